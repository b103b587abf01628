//! Player synchronization module
//!
//! Builds the per-tick player update packet (opcode 81):
//! - Local player movement block
//! - Visible player list
//! - Appearance masks
//! - One-shot update flags driving all of the above

pub mod appearance_mask;
pub mod player_sync;
pub mod update_flags;

pub use appearance_mask::AppearanceMask;
pub use player_sync::{build_update_packet, SyncConfig, PLAYER_UPDATE_OPCODE};
pub use update_flags::{PendingUpdate, APPEARANCE_MASK};
