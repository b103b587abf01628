//! Rustscape Sync Library
//!
//! The per-tick player synchronization layer of the Rustscape game server:
//! inbound packet dispatch, movement and region tracking, and the bit-packed
//! player update packet (opcode 81).
//!
//! ## Modules
//!
//! - `config` - Server configuration management
//! - `crypto` - Opcode keystreams
//! - `error` - Error types and result definitions
//! - `game` - Players, movement, regions, visibility, sync and the world tick
//! - `net` - Bit and byte buffers, client sessions
//! - `protocol` - Inbound packets and per-tick dispatch

pub mod config;
pub mod crypto;
pub mod error;
pub mod game;
pub mod net;
pub mod protocol;

// Re-export commonly used types
pub use config::ServerConfig;
pub use error::{Result, RustscapeError};
pub use game::world::GameWorld;

/// Server version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
