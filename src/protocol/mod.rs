//! Protocol module
//!
//! This module contains the in-game protocol pieces of the sync server:
//! - Inbound packet definitions and the region reload packet
//! - Per-tick dispatch of queued packets into one outgoing write

pub mod dispatcher;
pub mod packets;
