//! Networking module
//!
//! This module handles the byte-level side of the Rustscape sync server:
//! - Bit-packed stream writing for the player update packet
//! - Byte buffers with the client's integer encodings
//! - Per-client sessions (inbound queue, keystream, outbound channel)

pub mod bits;
pub mod buffer;
pub mod session;
