//! Packet definitions module
//!
//! Inbound packets the sync layer understands, and the outbound region reload
//! packet sent ahead of the player update when a player changes region.

use bytes::Bytes;

use crate::crypto::Keystream;
use crate::error::{ProtocolError, Result};
use crate::game::player::Region;
use crate::net::buffer::PacketBuffer;

/// Region reload packet opcode
pub const REGION_RELOAD_OPCODE: u8 = 73;

/// A packet received from the client, opcode already decrypted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundPacket {
    pub opcode: u8,
    pub payload: Bytes,
}

impl InboundPacket {
    /// Create a new inbound packet
    pub fn new(opcode: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            opcode,
            payload: payload.into(),
        }
    }
}

/// Client packet opcodes handled by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOpcode {
    /// Walk request (164)
    Walk,
    /// Client finished loading the region (121)
    RegionLoaded,
    /// Client is about to reload the region (210)
    RegionReloading,
    /// Anything else
    Unknown(u8),
}

impl ClientOpcode {
    /// Classify a raw opcode
    pub fn from_u8(opcode: u8) -> Self {
        match opcode {
            164 => Self::Walk,
            121 => Self::RegionLoaded,
            210 => Self::RegionReloading,
            other => Self::Unknown(other),
        }
    }

    /// Get the opcode value
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Walk => 164,
            Self::RegionLoaded => 121,
            Self::RegionReloading => 210,
            Self::Unknown(other) => other,
        }
    }
}

/// Walk request (opcode 164)
///
/// ```text
/// base_x (LE short A) | steps (N signed x/y byte pairs) | base_y (LE short) | running (byte C)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkRequest {
    /// Absolute X of the first tile
    pub base_x: u16,
    /// Absolute Y of the first tile
    pub base_y: u16,
    /// Signed step offsets from the first tile, interleaved x/y
    pub path: Vec<u8>,
    /// Whether the player asked to run
    pub running: bool,
}

impl WalkRequest {
    /// Fixed bytes around the path steps
    const HEADER_LEN: usize = 5;

    /// Decode a walk request payload
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::HEADER_LEN {
            return Err(ProtocolError::PacketTooShort {
                opcode: ClientOpcode::Walk.as_u8(),
                expected: Self::HEADER_LEN,
                actual: payload.len(),
            }
            .into());
        }

        let steps = (payload.len() - Self::HEADER_LEN) / 2;
        let mut buffer = PacketBuffer::from_bytes(payload);

        let base_x = buffer.read_ushort_le_a();
        let path = (0..steps * 2).map(|_| buffer.read_ubyte()).collect();
        let base_y = buffer.read_ushort_le();
        let running = buffer.read_byte_c() == 1;

        Ok(Self {
            base_x,
            base_y,
            path,
            running,
        })
    }

    /// Encode a walk request payload, as the client sends it
    pub fn encode(&self) -> Bytes {
        let mut buffer = PacketBuffer::with_capacity(Self::HEADER_LEN + self.path.len());
        buffer.write_ushort_le_a(self.base_x);
        buffer.write_bytes(&self.path);
        buffer.write_ushort_le(self.base_y);
        buffer.write_byte_c(self.running as i8);
        buffer.freeze()
    }
}

/// Build the region reload packet for a region origin
pub fn build_region_reload(region: &Region, keystream: &mut dyn Keystream) -> Bytes {
    let (chunk_x, chunk_y) = region.centre_chunk();
    let mut buffer = PacketBuffer::with_capacity(5);
    buffer.write_ubyte(keystream.encode_opcode(REGION_RELOAD_OPCODE));
    buffer.write_short_a(chunk_x);
    buffer.write_ushort(chunk_y);
    buffer.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PlainKeystream;
    use crate::error::RustscapeError;

    #[test]
    fn test_client_opcodes() {
        assert_eq!(ClientOpcode::from_u8(164), ClientOpcode::Walk);
        assert_eq!(ClientOpcode::from_u8(121), ClientOpcode::RegionLoaded);
        assert_eq!(ClientOpcode::from_u8(210), ClientOpcode::RegionReloading);
        assert_eq!(ClientOpcode::from_u8(4), ClientOpcode::Unknown(4));
        assert_eq!(ClientOpcode::Unknown(4).as_u8(), 4);
    }

    #[test]
    fn test_walk_decode() {
        // base x 3222 (LE A), steps (1, -1), base y 3218 (LE), running
        let payload = [0x16, 0x0C, 0x01, 0xFF, 0x92, 0x0C, 0xFF];
        let walk = WalkRequest::decode(&payload).unwrap();

        assert_eq!(walk.base_x, 3222);
        assert_eq!(walk.base_y, 3218);
        assert_eq!(walk.path, vec![1, 0xFF]);
        assert!(walk.running);
    }

    #[test]
    fn test_walk_decode_no_steps() {
        let walk = WalkRequest {
            base_x: 3200,
            base_y: 3201,
            path: Vec::new(),
            running: false,
        };
        let decoded = WalkRequest::decode(&walk.encode()).unwrap();
        assert_eq!(decoded, walk);
    }

    #[test]
    fn test_walk_decode_ignores_odd_trailing_byte() {
        let walk = WalkRequest {
            base_x: 3222,
            base_y: 3222,
            path: vec![5, 3],
            running: false,
        };
        let mut payload = walk.encode().to_vec();
        payload.push(0x42);

        // Only whole step pairs are read; the trailing byte is ignored
        let decoded = WalkRequest::decode(&payload).unwrap();
        assert_eq!(decoded.path.len(), 2);
        assert_eq!(decoded.base_y, 3222);
        assert!(!decoded.running);
    }

    #[test]
    fn test_walk_decode_too_short() {
        let result = WalkRequest::decode(&[0x16, 0x0C, 0x92]);
        assert!(matches!(
            result,
            Err(RustscapeError::Protocol(ProtocolError::PacketTooShort {
                opcode: 164,
                expected: 5,
                actual: 3,
            }))
        ));
    }

    #[test]
    fn test_region_reload() {
        let packet = build_region_reload(&Region::new(3200, 3200), &mut PlainKeystream);
        // 3200 / 8 + 6 = 406 = 0x0196, low byte of the first shifted by 128
        assert_eq!(packet.as_ref(), &[73, 0x01, 0x16, 0x01, 0x96]);
    }
}
