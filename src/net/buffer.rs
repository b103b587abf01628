//! Packet buffer implementation
//!
//! Byte-oriented reads and writes used for packet framing and the small
//! fixed-layout packets (walk requests, region reloads), including the
//! RS-specific byte transforms:
//! - A: value + 128 on the low byte
//! - C: negated byte

use bytes::{BufMut, Bytes, BytesMut};

/// Packet buffer for reading and writing game protocol data
#[derive(Debug, Clone, Default)]
pub struct PacketBuffer {
    /// Internal byte buffer
    data: BytesMut,
    /// Current read position
    read_pos: usize,
}

impl PacketBuffer {
    /// Create a new empty packet buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a packet buffer with a specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            read_pos: 0,
        }
    }

    /// Create a packet buffer for reading existing bytes
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: BytesMut::from(bytes),
            read_pos: 0,
        }
    }

    // ============ Properties ============

    /// Get the total length of the buffer
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of bytes remaining to read
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.read_pos)
    }

    /// Get a reference to the underlying bytes
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Freeze the written bytes
    pub fn freeze(self) -> Bytes {
        self.data.freeze()
    }

    // ============ Reading ============

    /// Read a signed byte (0 past the end)
    pub fn read_byte(&mut self) -> i8 {
        self.read_ubyte() as i8
    }

    /// Read an unsigned byte (0 past the end)
    pub fn read_ubyte(&mut self) -> u8 {
        match self.data.get(self.read_pos) {
            Some(&value) => {
                self.read_pos += 1;
                value
            }
            None => 0,
        }
    }

    /// Read an unsigned little-endian short
    pub fn read_ushort_le(&mut self) -> u16 {
        let low = self.read_ubyte() as u16;
        let high = self.read_ubyte() as u16;
        (high << 8) | low
    }

    /// Read little-endian short A
    pub fn read_ushort_le_a(&mut self) -> u16 {
        let low = self.read_ubyte().wrapping_sub(128) as u16;
        let high = self.read_ubyte() as u16;
        (high << 8) | low
    }

    /// Read byte C (negated)
    pub fn read_byte_c(&mut self) -> i8 {
        self.read_byte().wrapping_neg()
    }

    // ============ Writing ============

    /// Write a signed byte
    pub fn write_byte(&mut self, value: i8) {
        self.data.put_i8(value);
    }

    /// Write an unsigned byte
    pub fn write_ubyte(&mut self, value: u8) {
        self.data.put_u8(value);
    }

    /// Write a signed big-endian short
    pub fn write_short(&mut self, value: i16) {
        self.data.put_i16(value);
    }

    /// Write an unsigned big-endian short
    pub fn write_ushort(&mut self, value: u16) {
        self.data.put_u16(value);
    }

    /// Write an unsigned little-endian short
    pub fn write_ushort_le(&mut self, value: u16) {
        self.data.put_u16_le(value);
    }

    /// Write short A (big-endian with A modifier on second byte)
    pub fn write_short_a(&mut self, value: u16) {
        self.write_ubyte((value >> 8) as u8);
        self.write_ubyte((value as u8).wrapping_add(128));
    }

    /// Write little-endian short A
    pub fn write_ushort_le_a(&mut self, value: u16) {
        self.write_ubyte((value as u8).wrapping_add(128));
        self.write_ubyte((value >> 8) as u8);
    }

    /// Write byte C (negated)
    pub fn write_byte_c(&mut self, value: i8) {
        self.write_byte(value.wrapping_neg());
    }

    /// Write raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.put_slice(bytes);
    }
}

impl AsRef<[u8]> for PacketBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_shorts() {
        let mut buf = PacketBuffer::new();
        buf.write_short(-2);
        buf.write_ushort(0x1234);

        assert_eq!(buf.as_bytes(), &[0xFF, 0xFE, 0x12, 0x34]);
    }

    #[test]
    fn test_rs_specific_encodings() {
        let mut buf = PacketBuffer::new();
        buf.write_ushort_le_a(3222);
        buf.write_ushort_le(3218);
        buf.write_byte_c(1);
        buf.write_short_a(0x0102);

        assert_eq!(&buf.as_bytes()[5..], &[0x01, 0x82]);

        let mut reader = PacketBuffer::from_bytes(buf.as_bytes());
        assert_eq!(reader.read_ushort_le_a(), 3222);
        assert_eq!(reader.read_ushort_le(), 3218);
        assert_eq!(reader.read_byte_c(), 1);
    }

    #[test]
    fn test_read_past_end() {
        let mut buf = PacketBuffer::from_bytes(&[7]);
        assert_eq!(buf.remaining(), 1);
        assert_eq!(buf.read_ubyte(), 7);
        assert_eq!(buf.read_ubyte(), 0);
        assert_eq!(buf.remaining(), 0);
    }
}
