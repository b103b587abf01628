//! Bit-packed stream writing
//!
//! The player update packet is a single MSB-first bit stream. Fields are
//! written at fixed widths and silently truncated to that width; a field can
//! be rewritten in place once its value is known (the appearance mask's size
//! byte is backpatched this way).

/// Initial backing storage in bytes
const INITIAL_CAPACITY: usize = 256;

/// Mask covering the low `width` bits
#[inline]
fn low_bits(width: u32) -> u64 {
    (1u64 << width) - 1
}

/// Growable, index-addressable bit buffer
#[derive(Debug, Clone)]
pub struct BitWriter {
    /// Backing storage, always at least `ceil(bit_len / 8)` bytes
    data: Vec<u8>,
    /// Number of bits written so far
    bit_len: usize,
}

impl BitWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY)
    }

    /// Create an empty writer with room for `bytes` bytes before growing
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: vec![0; bytes.max(1)],
            bit_len: 0,
        }
    }

    /// Number of bits written
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Number of whole bytes the written bits occupy
    #[inline]
    pub fn byte_len(&self) -> usize {
        (self.bit_len + 7) / 8
    }

    /// Append a single bit
    pub fn write_bit(&mut self, bit: bool) {
        self.write_number(bit as u32, 1);
    }

    /// Append the `width` low bits of `value`, most significant bit first
    ///
    /// Bits above `width` are discarded. `width` must be in `1..=32`.
    pub fn write_number(&mut self, value: u32, width: u32) {
        debug_assert!((1..=32).contains(&width), "bit width out of range: {width}");
        self.ensure_capacity(self.bit_len + width as usize);
        self.put(value, width, self.bit_len);
        self.bit_len += width as usize;
    }

    /// Overwrite `width` bits starting at an already-written `bit_offset`
    ///
    /// The stream length is unchanged.
    pub fn write_number_over(&mut self, value: u32, width: u32, bit_offset: usize) {
        debug_assert!((1..=32).contains(&width), "bit width out of range: {width}");
        debug_assert!(
            bit_offset + width as usize <= self.bit_len,
            "backpatch past end of stream"
        );
        self.put(value, width, bit_offset);
    }

    /// Append zero bits until the stream ends on a byte boundary
    pub fn pad_to_byte(&mut self) {
        let rem = self.bit_len % 8;
        if rem != 0 {
            let pad = 8 - rem as u32;
            self.write_number(0, pad);
        }
    }

    /// The written bits as bytes, the final byte zero-filled
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data[..self.byte_len()].to_vec()
    }

    /// Grow the backing storage so `bits` bits fit
    fn ensure_capacity(&mut self, bits: usize) {
        let needed = (bits + 7) / 8;
        if needed > self.data.len() {
            let new_len = needed.max(self.data.len() * 2);
            self.data.resize(new_len, 0);
        }
    }

    /// Store `width` bits of `value` at `bit_offset`, clearing what was there
    fn put(&mut self, value: u32, width: u32, bit_offset: usize) {
        let mut remaining = width;
        let mut pos = bit_offset;
        let value = value as u64 & low_bits(width);

        while remaining > 0 {
            let byte = pos >> 3;
            let free = 8 - (pos & 7) as u32;
            let take = free.min(remaining);
            let shift = free - take;
            let chunk = ((value >> (remaining - take)) & low_bits(take)) as u8;
            let mask = (low_bits(take) as u8) << shift;

            self.data[byte] = (self.data[byte] & !mask) | (chunk << shift);

            remaining -= take;
            pos += take as usize;
        }
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// MSB-first bit reader over a byte slice
///
/// Mirrors the client's bit access so packets built by [`BitWriter`] can be
/// checked field by field.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Start reading at the first bit of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Current bit position
    pub fn position(&self) -> usize {
        self.bit_pos
    }

    /// Bits left to read
    pub fn remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.bit_pos)
    }

    /// Read a single bit
    pub fn read_bit(&mut self) -> Option<bool> {
        self.read_number(1).map(|bit| bit == 1)
    }

    /// Read `width` bits as an unsigned value, `None` past the end of input
    pub fn read_number(&mut self, width: u32) -> Option<u32> {
        if width == 0 || width > 32 || self.remaining() < width as usize {
            return None;
        }

        let mut value = 0u64;
        for _ in 0..width {
            let byte = self.data[self.bit_pos >> 3];
            let bit = (byte >> (7 - (self.bit_pos & 7))) & 1;
            value = (value << 1) | bit as u64;
            self.bit_pos += 1;
        }

        Some(value as u32)
    }

    /// Skip to the next byte boundary
    pub fn align(&mut self) {
        self.bit_pos = (self.bit_pos + 7) & !7;
    }
}
