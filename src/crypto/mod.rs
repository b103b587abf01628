//! Cryptography module
//!
//! Opcode obfuscation for outgoing packets. Each session owns a keystream and
//! every outgoing opcode is shifted by the next value it yields. The cipher
//! itself is negotiated at login and plugged in through [`Keystream`].

/// A per-session source of opcode keys
pub trait Keystream: Send {
    /// Advance the stream and return the next key
    fn next_key(&mut self) -> u32;

    /// Obfuscate an opcode with the next key (wrapping at the byte boundary)
    fn encode_opcode(&mut self, opcode: u8) -> u8 {
        (opcode as u32).wrapping_add(self.next_key()) as u8
    }
}

/// Keystream that never shifts opcodes, for clients connecting without a cipher
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainKeystream;

impl Keystream for PlainKeystream {
    fn next_key(&mut self) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u32);

    impl Keystream for Fixed {
        fn next_key(&mut self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_plain_keystream_leaves_opcode() {
        let mut keys = PlainKeystream;
        assert_eq!(keys.encode_opcode(81), 81);
    }

    #[test]
    fn test_encode_opcode_wraps() {
        let mut keys = Fixed(200);
        assert_eq!(keys.encode_opcode(81), ((81 + 200) % 256) as u8);
    }
}
