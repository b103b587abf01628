//! One-shot update flags for player synchronization
//!
//! Each flag is armed by whatever changed the player and consumed exactly once
//! by the encoder that writes it. Nothing reads a flag after consuming it.

use bitflags::bitflags;

/// Mask-type tag written before an appearance block
pub const APPEARANCE_MASK: u8 = 0x10;

bitflags! {
    /// Pending per-tick updates for a single player
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PendingUpdate: u8 {
        /// The player's own block must be written (movement or appearance changed)
        const LOCAL_BLOCK = 1 << 0;
        /// The player's appearance mask must accompany their own block
        const LOCAL_MASK = 1 << 1;
        /// An observer must receive this player's appearance mask
        const OBSERVER_MASK = 1 << 2;
    }
}

impl PendingUpdate {
    /// Consume a flag, returning whether it was armed
    pub fn take(&mut self, flag: PendingUpdate) -> bool {
        let armed = self.contains(flag);
        self.remove(flag);
        armed
    }
}
