//! Appearance mask (tag 0x10)
//!
//! An appearance block is a size byte followed by 36 fields at table-driven
//! widths. The size byte is written as a placeholder and backpatched once the
//! field bytes are counted, inverted as `255 - size + 1` and truncated to a
//! byte.

use crate::game::player::{encode_name, Player};
use crate::net::bits::BitWriter;

/// Number of fields in an appearance block
pub const FIELD_COUNT: usize = 36;

/// Bit width of each field
const FIELD_WIDTHS: [u32; FIELD_COUNT] = {
    let mut widths = [8u32; FIELD_COUNT];
    let mut i = 2;
    while i <= 13 {
        widths[i] = 16;
        i += 1;
    }
    let mut i = 19;
    while i <= 25 {
        widths[i] = 16;
        i += 1;
    }
    widths[35] = 16;
    widths
};

/// Equipment slot fields, which carry an id-kind offset
const EQUIPMENT_FIELDS: std::ops::RangeInclusive<usize> = 2..=13;

/// Slot codes above this are item ids; at or below, body-part ids
const ITEM_ID_THRESHOLD: u32 = 200;

/// Apply the client's equipment slot convention to a raw slot code
#[inline]
fn equipment_code(value: u32) -> u32 {
    if value > ITEM_ID_THRESHOLD {
        value + 0x200
    } else {
        value + 0x100
    }
}

/// The flat field list for one player's appearance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppearanceMask {
    pub fields: [u32; FIELD_COUNT],
}

impl AppearanceMask {
    /// Collect a player's appearance into wire field order
    ///
    /// gender, head icon, 12 equipment slots, 5 colours, 7 animations,
    /// 8 bytes of the base-37 name, combat level, skill level.
    pub fn for_player(player: &Player) -> Self {
        let appearance = &player.appearance;
        let mut fields = [0u32; FIELD_COUNT];

        fields[0] = appearance.gender as u32;
        fields[1] = appearance.head_icon as u32;
        for (slot, &code) in appearance.equipment.iter().enumerate() {
            fields[2 + slot] = code as u32;
        }
        for (i, &color) in appearance.colors.iter().enumerate() {
            fields[14 + i] = color as u32;
        }
        for (i, &anim) in appearance.animations.iter().enumerate() {
            fields[19 + i] = anim as u32;
        }
        for (i, &byte) in encode_name(&player.name).to_be_bytes().iter().enumerate() {
            fields[26 + i] = byte as u32;
        }
        fields[34] = player.combat_level as u32;
        fields[35] = player.skill_level as u32;

        Self { fields }
    }

    /// Write the block, returning the byte size counted for the size field
    pub fn encode(&self, bits: &mut BitWriter) -> u32 {
        encode_fields(&self.fields, bits)
    }
}

/// Write a size placeholder and the fields, then backpatch the size
///
/// Fields past the 36th are ignored.
pub fn encode_fields(fields: &[u32], bits: &mut BitWriter) -> u32 {
    let size_offset = bits.bit_len();
    bits.write_number(0, 8);

    let mut size = 0u32;
    for (i, (&value, &width)) in fields.iter().zip(FIELD_WIDTHS.iter()).enumerate() {
        let value = if EQUIPMENT_FIELDS.contains(&i) {
            equipment_code(value)
        } else {
            value
        };
        bits.write_number(value, width);
        size += width / 8;
    }

    bits.write_number_over(255u32.wrapping_sub(size).wrapping_add(1), 8, size_offset);
    size
}
