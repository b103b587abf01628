//! Player update packet (opcode 81)
//!
//! Built once per player per tick, after movement and region tracking have
//! run. The body is one bit stream:
//! - The local player's movement block
//! - A count of other players with movement updates (always 0)
//! - One entry per visible player, then the 2047 end marker
//! - Padding to a byte boundary
//! - An appearance mask for every player scheduled one, local player first
//!
//! Framed as `opcode | length (i16 BE) | body`.

use bytes::Bytes;
use tracing::trace;

use crate::crypto::Keystream;
use crate::game::movement;
use crate::game::player::{Others, Player, MAX_PLAYER_INDEX};
use crate::game::visibility;
use crate::net::bits::BitWriter;
use crate::net::buffer::PacketBuffer;

use super::appearance_mask::AppearanceMask;
use super::update_flags::{PendingUpdate, APPEARANCE_MASK};

/// View distance in tiles (how far players can see each other)
pub const VIEW_DISTANCE: u16 = 15;

/// Player update packet opcode
pub const PLAYER_UPDATE_OPCODE: u8 = 81;

/// Lowest region-relative tile before the region shifts down
pub const REGION_MIN_TILE: u16 = 15;

/// Highest region-relative tile before the region shifts up
pub const REGION_MAX_TILE: u16 = 86;

/// Synchronization configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// View distance in tiles
    pub view_distance: u16,
    /// Low region reload threshold
    pub region_min_tile: u16,
    /// High region reload threshold
    pub region_max_tile: u16,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            view_distance: VIEW_DISTANCE,
            region_min_tile: REGION_MIN_TILE,
            region_max_tile: REGION_MAX_TILE,
        }
    }
}

/// Write one entry per visible player, returning masks they scheduled
fn write_other_players(
    bits: &mut BitWriter,
    local: &Player,
    others: &mut Others<'_>,
    visible: &[u16],
) -> Vec<AppearanceMask> {
    let mut masks = Vec::new();

    for &index in visible {
        let Some(other) = others.get_mut(index) else {
            continue;
        };
        let (dx, dy) = visibility::relative_offset(local, other);
        let mask_pending = other.pending.take(PendingUpdate::OBSERVER_MASK);

        bits.write_number(index as u32, 11);
        bits.write_bit(mask_pending);
        bits.write_bit(false);
        bits.write_number((dy & 0x1f) as u32, 5);
        bits.write_number((dx & 0x1f) as u32, 5);

        if mask_pending {
            masks.push(AppearanceMask::for_player(other));
        }
    }

    masks
}

/// Build a player update packet for a specific player
///
/// Consumes the local player's block flags and the observer mask flag of
/// every visible player that carried one.
pub fn build_update_packet(
    local: &mut Player,
    others: &mut Others<'_>,
    config: &SyncConfig,
    keystream: &mut dyn Keystream,
) -> Bytes {
    let visible = visibility::resolve(local, others.iter(), config.view_distance);
    let mut bits = BitWriter::new();
    let mut masks = Vec::new();

    // === Local player ===
    if movement::encode_local_block(local, &mut bits) {
        masks.push(AppearanceMask::for_player(local));
    }

    // === Other players ===
    bits.write_number(0, 8);
    masks.extend(write_other_players(&mut bits, local, others, &visible));
    bits.write_number(MAX_PLAYER_INDEX as u32, 11);
    bits.pad_to_byte();

    // === Masks ===
    for mask in &masks {
        bits.write_number(APPEARANCE_MASK as u32, 8);
        mask.encode(&mut bits);
    }

    let body = bits.to_bytes();
    let mut packet = PacketBuffer::with_capacity(body.len() + 3);
    packet.write_ubyte(keystream.encode_opcode(PLAYER_UPDATE_OPCODE));
    packet.write_short(body.len() as i16);
    packet.write_bytes(&body);

    trace!(
        player_index = local.index,
        visible = visible.len(),
        masks = masks.len(),
        size = body.len(),
        "Built player update packet"
    );

    packet.freeze()
}
