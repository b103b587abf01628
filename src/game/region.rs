//! Region boundary tracking
//!
//! A player stays in their loaded region while their region-relative
//! coordinates remain inside `[min_tile, max_tile]`. Leaving that window on an
//! axis shifts the region origin by one region width in that direction, and
//! the client must be sent a region reload before this tick's update.

use tracing::debug;

use crate::game::player::{Player, REGION_SIZE};
use crate::game::sync::SyncConfig;

/// Per-axis region shift: -1, 0 or +1
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegionChange {
    pub dx: i8,
    pub dy: i8,
}

impl RegionChange {
    /// Check if either axis shifts
    pub fn is_change(&self) -> bool {
        self.dx != 0 || self.dy != 0
    }
}

/// Signed shift for a single axis
fn axis_change(coord: u16, min_tile: u16, max_tile: u16) -> i8 {
    if coord < min_tile {
        -1
    } else if coord > max_tile {
        1
    } else {
        0
    }
}

/// Compute the region shift a player's current position calls for
pub fn detect_change(player: &Player, config: &SyncConfig) -> RegionChange {
    RegionChange {
        dx: axis_change(player.position.x, config.region_min_tile, config.region_max_tile),
        dy: axis_change(player.position.y, config.region_min_tile, config.region_max_tile),
    }
}

/// Shift a region-relative byte coordinate against an origin move
fn shift_tile(tile: u8, change: i8) -> u8 {
    (tile as i16 - change as i16 * REGION_SIZE as i16) as u8
}

/// Move the player's region origin by `change` regions
///
/// Region-relative state (position, destination, remaining path) is
/// rebased so the player's absolute tile does not move.
pub fn apply_change(player: &mut Player, change: RegionChange) {
    let step = REGION_SIZE as i16;

    player.region.x = player.region.x.wrapping_add_signed(change.dx as i16 * step);
    player.region.y = player.region.y.wrapping_add_signed(change.dy as i16 * step);
    player.position.x = player.position.x.wrapping_add_signed(-(change.dx as i16) * step);
    player.position.y = player.position.y.wrapping_add_signed(-(change.dy as i16) * step);

    if let Some((x, y)) = player.destination {
        player.destination = Some((shift_tile(x, change.dx), shift_tile(y, change.dy)));
    }
    for (i, coord) in player.path_coords.iter_mut().enumerate() {
        let change = if i % 2 == 0 { change.dx } else { change.dy };
        *coord = shift_tile(*coord, change);
    }
}

/// Detect and apply a region change, reporting whether a reload is needed
pub fn track(player: &mut Player, config: &SyncConfig) -> Option<RegionChange> {
    let change = detect_change(player, config);
    if !change.is_change() {
        return None;
    }

    apply_change(player, change);
    debug!(
        player_index = player.index,
        dx = change.dx,
        dy = change.dy,
        region_x = player.region.x,
        region_y = player.region.y,
        "Region change"
    );
    Some(change)
}
