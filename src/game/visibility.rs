//! Player visibility
//!
//! Decides which other players a client is told about this tick: players in
//! the same or a neighbouring region, on the same plane, within the view
//! distance on both axes. Results keep login order.

use crate::game::player::{Player, REGION_SIZE};

/// Check if `other` has the same or an adjacent region origin
pub fn is_region_local(local: &Player, other: &Player) -> bool {
    let dx = (local.region.x as i32 - other.region.x as i32).abs();
    let dy = (local.region.y as i32 - other.region.y as i32).abs();
    dx <= REGION_SIZE as i32 && dy <= REGION_SIZE as i32
}

/// Absolute tile offset of `other` from `local`
pub fn relative_offset(local: &Player, other: &Player) -> (i32, i32) {
    (
        other.absolute_x() as i32 - local.absolute_x() as i32,
        other.absolute_y() as i32 - local.absolute_y() as i32,
    )
}

/// Check if `other` is within `view_distance` tiles of `local`
pub fn is_in_range(local: &Player, other: &Player, view_distance: u16) -> bool {
    if local.position.plane != other.position.plane {
        return false;
    }
    let (dx, dy) = relative_offset(local, other);
    dx.abs() <= view_distance as i32 && dy.abs() <= view_distance as i32
}

/// Indices of the players `local` can see, in the order given
pub fn resolve<'a>(
    local: &Player,
    players: impl IntoIterator<Item = &'a Player>,
    view_distance: u16,
) -> Vec<u16> {
    players
        .into_iter()
        .filter(|other| other.index != local.index)
        .filter(|other| is_region_local(local, other))
        .filter(|other| is_in_range(local, other, view_distance))
        .map(|other| other.index)
        .collect()
}
