//! Player movement
//!
//! Walk requests set a destination and a path; each tick a moving player
//! takes one step (walking) or two (running) along it. The resulting
//! [`MovementType`] is then written as the local player's block of the update
//! packet:
//!
//! ```text
//! update?(1) [type(2) [dir(3) | dir(3) dir(3) | plane(2) teleport(1)] mask?(1) [y(7) x(7)]]
//! ```

use tracing::trace;

use crate::game::player::{Direction, MovementType, Player};
use crate::game::sync::PendingUpdate;
use crate::net::bits::BitWriter;
use crate::protocol::packets::WalkRequest;

/// Start walking along a requested path
///
/// The first step becomes the destination (relative to the loaded region);
/// each following step is an offset from it, stored masked to a byte.
pub fn apply_walk_request(player: &mut Player, request: &WalkRequest) {
    let dest_x = (request.base_x.wrapping_sub(player.region.x) & 0xff) as u8;
    let dest_y = (request.base_y.wrapping_sub(player.region.y) & 0xff) as u8;

    player.destination = Some((dest_x, dest_y));
    player.path_coords = request
        .path
        .iter()
        .enumerate()
        .map(|(i, &step)| {
            let base = if i % 2 == 0 { dest_x } else { dest_y };
            step.wrapping_add(base)
        })
        .collect();
    player.running = request.running;
    player.moving = true;

    trace!(
        player_index = player.index,
        dest_x,
        dest_y,
        steps = player.path_coords.len() / 2,
        running = player.running,
        "Walk request applied"
    );
}

/// Move the next waypoint into place, or clear the destination at the end
fn next_waypoint(player: &mut Player) {
    if player.path_coords.len() >= 2 {
        player.destination = Some((player.path_coords[0], player.path_coords[1]));
        player.path_coords.drain(..2);
    } else {
        player.destination = None;
        player.path_coords.clear();
    }
}

/// Take one step toward the current waypoint
fn step(player: &mut Player) -> Option<Direction> {
    loop {
        let (target_x, target_y) = player.destination?;
        let dx = target_x as i32 - player.position.x as i32;
        let dy = target_y as i32 - player.position.y as i32;

        match Direction::from_delta(dx, dy) {
            Some(dir) => {
                let (sx, sy) = dir.delta();
                player.position.x = (player.position.x as i32 + sx) as u16;
                player.position.y = (player.position.y as i32 + sy) as u16;
                if player.position.x == target_x as u16 && player.position.y == target_y as u16 {
                    next_waypoint(player);
                }
                return Some(dir);
            }
            // Already standing on it
            None => next_waypoint(player),
        }
    }
}

/// Advance a moving player by one tick
pub fn advance(player: &mut Player) {
    let Some(first) = step(player) else {
        player.moving = false;
        player.movement = MovementType::Stand;
        return;
    };

    let second = if player.running { step(player) } else { None };
    player.movement = match second {
        Some(second) => MovementType::Run(first, second),
        None => MovementType::Walk(first),
    };
    player.pending |= PendingUpdate::LOCAL_BLOCK;

    if player.destination.is_none() {
        player.moving = false;
    }

    trace!(
        player_index = player.index,
        movement = ?player.movement,
        position = %player.position,
        "Player advanced"
    );
}

/// Return a player with no pending block to standing
pub fn settle(player: &mut Player) {
    if !player.pending.contains(PendingUpdate::LOCAL_BLOCK) {
        player.movement = MovementType::Stand;
    }
}

/// Write the local player's movement block
///
/// Consumes the player's local block and local mask flags. Returns whether
/// the player's appearance mask must be appended to the packet.
pub fn encode_local_block(player: &mut Player, bits: &mut BitWriter) -> bool {
    let update = player.pending.take(PendingUpdate::LOCAL_BLOCK);
    let mask_pending = player.pending.take(PendingUpdate::LOCAL_MASK);

    bits.write_bit(update);
    if !update {
        return false;
    }

    bits.write_number(player.movement.type_code() as u32, 2);
    match player.movement {
        MovementType::Stand => return true,
        MovementType::Walk(dir) => {
            bits.write_number(dir.code() as u32, 3);
            bits.write_bit(mask_pending);
        }
        MovementType::Run(first, second) => {
            bits.write_number(first.code() as u32, 3);
            bits.write_number(second.code() as u32, 3);
            bits.write_bit(mask_pending);
        }
        MovementType::Teleport => {
            bits.write_number(player.position.plane as u32, 2);
            bits.write_bit(true);
            bits.write_bit(mask_pending);
            bits.write_number(player.position.y as u32, 7);
            bits.write_number(player.position.x as u32, 7);
        }
    }

    mask_pending
}
