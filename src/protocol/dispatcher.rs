//! Per-tick packet dispatch
//!
//! Each tick, for one player:
//! 1. Route every queued inbound packet to its handler, oldest first
//! 2. Advance movement and region tracking if the player is walking
//! 3. Build the player update packet
//! 4. Concatenate every fragment into one write and clear the queue
//!
//! Repeated walk requests within a tick are not merged; each one replaces the
//! previous path, so the last one wins.

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::game::movement;
use crate::game::player::{MovementType, Others, Player};
use crate::game::region;
use crate::game::sync::{build_update_packet, PendingUpdate, SyncConfig};
use crate::net::session::Session;

use super::packets::{build_region_reload, ClientOpcode, InboundPacket, WalkRequest};

/// A packet handler, optionally producing a response fragment
pub type Handler = fn(&mut Player, &InboundPacket) -> Result<Option<Bytes>>;

/// Opcode routing table
static ROUTES: OnceLock<HashMap<ClientOpcode, Handler>> = OnceLock::new();

/// Get the routing table
fn routes() -> &'static HashMap<ClientOpcode, Handler> {
    ROUTES.get_or_init(|| {
        let mut map: HashMap<ClientOpcode, Handler> = HashMap::new();
        map.insert(ClientOpcode::Walk, handle_walk);
        map.insert(ClientOpcode::RegionLoaded, handle_region_loaded);
        map.insert(ClientOpcode::RegionReloading, handle_region_reloading);
        map
    })
}

/// Check if an opcode has a handler
pub fn is_handled(opcode: u8) -> bool {
    routes().contains_key(&ClientOpcode::from_u8(opcode))
}

/// Handle a walk request
fn handle_walk(player: &mut Player, packet: &InboundPacket) -> Result<Option<Bytes>> {
    let request = WalkRequest::decode(&packet.payload)?;
    debug!(
        player_index = player.index,
        base_x = request.base_x,
        base_y = request.base_y,
        steps = request.path.len() / 2,
        running = request.running,
        "Walk request received"
    );
    movement::apply_walk_request(player, &request);
    Ok(None)
}

/// Handle the client finishing a region load
fn handle_region_loaded(player: &mut Player, _packet: &InboundPacket) -> Result<Option<Bytes>> {
    trace!(player_index = player.index, "Region loaded");
    player.region_loaded = true;
    Ok(None)
}

/// Handle the client starting a region reload
fn handle_region_reloading(player: &mut Player, _packet: &InboundPacket) -> Result<Option<Bytes>> {
    trace!(player_index = player.index, "Region reloading");
    player.region_loaded = false;
    Ok(None)
}

/// Route one packet to its handler
pub fn route(player: &mut Player, packet: &InboundPacket) -> Result<Option<Bytes>> {
    let opcode = ClientOpcode::from_u8(packet.opcode);
    match routes().get(&opcode) {
        Some(handler) => handler(player, packet),
        None => {
            debug!(
                player_index = player.index,
                opcode = packet.opcode,
                size = packet.payload.len(),
                "Unhandled game packet"
            );
            Ok(None)
        }
    }
}

/// Run one tick for a player, returning the single write for their client
pub fn dispatch(
    session: &mut Session,
    local: &mut Player,
    others: &mut Others<'_>,
    config: &SyncConfig,
) -> Bytes {
    let mut out = BytesMut::new();

    let (inbound, keystream) = session.split();
    for packet in inbound {
        match route(local, packet) {
            Ok(Some(fragment)) => out.extend_from_slice(&fragment),
            Ok(None) => {}
            Err(e) => warn!(
                player_index = local.index,
                opcode = packet.opcode,
                error = %e,
                "Failed to handle game packet"
            ),
        }
    }

    if local.moving {
        movement::advance(local);
        if region::track(local, config).is_some() {
            out.extend_from_slice(&build_region_reload(&local.region, keystream));
        }
    }

    out.extend_from_slice(&build_update_packet(local, others, config, keystream));
    movement::settle(local);
    session.clear_inbound();

    out.freeze()
}

/// Send the region and first player update to a player who just logged in
pub fn send_initial_packets(
    session: &mut Session,
    local: &mut Player,
    others: &mut Others<'_>,
    config: &SyncConfig,
) -> Result<()> {
    let keystream = session.keystream();
    let mut out = BytesMut::new();
    out.extend_from_slice(&build_region_reload(&local.region, keystream));
    out.extend_from_slice(&build_update_packet(local, others, config, keystream));

    local.movement = MovementType::Stand;
    local.pending.remove(PendingUpdate::LOCAL_MASK);

    debug!(
        player_index = local.index,
        region_x = local.region.x,
        region_y = local.region.y,
        size = out.len(),
        "Sent initial packets"
    );
    session.send(out.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PlainKeystream;
    use crate::game::player::{PlayerList, Position, Region};
    use crate::protocol::packets::REGION_RELOAD_OPCODE;

    fn setup(x: u16, y: u16) -> (Session, PlayerList) {
        let (session, rx) = Session::with_channel(1, Box::new(PlainKeystream));
        // The receiver is not needed by dispatch
        drop(rx);
        let mut list = PlayerList::new();
        let mut player = Player::new(1, "p", Region::new(3200, 3200), Position::new(x, y, 0));
        player.movement = MovementType::Stand;
        player.pending = PendingUpdate::empty();
        list.add(player).unwrap();
        (session, list)
    }

    fn tick(session: &mut Session, list: &mut PlayerList) -> Bytes {
        let (local, mut others) = list.split_local(1).unwrap();
        dispatch(session, local, &mut others, &SyncConfig::default())
    }

    #[test]
    fn test_routes() {
        assert!(is_handled(164));
        assert!(is_handled(121));
        assert!(is_handled(210));
        assert!(!is_handled(0));
    }

    #[test]
    fn test_empty_tick_is_sync_only() {
        let (mut session, mut list) = setup(40, 40);

        let first = tick(&mut session, &mut list);
        let second = tick(&mut session, &mut list);

        assert_eq!(first.as_ref(), &[81, 0, 3, 0x00, 0x7F, 0xF0]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_region_flags() {
        let (mut session, mut list) = setup(40, 40);

        session.queue_packet(InboundPacket::new(121, Bytes::new()));
        tick(&mut session, &mut list);
        assert!(list.get(1).unwrap().region_loaded);

        session.queue_packet(InboundPacket::new(210, Bytes::new()));
        tick(&mut session, &mut list);
        assert!(!list.get(1).unwrap().region_loaded);
        assert_eq!(session.pending_packets(), 0);
    }

    #[test]
    fn test_unknown_and_malformed_packets_are_skipped() {
        let (mut session, mut list) = setup(40, 40);
        session.queue_packet(InboundPacket::new(3, Bytes::from_static(&[1])));
        session.queue_packet(InboundPacket::new(164, Bytes::from_static(&[1, 2])));

        let out = tick(&mut session, &mut list);

        assert_eq!(out[0], 81);
        assert_eq!(session.pending_packets(), 0);
        assert!(!list.get(1).unwrap().moving);
    }

    #[test]
    fn test_walk_moves_player() {
        let (mut session, mut list) = setup(40, 40);
        let walk = WalkRequest {
            base_x: 3242,
            base_y: 3240,
            path: Vec::new(),
            running: false,
        };
        session.queue_packet(InboundPacket::new(164, walk.encode()));

        let out = tick(&mut session, &mut list);

        let player = list.get(1).unwrap();
        assert_eq!(player.position, Position::new(41, 40, 0));
        assert_eq!(player.movement, MovementType::Stand);
        assert!(player.moving);
        // update | walk | east | no mask
        assert_eq!(out[3] >> 1, 0b1_01_100_0);
    }

    #[test]
    fn test_region_crossing_prepends_reload() {
        let (mut session, mut list) = setup(86, 40);
        let walk = WalkRequest {
            base_x: 3287,
            base_y: 3240,
            path: Vec::new(),
            running: false,
        };
        session.queue_packet(InboundPacket::new(164, walk.encode()));

        let out = tick(&mut session, &mut list);

        assert_eq!(out[0], REGION_RELOAD_OPCODE);
        assert_eq!(out[5], 81);
        let player = list.get(1).unwrap();
        assert_eq!(player.region, Region::new(3264, 3200));
        assert_eq!(player.absolute_x(), 3287);
    }

    #[test]
    fn test_initial_packets() {
        let (mut session, mut rx) = Session::with_channel(1, Box::new(PlainKeystream));
        let mut list = PlayerList::new();
        let mut player = Player::at_tile(1, "p", 3222, 3222, 0);
        player.flag_appearance_update();
        list.add(player).unwrap();

        let (local, mut others) = list.split_local(1).unwrap();
        send_initial_packets(&mut session, local, &mut others, &SyncConfig::default()).unwrap();

        let out = rx.try_recv().unwrap();
        assert_eq!(out[0], REGION_RELOAD_OPCODE);
        assert_eq!(out[5], 81);

        let player = list.get(1).unwrap();
        assert_eq!(player.movement, MovementType::Stand);
        assert!(!player.pending.contains(PendingUpdate::LOCAL_MASK));
    }
}
