//! World module
//!
//! Manages the game world including:
//! - Game tick loop (600ms intervals)
//! - Player login and logout, with index allocation
//! - Per-tick packet dispatch and player synchronization
//!
//! Each tick processes players one at a time in login order while holding
//! the player list write lock, so logins and logouts never interleave with a
//! visibility scan.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::crypto::Keystream;
use crate::error::{GameError, NetworkError, Result};
use crate::game::player::{Player, PlayerList, MAX_PLAYER_INDEX};
use crate::game::sync::SyncConfig;
use crate::net::session::Session;
use crate::protocol::dispatcher;
use crate::protocol::packets::InboundPacket;

/// Standard game tick rate in milliseconds
pub const TICK_RATE_MS: u64 = 600;

/// Maximum players per world (indices 1 to 2046)
pub const MAX_PLAYERS: u16 = MAX_PLAYER_INDEX - 1;

/// World settings
#[derive(Debug, Clone)]
pub struct WorldSettings {
    /// World ID (1-255)
    pub world_id: u8,
    /// World name
    pub name: String,
    /// Tick rate in milliseconds
    pub tick_rate_ms: u64,
    /// Maximum players allowed
    pub max_players: u16,
    /// Player synchronization settings
    pub sync: SyncConfig,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            world_id: 1,
            name: "Rustscape".to_string(),
            tick_rate_ms: TICK_RATE_MS,
            max_players: MAX_PLAYERS,
            sync: SyncConfig::default(),
        }
    }
}

impl WorldSettings {
    /// Create new world settings with a specific ID
    pub fn new(world_id: u8) -> Self {
        Self {
            world_id,
            ..Default::default()
        }
    }

    /// Set the player limit
    pub fn with_max_players(mut self, max_players: u16) -> Self {
        self.max_players = max_players;
        self
    }

    /// Set the tick rate
    pub fn with_tick_rate(mut self, tick_rate_ms: u64) -> Self {
        self.tick_rate_ms = tick_rate_ms;
        self
    }
}

impl From<&ServerConfig> for WorldSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            world_id: config.world_id,
            name: config.server_name.clone(),
            tick_rate_ms: config.tick_rate_ms,
            max_players: config.max_players,
            sync: config.sync_config(),
        }
    }
}

/// World state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldState {
    /// World is initializing
    Initializing,
    /// World is running normally
    Running,
    /// World has stopped
    Stopped,
}

impl WorldState {
    /// Check if the world is accepting new logins
    ///
    /// Players may be attached before the tick loop starts, but not after it
    /// has stopped.
    pub fn accepting_connections(&self) -> bool {
        !matches!(self, WorldState::Stopped)
    }
}

/// Game world - owns every player and session and drives the tick
pub struct GameWorld {
    /// World settings
    pub settings: WorldSettings,
    /// Current world state
    state: RwLock<WorldState>,
    /// Current tick number
    tick: AtomicU64,
    /// Whether the world is running
    running: AtomicBool,
    /// Time the world started
    start_time: RwLock<Option<Instant>>,
    /// Connected players in login order
    players: RwLock<PlayerList>,
    /// Sessions by player index
    sessions: Mutex<HashMap<u16, Session>>,
}

impl GameWorld {
    /// Create a new game world
    pub fn new(world_id: u8) -> Self {
        Self::with_settings(WorldSettings::new(world_id))
    }

    /// Create a new game world with custom settings
    pub fn with_settings(settings: WorldSettings) -> Self {
        info!(
            world_id = settings.world_id,
            name = %settings.name,
            max_players = settings.max_players,
            "Creating game world"
        );

        Self {
            settings,
            state: RwLock::new(WorldState::Initializing),
            tick: AtomicU64::new(0),
            running: AtomicBool::new(false),
            start_time: RwLock::new(None),
            players: RwLock::new(PlayerList::new()),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get the current world state
    pub fn state(&self) -> WorldState {
        *self.state.read()
    }

    /// Set the world state
    pub fn set_state(&self, new_state: WorldState) {
        let mut state = self.state.write();
        let old_state = *state;
        *state = new_state;
        info!(
            old_state = ?old_state,
            new_state = ?new_state,
            "World state changed"
        );
    }

    /// Get the current tick number
    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    /// Check if the world is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get the player count
    pub fn player_count(&self) -> usize {
        self.players.read().len()
    }

    /// Get the uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Read a snapshot of one player
    pub fn player(&self, index: u16) -> Option<Player> {
        self.players.read().get(index).cloned()
    }

    /// Change a player between ticks
    pub fn with_player<R>(&self, index: u16, f: impl FnOnce(&mut Player) -> R) -> Result<R> {
        let mut players = self.players.write();
        let player = players
            .get_mut(index)
            .ok_or(GameError::PlayerNotFound(index))?;
        Ok(f(player))
    }

    /// Lowest free player index
    fn allocate_index(&self, players: &PlayerList) -> Result<u16> {
        let limit = self.settings.max_players.min(MAX_PLAYERS);
        if players.len() >= limit as usize {
            return Err(GameError::WorldFull.into());
        }
        (1..=limit)
            .find(|&index| !players.contains(index))
            .ok_or_else(|| GameError::WorldFull.into())
    }

    /// Log a player in at an absolute tile
    ///
    /// Sends the region and the first player update immediately. Returns the
    /// player index and the receiver for the player's outbound writes.
    pub fn login(
        &self,
        name: &str,
        abs_x: u16,
        abs_y: u16,
        plane: u8,
        keystream: Box<dyn Keystream>,
    ) -> Result<(u16, mpsc::UnboundedReceiver<Bytes>)> {
        if !self.state().accepting_connections() {
            warn!(name = %name, state = ?self.state(), "Login refused");
            return Err(GameError::LoginsClosed.into());
        }

        let mut players = self.players.write();
        let index = self.allocate_index(&players)?;

        let mut player = Player::at_tile(index, name, abs_x, abs_y, plane);
        player.flag_appearance_update();
        players.add(player)?;

        let (mut session, outbound_rx) = Session::with_channel(index, keystream);
        let sent = match players.split_local(index) {
            Some((local, mut others)) => {
                dispatcher::send_initial_packets(&mut session, local, &mut others, &self.settings.sync)
            }
            None => Err(GameError::PlayerNotFound(index).into()),
        };
        if let Err(e) = sent {
            players.remove(index);
            return Err(e);
        }

        self.sessions.lock().insert(index, session);
        info!(
            player_index = index,
            name = %name,
            x = abs_x,
            y = abs_y,
            plane = plane,
            players = players.len(),
            "Player logged in"
        );

        Ok((index, outbound_rx))
    }

    /// Remove a player and their session
    pub fn logout(&self, index: u16) -> Result<Player> {
        let player = self
            .players
            .write()
            .remove(index)
            .ok_or(GameError::PlayerNotFound(index))?;
        self.sessions.lock().remove(&index);

        info!(player_index = index, name = %player.name, "Player logged out");
        Ok(player)
    }

    /// Queue an inbound packet for a player's next tick
    pub fn queue_packet(&self, index: u16, packet: InboundPacket) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(&index)
            .ok_or(NetworkError::SessionNotFound(index))?;
        session.queue_packet(packet);
        Ok(())
    }

    /// Process a single game tick
    pub fn process_tick(&self) -> Result<()> {
        let tick_num = self.tick.fetch_add(1, Ordering::SeqCst);

        // Log periodically
        if tick_num % 1000 == 0 {
            debug!(
                tick = tick_num,
                players = self.player_count(),
                "Game tick milestone"
            );
        }

        let mut players = self.players.write();
        let mut sessions = self.sessions.lock();
        let mut disconnected = Vec::new();

        for index in players.indices() {
            let Some(session) = sessions.get_mut(&index) else {
                warn!(player_index = index, "Player has no session");
                continue;
            };
            let Some((local, mut others)) = players.split_local(index) else {
                continue;
            };

            let write = dispatcher::dispatch(session, local, &mut others, &self.settings.sync);
            if let Err(e) = session.send(write) {
                if e.is_fatal() {
                    disconnected.push(index);
                } else {
                    error!(player_index = index, error = %e, "Failed to send tick update");
                }
            }
        }

        for index in disconnected {
            players.remove(index);
            sessions.remove(&index);
            info!(player_index = index, "Removed disconnected player");
        }

        Ok(())
    }

    /// Run the game world tick loop
    pub async fn run(&self, shutdown_rx: &mut broadcast::Receiver<()>) {
        info!(
            world_id = self.settings.world_id,
            tick_rate_ms = self.settings.tick_rate_ms,
            "Starting game world"
        );

        // Mark as running
        self.running.store(true, Ordering::SeqCst);
        *self.start_time.write() = Some(Instant::now());
        self.set_state(WorldState::Running);

        // Create tick interval
        let mut tick_interval = interval(Duration::from_millis(self.settings.tick_rate_ms));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Main game loop
        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    if !self.is_running() {
                        break;
                    }

                    if let Err(e) = self.process_tick() {
                        error!(error = %e, "Error processing game tick");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        // Cleanup
        self.running.store(false, Ordering::SeqCst);
        self.set_state(WorldState::Stopped);

        info!(
            total_ticks = self.tick(),
            uptime_secs = self.uptime_secs(),
            "Game world stopped"
        );
    }

    /// Stop the tick loop after the current tick
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Get world info as a string
    pub fn info(&self) -> String {
        format!(
            "World {} ({}) - {} players - Tick {} - Uptime {}s",
            self.settings.world_id,
            self.settings.name,
            self.player_count(),
            self.tick(),
            self.uptime_secs()
        )
    }
}

impl std::fmt::Debug for GameWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameWorld")
            .field("settings", &self.settings)
            .field("state", &self.state())
            .field("tick", &self.tick())
            .field("running", &self.is_running())
            .field("player_count", &self.player_count())
            .field("uptime_secs", &self.uptime_secs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::PlainKeystream;
    use crate::error::RustscapeError;
    use crate::game::player::MovementType;
    use crate::game::sync::PendingUpdate;

    fn login(world: &GameWorld, x: u16, y: u16) -> (u16, mpsc::UnboundedReceiver<Bytes>) {
        world
            .login("player", x, y, 0, Box::new(PlainKeystream))
            .unwrap()
    }

    #[test]
    fn test_world_settings_default() {
        let settings = WorldSettings::default();
        assert_eq!(settings.world_id, 1);
        assert_eq!(settings.tick_rate_ms, TICK_RATE_MS);
        assert_eq!(settings.max_players, 2046);
        assert_eq!(settings.sync.view_distance, 15);
    }

    #[test]
    fn test_world_settings_from_config() {
        let mut config = ServerConfig::default();
        config.world_id = 7;
        config.sync.view_distance = 10;

        let settings = WorldSettings::from(&config);
        assert_eq!(settings.world_id, 7);
        assert_eq!(settings.sync.view_distance, 10);
    }

    #[test]
    fn test_world_state() {
        let world = GameWorld::new(1);
        assert_eq!(world.state(), WorldState::Initializing);
        assert!(world.state().accepting_connections());

        world.set_state(WorldState::Running);
        assert!(world.state().accepting_connections());

        world.set_state(WorldState::Stopped);
        assert!(!world.state().accepting_connections());
    }

    #[test]
    fn test_login_refused_after_stop() {
        let world = GameWorld::new(1);
        world.set_state(WorldState::Stopped);

        let result = world.login("late", 3222, 3222, 0, Box::new(PlainKeystream));

        assert!(matches!(
            result,
            Err(RustscapeError::Game(GameError::LoginsClosed))
        ));
        assert_eq!(world.player_count(), 0);
    }

    #[test]
    fn test_login_sends_initial_packets() {
        let world = GameWorld::new(1);
        let (index, mut rx) = login(&world, 3222, 3222);

        assert_eq!(index, 1);
        let first = rx.try_recv().unwrap();
        assert_eq!(first[0], 73);
        assert_eq!(first[5], 81);

        let player = world.player(index).unwrap();
        assert_eq!(player.movement, MovementType::Stand);
        assert!(!player.pending.contains(PendingUpdate::LOCAL_MASK));
        assert!(player.pending.contains(PendingUpdate::OBSERVER_MASK));
    }

    #[test]
    fn test_index_allocation_reuses_lowest() {
        let world = GameWorld::new(1);
        let (a, _ra) = login(&world, 3222, 3222);
        let (b, _rb) = login(&world, 3222, 3222);
        let (c, _rc) = login(&world, 3222, 3222);
        assert_eq!((a, b, c), (1, 2, 3));

        world.logout(b).unwrap();
        let (d, _rd) = login(&world, 3222, 3222);
        assert_eq!(d, 2);
    }

    #[test]
    fn test_world_full() {
        let world = GameWorld::with_settings(WorldSettings::new(1).with_max_players(1));
        let (_index, _rx) = login(&world, 3222, 3222);

        let result = world.login("late", 3222, 3222, 0, Box::new(PlainKeystream));
        assert!(matches!(
            result,
            Err(RustscapeError::Game(GameError::WorldFull))
        ));
    }

    #[test]
    fn test_tick_writes_once_per_player() {
        let world = GameWorld::new(1);
        let (_a, mut ra) = login(&world, 3222, 3222);
        let (_b, mut rb) = login(&world, 3223, 3222);
        while ra.try_recv().is_ok() {}
        while rb.try_recv().is_ok() {}

        world.process_tick().unwrap();

        assert!(ra.try_recv().is_ok());
        assert!(ra.try_recv().is_err());
        assert!(rb.try_recv().is_ok());
        assert!(rb.try_recv().is_err());
        assert_eq!(world.tick(), 1);
    }

    #[test]
    fn test_closed_session_removed_on_tick() {
        let world = GameWorld::new(1);
        let (index, rx) = login(&world, 3222, 3222);
        drop(rx);

        world.process_tick().unwrap();

        assert_eq!(world.player_count(), 0);
        assert!(matches!(
            world.queue_packet(index, InboundPacket::new(121, Bytes::new())),
            Err(RustscapeError::Network(NetworkError::SessionNotFound(1)))
        ));
    }

    #[test]
    fn test_logout_unknown_player() {
        let world = GameWorld::new(1);
        assert!(matches!(
            world.logout(9),
            Err(RustscapeError::Game(GameError::PlayerNotFound(9)))
        ));
    }

    #[test]
    fn test_with_player_mutates_in_place() {
        let world = GameWorld::new(1);
        let (index, _rx) = world
            .login("p", 3222, 3222, 0, Box::new(PlainKeystream))
            .unwrap();

        let running = world
            .with_player(index, |player| {
                player.running = true;
                player.running
            })
            .unwrap();

        assert!(running);
        assert!(world.player(index).unwrap().running);
        assert!(world.with_player(99, |_| ()).is_err());
    }

    #[tokio::test]
    async fn test_stop_ends_run_loop() {
        let world = GameWorld::with_settings(WorldSettings::new(1).with_tick_rate(10));
        let (_shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            world.stop();
        };
        tokio::join!(world.run(&mut shutdown_rx), stopper);

        assert_eq!(world.state(), WorldState::Stopped);
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let world = GameWorld::with_settings(WorldSettings::new(1).with_tick_rate(10));
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            shutdown_tx.send(()).unwrap();
        };
        tokio::join!(world.run(&mut shutdown_rx), stopper);

        assert_eq!(world.state(), WorldState::Stopped);
        assert!(!world.is_running());
        assert!(world.tick() >= 1);
    }
}
