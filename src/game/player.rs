//! Player module
//!
//! Player state as seen by the synchronization layer:
//! - Position within the loaded region, and the region origin itself
//! - Walking state (destination, remaining path, movement this tick)
//! - One-shot update flags
//! - Appearance record
//!
//! Players live in a [`PlayerList`], which keeps login order. That order is
//! the order other players are written in the update packet.

use std::fmt;

use tracing::debug;

use crate::error::{GameError, Result};
use crate::game::sync::PendingUpdate;

/// Reserved index terminating the player list on the wire
pub const MAX_PLAYER_INDEX: u16 = 2047;

/// Width and height of a region in tiles
pub const REGION_SIZE: u16 = 64;

/// Walking direction codes as the client numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    NorthWest = 0,
    North = 1,
    NorthEast = 2,
    West = 3,
    East = 4,
    SouthWest = 5,
    South = 6,
    SouthEast = 7,
}

impl Direction {
    /// Direction of a one-tile step, `None` for a zero step
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        match (dx.signum(), dy.signum()) {
            (-1, 1) => Some(Self::NorthWest),
            (0, 1) => Some(Self::North),
            (1, 1) => Some(Self::NorthEast),
            (-1, 0) => Some(Self::West),
            (1, 0) => Some(Self::East),
            (-1, -1) => Some(Self::SouthWest),
            (0, -1) => Some(Self::South),
            (1, -1) => Some(Self::SouthEast),
            _ => None,
        }
    }

    /// Tile delta of one step in this direction
    pub fn delta(self) -> (i32, i32) {
        match self {
            Self::NorthWest => (-1, 1),
            Self::North => (0, 1),
            Self::NorthEast => (1, 1),
            Self::West => (-1, 0),
            Self::East => (1, 0),
            Self::SouthWest => (-1, -1),
            Self::South => (0, -1),
            Self::SouthEast => (1, -1),
        }
    }

    /// 3-bit wire code
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// What the player did this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementType {
    /// Standing still (possibly turning or changing appearance)
    #[default]
    Stand,
    /// One step
    Walk(Direction),
    /// Two steps
    Run(Direction, Direction),
    /// Placed at a new position
    Teleport,
}

impl MovementType {
    /// 2-bit wire code
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Stand => 0,
            Self::Walk(_) => 1,
            Self::Run(..) => 2,
            Self::Teleport => 3,
        }
    }
}

/// Origin (south-west tile) of the loaded region, always a multiple of 64
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Region {
    pub x: u16,
    pub y: u16,
}

impl Region {
    /// Create a region origin
    pub fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Region whose interior holds the absolute tile (`abs_x`, `abs_y`)
    ///
    /// The origin is chosen so the region-relative coordinate is at least 15,
    /// keeping a fresh login away from the reload thresholds on the low side.
    pub fn containing(abs_x: u16, abs_y: u16) -> Self {
        let origin = |abs: u16| (abs.saturating_sub(15) / REGION_SIZE) * REGION_SIZE;
        Self {
            x: origin(abs_x),
            y: origin(abs_y),
        }
    }

    /// Centre chunk coordinates sent in the region reload packet
    pub fn centre_chunk(&self) -> (u16, u16) {
        (self.x / 8 + 6, self.y / 8 + 6)
    }
}

/// Region-relative position
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// X within the region (0-127)
    pub x: u16,
    /// Y within the region (0-127)
    pub y: u16,
    /// Height level (0-3)
    pub plane: u8,
}

impl Position {
    /// Create a new position
    pub fn new(x: u16, y: u16, plane: u8) -> Self {
        Self { x, y, plane }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.plane)
    }
}

/// Player appearance (for model rendering)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appearance {
    /// Gender (0 = male, 1 = female)
    pub gender: u8,
    /// Overhead icon id
    pub head_icon: u8,
    /// Equipment slot codes: item ids above 200, body-part ids otherwise
    pub equipment: [u16; 12],
    /// Hair, torso, legs, feet and skin colours
    pub colors: [u8; 5],
    /// Stand, stand-turn, walk, turn-180, turn-90-cw, turn-90-ccw, run
    pub animations: [u16; 7],
}

impl Default for Appearance {
    fn default() -> Self {
        Self::default_male()
    }
}

impl Appearance {
    /// Default male appearance with no items worn
    pub fn default_male() -> Self {
        Self {
            gender: 0,
            head_icon: 0,
            // hat, cape, amulet, weapon, chest, shield, arms, legs, head, hands, feet, beard
            equipment: [0, 0, 0, 0, 18, 0, 26, 36, 0, 33, 42, 10],
            colors: [7, 4, 9, 5, 0],
            animations: [808, 823, 819, 820, 821, 822, 824],
        }
    }
}

/// A connected player
#[derive(Debug, Clone)]
pub struct Player {
    /// Player index (1-2046)
    pub index: u16,
    /// Display name
    pub name: String,
    /// Region-relative position
    pub position: Position,
    /// Loaded region origin
    pub region: Region,
    /// Next tile to walk to, region-relative
    pub destination: Option<(u8, u8)>,
    /// Remaining path tiles, interleaved x/y, region-relative
    pub path_coords: Vec<u8>,
    /// Movement performed this tick
    pub movement: MovementType,
    /// Whether the player still has tiles to walk
    pub moving: bool,
    /// Whether the current walk is a run
    pub running: bool,
    /// Whether the client has finished loading the current region
    pub region_loaded: bool,
    /// One-shot update flags
    pub pending: PendingUpdate,
    /// Player appearance
    pub appearance: Appearance,
    /// Combat level shown to other players
    pub combat_level: u8,
    /// Total skill level shown on skill worlds
    pub skill_level: u16,
}

impl Player {
    /// Create a freshly logged-in player
    ///
    /// The first update places the player with a teleport block and sends
    /// their appearance.
    pub fn new(index: u16, name: impl Into<String>, region: Region, position: Position) -> Self {
        Self {
            index,
            name: name.into(),
            position,
            region,
            destination: None,
            path_coords: Vec::new(),
            movement: MovementType::Teleport,
            moving: false,
            running: false,
            region_loaded: false,
            pending: PendingUpdate::LOCAL_BLOCK | PendingUpdate::LOCAL_MASK,
            appearance: Appearance::default_male(),
            combat_level: 3,
            skill_level: 0,
        }
    }

    /// Create a player at an absolute tile
    pub fn at_tile(index: u16, name: impl Into<String>, abs_x: u16, abs_y: u16, plane: u8) -> Self {
        let region = Region::containing(abs_x, abs_y);
        let position = Position::new(abs_x - region.x, abs_y - region.y, plane);
        Self::new(index, name, region, position)
    }

    /// Absolute X coordinate
    pub fn absolute_x(&self) -> u16 {
        self.region.x + self.position.x
    }

    /// Absolute Y coordinate
    pub fn absolute_y(&self) -> u16 {
        self.region.y + self.position.y
    }

    /// Place the player at a region-relative position
    pub fn teleport(&mut self, position: Position) {
        self.position = position;
        self.movement = MovementType::Teleport;
        self.destination = None;
        self.path_coords.clear();
        self.moving = false;
        self.pending |= PendingUpdate::LOCAL_BLOCK;
        debug!(player_index = self.index, to = %position, "Player teleported");
    }

    /// Arm an appearance update for this player and for everyone observing them
    pub fn flag_appearance_update(&mut self) {
        self.pending |=
            PendingUpdate::LOCAL_BLOCK | PendingUpdate::LOCAL_MASK | PendingUpdate::OBSERVER_MASK;
    }
}

/// Connected players in login order
#[derive(Debug, Default)]
pub struct PlayerList {
    players: Vec<Player>,
}

impl PlayerList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of players
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Check if no players are connected
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Check if an index is taken
    pub fn contains(&self, index: u16) -> bool {
        self.players.iter().any(|p| p.index == index)
    }

    /// Append a player
    pub fn add(&mut self, player: Player) -> Result<()> {
        if self.contains(player.index) {
            return Err(GameError::IndexInUse(player.index).into());
        }
        self.players.push(player);
        Ok(())
    }

    /// Remove a player by index, keeping the order of the rest
    pub fn remove(&mut self, index: u16) -> Option<Player> {
        let pos = self.players.iter().position(|p| p.index == index)?;
        Some(self.players.remove(pos))
    }

    /// Get a player by index
    pub fn get(&self, index: u16) -> Option<&Player> {
        self.players.iter().find(|p| p.index == index)
    }

    /// Get a mutable player by index
    pub fn get_mut(&mut self, index: u16) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.index == index)
    }

    /// Iterate over all players
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.iter()
    }

    /// Indices of all players in login order
    pub fn indices(&self) -> Vec<u16> {
        self.players.iter().map(|p| p.index).collect()
    }

    /// Borrow one player mutably alongside everyone else
    pub fn split_local(&mut self, index: u16) -> Option<(&mut Player, Others<'_>)> {
        let pos = self.players.iter().position(|p| p.index == index)?;
        let (before, rest) = self.players.split_at_mut(pos);
        let (local, after) = rest.split_first_mut()?;
        Some((local, Others { before, after }))
    }
}

/// Every player except the local one, in login order
#[derive(Debug)]
pub struct Others<'a> {
    before: &'a mut [Player],
    after: &'a mut [Player],
}

impl<'a> Others<'a> {
    /// Iterate immutably
    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.before.iter().chain(self.after.iter())
    }

    /// Iterate mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.before.iter_mut().chain(self.after.iter_mut())
    }

    /// Get a mutable player by index
    pub fn get_mut(&mut self, index: u16) -> Option<&mut Player> {
        self.iter_mut().find(|p| p.index == index)
    }
}

/// Encode a display name as the client's base-37 long
pub fn encode_name(name: &str) -> u64 {
    let mut result: u64 = 0;

    for c in name.chars().take(12) {
        result = result.wrapping_mul(37);
        match c {
            'A'..='Z' => result += (c as u64) - 'A' as u64 + 1,
            'a'..='z' => result += (c as u64) - 'a' as u64 + 1,
            '0'..='9' => result += (c as u64) - '0' as u64 + 27,
            _ => {}
        }
    }

    while result % 37 == 0 && result != 0 {
        result /= 37;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_round_trip() {
        for code in 0..8u8 {
            let dir = [
                Direction::NorthWest,
                Direction::North,
                Direction::NorthEast,
                Direction::West,
                Direction::East,
                Direction::SouthWest,
                Direction::South,
                Direction::SouthEast,
            ][code as usize];
            assert_eq!(dir.code(), code);
            let (dx, dy) = dir.delta();
            assert_eq!(Direction::from_delta(dx, dy), Some(dir));
        }
        assert_eq!(Direction::from_delta(0, 0), None);
    }

    #[test]
    fn test_direction_clamps_long_steps() {
        assert_eq!(Direction::from_delta(5, -3), Some(Direction::SouthEast));
    }

    #[test]
    fn test_movement_type_codes() {
        assert_eq!(MovementType::Stand.type_code(), 0);
        assert_eq!(MovementType::Walk(Direction::North).type_code(), 1);
        assert_eq!(
            MovementType::Run(Direction::North, Direction::East).type_code(),
            2
        );
        assert_eq!(MovementType::Teleport.type_code(), 3);
    }

    #[test]
    fn test_region_containing() {
        let region = Region::containing(3222, 3218);
        assert_eq!(region, Region::new(3200, 3200));

        // Too close to the low edge: the previous region is loaded instead
        let region = Region::containing(3205, 3222);
        assert_eq!(region.x, 3136);
        assert_eq!(region.y, 3200);
    }

    #[test]
    fn test_player_at_tile() {
        let player = Player::at_tile(1, "Zezima", 3222, 3218, 0);
        assert_eq!(player.position, Position::new(22, 18, 0));
        assert_eq!(player.absolute_x(), 3222);
        assert_eq!(player.absolute_y(), 3218);
        assert_eq!(player.movement, MovementType::Teleport);
        assert!(player.pending.contains(PendingUpdate::LOCAL_BLOCK | PendingUpdate::LOCAL_MASK));
    }

    #[test]
    fn test_teleport_clears_walk() {
        let mut player = Player::at_tile(1, "a", 3222, 3222, 0);
        player.pending = PendingUpdate::empty();
        player.destination = Some((30, 30));
        player.path_coords = vec![31, 31];
        player.moving = true;

        player.teleport(Position::new(40, 41, 1));

        assert_eq!(player.movement, MovementType::Teleport);
        assert!(player.destination.is_none());
        assert!(player.path_coords.is_empty());
        assert!(!player.moving);
        assert_eq!(player.pending, PendingUpdate::LOCAL_BLOCK);
    }

    #[test]
    fn test_player_list_order_and_split() {
        let mut list = PlayerList::new();
        for index in [5, 2, 9] {
            list.add(Player::at_tile(index, "p", 3222, 3222, 0)).unwrap();
        }
        assert!(list.add(Player::at_tile(2, "dup", 3222, 3222, 0)).is_err());

        let (local, others) = list.split_local(2).unwrap();
        assert_eq!(local.index, 2);
        let other_indices: Vec<u16> = others.iter().map(|p| p.index).collect();
        assert_eq!(other_indices, vec![5, 9]);

        list.remove(5);
        assert_eq!(list.indices(), vec![2, 9]);
        assert!(list.split_local(5).is_none());
    }

    #[test]
    fn test_encode_name() {
        assert_eq!(encode_name("a"), 1);
        assert_eq!(encode_name("B"), 2);
        assert_eq!(encode_name("ab"), 37 + 2);
        assert_eq!(encode_name("0"), 27);
        assert_eq!(encode_name(""), 0);
    }
}
