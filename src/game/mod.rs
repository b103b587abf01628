//! Game module
//!
//! This module contains the game-side state the sync layer works on:
//! - Players and the login-ordered player list
//! - Walking and region tracking
//! - Visibility between players
//! - Player update packet building
//! - World management (game tick, login, logout)

pub mod movement;
pub mod player;
pub mod region;
pub mod sync;
pub mod visibility;
pub mod world;
