//! Error handling module
//!
//! Defines custom error types for the Rustscape sync server.

use thiserror::Error;

/// Main error type for the Rustscape sync server
#[derive(Error, Debug)]
pub enum RustscapeError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Protocol-related errors
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Game logic errors
    #[error("Game error: {0}")]
    Game(#[from] GameError),
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Session not found for player {0}")]
    SessionNotFound(u16),
}

/// Protocol-specific errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Packet {opcode} too short: expected at least {expected} bytes, got {actual}")]
    PacketTooShort {
        opcode: u8,
        expected: usize,
        actual: usize,
    },
}

/// Game logic errors
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Player not found: {0}")]
    PlayerNotFound(u16),

    #[error("World is full")]
    WorldFull,

    #[error("Player index {0} is already in use")]
    IndexInUse(u16),

    #[error("World is not accepting logins")]
    LoginsClosed,
}

/// Result type alias using RustscapeError
pub type Result<T> = std::result::Result<T, RustscapeError>;

impl RustscapeError {
    /// Check if this error should terminate the player's connection
    pub fn is_fatal(&self) -> bool {
        matches!(self, RustscapeError::Network(NetworkError::ConnectionClosed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RustscapeError::Protocol(ProtocolError::PacketTooShort {
            opcode: 164,
            expected: 5,
            actual: 2,
        });
        assert_eq!(
            err.to_string(),
            "Protocol error: Packet 164 too short: expected at least 5 bytes, got 2"
        );
    }

    #[test]
    fn test_error_from_conversion() {
        let err: RustscapeError = GameError::PlayerNotFound(7).into();
        assert!(matches!(err, RustscapeError::Game(GameError::PlayerNotFound(7))));
    }

    #[test]
    fn test_is_fatal() {
        assert!(RustscapeError::Network(NetworkError::ConnectionClosed).is_fatal());
        assert!(!RustscapeError::Game(GameError::WorldFull).is_fatal());
    }
}
