//! Session management module
//!
//! A session is the in-game side of one client connection:
//! - The player index it controls
//! - Inbound packets queued by the transport since the last tick
//! - The opcode keystream for outgoing packets
//! - The outbound channel the transport drains into the socket

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::crypto::Keystream;
use crate::error::{NetworkError, Result};
use crate::protocol::packets::InboundPacket;

/// A connected client session
pub struct Session {
    /// Associated player index
    pub player_index: u16,
    /// Packets received since the last tick, oldest first
    inbound: VecDeque<InboundPacket>,
    /// Outgoing opcode keystream
    keystream: Box<dyn Keystream>,
    /// Outbound message channel (one message per tick)
    outbound_tx: mpsc::UnboundedSender<Bytes>,
}

impl Session {
    /// Create a new session
    pub fn new(
        player_index: u16,
        keystream: Box<dyn Keystream>,
        outbound_tx: mpsc::UnboundedSender<Bytes>,
    ) -> Self {
        Self {
            player_index,
            inbound: VecDeque::new(),
            keystream,
            outbound_tx,
        }
    }

    /// Create a session with a fresh outbound channel, returning its receiver
    pub fn with_channel(
        player_index: u16,
        keystream: Box<dyn Keystream>,
    ) -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(player_index, keystream, tx), rx)
    }

    /// Queue a packet for the next tick
    pub fn queue_packet(&mut self, packet: InboundPacket) {
        trace!(
            player_index = self.player_index,
            opcode = packet.opcode,
            size = packet.payload.len(),
            "Queued inbound packet"
        );
        self.inbound.push_back(packet);
    }

    /// Number of queued inbound packets
    pub fn pending_packets(&self) -> usize {
        self.inbound.len()
    }

    /// Iterate the queued packets, oldest first
    pub fn inbound(&self) -> impl Iterator<Item = &InboundPacket> {
        self.inbound.iter()
    }

    /// Drop every queued packet
    pub fn clear_inbound(&mut self) {
        self.inbound.clear();
    }

    /// Get the outgoing keystream
    pub fn keystream(&mut self) -> &mut dyn Keystream {
        self.keystream.as_mut()
    }

    /// Borrow the queued packets and the keystream together
    pub fn split(&mut self) -> (&VecDeque<InboundPacket>, &mut dyn Keystream) {
        (&self.inbound, self.keystream.as_mut())
    }

    /// Check if the transport side is still receiving
    pub fn is_connected(&self) -> bool {
        !self.outbound_tx.is_closed()
    }

    /// Hand one write to the transport
    pub fn send(&self, data: Bytes) -> Result<()> {
        let len = data.len();
        self.outbound_tx.send(data).map_err(|_| {
            debug!(player_index = self.player_index, "Outbound channel closed");
            NetworkError::ConnectionClosed
        })?;
        trace!(player_index = self.player_index, size = len, "Queued outbound write");
        Ok(())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("player_index", &self.player_index)
            .field("inbound", &self.inbound.len())
            .field("connected", &self.is_connected())
            .finish()
    }
}
