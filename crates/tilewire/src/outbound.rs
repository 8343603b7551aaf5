//! Outbound action batching.
//!
//! Dragging a tile produces a position update per input event, far more
//! than the server needs. [`OutboundBatcher`] keeps only the latest
//! position per tile and hands them out when the transport has caught up
//! with what was already sent.
//!
//! It also holds one-shot messages (chat) that were requested while the
//! connection was down, so they go out right after the next rejoin.

use std::collections::{BTreeMap, VecDeque};

use tilewire_protocol::ClientMessage;

/// Result of [`OutboundBatcher::flush`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flush {
    /// Nothing is dirty.
    Idle,
    /// The transport still has unsent data. Try again later.
    Deferred,
    /// These messages should be sent now. The dirty set is cleared.
    Sent(Vec<ClientMessage>),
}

/// Coalesces tile moves and queues messages for the next connection.
#[derive(Debug, Default)]
pub struct OutboundBatcher {
    dirty: BTreeMap<u8, (i16, i16)>,
    queued: VecDeque<ClientMessage>,
}

impl OutboundBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where a tile should end up. Replaces any earlier
    /// position for the same tile that hasn't been sent yet.
    pub fn mark_dirty(&mut self, tile: u8, x: i16, y: i16) {
        self.dirty.insert(tile, (x, y));
    }

    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Takes every dirty tile as a `MoveTile`, but only if nothing is
    /// waiting in the transport's write buffer.
    pub fn flush(&mut self, buffered_amount: usize) -> Flush {
        if self.dirty.is_empty() {
            return Flush::Idle;
        }
        if buffered_amount > 0 {
            return Flush::Deferred;
        }
        let moves = std::mem::take(&mut self.dirty)
            .into_iter()
            .map(|(tile, (x, y))| ClientMessage::MoveTile { tile, x, y })
            .collect();
        Flush::Sent(moves)
    }

    /// Holds a message until [`drain_queued`](Self::drain_queued).
    pub fn queue(&mut self, msg: ClientMessage) {
        self.queued.push_back(msg);
    }

    /// Takes the queued messages in the order they were queued.
    pub fn drain_queued(&mut self) -> impl Iterator<Item = ClientMessage> + '_ {
        self.queued.drain(..)
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.dirty.clear();
        self.queued.clear();
    }
}

/// The typing indicator we want versus what the server was last told.
///
/// The server forgets our typing state when the connection drops, so it
/// is sent again after a rejoin if we are still typing.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypingState {
    desired: bool,
    sent: bool,
}

impl TypingState {
    /// Updates the desired state. Returns the message to send if the
    /// server needs to hear about it.
    pub fn set(&mut self, typing: bool, connected: bool) -> Option<ClientMessage> {
        self.desired = typing;
        if connected { self.sync() } else { None }
    }

    /// Returns the message that brings the server in line, if any, and
    /// assumes it will be sent.
    pub fn sync(&mut self) -> Option<ClientMessage> {
        if self.desired == self.sent {
            return None;
        }
        self.sent = self.desired;
        Some(if self.desired {
            ClientMessage::StartTyping
        } else {
            ClientMessage::StopTyping
        })
    }

    /// The connection is gone, and with it the server's typing flag.
    pub fn connection_lost(&mut self) {
        self.sent = false;
    }

    pub fn is_typing(&self) -> bool {
        self.desired
    }
}
