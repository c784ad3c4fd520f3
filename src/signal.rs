//! Typed in-process signals — intents in, board events out.
//!
//! ARCHITECTURE
//! ============
//! UI code (or the stdin driver in the binary) sends [`Intent`]s to the
//! session task over an mpsc channel. The session publishes [`BoardEvent`]s
//! on a [`SignalBus`], a thin wrapper over `tokio::sync::broadcast`, so any
//! number of renderers or loggers can subscribe. Lagging subscribers miss
//! events; they never block the session.

#[cfg(test)]
#[path = "signal_test.rs"]
mod tests;

use tokio::sync::broadcast;

use crate::model::{LngLat, NewPin, Participant, Pin, PinPatch, Route};

const DEFAULT_BUS_CAPACITY: usize = 256;

/// A user action routed to the board session.
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    AddPin(NewPin),
    UpdatePin { id: String, patch: PinPatch },
    DeletePin { id: String },
    SelectPin { id: Option<String> },
    ClearPins,
    ClearRoute,
    StartRouteSelection,
    CancelRouteSelection,
    /// Route between the last two pins in insertion order.
    RouteLastTwo,
    /// Direct lookup outside the pick workflow.
    RequestRoute { from: LngLat, to: LngLat, from_id: Option<String>, to_id: Option<String> },
    /// Local pointer moved; forwarded to peers.
    MoveCursor { position: LngLat },
    /// Look up a participant's last cursor position.
    JumpTo { session_id: String },
}

/// A change to board state, published after it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum BoardEvent {
    PinAdded(Pin),
    PinUpdated(Pin),
    PinDeleted { id: String },
    PinsCleared,
    SelectionChanged { id: Option<String> },
    RouteChanged(Option<Route>),
    RouteSelectionStart,
    RouteSelectionEnd,
    ParticipantJoined { session_id: String, participant: Option<Participant> },
    ParticipantLeft { session_id: String, participant: Option<Participant> },
    RosterChanged(Vec<Participant>),
    JumpTo { session_id: String, position: Option<LngLat> },
    Connected { session_id: String },
    Disconnected,
    ServerError { code: String, message: String },
}

#[derive(Debug, Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<BoardEvent>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

impl SignalBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Returns the receiver count.
    pub fn publish(&self, event: BoardEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BoardEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
