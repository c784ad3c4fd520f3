//! Shared relay state.
//!
//! DESIGN
//! ======
//! `RelayState` is injected into Axum handlers via the `State` extractor. It
//! holds a map of live rooms keyed by board id. Each room owns its members'
//! outbound queues and a color registry, so colors are unique per board
//! rather than per process. Rooms exist only while they have members.

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};

use crate::color::ColorRegistry;
use crate::config::RelayConfig;
use crate::message::ServerMessage;
use crate::model::Participant;

// =============================================================================
// ROOM
// =============================================================================

/// One connection joined to a room.
pub struct Member {
    /// Participant as announced to peers: session id and color stamped.
    pub participant: Participant,
    /// Outbound queue drained by the member's socket task.
    pub tx: mpsc::Sender<ServerMessage>,
    /// Join order, for a stable roster.
    pub seq: u64,
}

pub struct Room {
    /// Members keyed by session id.
    pub members: HashMap<String, Member>,
    pub colors: ColorRegistry,
    next_seq: u64,
}

impl Room {
    #[must_use]
    pub fn new(colors: ColorRegistry) -> Self {
        Self { members: HashMap::new(), colors, next_seq: 0 }
    }

    pub(crate) fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Participants in join order.
    #[must_use]
    pub fn roster(&self) -> Vec<Participant> {
        let mut members: Vec<&Member> = self.members.values().collect();
        members.sort_by_key(|m| m.seq);
        members.into_iter().map(|m| m.participant.clone()).collect()
    }
}

// =============================================================================
// RELAY STATE
// =============================================================================

/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct RelayState {
    pub rooms: Arc<RwLock<HashMap<String, Room>>>,
    pub config: Arc<RelayConfig>,
}

impl RelayState {
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), config: Arc::new(config) }
    }

    /// Fresh registry for a new room, built from the configured palette.
    #[must_use]
    pub fn room_colors(&self) -> ColorRegistry {
        ColorRegistry::new(&self.config.palette)
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
