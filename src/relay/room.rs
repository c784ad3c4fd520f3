//! Room service — membership, roster, and fan-out for one board.
//!
//! Operations take the state lock once and never hold it across an await on
//! a peer's queue; broadcast uses `try_send` so a slow peer only loses its
//! own copy.

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::state::{Member, RelayState, Room};
use crate::color::normalize_hex_color;
use crate::message::ServerMessage;
use crate::model::Participant;

// =============================================================================
// MEMBERSHIP
// =============================================================================

/// Add a connection to a room, creating the room on first join. Returns the
/// participant as peers will see it (session id and color stamped).
pub async fn join_room(
    state: &RelayState,
    board_id: &str,
    session_id: &str,
    participant: Option<Participant>,
    tx: mpsc::Sender<ServerMessage>,
) -> Participant {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(board_id.to_owned()).or_insert_with(|| Room::new(state.room_colors()));

    let mut participant = participant.unwrap_or_else(|| Participant::new(session_id, ""));
    if participant.id.is_empty() {
        participant.id = session_id.to_owned();
    }
    participant.session_id = Some(session_id.to_owned());
    participant.color = match participant.color.as_deref().and_then(normalize_hex_color) {
        Some(color) => Some(color),
        None => Some(room.colors.get(session_id)),
    };

    let seq = room.next_seq();
    room.members.insert(session_id.to_owned(), Member { participant: participant.clone(), tx, seq });
    info!(%board_id, %session_id, members = room.members.len(), "relay: joined room");
    participant
}

/// Remove a connection from a room and release its color. Empty rooms are
/// evicted. Returns the departed participant, if it was a member.
pub async fn leave_room(state: &RelayState, board_id: &str, session_id: &str) -> Option<Participant> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(board_id)?;
    let member = room.members.remove(session_id)?;
    room.colors.release(session_id);
    info!(%board_id, %session_id, remaining = room.members.len(), "relay: left room");

    if room.members.is_empty() {
        rooms.remove(board_id);
        info!(%board_id, "relay: evicted empty room");
    }
    Some(member.participant)
}

/// Stamped participant for a member, if present.
pub async fn member(state: &RelayState, board_id: &str, session_id: &str) -> Option<Participant> {
    let rooms = state.rooms.read().await;
    rooms.get(board_id)?.members.get(session_id).map(|m| m.participant.clone())
}

/// Room roster in join order; empty for unknown rooms.
pub async fn roster(state: &RelayState, board_id: &str) -> Vec<Participant> {
    let rooms = state.rooms.read().await;
    rooms.get(board_id).map(Room::roster).unwrap_or_default()
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send a message to every member of a room, optionally excluding one.
/// Returns how many queues accepted it.
pub async fn broadcast(state: &RelayState, board_id: &str, message: &ServerMessage, exclude: Option<&str>) -> usize {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(board_id) else {
        return 0;
    };

    let mut delivered = 0;
    for (session_id, member) in &room.members {
        if exclude == Some(session_id.as_str()) {
            continue;
        }
        // Best-effort: a full queue drops this frame for that member only.
        match member.tx.try_send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => debug!(%board_id, %session_id, error = %e, "relay: dropped frame for slow peer"),
        }
    }
    delivered
}
