//! WebSocket handler — per-connection relay loop.
//!
//! DESIGN
//! ======
//! On upgrade, generates a session id and enters a `select!` loop:
//! - Incoming client events → decode + dispatch by event name
//! - Queued events from room peers → forward to client
//!
//! Handlers validate and mutate room state, then return an `Outcome`. The
//! dispatch layer owns fan-out to the room; errors go back to the sender.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → send `session` with the new session id
//! 2. Client sends events → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (announce / relay)
//! 4. Close → leave the room → `user_left` + `user_list` to remaining peers

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::room;
use super::state::RelayState;
use crate::message::{ClientMessage, ErrorCode, ServerMessage};
use crate::model::{CursorSample, Participant};

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("boardId required")]
    BoardIdRequired,
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl ErrorCode for RelayError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardIdRequired => "E_BOARD_ID_REQUIRED",
            Self::InvalidMessage(_) => "E_INVALID_MESSAGE",
        }
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handlers. Handlers never send directly.
enum Outcome {
    /// Nothing to send.
    Quiet,
    /// Membership change: `message` to peers, then a fresh roster to the room.
    Announce { board_id: String, message: ServerMessage },
    /// Ephemeral event to peers, sender excluded.
    Relay { board_id: String, message: ServerMessage },
}

/// Per-connection state owned by the socket task.
pub struct Connection {
    pub session_id: String,
    /// Board currently joined, if any.
    pub board: Option<String>,
    /// Queue peers use to reach this connection.
    pub tx: mpsc::Sender<ServerMessage>,
}

impl Connection {
    #[must_use]
    pub fn new(session_id: impl Into<String>, tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { session_id: session_id.into(), board: None, tx }
    }
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<RelayState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: RelayState) {
    let session_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(state.config.client_buffer);
    let mut conn = Connection::new(session_id.clone(), tx);

    if send_message(&mut socket, &ServerMessage::Session { session_id: session_id.clone() })
        .await
        .is_err()
    {
        return;
    }
    info!(%session_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        for reply in process_inbound_text(&state, &mut conn, text.as_str()).await {
                            if send_message(&mut socket, &reply).await.is_err() {
                                debug!(%session_id, "ws: reply not delivered");
                            }
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(queued) = rx.recv() => {
                if send_message(&mut socket, &queued).await.is_err() {
                    break;
                }
            }
        }
    }

    if let Some(outcome) = leave_current(&state, &mut conn).await {
        apply(&state, &conn, outcome).await;
    }
    info!(%session_id, "ws: client disconnected");
}

async fn send_message(socket: &mut WebSocket, message: &ServerMessage) -> Result<(), ()> {
    let text = message.to_text().map_err(|e| warn!(error = %e, "ws: encode failed"))?;
    socket.send(Message::Text(text.into())).await.map_err(|e| debug!(error = %e, "ws: send failed"))
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Decode and process one inbound text payload. Room fan-out happens here
/// through the room service; the returned events (errors) go to the sender.
pub async fn process_inbound_text(state: &RelayState, conn: &mut Connection, text: &str) -> Vec<ServerMessage> {
    let message = match ClientMessage::from_text(text) {
        Ok(m) => m,
        Err(e) => {
            warn!(session_id = %conn.session_id, error = %e, "ws: invalid inbound message");
            return vec![ServerMessage::error(&RelayError::InvalidMessage(e.to_string()))];
        }
    };

    let result = match message {
        ClientMessage::JoinBoard { board_id, participant } => handle_join(state, conn, &board_id, participant).await,
        ClientMessage::LeaveBoard {} => Ok(leave_current(state, conn).await.unwrap_or(Outcome::Quiet)),
        ClientMessage::Cursor { lng, lat } => Ok(handle_cursor(state, conn, lng, lat).await),
    };

    match result {
        Ok(outcome) => {
            apply(state, conn, outcome).await;
            vec![]
        }
        Err(e) => {
            debug!(session_id = %conn.session_id, code = e.error_code(), "ws: rejected event");
            vec![ServerMessage::error(&e)]
        }
    }
}

async fn apply(state: &RelayState, conn: &Connection, outcome: Outcome) {
    match outcome {
        Outcome::Quiet => {}
        Outcome::Announce { board_id, message } => {
            room::broadcast(state, &board_id, &message, Some(&conn.session_id)).await;
            let participants = room::roster(state, &board_id).await;
            room::broadcast(state, &board_id, &ServerMessage::UserList { participants }, None).await;
        }
        Outcome::Relay { board_id, message } => {
            room::broadcast(state, &board_id, &message, Some(&conn.session_id)).await;
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

async fn handle_join(
    state: &RelayState,
    conn: &mut Connection,
    board_id: &str,
    participant: Option<Participant>,
) -> Result<Outcome, RelayError> {
    let board_id = board_id.trim();
    if board_id.is_empty() {
        return Err(RelayError::BoardIdRequired);
    }

    // Leave the previous board first, announcing to its peers.
    if let Some(previous) = leave_current(state, conn).await {
        apply(state, conn, previous).await;
    }

    let stamped = room::join_room(state, board_id, &conn.session_id, participant, conn.tx.clone()).await;
    conn.board = Some(board_id.to_owned());
    Ok(Outcome::Announce {
        board_id: board_id.to_owned(),
        message: ServerMessage::UserJoined { session_id: conn.session_id.clone(), participant: Some(stamped) },
    })
}

/// Leave the joined board, if any. Returns the announcement for its peers.
async fn leave_current(state: &RelayState, conn: &mut Connection) -> Option<Outcome> {
    let board_id = conn.board.take()?;
    let participant = room::leave_room(state, &board_id, &conn.session_id).await;
    Some(Outcome::Announce {
        message: ServerMessage::UserLeft { session_id: conn.session_id.clone(), participant },
        board_id,
    })
}

async fn handle_cursor(state: &RelayState, conn: &Connection, lng: f64, lat: f64) -> Outcome {
    let Some(board_id) = conn.board.clone() else {
        return Outcome::Quiet;
    };
    if !lng.is_finite() || !lat.is_finite() {
        return Outcome::Quiet;
    }
    let participant = room::member(state, &board_id, &conn.session_id).await;
    let color = participant.as_ref().and_then(|p| p.color.clone());
    let sample = CursorSample { session_id: conn.session_id.clone(), lng, lat, participant, color };
    Outcome::Relay { board_id, message: ServerMessage::Cursor(sample) }
}
