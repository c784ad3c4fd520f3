//! Presence channel client — join/leave handshake and roster reconciliation.
//!
//! DESIGN
//! ======
//! Pure state machine over decoded [`ServerMessage`]s. It never touches a
//! socket: each call returns the message to send (if any) plus presence
//! events for the session to publish. The transport driver owns I/O.
//!
//! LIFECYCLE
//! =========
//! 1. `connect(board, local)` records intent to join
//! 2. relay `session {sessionId}` marks the transport ready → `join_board`
//! 3. `user_list` snapshots replace the roster, merged by session key
//! 4. transport loss clears cursors and colors; the next `session` rejoins
//! 5. `disconnect()` always yields `leave_board` and tears down

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;

use tracing::{debug, info, warn};

use crate::color::normalize_hex_color;
use crate::cursor::{CursorUpdate, MarkerLayer, RemoteCursorTracker};
use crate::message::{ClientMessage, ServerMessage};
use crate::model::{LngLat, Participant};

/// Presence change worth announcing.
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceEvent {
    /// Transport ready with this local session id.
    Ready { session_id: String },
    Joined { session_id: String, participant: Option<Participant> },
    Left { session_id: String, participant: Option<Participant> },
    RosterChanged(Vec<Participant>),
    ServerError { code: String, message: String },
}

/// What handling one inbound message produced.
#[derive(Debug, Default, PartialEq)]
pub struct Handled {
    pub reply: Option<ClientMessage>,
    pub events: Vec<PresenceEvent>,
}

impl Handled {
    fn event(event: PresenceEvent) -> Self {
        Self { reply: None, events: vec![event] }
    }
}

pub struct PresenceClient<M: MarkerLayer> {
    tracker: RemoteCursorTracker<M>,
    roster: Vec<Participant>,
    session_id: Option<String>,
    board_id: Option<String>,
    local: Option<Participant>,
    joined: bool,
}

impl<M: MarkerLayer> PresenceClient<M> {
    pub fn new(tracker: RemoteCursorTracker<M>) -> Self {
        Self { tracker, roster: Vec::new(), session_id: None, board_id: None, local: None, joined: false }
    }

    // =========================================================================
    // OUTBOUND
    // =========================================================================

    /// Record the board to join. Returns `join_board` right away when the
    /// transport is already ready; otherwise it is sent on `session`.
    pub fn connect(&mut self, board_id: impl Into<String>, local: Participant) -> Option<ClientMessage> {
        self.board_id = Some(board_id.into());
        self.local = Some(local);
        self.join_message()
    }

    /// Cursor update for peers. Only sent once joined.
    pub fn send_cursor(&self, position: LngLat) -> Option<ClientMessage> {
        self.joined.then_some(ClientMessage::Cursor { lng: position[0], lat: position[1] })
    }

    /// Leave the board and tear down local presence state. The returned
    /// `leave_board` is best-effort; teardown happens regardless.
    pub fn disconnect(&mut self) -> ClientMessage {
        if let Some(board_id) = &self.board_id {
            info!(%board_id, "presence: leaving board");
        }
        self.board_id = None;
        self.clear_remote();
        ClientMessage::leave()
    }

    /// Transport dropped: remove every remote cursor and release every color.
    /// The board stays recorded so the next `session` rejoins.
    pub fn on_transport_lost(&mut self) {
        debug!(cursors = self.tracker.len(), "presence: transport lost, clearing remote state");
        self.session_id = None;
        self.tracker.set_local_session(None);
        self.clear_remote();
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    pub fn handle(&mut self, message: ServerMessage) -> Handled {
        match message {
            ServerMessage::Session { session_id } => self.on_session(session_id),
            ServerMessage::UserList { participants } => {
                self.reconcile_roster(participants);
                Handled::event(PresenceEvent::RosterChanged(self.roster.clone()))
            }
            ServerMessage::UserJoined { session_id, participant } => {
                if self.session_id.as_deref() == Some(session_id.as_str()) {
                    return Handled::default();
                }
                if let Some(p) = &participant {
                    let mut entry = p.clone();
                    entry.session_id = Some(session_id.clone());
                    self.upsert(entry);
                }
                Handled::event(PresenceEvent::Joined { session_id, participant })
            }
            ServerMessage::UserLeft { session_id, participant } => {
                self.tracker.on_participant_left(&session_id);
                self.roster.retain(|p| p.roster_key() != session_id);
                Handled::event(PresenceEvent::Left { session_id, participant })
            }
            ServerMessage::Cursor(sample) => {
                let session_id = sample.session_id.clone();
                let update = self.tracker.on_cursor_sample(sample);
                if update == CursorUpdate::Created {
                    debug!(%session_id, "presence: first cursor sample");
                }
                Handled::default()
            }
            ServerMessage::Error { code, message } => {
                warn!(%code, %message, "presence: relay error");
                Handled::event(PresenceEvent::ServerError { code, message })
            }
        }
    }

    fn on_session(&mut self, session_id: String) -> Handled {
        info!(%session_id, "presence: transport ready");
        self.tracker.set_local_session(Some(session_id.clone()));
        self.session_id = Some(session_id.clone());
        Handled { reply: self.join_message(), events: vec![PresenceEvent::Ready { session_id }] }
    }

    fn join_message(&mut self) -> Option<ClientMessage> {
        self.session_id.as_ref()?;
        let board_id = self.board_id.clone()?;
        let local = self.local.clone()?;
        info!(%board_id, initials = %local.display_initials(), "presence: joining board");
        self.joined = true;
        Some(ClientMessage::join(board_id, local))
    }

    /// Replace the roster with `participants`, merged by session key.
    /// Entries missing from the snapshot are treated as left.
    pub fn reconcile_roster(&mut self, participants: Vec<Participant>) {
        let mut next: Vec<Participant> = Vec::with_capacity(participants.len());
        for participant in participants {
            if participant.roster_key().is_empty() {
                continue;
            }
            match next.iter_mut().find(|p| p.roster_key() == participant.roster_key()) {
                Some(existing) => *existing = participant,
                None => next.push(participant),
            }
        }

        let departed: Vec<String> = self
            .roster
            .iter()
            .map(|p| p.roster_key().to_owned())
            .filter(|key| !next.iter().any(|p| p.roster_key() == key))
            .collect();
        for key in &departed {
            self.tracker.on_participant_left(key);
        }

        let local = self.session_id.as_deref();
        for participant in &mut next {
            let key = participant.roster_key().to_owned();
            let own = participant.color.as_deref().and_then(normalize_hex_color);
            participant.color = match own {
                Some(color) => Some(color),
                None if local == Some(key.as_str()) => None,
                None => Some(self.tracker.colors_mut().get(&key)),
            };
        }
        debug!(participants = next.len(), departed = departed.len(), "presence: roster reconciled");
        self.roster = next;
    }

    fn upsert(&mut self, participant: Participant) {
        let key = participant.roster_key().to_owned();
        let mut participant = participant;
        if participant.color.is_none() {
            participant.color = Some(self.tracker.colors_mut().get(&key));
        }
        match self.roster.iter_mut().find(|p| p.roster_key() == key) {
            Some(existing) => *existing = participant,
            None => self.roster.push(participant),
        }
    }

    fn clear_remote(&mut self) {
        self.tracker.dispose();
        self.roster.clear();
        self.joined = false;
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    #[must_use]
    pub fn board_id(&self) -> Option<&str> {
        self.board_id.as_deref()
    }

    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    #[must_use]
    pub fn last_position(&self, session_id: &str) -> Option<LngLat> {
        self.tracker.last_position(session_id)
    }

    #[must_use]
    pub fn tracker(&self) -> &RemoteCursorTracker<M> {
        &self.tracker
    }
}
