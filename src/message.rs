//! Realtime wire messages — the JSON envelope shared by relay and client.
//!
//! DESIGN
//! ======
//! Every text frame is `{"event": "<name>", "data": {...}}`. Both directions
//! are modeled as adjacently tagged enums so an unknown event name fails to
//! decode and can be dropped by the caller without touching state.
//!
//! ERROR CODES
//! ===========
//! Errors that reach a peer implement [`ErrorCode`] and travel as an `error`
//! event carrying a grepable `E_*` code plus the display message.

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::model::{CursorSample, Participant};

// =============================================================================
// ERROR CODE TRAIT
// =============================================================================

/// Trait for errors that carry a machine-readable code.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CLIENT → RELAY
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinBoard {
        #[serde(default)]
        board_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant: Option<Participant>,
    },
    LeaveBoard {},
    Cursor { lng: f64, lat: f64 },
}

impl ClientMessage {
    pub fn join(board_id: impl Into<String>, participant: Participant) -> Self {
        Self::JoinBoard { board_id: board_id.into(), participant: Some(participant) }
    }

    #[must_use]
    pub fn leave() -> Self {
        Self::LeaveBoard {}
    }

    /// Encode as a websocket text payload.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; only non-finite floats can trigger it.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a websocket text payload.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or an unknown event name.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

// =============================================================================
// RELAY → CLIENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Transport ready; carries this connection's session id.
    #[serde(rename_all = "camelCase")]
    Session { session_id: String },
    UserList {
        #[serde(default)]
        participants: Vec<Participant>,
    },
    #[serde(rename_all = "camelCase")]
    UserJoined {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant: Option<Participant>,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        session_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        participant: Option<Participant>,
    },
    Cursor(CursorSample),
    Error { code: String, message: String },
}

impl ServerMessage {
    /// Build an `error` event from any coded error.
    pub fn error(err: &impl ErrorCode) -> Self {
        Self::Error { code: err.error_code().to_owned(), message: err.to_string() }
    }

    /// Encode as a websocket text payload.
    ///
    /// # Errors
    ///
    /// Returns the serializer error; only non-finite floats can trigger it.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a websocket text payload.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed JSON or an unknown event name.
    pub fn from_text(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
