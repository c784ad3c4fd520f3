//! Remote cursor tracker — one live marker per remote session.
//!
//! DESIGN
//! ======
//! The tracker caches the last known position of every remote session and
//! drives marker lifecycle through a [`MarkerLayer`], the seam to whatever
//! renders the map. The local session's own samples never produce a marker.
//!
//! Color assignment lives here too, so removing a marker and releasing its
//! color always happen in the same call.
//!
//! ORDERING
//! ========
//! Samples carry no sequence number. The newest *arrival* wins, so a sample
//! delivered out of order overwrites a fresher position until the next one
//! lands. Hardening this means a per-session sequence on the wire.

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;

use std::collections::HashMap;

use tracing::debug;

use crate::color::{ColorRegistry, normalize_hex_color};
use crate::model::{CursorSample, LngLat, PLACEHOLDER_INITIALS, Participant};

// =============================================================================
// MARKER LAYER
// =============================================================================

/// Visual attributes of a remote cursor marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerStyle {
    pub initials: String,
    pub color: String,
}

/// Rendering seam for remote cursor markers.
pub trait MarkerLayer {
    type Handle;

    fn create_marker(&mut self, session_id: &str, style: &MarkerStyle, position: LngLat) -> Self::Handle;

    fn move_marker(&mut self, handle: &mut Self::Handle, position: LngLat);

    fn remove_marker(&mut self, handle: Self::Handle);
}

/// Headless layer that only logs marker lifecycle.
#[derive(Debug, Default)]
pub struct TracingMarkerLayer;

impl MarkerLayer for TracingMarkerLayer {
    type Handle = String;

    fn create_marker(&mut self, session_id: &str, style: &MarkerStyle, position: LngLat) -> String {
        debug!(%session_id, initials = %style.initials, color = %style.color, ?position, "cursor: marker created");
        session_id.to_owned()
    }

    fn move_marker(&mut self, handle: &mut String, position: LngLat) {
        debug!(session_id = %handle, ?position, "cursor: marker moved");
    }

    fn remove_marker(&mut self, handle: String) {
        debug!(session_id = %handle, "cursor: marker removed");
    }
}

// =============================================================================
// TRACKER
// =============================================================================

struct RemoteCursor<H> {
    position: LngLat,
    participant: Option<Participant>,
    handle: H,
}

/// What a cursor sample did to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorUpdate {
    /// Own session, blank session id, or non-finite coordinates.
    Ignored,
    Created,
    Moved,
}

pub struct RemoteCursorTracker<M: MarkerLayer> {
    layer: M,
    colors: ColorRegistry,
    local_session: Option<String>,
    cursors: HashMap<String, RemoteCursor<M::Handle>>,
}

impl<M: MarkerLayer> RemoteCursorTracker<M> {
    pub fn new(layer: M, colors: ColorRegistry) -> Self {
        Self { layer, colors, local_session: None, cursors: HashMap::new() }
    }

    /// Record the local session id. Any marker already held for it is dropped.
    pub fn set_local_session(&mut self, session_id: Option<String>) {
        if let Some(sid) = session_id.as_deref() {
            self.on_participant_left(sid);
        }
        self.local_session = session_id;
    }

    #[must_use]
    pub fn local_session(&self) -> Option<&str> {
        self.local_session.as_deref()
    }

    pub fn on_cursor_sample(&mut self, sample: CursorSample) -> CursorUpdate {
        if sample.session_id.is_empty() || self.local_session.as_deref() == Some(sample.session_id.as_str()) {
            return CursorUpdate::Ignored;
        }
        if !sample.lng.is_finite() || !sample.lat.is_finite() {
            debug!(session_id = %sample.session_id, "cursor: non-finite sample dropped");
            return CursorUpdate::Ignored;
        }

        let position = sample.position();
        if let Some(cursor) = self.cursors.get_mut(&sample.session_id) {
            cursor.position = position;
            if sample.participant.is_some() {
                cursor.participant = sample.participant;
            }
            self.layer.move_marker(&mut cursor.handle, position);
            return CursorUpdate::Moved;
        }

        let color = match sample
            .color
            .as_deref()
            .and_then(normalize_hex_color)
            .or_else(|| sample.participant.as_ref().and_then(|p| p.color.as_deref()).and_then(normalize_hex_color))
        {
            Some(color) => color,
            None => self.colors.get(&sample.session_id),
        };
        let initials = sample
            .participant
            .as_ref()
            .map_or(PLACEHOLDER_INITIALS, Participant::display_initials)
            .to_owned();
        let style = MarkerStyle { initials, color };
        let handle = self.layer.create_marker(&sample.session_id, &style, position);
        self.cursors.insert(sample.session_id, RemoteCursor { position, participant: sample.participant, handle });
        CursorUpdate::Created
    }

    /// Remove the session's marker and release its color. Idempotent.
    pub fn on_participant_left(&mut self, session_id: &str) -> bool {
        self.colors.release(session_id);
        match self.cursors.remove(session_id) {
            Some(cursor) => {
                self.layer.remove_marker(cursor.handle);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn last_position(&self, session_id: &str) -> Option<LngLat> {
        self.cursors.get(session_id).map(|c| c.position)
    }

    #[must_use]
    pub fn participant(&self, session_id: &str) -> Option<&Participant> {
        self.cursors.get(session_id).and_then(|c| c.participant.as_ref())
    }

    /// Remove every marker and drop every color assignment.
    pub fn dispose(&mut self) {
        for (_, cursor) in self.cursors.drain() {
            self.layer.remove_marker(cursor.handle);
        }
        self.colors.reset();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn colors_mut(&mut self) -> &mut ColorRegistry {
        &mut self.colors
    }

    #[must_use]
    pub fn colors(&self) -> &ColorRegistry {
        &self.colors
    }

    #[must_use]
    pub fn layer(&self) -> &M {
        &self.layer
    }
}
