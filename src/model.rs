//! Board data model shared by the store, the presence layer, and the wire.
//!
//! DESIGN
//! ======
//! Coordinates are always `[lng, lat]` pairs, matching `GeoJSON` ordering so
//! directions geometry can be stored without conversion. Field names are
//! camelCase on the wire (`sessionId`, `fromId`).

#[cfg(test)]
#[path = "model_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

/// Initials shown on a remote cursor when the participant payload is missing.
pub const PLACEHOLDER_INITIALS: &str = "??";

/// A `[lng, lat]` coordinate pair.
pub type LngLat = [f64; 2];

// =============================================================================
// PARTICIPANT
// =============================================================================

/// One live participant on a board. `id` is unique per connection session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub initials: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Transport session id, stamped by the relay on roster entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, initials: impl Into<String>) -> Self {
        Self { id: id.into(), initials: initials.into(), color: None, session_id: None }
    }

    /// Initials to render, falling back to a two-character placeholder.
    #[must_use]
    pub fn display_initials(&self) -> &str {
        let trimmed = self.initials.trim();
        if trimmed.is_empty() { PLACEHOLDER_INITIALS } else { trimmed }
    }

    /// Key used to merge roster entries: the session id when stamped, else the id.
    #[must_use]
    pub fn roster_key(&self) -> &str {
        self.session_id.as_deref().unwrap_or(&self.id)
    }
}

// =============================================================================
// CURSOR SAMPLE
// =============================================================================

/// A remote pointer position. Superseded by the next sample for the same session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorSample {
    pub session_id: String,
    pub lng: f64,
    pub lat: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<Participant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CursorSample {
    #[must_use]
    pub fn position(&self) -> LngLat {
        [self.lng, self.lat]
    }
}

// =============================================================================
// PINS
// =============================================================================

/// A user-placed point annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub coordinates: LngLat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Input to `AnnotationStore::add_pin`. The id is generated when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewPin {
    pub id: Option<String>,
    pub title: Option<String>,
    pub coordinates: LngLat,
    pub color: Option<String>,
}

impl NewPin {
    #[must_use]
    pub fn at(coordinates: LngLat) -> Self {
        Self { coordinates, ..Self::default() }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Partial pin update. `Some` fields replace the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PinPatch {
    pub title: Option<String>,
    pub coordinates: Option<LngLat>,
    pub color: Option<String>,
}

impl PinPatch {
    pub(crate) fn apply(self, pin: &mut Pin) {
        if let Some(title) = self.title {
            pin.title = Some(title);
        }
        if let Some(coordinates) = self.coordinates {
            pin.coordinates = coordinates;
        }
        if let Some(color) = self.color {
            pin.color = Some(color);
        }
    }
}

// =============================================================================
// ROUTE
// =============================================================================

/// `GeoJSON` `LineString` geometry. Only the coordinates are retained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineString {
    pub coordinates: Vec<LngLat>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_id: Option<String>,
    /// Meters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// The single active route between two pins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub geometry: LineString,
    pub properties: RouteProperties,
}

impl Route {
    /// True when either endpoint of the route is the given pin.
    #[must_use]
    pub fn references(&self, pin_id: &str) -> bool {
        self.properties.from_id.as_deref() == Some(pin_id) || self.properties.to_id.as_deref() == Some(pin_id)
    }
}
