//! Shared annotation store — pins, the single selection, and the active route.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store is the authoritative in-memory model for one board session.
//! All mutations are synchronous and run on the session task, so there is no
//! locking. Every method that can change something reports what it changed
//! so the session can publish the matching board events.
//!
//! INVARIANTS
//! ==========
//! - Pin ids are unique; adding a pin with a known id replaces it in place.
//! - A stored route only references pins that exist. Deleting an endpoint
//!   clears the route, and `set_route` refuses a route with a dangling id.
//! - The selection, when set, names an existing pin.

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;

use tracing::{debug, info};
use uuid::Uuid;

use crate::model::{NewPin, Pin, PinPatch, Route};

/// Result of a successful `delete_pin`.
#[derive(Debug, Clone, PartialEq)]
pub struct Deleted {
    pub pin: Pin,
    pub route_cleared: bool,
    pub selection_cleared: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    pins: Vec<Pin>,
    selected: Option<String>,
    route: Option<Route>,
}

impl AnnotationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // PINS
    // =========================================================================

    /// Add a pin, generating a UUID v4 id when none is supplied.
    pub fn add_pin(&mut self, new_pin: NewPin) -> Pin {
        let id = new_pin.id.filter(|id| !id.is_empty()).unwrap_or_else(|| Uuid::new_v4().to_string());
        let pin = Pin { id, title: new_pin.title, coordinates: new_pin.coordinates, color: new_pin.color };

        if let Some(existing) = self.pins.iter_mut().find(|p| p.id == pin.id) {
            debug!(pin_id = %pin.id, "store: pin replaced in place");
            existing.clone_from(&pin);
        } else {
            debug!(pin_id = %pin.id, "store: pin added");
            self.pins.push(pin.clone());
        }
        pin
    }

    /// Merge `patch` into the pin. Returns the updated pin, or `None` if absent.
    pub fn update_pin(&mut self, id: &str, patch: PinPatch) -> Option<Pin> {
        let pin = self.pins.iter_mut().find(|p| p.id == id)?;
        patch.apply(pin);
        Some(pin.clone())
    }

    /// Remove a pin and invalidate anything that referenced it.
    pub fn delete_pin(&mut self, id: &str) -> Option<Deleted> {
        let index = self.pins.iter().position(|p| p.id == id)?;
        let pin = self.pins.remove(index);

        let route_cleared = self.route.as_ref().is_some_and(|r| r.references(id));
        if route_cleared {
            info!(pin_id = %id, "store: route cleared, endpoint deleted");
            self.route = None;
        }
        let selection_cleared = self.selected.as_deref() == Some(id);
        if selection_cleared {
            self.selected = None;
        }
        Some(Deleted { pin, route_cleared, selection_cleared })
    }

    /// Set or clear the single selection. Unknown ids leave it untouched.
    /// Returns true when the selection changed.
    pub fn select_pin(&mut self, id: Option<&str>) -> bool {
        match id {
            Some(id) if !self.contains(id) => false,
            Some(id) if self.selected.as_deref() == Some(id) => false,
            Some(id) => {
                self.selected = Some(id.to_owned());
                true
            }
            None => self.selected.take().is_some(),
        }
    }

    /// Drop every pin, the selection, and the route.
    pub fn clear_pins(&mut self) {
        self.pins.clear();
        self.selected = None;
        self.route = None;
    }

    // =========================================================================
    // ROUTE
    // =========================================================================

    /// Replace the active route. A route naming a pin that is not stored is
    /// refused and `false` is returned; the previous route is kept.
    pub fn set_route(&mut self, route: Option<Route>) -> bool {
        if let Some(route) = &route {
            let dangling = [&route.properties.from_id, &route.properties.to_id]
                .into_iter()
                .flatten()
                .any(|id| !self.contains(id));
            if dangling {
                debug!("store: route refused, endpoint missing");
                return false;
            }
        }
        self.route = route;
        true
    }

    /// Returns true when a route was present.
    pub fn clear_route(&mut self) -> bool {
        self.route.take().is_some()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    #[must_use]
    pub fn pin(&self, id: &str) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.pin(id).is_some()
    }

    #[must_use]
    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// The last two pins in insertion order, oldest first.
    #[must_use]
    pub fn last_two(&self) -> Option<(&Pin, &Pin)> {
        match self.pins.as_slice() {
            [.., from, to] => Some((from, to)),
            _ => None,
        }
    }
}
