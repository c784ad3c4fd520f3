//! Route-selection workflow — pick two pins, resolve a route between them.
//!
//! DESIGN
//! ======
//! A small synchronous state machine. It never touches the store or the
//! gateway itself: picks go in, and a [`RouteRequest`] comes out when a
//! lookup should be dispatched. The session owns side effects (clearing the
//! selection, publishing start/end events, spawning the gateway call).
//!
//! ```text
//!   Idle ──start (≥2 pins)──▶ AwaitingSecondPick ──2nd distinct pick──▶ Resolving
//!    ▲                               │                                     │
//!    └────────── cancel / pin gone ──┴─────────── complete(generation) ────┘
//! ```
//!
//! STALE RESULTS
//! =============
//! Each `start` and `cancel` bumps a generation counter and the dispatched
//! request carries it. A completion whose generation no longer matches the
//! `Resolving` state is reported as stale and must be discarded.

#[cfg(test)]
#[path = "workflow_test.rs"]
mod tests;

use tracing::debug;

use crate::model::LngLat;
use crate::store::AnnotationStore;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SelectionState {
    #[default]
    Idle,
    AwaitingSecondPick {
        picks: Vec<String>,
    },
    Resolving {
        generation: u64,
        from_id: String,
        to_id: String,
    },
}

/// Who asked for a route lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTicket {
    /// Two-pick workflow at the given generation.
    Workflow(u64),
    /// Direct shortcut ("route last two", explicit request); always applied.
    Direct,
}

/// A gateway lookup to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub ticket: RouteTicket,
    pub from: LngLat,
    pub to: LngLat,
    pub from_id: Option<String>,
    pub to_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PickOutcome {
    /// Not selecting, duplicate pick, or unknown pin.
    Ignored,
    /// First distinct pick stored; still waiting.
    Recorded,
    /// Second distinct pick; the lookup should be dispatched.
    Dispatch(RouteRequest),
    /// A picked pin vanished; the workflow went back to idle.
    Abandoned,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct RouteSelection {
    state: SelectionState,
    generation: u64,
}

impl RouteSelection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter pick mode. Requires idle state and at least two pins.
    pub fn start(&mut self, store: &AnnotationStore) -> bool {
        if self.state != SelectionState::Idle || store.len() < 2 {
            return false;
        }
        self.generation += 1;
        self.state = SelectionState::AwaitingSecondPick { picks: Vec::new() };
        debug!(generation = self.generation, "workflow: route selection started");
        true
    }

    /// Feed a pin selection into the workflow.
    pub fn on_pin_selected(&mut self, id: &str, store: &AnnotationStore) -> PickOutcome {
        let SelectionState::AwaitingSecondPick { picks } = &mut self.state else {
            return PickOutcome::Ignored;
        };
        if picks.iter().any(|p| p == id) || !store.contains(id) {
            return PickOutcome::Ignored;
        }
        picks.push(id.to_owned());
        if picks.len() < 2 {
            return PickOutcome::Recorded;
        }

        let from_id = picks[0].clone();
        let to_id = picks[1].clone();
        let (Some(from), Some(to)) = (store.pin(&from_id), store.pin(&to_id)) else {
            debug!(%from_id, %to_id, "workflow: picked pin vanished");
            self.reset();
            return PickOutcome::Abandoned;
        };
        let request = RouteRequest {
            ticket: RouteTicket::Workflow(self.generation),
            from: from.coordinates,
            to: to.coordinates,
            from_id: Some(from_id.clone()),
            to_id: Some(to_id.clone()),
        };
        self.state = SelectionState::Resolving { generation: self.generation, from_id, to_id };
        PickOutcome::Dispatch(request)
    }

    /// Finish a lookup. Returns false when `generation` is stale.
    pub fn complete(&mut self, generation: u64) -> bool {
        match self.state {
            SelectionState::Resolving { generation: current, .. } if current == generation => {
                self.state = SelectionState::Idle;
                true
            }
            _ => false,
        }
    }

    /// Abort from any non-idle state. Returns false when already idle.
    pub fn cancel(&mut self) -> bool {
        if self.state == SelectionState::Idle {
            return false;
        }
        self.reset();
        true
    }

    /// Drop any pending pick and invalidate in-flight lookups.
    fn reset(&mut self) {
        self.generation += 1;
        self.state = SelectionState::Idle;
    }

    #[must_use]
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state != SelectionState::Idle
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
