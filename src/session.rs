//! Board session — one participant's view of one board.
//!
//! ARCHITECTURE
//! ============
//! Composes the annotation store, the presence client, and the route
//! workflow behind two entry points: inbound relay messages and local
//! intents. Both return [`Effects`] (messages to send, lookups to dispatch)
//! and publish [`BoardEvent`]s on the bus. The session itself does no I/O,
//! so everything one event triggers completes before the next is handled.
//!
//! ROUTE RESULTS
//! =============
//! Lookups run elsewhere and come back through `apply_route_result`.
//! Workflow results with a stale generation are dropped. Every result is
//! re-validated against the store before it is applied, since a referenced
//! pin may have been deleted while the lookup was in flight. An empty result
//! leaves the current route untouched.

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use tracing::{debug, info};

use crate::color::ColorRegistry;
use crate::cursor::{MarkerLayer, RemoteCursorTracker};
use crate::message::{ClientMessage, ServerMessage};
use crate::model::Participant;
use crate::presence::{PresenceClient, PresenceEvent};
use crate::route::ResolvedPath;
use crate::signal::{BoardEvent, Intent, SignalBus};
use crate::store::AnnotationStore;
use crate::workflow::{PickOutcome, RouteRequest, RouteSelection, RouteTicket};

/// Side effects the transport driver must carry out.
#[derive(Debug, Default, PartialEq)]
pub struct Effects {
    pub outbound: Vec<ClientMessage>,
    pub routes: Vec<RouteRequest>,
}

impl Effects {
    fn send(message: Option<ClientMessage>) -> Self {
        Self { outbound: message.into_iter().collect(), routes: Vec::new() }
    }

    fn lookup(request: RouteRequest) -> Self {
        Self { outbound: Vec::new(), routes: vec![request] }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outbound.is_empty() && self.routes.is_empty()
    }
}

pub struct BoardSession<M: MarkerLayer> {
    store: AnnotationStore,
    presence: PresenceClient<M>,
    workflow: RouteSelection,
    bus: SignalBus,
}

impl<M: MarkerLayer> BoardSession<M> {
    pub fn new(layer: M, colors: ColorRegistry, bus: SignalBus) -> Self {
        Self {
            store: AnnotationStore::new(),
            presence: PresenceClient::new(RemoteCursorTracker::new(layer, colors)),
            workflow: RouteSelection::new(),
            bus,
        }
    }

    /// Record the board to join; sends `join_board` once the relay is ready.
    pub fn connect(&mut self, board_id: impl Into<String>, local: Participant) -> Effects {
        Effects::send(self.presence.connect(board_id, local))
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    pub fn handle_server_message(&mut self, message: ServerMessage) -> Effects {
        let handled = self.presence.handle(message);
        for event in handled.events {
            self.bus.publish(match event {
                PresenceEvent::Ready { session_id } => BoardEvent::Connected { session_id },
                PresenceEvent::Joined { session_id, participant } => {
                    BoardEvent::ParticipantJoined { session_id, participant }
                }
                PresenceEvent::Left { session_id, participant } => BoardEvent::ParticipantLeft { session_id, participant },
                PresenceEvent::RosterChanged(roster) => BoardEvent::RosterChanged(roster),
                PresenceEvent::ServerError { code, message } => BoardEvent::ServerError { code, message },
            });
        }
        Effects::send(handled.reply)
    }

    // =========================================================================
    // INTENTS
    // =========================================================================

    pub fn handle_intent(&mut self, intent: Intent) -> Effects {
        match intent {
            Intent::AddPin(new_pin) => {
                let pin = self.store.add_pin(new_pin);
                self.bus.publish(BoardEvent::PinAdded(pin));
            }
            Intent::UpdatePin { id, patch } => {
                if let Some(pin) = self.store.update_pin(&id, patch) {
                    self.bus.publish(BoardEvent::PinUpdated(pin));
                }
            }
            Intent::DeletePin { id } => {
                if let Some(deleted) = self.store.delete_pin(&id) {
                    self.bus.publish(BoardEvent::PinDeleted { id: deleted.pin.id });
                    if deleted.selection_cleared {
                        self.bus.publish(BoardEvent::SelectionChanged { id: None });
                    }
                    if deleted.route_cleared {
                        self.bus.publish(BoardEvent::RouteChanged(None));
                    }
                }
            }
            Intent::SelectPin { id } => return self.select(id),
            Intent::ClearPins => {
                self.store.clear_pins();
                self.bus.publish(BoardEvent::PinsCleared);
                if self.workflow.cancel() {
                    self.bus.publish(BoardEvent::RouteSelectionEnd);
                }
            }
            Intent::ClearRoute => {
                if self.store.clear_route() {
                    self.bus.publish(BoardEvent::RouteChanged(None));
                }
            }
            Intent::StartRouteSelection => {
                if self.workflow.start(&self.store) {
                    info!(generation = self.workflow.generation(), "session: route selection started");
                    self.bus.publish(BoardEvent::RouteSelectionStart);
                } else {
                    debug!(pins = self.store.len(), "session: route selection refused");
                }
            }
            Intent::CancelRouteSelection => {
                if self.workflow.cancel() {
                    self.end_selection();
                }
            }
            Intent::RouteLastTwo => {
                if let Some((from, to)) = self.store.last_two() {
                    return Effects::lookup(RouteRequest {
                        ticket: RouteTicket::Direct,
                        from: from.coordinates,
                        to: to.coordinates,
                        from_id: Some(from.id.clone()),
                        to_id: Some(to.id.clone()),
                    });
                }
            }
            Intent::RequestRoute { from, to, from_id, to_id } => {
                return Effects::lookup(RouteRequest { ticket: RouteTicket::Direct, from, to, from_id, to_id });
            }
            Intent::MoveCursor { position } => return Effects::send(self.presence.send_cursor(position)),
            Intent::JumpTo { session_id } => {
                let position = self.presence.last_position(&session_id);
                self.bus.publish(BoardEvent::JumpTo { session_id, position });
            }
        }
        Effects::default()
    }

    fn select(&mut self, id: Option<String>) -> Effects {
        if self.store.select_pin(id.as_deref()) {
            self.bus.publish(BoardEvent::SelectionChanged { id: self.store.selected().map(str::to_owned) });
        }
        let Some(id) = id else {
            return Effects::default();
        };
        match self.workflow.on_pin_selected(&id, &self.store) {
            PickOutcome::Dispatch(request) => {
                debug!(from_id = ?request.from_id, to_id = ?request.to_id, "session: dispatching route lookup");
                Effects::lookup(request)
            }
            PickOutcome::Abandoned => {
                self.end_selection();
                Effects::default()
            }
            PickOutcome::Ignored | PickOutcome::Recorded => Effects::default(),
        }
    }

    /// Leave pick mode: clear the global selection and announce the end.
    fn end_selection(&mut self) {
        if self.store.select_pin(None) {
            self.bus.publish(BoardEvent::SelectionChanged { id: None });
        }
        self.bus.publish(BoardEvent::RouteSelectionEnd);
    }

    // =========================================================================
    // ROUTE RESULTS
    // =========================================================================

    /// Apply a finished lookup. Returns true when a route was stored.
    pub fn apply_route_result(&mut self, request: RouteRequest, result: Option<ResolvedPath>) -> bool {
        if let RouteTicket::Workflow(generation) = request.ticket {
            if !self.workflow.complete(generation) {
                debug!(generation, current = self.workflow.generation(), "session: stale route result dropped");
                return false;
            }
        }

        let applied = match result {
            Some(path) => {
                let route = path.into_route(request.from_id, request.to_id);
                let stored = self.store.set_route(Some(route));
                if stored {
                    self.bus.publish(BoardEvent::RouteChanged(self.store.route().cloned()));
                } else {
                    debug!("session: route dropped, endpoint deleted in flight");
                }
                stored
            }
            None => false,
        };

        if matches!(request.ticket, RouteTicket::Workflow(_)) {
            self.end_selection();
        }
        applied
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    pub fn on_transport_lost(&mut self) {
        self.presence.on_transport_lost();
        self.bus.publish(BoardEvent::Disconnected);
    }

    /// Tear down: cancel pick mode, drop remote state, and return the
    /// best-effort `leave_board`.
    pub fn dispose(&mut self) -> ClientMessage {
        if self.workflow.cancel() {
            self.end_selection();
        }
        self.presence.disconnect()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn store(&self) -> &AnnotationStore {
        &self.store
    }

    #[must_use]
    pub fn presence(&self) -> &PresenceClient<M> {
        &self.presence
    }

    #[must_use]
    pub fn workflow(&self) -> &RouteSelection {
        &self.workflow
    }

    #[must_use]
    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }
}
