//! Real-time presence and annotation layer for a shared map board.
//!
//! Participants on the same board see each other's cursors as colored
//! initials markers, and each participant keeps a local set of pins plus at
//! most one route between two of them. The crate carries both ends of the
//! realtime channel: the client-side session and the relay server.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`model`] | Participants, cursor samples, pins, routes |
//! | [`message`] | Wire events and the [`message::ErrorCode`] trait |
//! | [`color`] | Per-board color assignment and hex normalization |
//! | [`cursor`] | Remote cursor markers behind a [`cursor::MarkerLayer`] |
//! | [`presence`] | Join/leave lifecycle and roster reconciliation |
//! | [`store`] | Pins, selection, and the current route |
//! | [`workflow`] | Two-pick route selection state machine |
//! | [`route`] | Directions lookup gateway |
//! | [`signal`] | Intents in, board events out |
//! | [`session`] | Glue: intents and relay events → store, presence, effects |
//! | [`net`] | Websocket session driver with reconnect |
//! | [`relay`] | Axum relay server |
//! | [`config`] | Environment configuration |
//! | [`cli`] | Line commands for the headless participant |

pub mod cli;
pub mod color;
pub mod config;
pub mod cursor;
pub mod message;
pub mod model;
pub mod net;
pub mod presence;
pub mod relay;
pub mod route;
pub mod session;
pub mod signal;
pub mod store;
pub mod workflow;
