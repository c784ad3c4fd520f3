//! Client transport — websocket driver and reconnect policy.

mod backoff;
mod socket;

pub use backoff::Backoff;
pub use socket::{TransportError, run_session};
