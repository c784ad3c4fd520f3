//! Relay server — router assembly and listener.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay keeps no board data. It tracks which connections sit in which
//! room and fans presence events out between them: `/ws` for the realtime
//! channel, `/healthz` for liveness probes.

pub mod room;
pub mod state;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
pub use state::RelayState;

/// Build the relay router over shared state.
pub fn app(state: RelayState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `0.0.0.0:<port>` and serve until the process exits.
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails.
pub async fn serve(config: RelayConfig) -> std::io::Result<()> {
    let port = config.port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(%port, "mapboard relay listening");
    axum::serve(listener, app(RelayState::new(config))).await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
