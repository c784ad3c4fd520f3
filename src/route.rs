//! Route resolution — two coordinates in, a driving path out.
//!
//! DESIGN
//! ======
//! [`RouteGateway`] is the seam the session calls. It is stateless, uncached,
//! and performs one external lookup per call. Every failure (missing token,
//! transport error, non-success status, unparseable body, empty result) is
//! logged and collapsed into `None`; callers only ever see "a path" or
//! "no path".
//!
//! [`DirectionsClient`] is the production gateway backed by the Mapbox
//! Directions v5 API. `fetch` keeps the typed [`RouteError`] for callers
//! that want it; `resolve` is the swallowing wrapper.

#[cfg(test)]
#[path = "route_test.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::RouteConfig;
use crate::message::ErrorCode;
use crate::model::{LineString, LngLat, Route, RouteProperties};

// =============================================================================
// TYPES
// =============================================================================

/// Geometry plus metrics for one resolved path.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub geometry: LineString,
    /// Meters.
    pub distance: Option<f64>,
    /// Seconds.
    pub duration: Option<f64>,
}

impl ResolvedPath {
    /// Attach pin ids and turn the path into a storable route.
    #[must_use]
    pub fn into_route(self, from_id: Option<String>, to_id: Option<String>) -> Route {
        Route {
            geometry: self.geometry,
            properties: RouteProperties { from_id, to_id, distance: self.distance, duration: self.duration },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// No access token configured.
    #[error("missing directions token: env var MAPBOX_TOKEN not set")]
    MissingToken,

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Transport failure talking to the directions API.
    #[error("directions request failed: {0}")]
    Request(String),

    /// The directions API returned a non-success status.
    #[error("directions response error: status {status}")]
    Response { status: u16, body: String },

    #[error("directions response parse failed: {0}")]
    Parse(String),
}

impl ErrorCode for RouteError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingToken => "E_MISSING_TOKEN",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Request(_) => "E_ROUTE_REQUEST",
            Self::Response { .. } => "E_ROUTE_RESPONSE",
            Self::Parse(_) => "E_ROUTE_PARSE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// GATEWAY TRAIT
// =============================================================================

#[async_trait]
pub trait RouteGateway: Send + Sync {
    /// Resolve a path between two points. `None` on any failure or empty result.
    async fn resolve(&self, from: LngLat, to: LngLat) -> Option<ResolvedPath>;
}

// =============================================================================
// DIRECTIONS CLIENT
// =============================================================================

pub struct DirectionsClient {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
    profile: String,
}

impl DirectionsClient {
    /// Build a client from config. A missing token is not an error here;
    /// every lookup reports it instead.
    ///
    /// # Errors
    ///
    /// Returns `HttpClientBuild` if the reqwest client cannot be constructed.
    pub fn new(config: &RouteConfig) -> Result<Self, RouteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| RouteError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            profile: config.profile.trim_matches('/').to_owned(),
        })
    }

    #[must_use]
    pub fn directions_url(&self, from: LngLat, to: LngLat) -> String {
        format!(
            "{}/directions/v5/{}/{},{};{},{}",
            self.base_url, self.profile, from[0], from[1], to[0], to[1]
        )
    }

    /// One directions lookup. `Ok(None)` when the API found no route.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] for a missing token, transport failure,
    /// non-success status, or unparseable body.
    pub async fn fetch(&self, from: LngLat, to: LngLat) -> Result<Option<ResolvedPath>, RouteError> {
        let token = self.token.as_deref().ok_or(RouteError::MissingToken)?;
        let response = self
            .http
            .get(self.directions_url(from, to))
            .query(&[("geometries", "geojson"), ("overview", "full"), ("access_token", token)])
            .send()
            .await
            .map_err(|e| RouteError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| RouteError::Request(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(RouteError::Response { status, body: text });
        }
        parse_directions_response(&text)
    }
}

#[async_trait]
impl RouteGateway for DirectionsClient {
    async fn resolve(&self, from: LngLat, to: LngLat) -> Option<ResolvedPath> {
        match self.fetch(from, to).await {
            Ok(Some(path)) => Some(path),
            Ok(None) => {
                debug!(?from, ?to, "route: no route found");
                None
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), ?from, ?to, "route: lookup failed");
                None
            }
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Deserialize)]
struct DirectionsResponse {
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Deserialize)]
struct DirectionsRoute {
    geometry: LineString,
    distance: Option<f64>,
    duration: Option<f64>,
}

/// Parse a directions body, taking the first route.
///
/// # Errors
///
/// Returns `Parse` when the body is not a directions response.
pub fn parse_directions_response(text: &str) -> Result<Option<ResolvedPath>, RouteError> {
    let parsed: DirectionsResponse = serde_json::from_str(text).map_err(|e| RouteError::Parse(e.to_string()))?;
    Ok(parsed
        .routes
        .into_iter()
        .next()
        .map(|r| ResolvedPath { geometry: r.geometry, distance: r.distance, duration: r.duration }))
}
