//! Environment configuration for the board client and the relay.
//!
//! Every value has a default; the binary layers `clap` flags on top. Numeric
//! variables that fail to parse fall back to their default. Lookups go
//! through a closure so tests never touch the process environment.

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

use std::env::VarError;
use std::fmt::Display;
use std::str::FromStr;

use tracing::warn;

use crate::color::{DEFAULT_PALETTE, parse_palette};

pub const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";
pub const DEFAULT_BOARD_ID: &str = "demo-board-1";
pub const DEFAULT_INITIALS: &str = "YY";
pub const DEFAULT_MAPBOX_BASE_URL: &str = "https://api.mapbox.com";
pub const DEFAULT_MAPBOX_PROFILE: &str = "mapbox/driving";
const DEFAULT_ROUTE_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_ROUTE_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_RECONNECT_INITIAL_MS: u64 = 1000;
const DEFAULT_RECONNECT_MAX_MS: u64 = 10_000;
const DEFAULT_IO_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RELAY_CLIENT_BUFFER: usize = 256;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid relay url '{0}': expected ws:// or wss://")]
    InvalidUrl(String),

    #[error("board id must not be empty")]
    BoardIdRequired,

    #[error("invalid reconnect window: initial {initial_ms}ms, max {max_ms}ms")]
    InvalidReconnect { initial_ms: u64, max_ms: u64 },
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RouteConfig {
    pub token: Option<String>,
    pub base_url: String,
    /// Directions profile path, e.g. `mapbox/driving`.
    pub profile: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            token: None,
            base_url: DEFAULT_MAPBOX_BASE_URL.into(),
            profile: DEFAULT_MAPBOX_PROFILE.into(),
            request_timeout_secs: DEFAULT_ROUTE_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_ROUTE_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub initial_ms: u64,
    pub max_ms: u64,
    /// Upper bound on the websocket handshake and on each outbound send.
    pub io_timeout_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_ms: DEFAULT_RECONNECT_INITIAL_MS,
            max_ms: DEFAULT_RECONNECT_MAX_MS,
            io_timeout_ms: DEFAULT_IO_TIMEOUT_MS,
        }
    }
}

// =============================================================================
// BOARD CLIENT
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BoardConfig {
    pub url: String,
    pub board_id: String,
    pub initials: String,
    pub palette: Vec<String>,
    pub route: RouteConfig,
    pub reconnect: ReconnectConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            board_id: DEFAULT_BOARD_ID.into(),
            initials: DEFAULT_INITIALS.into(),
            palette: default_palette(),
            route: RouteConfig::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl BoardConfig {
    /// Load from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the resulting config fails validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(env_lookup)
    }

    /// Load from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the resulting config fails validation.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            url: lookup("MAPBOARD_URL").unwrap_or(defaults.url),
            board_id: lookup("MAPBOARD_BOARD_ID").unwrap_or(defaults.board_id),
            initials: lookup("MAPBOARD_INITIALS").unwrap_or(defaults.initials),
            palette: lookup("MAPBOARD_PALETTE").map_or(defaults.palette, |raw| parse_palette(&raw)),
            route: RouteConfig {
                token: lookup("MAPBOX_TOKEN").filter(|t| !t.trim().is_empty()),
                base_url: lookup("MAPBOX_BASE_URL")
                    .unwrap_or(defaults.route.base_url)
                    .trim_end_matches('/')
                    .to_owned(),
                profile: lookup("MAPBOX_PROFILE").unwrap_or(defaults.route.profile),
                request_timeout_secs: parse_or(&lookup, "ROUTE_REQUEST_TIMEOUT_SECS", DEFAULT_ROUTE_REQUEST_TIMEOUT_SECS),
                connect_timeout_secs: parse_or(&lookup, "ROUTE_CONNECT_TIMEOUT_SECS", DEFAULT_ROUTE_CONNECT_TIMEOUT_SECS),
            },
            reconnect: ReconnectConfig {
                initial_ms: parse_or(&lookup, "RECONNECT_INITIAL_MS", DEFAULT_RECONNECT_INITIAL_MS),
                max_ms: parse_or(&lookup, "RECONNECT_MAX_MS", DEFAULT_RECONNECT_MAX_MS),
                io_timeout_ms: parse_or(&lookup, "TRANSPORT_IO_TIMEOUT_MS", DEFAULT_IO_TIMEOUT_MS).max(1),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints. Called again after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl(self.url.clone()));
        }
        if self.board_id.trim().is_empty() {
            return Err(ConfigError::BoardIdRequired);
        }
        let ReconnectConfig { initial_ms, max_ms, .. } = self.reconnect;
        if initial_ms == 0 || initial_ms > max_ms {
            return Err(ConfigError::InvalidReconnect { initial_ms, max_ms });
        }
        Ok(())
    }
}

// =============================================================================
// RELAY
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub port: u16,
    /// Per-client outbound queue depth; frames beyond it are dropped.
    pub client_buffer: usize,
    pub palette: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT, client_buffer: DEFAULT_RELAY_CLIENT_BUFFER, palette: default_palette() }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            client_buffer: parse_or(&lookup, "RELAY_CLIENT_BUFFER", DEFAULT_RELAY_CLIENT_BUFFER).max(1),
            palette: lookup("MAPBOARD_PALETTE").map_or_else(default_palette, |raw| parse_palette(&raw)),
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Process environment lookup. Unset is absent; a non-unicode value is
/// logged and treated as absent.
fn env_lookup(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(VarError::NotPresent) => None,
        Err(VarError::NotUnicode(raw)) => {
            warn!(%key, ?raw, "config: ignoring non-unicode value");
            None
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(e) => {
            warn!(%key, value = %raw, error = %e, "config: unparseable value, using default");
            default
        }
    }
}

fn default_palette() -> Vec<String> {
    DEFAULT_PALETTE.iter().map(|c| (*c).to_owned()).collect()
}
