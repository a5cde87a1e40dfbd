//! Hub configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable numeric values
//! fall back to their defaults; only `LISTEN_ADDR` is strict.

use std::net::SocketAddr;
use std::time::Duration;

use crate::error::HubError;
use crate::ws::SessionSettings;

/// Top-level hub configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:8080`).
    pub listen_addr: SocketAddr,

    /// NATS server URL.
    pub nats_url: String,

    /// Wildcard subject the bridge subscribes to.
    pub nats_subject: String,

    /// Timeout in seconds for the initial NATS connection.
    pub nats_connect_timeout_secs: u64,

    /// Connection name reported to the NATS server.
    pub nats_client_name: String,

    /// Capacity of each session's outbound queue.
    pub session_queue_capacity: usize,

    /// Capacity of the hub's command queue.
    pub hub_queue_capacity: usize,

    /// Seconds a session waits for a pong before closing.
    pub pong_wait_secs: u64,

    /// Seconds allowed for a single write to a client.
    pub write_wait_secs: u64,

    /// Largest inbound WebSocket message accepted, in bytes.
    pub max_message_size: usize,

    /// Emit logs as JSON instead of human-readable text.
    pub json_logs: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            nats_url: "nats://localhost:4222".to_string(),
            nats_subject: "tasks.>".to_string(),
            nats_connect_timeout_secs: 10,
            nats_client_name: "taskboard-hub".to_string(),
            session_queue_capacity: 256,
            hub_queue_capacity: 256,
            pong_wait_secs: 60,
            write_wait_secs: 10,
            max_message_size: 512,
            json_logs: false,
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::InvalidConfig`] if `LISTEN_ADDR` is set but
    /// cannot be parsed as a [`SocketAddr`], or if `PONG_WAIT_SECS` is zero.
    pub fn from_env() -> Result<Self, HubError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw
                .parse()
                .map_err(|e| HubError::InvalidConfig(format!("LISTEN_ADDR {raw:?}: {e}")))?,
            Err(_) => defaults.listen_addr,
        };

        let config = Self {
            listen_addr,
            nats_url: std::env::var("NATS_URL").unwrap_or(defaults.nats_url),
            nats_subject: std::env::var("NATS_SUBJECT").unwrap_or(defaults.nats_subject),
            nats_connect_timeout_secs: parse_env(
                "NATS_CONNECT_TIMEOUT_SECS",
                defaults.nats_connect_timeout_secs,
            ),
            nats_client_name: std::env::var("NATS_CLIENT_NAME")
                .unwrap_or(defaults.nats_client_name),
            session_queue_capacity: parse_env(
                "SESSION_QUEUE_CAPACITY",
                defaults.session_queue_capacity,
            )
            .max(1),
            hub_queue_capacity: parse_env("HUB_QUEUE_CAPACITY", defaults.hub_queue_capacity)
                .max(1),
            pong_wait_secs: parse_env("PONG_WAIT_SECS", defaults.pong_wait_secs),
            write_wait_secs: parse_env("WRITE_WAIT_SECS", defaults.write_wait_secs),
            max_message_size: parse_env("MAX_MESSAGE_SIZE", defaults.max_message_size),
            json_logs: std::env::var("LOG_FORMAT")
                .is_ok_and(|format| format.eq_ignore_ascii_case("json")),
        };

        if config.pong_wait_secs == 0 {
            return Err(HubError::InvalidConfig(
                "PONG_WAIT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(config)
    }

    /// Session timeouts and limits derived from this configuration.
    #[must_use]
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings::from_pong_wait(
            Duration::from_secs(self.pong_wait_secs),
            Duration::from_secs(self.write_wait_secs),
            self.max_message_size,
            self.session_queue_capacity,
        )
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_queue_sizes_and_subject() {
        let config = HubConfig::default();
        assert_eq!(config.listen_addr.port(), 8080);
        assert_eq!(config.nats_subject, "tasks.>");
        assert_eq!(config.session_queue_capacity, 256);
        assert_eq!(config.hub_queue_capacity, 256);
    }

    #[test]
    fn session_settings_derive_ping_period() {
        let config = HubConfig {
            pong_wait_secs: 30,
            write_wait_secs: 5,
            ..HubConfig::default()
        };
        let settings = config.session_settings();
        assert_eq!(settings.pong_wait, Duration::from_secs(30));
        assert_eq!(settings.ping_period, Duration::from_secs(27));
        assert_eq!(settings.write_wait, Duration::from_secs(5));
        assert_eq!(settings.queue_capacity, 256);
    }

    #[test]
    fn parse_env_falls_back_on_missing_values() {
        assert_eq!(parse_env("TASKBOARD_HUB_SURELY_UNSET_VARIABLE", 42u64), 42);
    }
}
