use std::time::Duration;
use serde::{Deserialize, Serialize};
use common::config::Validate;

pub const DEFAULT_CONFIG_PATH: &str = "grid_strike_server.yaml";
pub const CLEANUP_CHECK_INTERVAL: Duration = Duration::from_secs(300);
pub const INACTIVITY_TIMEOUT: Duration = Duration::from_secs(3600);
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    /// Directory served under `/ui`, if any.
    pub static_files_path: Option<String>,
    /// WebSocket transport at `/ws`.
    pub enable_push: bool,
    /// HTTP polling transport under `/api/rooms`.
    pub enable_pull: bool,
    pub cleanup_interval_secs: u64,
    /// Rooms idle this long are closed; 0 keeps rooms for the life of the process.
    pub room_idle_timeout_secs: u64,
    pub history_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            static_files_path: None,
            enable_push: true,
            enable_pull: true,
            cleanup_interval_secs: CLEANUP_CHECK_INTERVAL.as_secs(),
            room_idle_timeout_secs: INACTIVITY_TIMEOUT.as_secs(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl ServerConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn room_idle_timeout(&self) -> Option<Duration> {
        match self.room_idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<(), String> {
        if self.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(format!("Invalid bind address: {}", self.bind_address));
        }
        if !self.enable_push && !self.enable_pull {
            return Err("At least one of enable_push and enable_pull must be set".to_string());
        }
        if self.cleanup_interval_secs == 0 {
            return Err("cleanup_interval_secs must be positive".to_string());
        }
        if self.history_capacity == 0 {
            return Err("history_capacity must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_keeps_rooms_forever() {
        let config = ServerConfig {
            room_idle_timeout_secs: 0,
            ..ServerConfig::default()
        };

        assert_eq!(config.room_idle_timeout(), None);
    }

    #[test]
    fn test_both_transports_disabled_is_invalid() {
        let config = ServerConfig {
            enable_push: false,
            enable_pull: false,
            ..ServerConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_bind_address_is_invalid() {
        let config = ServerConfig {
            bind_address: "localhost".to_string(),
            ..ServerConfig::default()
        };

        assert!(config.validate().is_err());
    }
}
