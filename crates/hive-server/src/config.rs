//! Server configuration from environment.

use hive_core::DEFAULT_MINIMUM_WEIGHT;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Threshold used when a request doesn't name one
    pub default_minimum_weight: f64,
    /// Fixed seed for topology jitter; entropy when unset
    pub topology_seed: Option<u64>,
    pub telemetry_history: usize,
    pub notify_timeout_ms: u64,
    /// Per-drone callback URL with a `{drone_id}` placeholder
    pub drone_callback_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            default_minimum_weight: DEFAULT_MINIMUM_WEIGHT,
            topology_seed: None,
            telemetry_history: 100,
            notify_timeout_ms: 2000,
            drone_callback_url: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: env::var("HIVE_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.server_port),
            default_minimum_weight: env::var("HIVE_MIN_LINK_WEIGHT")
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|w| (0.0..=1.0).contains(w))
                .unwrap_or(defaults.default_minimum_weight),
            topology_seed: env::var("HIVE_TOPOLOGY_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
            telemetry_history: env::var("HIVE_TELEMETRY_HISTORY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.telemetry_history),
            notify_timeout_ms: env::var("HIVE_NOTIFY_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.notify_timeout_ms),
            drone_callback_url: env::var("HIVE_DRONE_CALLBACK_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}
