//! Application configuration
//!
//! Loaded from YAML; every field has a default so partial files are fine.

use std::time::Duration;

use command_dispatcher::BrowseDurations;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub relay: RelayConfig,
    pub agent: AgentConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// Number of results kept in history
    pub history_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            history_capacity: relay_command_store::DEFAULT_HISTORY_CAPACITY,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub relay_url: String,
    pub poll_interval_ms: u64,
    pub auto_browse_minutes: u64,
    pub home_feed_minutes: u64,
    /// Fixed seed for the browse tempo; random when unset
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            relay_url: "http://127.0.0.1:3000".to_string(),
            poll_interval_ms: 2_000,
            auto_browse_minutes: 5,
            home_feed_minutes: 10,
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn durations(&self) -> BrowseDurations {
        BrowseDurations {
            auto_browse: Duration::from_secs(self.auto_browse_minutes * 60),
            home_feed: Duration::from_secs(self.home_feed_minutes * 60),
        }
    }
}
