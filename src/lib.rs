//! browse-relay library
//!
//! Configuration and agent wiring shared by the binary and integration tests.

pub mod agent;
pub mod config;

pub use config::{AgentConfig, Config, RelayConfig};
