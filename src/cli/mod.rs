pub mod agent;
pub mod client;
pub mod runtime;
pub mod serve;

pub use agent::{cmd_agent, AgentArgs};
pub use client::{cmd_catalog, cmd_history, cmd_send, cmd_status, HistoryArgs, RelayTarget, SendArgs};
pub use runtime::{init_logging, load_config, LoadedConfig};
pub use serve::{cmd_serve, ServeArgs};
