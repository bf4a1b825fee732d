use std::sync::Arc;

use anyhow::{Context, Result};
use browse_relay::agent::build_dispatcher;
use browse_relay::Config;
use clap::Args;
use command_dispatcher::{HttpRelayClient, TickerStart};
use page_adapter::{SimulatedPage, SimulatedPageConfig};
use tracing::{info, warn};

use super::runtime::shutdown_signal;

#[derive(Args, Clone, Debug)]
pub struct AgentArgs {
    /// Relay base URL (defaults to agent.relay_url from config)
    #[arg(long)]
    pub relay_url: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Seed for the browse tempo, for reproducible sessions
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Run the agent against the simulated page until Ctrl-C.
pub async fn cmd_agent(args: AgentArgs, config: &Config) -> Result<()> {
    let mut agent_config = config.agent.clone();
    if let Some(url) = args.relay_url {
        agent_config.relay_url = url;
    }
    if let Some(interval) = args.interval_ms {
        agent_config.poll_interval_ms = interval;
    }
    if args.seed.is_some() {
        agent_config.seed = args.seed;
    }

    let transport = HttpRelayClient::new(agent_config.relay_url.clone())
        .context("failed to create relay client")?;
    let page = Arc::new(SimulatedPage::new(SimulatedPageConfig::default()));
    let dispatcher = build_dispatcher(&agent_config, Arc::new(transport), page);

    if dispatcher.start_polling() == TickerStart::AlreadyActive {
        warn!("polling already active");
    }
    info!(
        relay = %agent_config.relay_url,
        interval_ms = dispatcher.poll_interval().as_millis() as u64,
        "agent polling started"
    );

    shutdown_signal().await;

    dispatcher.stop_polling();
    dispatcher.executor().session().stop();
    let metrics = dispatcher.metrics();
    info!(
        polls = metrics.polls,
        executed = metrics.executed,
        failed = metrics.failed,
        transport_errors = metrics.transport_errors,
        "agent stopped"
    );
    Ok(())
}
