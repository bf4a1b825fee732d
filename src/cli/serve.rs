use std::sync::Arc;

use anyhow::{Context, Result};
use browse_relay::Config;
use clap::Args;
use relay_command_store::CommandStore;
use relay_server::RelayState;
use tokio::net::TcpListener;
use tracing::info;

use super::runtime::shutdown_signal;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind (defaults to relay.host from config)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (defaults to relay.port from config)
    #[arg(long)]
    pub port: Option<u16>,
}

pub async fn cmd_serve(args: ServeArgs, config: &Config) -> Result<()> {
    let host = args.host.unwrap_or_else(|| config.relay.host.clone());
    let port = args.port.unwrap_or(config.relay.port);

    let store = Arc::new(CommandStore::with_history_capacity(
        config.relay.history_capacity,
    ));
    let listener = TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("failed to bind relay server on {}:{}", host, port))?;
    info!(
        history_capacity = store.history_capacity(),
        "Relay API available at http://{}:{}/api", host, port
    );

    relay_server::serve(listener, RelayState::new(store), shutdown_signal())
        .await
        .context("relay server exited unexpectedly")?;
    info!("relay server stopped");
    Ok(())
}
