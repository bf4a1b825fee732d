//! Controller-side commands talking to a running relay.

use std::time::Duration;

use anyhow::{Context, Result};
use browse_relay::Config;
use clap::Args;
use command_dispatcher::HttpRelayClient;
use serde::Serialize;
use serde_json::Value;

#[derive(Args, Clone, Debug)]
pub struct RelayTarget {
    /// Relay base URL (defaults to agent.relay_url from config)
    #[arg(long)]
    pub relay_url: Option<String>,
}

impl RelayTarget {
    fn client(&self, config: &Config) -> Result<HttpRelayClient> {
        let url = self
            .relay_url
            .clone()
            .unwrap_or_else(|| config.agent.relay_url.clone());
        HttpRelayClient::new(url).context("failed to create relay client")
    }
}

#[derive(Args, Clone, Debug)]
pub struct SendArgs {
    /// Command kind, e.g. search or startAutoBrowse
    pub kind: String,

    /// Command payload as JSON
    #[arg(long)]
    pub data: Option<String>,

    /// Wait up to this many seconds for the result
    #[arg(long, value_name = "SECS")]
    pub wait: Option<u64>,

    #[command(flatten)]
    pub target: RelayTarget,
}

#[derive(Args, Clone, Debug)]
pub struct HistoryArgs {
    /// Number of most recent results to show
    #[arg(long)]
    pub limit: Option<usize>,

    #[command(flatten)]
    pub target: RelayTarget,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn cmd_send(args: SendArgs, config: &Config) -> Result<()> {
    let data: Value = match args.data.as_deref() {
        Some(raw) => serde_json::from_str(raw).context("--data must be valid JSON")?,
        None => Value::Object(Default::default()),
    };
    let client = args.target.client(config)?;
    let command_id = client
        .send(&args.kind, data)
        .await
        .context("failed to queue command")?;
    println!("queued {} as {}", args.kind, command_id);

    if let Some(secs) = args.wait {
        match client
            .wait_result(&command_id, Duration::from_secs(secs))
            .await
            .context("failed to wait for result")?
        {
            Some(result) => print_json(&result)?,
            None => println!("no result within {}s", secs),
        }
    }
    Ok(())
}

pub async fn cmd_status(target: RelayTarget, config: &Config) -> Result<()> {
    let status = target
        .client(config)?
        .status()
        .await
        .context("failed to read relay status")?;
    print_json(&status)
}

pub async fn cmd_history(args: HistoryArgs, config: &Config) -> Result<()> {
    let history = args
        .target
        .client(config)?
        .history(args.limit)
        .await
        .context("failed to read history")?;
    print_json(&history)
}

pub async fn cmd_catalog(target: RelayTarget, config: &Config) -> Result<()> {
    let catalog = target
        .client(config)?
        .catalog()
        .await
        .context("failed to read command catalog")?;
    print_json(&catalog)
}
