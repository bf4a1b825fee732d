use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{debug, error, info};

mod cli;

use cli::{
    cmd_agent, cmd_catalog, cmd_history, cmd_send, cmd_serve, cmd_status, init_logging,
    load_config, AgentArgs, HistoryArgs, RelayTarget, SendArgs, ServeArgs,
};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_DATE"),
    ")"
);

/// Command relay server and autonomous browse agent
#[derive(Parser)]
#[command(author, version, long_version = LONG_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable debug mode
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay server
    Serve(ServeArgs),

    /// Poll the relay and execute commands against the simulated page
    Agent(AgentArgs),

    /// Queue a command on the relay
    Send(SendArgs),

    /// Show relay queue and history counts
    Status(RelayTarget),

    /// Show recent command results
    History(HistoryArgs),

    /// List the commands the agent recognizes
    Catalog(RelayTarget),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.debug)?;
    info!("Starting browse-relay v{}", LONG_VERSION);

    let loaded = load_config(cli.config.as_ref()).await?;
    debug!(path = %loaded.path.display(), config = ?loaded.config, "configuration resolved");
    let config = loaded.config;

    let result = match cli.command {
        Commands::Serve(args) => cmd_serve(args, &config).await,
        Commands::Agent(args) => cmd_agent(args, &config).await,
        Commands::Send(args) => cmd_send(args, &config).await,
        Commands::Status(target) => cmd_status(target, &config).await,
        Commands::History(args) => cmd_history(args, &config).await,
        Commands::Catalog(target) => cmd_catalog(target, &config).await,
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
