//! Harbor CLI
//!
//! Browse containers, logs, lifecycle events and resource stats across
//! every configured Harbor agent.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use client::{parse_ago, Target};
use commands::{containers, logs, watch};
use harbor_lib::{ContainerAction, StdType};
use std::path::PathBuf;

/// Harbor: containers, logs, events and stats across hosts
#[derive(Parser)]
#[command(name = "harbor")]
#[command(author, version, about = "Container log and event viewer for Harbor agents", long_about = None)]
pub struct Cli {
    /// Config file listing agents (defaults to ~/.config/harbor/config.json)
    #[arg(long, env = "HARBOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only talk to this host
    #[arg(long = "host", short = 'H')]
    pub host: Option<String>,

    /// Output format (defaults to the config file's, then table)
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List hosts and whether they are reachable
    Hosts,

    /// List containers across hosts
    Ps {
        /// Include stopped containers
        #[arg(long, short)]
        all: bool,
    },

    /// Show container logs
    Logs {
        /// HOST/CONTAINER
        target: Target,

        /// Start this long ago, e.g. 10m or 2h
        #[arg(long)]
        since: Option<String>,

        /// Stop this long ago; without it logs are followed
        #[arg(long)]
        until: Option<String>,

        /// Which output streams to show
        #[arg(long, value_enum, default_value = "all")]
        stream: StreamChoice,

        /// Print the runtime's bytes without parsing
        #[arg(long)]
        raw: bool,
    },

    /// Follow container lifecycle events
    Events,

    /// Follow resource usage samples
    Stats,

    /// Start a container
    Start {
        /// HOST/CONTAINER
        target: Target,
    },

    /// Stop a container
    Stop {
        /// HOST/CONTAINER
        target: Target,
    },

    /// Restart a container
    Restart {
        /// HOST/CONTAINER
        target: Target,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StreamChoice {
    Stdout,
    Stderr,
    All,
}

impl From<StreamChoice> for StdType {
    fn from(choice: StreamChoice) -> Self {
        match choice {
            StreamChoice::Stdout => StdType::STDOUT,
            StreamChoice::Stderr => StdType::STDERR,
            StreamChoice::All => StdType::ALL,
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let config = config::Config::load(cli.config.as_deref())?;
    let multi = client::connect(&config, cli.host.as_deref()).await?;
    let format = match cli.format {
        Some(format) => format,
        None => config.default_format()?,
    };

    match cli.command {
        Commands::Hosts => containers::show_hosts(&multi, format).await?,
        Commands::Ps { all } => containers::list_containers(&multi, all, format).await?,
        Commands::Logs {
            target,
            since,
            until,
            stream,
            raw,
        } => {
            let args = logs::LogsArgs {
                since: since.as_deref().map(parse_ago).transpose()?,
                until: until.as_deref().map(parse_ago).transpose()?,
                streams: stream.into(),
                raw,
            };
            logs::show_logs(&multi, &target, args, format).await?;
        }
        Commands::Events => watch::watch_events(&multi, format).await?,
        Commands::Stats => watch::watch_stats(&multi, format).await?,
        Commands::Start { target } => {
            containers::run_action(&multi, &target, ContainerAction::Start).await?
        }
        Commands::Stop { target } => {
            containers::run_action(&multi, &target, ContainerAction::Stop).await?
        }
        Commands::Restart { target } => {
            containers::run_action(&multi, &target, ContainerAction::Restart).await?
        }
    }

    Ok(())
}
