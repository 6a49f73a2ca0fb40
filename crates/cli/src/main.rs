//! Rightsize CLI
//!
//! Generates container sizing recommendations from a metric series file,
//! either locally or through a running rightsize advisor.

mod client;
mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use commands::recommend::{Backend, RecommendArgs};
use commands::{policy, recommend};
use engine_lib::EngineKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const DEFAULT_API_URL: &str = "http://localhost:8080";

/// Rightsize CLI
#[derive(Parser)]
#[command(name = "rsz")]
#[command(author, version, about = "CLI for the Rightsize recommendation engine", long_about = None)]
pub struct Cli {
    /// Advisor URL (can also be set via RSZ_API_URL env var)
    #[arg(long, env = "RSZ_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short)]
    pub format: Option<output::OutputFormat>,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate recommendations for a series file
    Recommend {
        /// Series JSON file (object keyed by RFC 3339 interval end time)
        #[arg(long, short)]
        input: PathBuf,

        /// Evaluation time (defaults to the latest interval in the series)
        #[arg(long)]
        end_time: Option<DateTime<Utc>>,

        /// Engine key (duration_based, capacity_based)
        #[arg(long, short)]
        engine: Option<String>,

        /// Container name shown in the output
        #[arg(long, short)]
        container: Option<String>,

        /// Ask the advisor at --api-url instead of running the engine locally
        #[arg(long)]
        remote: bool,
    },

    /// Check whether a series holds enough data for a recommendation
    Check {
        /// Series JSON file
        #[arg(long, short)]
        input: PathBuf,

        /// Engine key (duration_based, capacity_based)
        #[arg(long, short)]
        engine: Option<String>,

        /// Ask the advisor at --api-url instead of running the engine locally
        #[arg(long)]
        remote: bool,
    },

    /// Show the default sub-category policy
    Policy,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_engine(flag: Option<String>, config: &config::Config) -> Result<EngineKind> {
    match flag.or_else(|| config.engine.clone()) {
        Some(key) => EngineKind::from_key(&key).context("Invalid engine"),
        None => Ok(EngineKind::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = config::Config::load()?;

    let format = match (cli.format, config.default_format.as_deref()) {
        (Some(format), _) => format,
        (None, Some(name)) => output::OutputFormat::from_str(name, true)
            .map_err(|e| anyhow::anyhow!("Invalid default_format in config: {}", e))?,
        (None, None) => output::OutputFormat::default(),
    };
    let api_url = cli
        .api_url
        .or_else(|| config.api_url.clone())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    match cli.command {
        Commands::Recommend {
            input,
            end_time,
            engine,
            container,
            remote,
        } => {
            let args = RecommendArgs {
                input: &input,
                container_name: container.as_deref(),
                end_time,
            };
            if remote {
                let client = client::ApiClient::new(&api_url)?;
                recommend::recommend(Backend::Remote(&client), args, format).await?;
            } else {
                let kind = resolve_engine(engine, &config)?;
                recommend::recommend(Backend::Local(kind), args, format).await?;
            }
        }
        Commands::Check {
            input,
            engine,
            remote,
        } => {
            if remote {
                let client = client::ApiClient::new(&api_url)?;
                recommend::check(Backend::Remote(&client), &input, format).await?;
            } else {
                let kind = resolve_engine(engine, &config)?;
                recommend::check(Backend::Local(kind), &input, format).await?;
            }
        }
        Commands::Policy => {
            policy::show_policy(format)?;
        }
    }

    Ok(())
}
