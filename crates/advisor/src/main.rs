//! Rightsize Advisor - container sizing recommendation service
//!
//! Accepts per-container metric series over HTTP and answers with
//! short/medium/long term CPU and memory recommendations.

use anyhow::{Context, Result};
use engine_lib::{build_engine, EngineMetrics, StructuredLogger};
use rightsize_advisor::{api, config::AdvisorConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ADVISOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting rightsize-advisor");

    let config = AdvisorConfig::load()?;
    let kind = config.engine_kind()?;
    info!(
        service_name = %config.service_name,
        engine = kind.key(),
        sub_categories = config.policy.sub_categories.len(),
        "Advisor configured"
    );

    let engine = build_engine(kind, config.engine_config.clone(), config.policy.clone())
        .context("Failed to build recommendation engine")?;

    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);
    logger.log_startup(ADVISOR_VERSION, kind.key());

    let app_state = Arc::new(api::AppState::new(
        Arc::from(engine),
        metrics,
        logger.clone(),
    ));

    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    tokio::select! {
        result = api_handle => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(err)) => {
                    error!(error = %err, "API server failed");
                    logger.log_shutdown("API server failed");
                    return Err(err);
                }
                Err(err) => {
                    logger.log_shutdown("API server task panicked");
                    return Err(err.into());
                }
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for shutdown signal")?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
