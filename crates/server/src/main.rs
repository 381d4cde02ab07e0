mod api;
mod bootstrap;
mod health;

use anyhow::Result;
use basketry_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use basketry_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        app.db_pool.clone(),
    )
    .await?;

    // Pre-warm the rule cache so the first recommendation request does not
    // pay for the initial mining pass.
    let prewarm_service = app.service.clone();
    tokio::spawn(async move {
        match prewarm_service.refresh_rules(false).await {
            Ok(summary) => tracing::info!(
                event_name = "system.server.rules_prewarmed",
                correlation_id = "bootstrap",
                rule_count = summary.rule_count,
                transaction_count = summary.transaction_count,
                "association rules primed at startup"
            ),
            Err(prewarm_error) => tracing::warn!(
                event_name = "system.server.prewarm_failed",
                correlation_id = "bootstrap",
                error = %prewarm_error,
                "initial mining pass failed; rules will be computed on demand"
            ),
        }
    });

    let api_task = api::spawn(
        &app.config.server.bind_address,
        app.config.server.api_port,
        app.service.clone(),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        "basketry-server started"
    );

    api_task.await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "basketry-server stopping"
    );

    Ok(())
}
