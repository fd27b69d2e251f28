mod bootstrap;
mod builtin;
mod health;

use anyhow::Result;
use chatops_core::{
    config::{AppConfig, LoadOptions},
    Bot,
};

fn init_logging(config: &AppConfig) {
    use chatops_core::config::LogFormat::*;
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
    // Logging depends on the loaded config, so nothing may log before this.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let processors = builtin::processors(&config.bot);
    let app = bootstrap::bootstrap_with_config(config, &processors)?;

    health::spawn(
        &app.config.server.bind_address,
        app.config.server.health_check_port,
        health::HealthState::new(app.registry.clone(), app.meter.clone()),
    )
    .await?;

    tracing::info!(
        event_name = "system.server.started",
        bot = app.bot.name(),
        commands = app.registry.len(),
        slack_debug = app.config.slack.debug,
        "chatops-server started"
    );
    let summary = app.slack_runner.start().await;
    tracing::info!(
        event_name = "system.socket.finished",
        sessions = summary.sessions,
        dispatched = summary.dispatched,
        "socket mode runner finished"
    );

    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        total_requests = app.meter.total(),
        "chatops-server stopping"
    );

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
