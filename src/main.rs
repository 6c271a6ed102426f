use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

mod cli;
mod config;
mod error;
mod metrics;
mod models;
mod services;

use cli::{AutostartAction, Command, CommandArgs, RunArgs};
use config::{Config, NotifierKind};
use services::{
    Autostart, DesktopNotifier, LogNotifier, LogProgress, MetricsProgress, Monitor,
    NotificationSink, SysinfoSampler,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandArgs::parse();
    match args.command {
        Some(Command::Autostart { action }) => autostart(action),
        Some(Command::Run) | None => monitor(&args.run).await,
    }
}

fn load_config(run: &RunArgs) -> Result<Config> {
    let mut config = match &run.config {
        Some(path) => Config::load(path)?,
        None => {
            let path = Config::config_path();
            if path.exists() {
                Config::load(&path).unwrap_or_else(|e| {
                    log::warn!("Failed to load config: {}, using defaults", e);
                    Config::default()
                })
            } else {
                log::info!("No config file found, using defaults");
                Config::default()
            }
        }
    };
    run.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn monitor(run: &RunArgs) -> Result<()> {
    let config = load_config(run)?;
    let sampler = Arc::new(SysinfoSampler::new(config.ignore_patterns()?));

    let notifier: Box<dyn NotificationSink> = match config.notifier {
        NotifierKind::Desktop => Box::new(DesktopNotifier::new()),
        NotifierKind::Log => Box::new(LogNotifier),
    };

    let mut monitor = Monitor::new(sampler, config.thresholds(), config.sample_interval())
        .with_indicator_steps(config.indicator_steps)
        .with_notifier(notifier)
        .with_progress(Box::new(LogProgress::default()));
    if let Some(path) = &config.metrics_file {
        log::info!("Writing metrics to {}", path.display());
        monitor = monitor.with_progress(Box::new(MetricsProgress::new(path)));
    }

    log::info!("🚀 CPU Watchdog v{} starting", env!("CARGO_PKG_VERSION"));

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    log::info!("👋 CPU Watchdog stopped");
    Ok(())
}

fn autostart(action: AutostartAction) -> Result<()> {
    let autostart = Autostart::for_current_user().context("failed to locate autostart entry")?;
    match action {
        AutostartAction::Enable => autostart.set_launch_on_login(true)?,
        AutostartAction::Disable => autostart.set_launch_on_login(false)?,
        AutostartAction::Status => {}
    }
    println!(
        "Run on login: {} ({})",
        if autostart.is_enabled() { "ON" } else { "OFF" },
        autostart.entry_path().display()
    );
    Ok(())
}
