//! Flight price alert: binary entrypoint.
//! `watch` loops until Ctrl-C, `once` runs a single cycle (cron / CI),
//! `serve` exposes the HTTP control surface, `check-config` validates only.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;

use flight_price_alert::api::{self, AppState};
use flight_price_alert::config::{env, file, Config};
use flight_price_alert::error::ConfigError;
use flight_price_alert::monitor::{CycleOutcome, Monitor, RunMode};
use flight_price_alert::service::{MonitorHandle, MonitorParts};
use flight_price_alert::{airports, logging, metrics};

#[derive(Parser)]
#[command(name = "flight-price-alert", version, about)]
struct Cli {
    /// Config file (TOML or JSON). Defaults to $FLIGHT_ALERT_CONFIG,
    /// config/flight_alert.toml, config/flight_alert.json, then the environment.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ignore config files and read DATE_TO_GO, PLACE_FROM, ... from the environment.
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Subcommand)]
enum Cmd {
    /// Poll until interrupted (default).
    Watch,
    /// Run exactly one cycle and exit.
    Once,
    /// Serve the HTTP control surface.
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Validate the configuration and print it.
    CheckConfig,
}

fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    if cli.env {
        return env::load_from_env();
    }
    match file::locate(cli.config.as_deref())? {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading config file");
            file::load_from(&path)
        }
        None => env::load_from_env(),
    }
}

/// Flip the cancel flag on Ctrl-C.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupted, stopping after the current step");
                let _ = tx.send(true);
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot listen for Ctrl-C");
                // Keep the sender alive; a dropped sender reads as cancellation.
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}

async fn run_monitor(config: Config, mode: RunMode) -> ExitCode {
    let parts = match MonitorParts::production(&config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "cannot build monitor");
            return ExitCode::FAILURE;
        }
    };
    if parts.notifier.is_empty() {
        tracing::warn!("no notification channel configured; alerts are only logged");
    }

    let mut monitor = Monitor::new(config, parts.source, parts.notifier, parts.store).await;
    match monitor.run(mode, cancel_on_ctrl_c()).await {
        // A single-shot run that could not fetch is reported to the scheduler.
        Some(CycleOutcome::FetchFailed(_)) if mode == RunMode::Once => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

async fn serve(cli: &Cli, bind: SocketAddr) -> anyhow::Result<()> {
    let _ = metrics::prometheus();
    let config_file = file::save_target(cli.config.as_deref());

    let config = match load_config(cli) {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::warn!(error = %e, "starting unconfigured; PUT /config to configure");
            None
        }
    };

    let handle = MonitorHandle::spawn(
        config,
        Arc::new(MonitorParts::production),
        Some(config_file),
    );
    let router = api::create_router(AppState {
        monitor: handle.clone(),
    });

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(%bind, "control surface listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = handle.stop().await;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();
    logging::init();
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "unexpected fault");
    }));

    let cli = Cli::parse();
    let command = cli.command.as_ref().unwrap_or(&Cmd::Watch);

    let mode = match command {
        Cmd::Serve { bind } => {
            return match serve(&cli, *bind).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), "control surface failed");
                    ExitCode::FAILURE
                }
            };
        }
        Cmd::Watch => Some(RunMode::UntilCancelled),
        Cmd::Once => Some(RunMode::Once),
        Cmd::CheckConfig => None,
    };

    let config = match load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("configuration error: {e}");
            return ExitCode::from(2);
        }
    };

    match mode {
        Some(mode) => run_monitor(config, mode).await,
        None => {
            println!(
                "route: {} → {}",
                airports::label(&config.route.origin),
                airports::label(&config.route.destination)
            );
            match serde_json::to_string_pretty(&config) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("cannot render config: {e}"),
            }
            ExitCode::SUCCESS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["flight-price-alert", "serve", "--bind", "0.0.0.0:9090"]).unwrap();
        match cli.command {
            Some(Cmd::Serve { bind }) => assert_eq!(bind.port(), 9090),
            _ => panic!("expected serve"),
        }

        let cli = Cli::try_parse_from(["flight-price-alert", "once", "--config", "a.toml"]).unwrap();
        assert!(matches!(cli.command, Some(Cmd::Once)));
        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("a.toml")));

        let cli = Cli::try_parse_from(["flight-price-alert"]).unwrap();
        assert!(cli.command.is_none(), "no subcommand means watch");
    }
}
