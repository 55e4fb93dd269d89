//! ---
//! ldhrs_section: "01-core-functionality"
//! ldhrs_subsection: "binary"
//! ldhrs_type: "source"
//! ldhrs_scope: "code"
//! ldhrs_description: "Binary entrypoint for the LDHRS controller daemon."
//! ldhrs_version: "v0.0.0-prealpha"
//! ldhrs_owner: "tbd"
//! ---
mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ldhrs_common::{init_tracing, AppConfig, OperatorSession, OracleMode};
use ldhrs_core::{ControllerClient, SafetyView, SystemState, TelemetryController};
use ldhrs_metrics::{new_registry, spawn_http_server, DaemonMetrics, SharedRegistry};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::console::{ConsoleCommand, HELP};

#[derive(Debug, Parser)]
#[command(
    author,
    version = concat!("LDHRS ", env!("CARGO_PKG_VERSION")),
    about = "LDHRS solar tracker telemetry and safety controller",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(long, env = "LDHRS_OPERATOR_EMAIL", help = "Operator email used to log in")]
    email: Option<String>,

    #[arg(
        long,
        env = "LDHRS_OPERATOR_PASSWORD",
        hide_env_values = true,
        help = "Operator password"
    )]
    password: Option<String>,

    #[arg(long, help = "Use the built-in offline oracle instead of the HTTP backend")]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Run the controller with an operator console on stdin")]
    Run,
    #[command(about = "Load and validate the configuration, then exit")]
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut candidates = Vec::new();
    if let Some(path) = &cli.config {
        candidates.push(path.clone());
    }
    candidates.push(PathBuf::from("configs/ldhrs.toml"));
    candidates.push(PathBuf::from("configs/example.toml"));

    let load_started = Instant::now();
    let loaded_config = AppConfig::load_with_source(&candidates)?;
    let mut config = loaded_config.config;
    let config_path = loaded_config.source;
    let load_duration = load_started.elapsed();
    if cli.offline {
        config.oracle.mode = OracleMode::Offline;
    }

    init_tracing("ldhrsd", &config.logging)?;
    match &config_path {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => info!("no configuration file found; running with defaults"),
    }

    let metrics_registry = new_registry();
    let daemon_metrics = DaemonMetrics::new(metrics_registry.clone())?;
    daemon_metrics.observe_config_load(load_duration.as_secs_f64());
    daemon_metrics.inc_start();
    daemon_metrics.set_build_info(env!("CARGO_PKG_VERSION"), build_profile());

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let session = OperatorSession::login(
                cli.email.as_deref().unwrap_or_default(),
                cli.password.as_deref().unwrap_or_default(),
            )
            .context("operator login rejected")?;
            info!(operator = %session.identity(), "operator logged in");
            run_daemon(config, session, metrics_registry).await?;
        }
        Commands::CheckConfig => {
            config.validate()?;
            println!(
                "{}",
                json!({
                    "source": config_path.map(|path| path.display().to_string()),
                    "telemetry_interval_ms": config.controller.telemetry_interval_ms.as_millis() as u64,
                    "weather_interval_secs": config.weather.poll_interval_secs.as_secs(),
                    "location": config.weather.location,
                    "oracle_mode": config.oracle.mode,
                    "metrics_enabled": config.metrics.enabled,
                })
            );
        }
    }

    Ok(())
}

async fn run_daemon(
    config: AppConfig,
    session: OperatorSession,
    metrics_registry: SharedRegistry,
) -> Result<()> {
    let metrics_settings = config.metrics.clone();
    let metrics_server = if metrics_settings.enabled {
        info!(address = %metrics_settings.listen, "metrics exporter enabled");
        Some(spawn_http_server(metrics_registry.clone(), metrics_settings.listen)?)
    } else {
        info!("metrics exporter disabled by configuration");
        None
    };

    let oracle = ldhrs_oracle::from_config(&config.oracle)
        .context("failed to build oracle client; pass --offline to run without one")?;
    if config.oracle.mode == OracleMode::Http && config.oracle.api_key().is_none() {
        warn!(
            env = %config.oracle.api_key_env,
            "oracle api key not set; weather polls will fail and audits will fall back"
        );
    }
    info!(mode = ?config.oracle.mode, "oracle ready");

    let controller = TelemetryController::new(config, oracle, Some(metrics_registry));
    let handle = controller.start().await?;

    let mut printers = JoinSet::new();
    printers.spawn(print_snapshots(handle.client()));
    printers.spawn(print_audits(handle.client()));

    info!("daemon running; reading console commands from stdin");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut console_open = true;
    loop {
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("ctrl-c received; shutting down");
                break;
            }
            line = lines.next_line(), if console_open => {
                match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => {
                        if !dispatch(&handle, &session, &line).await {
                            info!("quit requested; shutting down");
                            break;
                        }
                    }
                    None => {
                        info!("console closed; waiting for termination signal");
                        console_open = false;
                    }
                }
            }
        }
    }

    printers.abort_all();
    handle.shutdown().await?;
    session.logout();

    if let Some(server) = metrics_server {
        server.shutdown().await?;
    }
    Ok(())
}

/// Run one console line. Returns `false` when the operator asked to quit.
async fn dispatch(client: &ControllerClient, session: &OperatorSession, line: &str) -> bool {
    let command = match line.parse::<ConsoleCommand>() {
        Ok(command) => command,
        Err(err) => {
            emit(json!({ "kind": "error", "message": err.to_string() }));
            return true;
        }
    };
    let reply = match command {
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Help => Ok(json!({ "kind": "help", "message": HELP })),
        ConsoleCommand::Status => Ok(snapshot_event(&client.snapshot())),
        ConsoleCommand::Angle { axis, degrees } => client
            .set_angle(axis, degrees)
            .await
            .map(|outcome| json!({ "kind": "reply", "command": "angle", "outcome": outcome })),
        ConsoleCommand::Lock => client
            .toggle_child_lock()
            .await
            .map(|value| json!({ "kind": "reply", "command": "lock", "child_lock": value })),
        ConsoleCommand::Auto => client
            .toggle_auto_track()
            .await
            .map(|value| json!({ "kind": "reply", "command": "auto", "auto_track": value })),
        ConsoleCommand::Shutdown => client
            .toggle_shutdown()
            .await
            .map(|value| json!({ "kind": "reply", "command": "shutdown", "shut_down": value })),
        ConsoleCommand::Audit => client
            .request_audit(session.identity())
            .await
            .map(|request| json!({ "kind": "reply", "command": "audit", "request": request })),
    };
    match reply {
        Ok(event) => emit(event),
        Err(err) => {
            warn!(error = %err, "console command failed");
            emit(json!({ "kind": "error", "message": err.to_string() }));
        }
    }
    true
}

async fn print_snapshots(client: ControllerClient) {
    let mut rx = client.subscribe();
    loop {
        let state = rx.borrow_and_update().clone();
        emit(snapshot_event(&state));
        if rx.changed().await.is_err() {
            break;
        }
    }
}

async fn print_audits(client: ControllerClient) {
    let mut rx = client.audit();
    while rx.changed().await.is_ok() {
        let audit = rx.borrow_and_update().clone();
        emit(json!({ "kind": "audit", "audit": audit }));
    }
}

fn snapshot_event(state: &Arc<SystemState>) -> serde_json::Value {
    json!({
        "kind": "snapshot",
        "state": state.as_ref(),
        "view": SafetyView::evaluate(state),
    })
}

fn emit(event: serde_json::Value) {
    println!("{event}");
}

fn build_profile() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    }
}
