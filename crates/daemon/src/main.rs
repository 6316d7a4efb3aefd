// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fleet Warden Daemon (fwd)
//!
//! Background process that owns the fleet state and runs the periodic jobs.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::future::select_all;
use fw_adapters::{NatsTransport, TracedTransport};
use fw_daemon::{startup, Config, ConfigError, LifecycleError, DEFAULT_CONFIG_PATH, LOG_FILE_NAME};
use fw_engine::Job;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{error, info};

const USAGE: &str = "usage: fwd [--config <path>] [--check-config]";

/// Startup marker prefix written to log before anything else.
/// Full format: "--- fwd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- fwd: starting (pid: ";

#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    check_config: bool,
    help: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Args::default();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => match args.next() {
                    Some(path) => parsed.config = Some(PathBuf::from(path)),
                    None => return Err("--config needs a path".to_string()),
                },
                "--check-config" => parsed.check_config = true,
                "--help" | "-h" => parsed.help = true,
                other => return Err(format!("unexpected argument '{other}'")),
            }
        }
        Ok(parsed)
    }

    /// An explicit path must exist; the default one may be absent
    fn load_config(&self) -> Result<Config, ConfigError> {
        match &self.config {
            Some(path) => Config::load(path),
            None => Config::load_or_default(Path::new(DEFAULT_CONFIG_PATH)),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match Args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("fwd: {msg}\n{USAGE}");
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let config = args.load_config();
    if args.check_config {
        match config {
            Ok(_) => {
                println!("config ok");
                return Ok(());
            }
            Err(e) => {
                eprintln!("fwd: {e}");
                std::process::exit(2);
            }
        }
    }
    let config = config?;

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;
    let log_guard = setup_logging(&config)?;

    info!(
        url = %config.transport.url,
        state = %config.state.dir.display(),
        "Starting fwd"
    );

    let transport = TracedTransport::new(NatsTransport::new(config.nats_options()));
    let mut daemon = match startup(&config, transport).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let mut ticks: Vec<(Job, Interval)> = config
        .intervals
        .schedule()
        .into_iter()
        .map(|(job, period)| (job, ticker(period)))
        .collect();

    info!(jobs = ticks.len(), "Daemon ready");

    loop {
        tokio::select! {
            job = next_job(&mut ticks) => {
                // The job runner logs every outcome
                let _ = daemon.run_job(&job).await;
            }

            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading fleet");
                if let Err(e) = daemon.reload().await {
                    error!("Reload failed, keeping previous fleet: {}", e);
                }
            }

            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                daemon.shutdown();
                break;
            }

            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down...");
                daemon.shutdown();
                break;
            }
        }
    }

    info!("Daemon stopped");
    drop(log_guard);
    Ok(())
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Wait for the next job whose interval fires
async fn next_job(ticks: &mut [(Job, Interval)]) -> Job {
    let (_, index, _) = select_all(ticks.iter_mut().map(|(_, t)| Box::pin(t.tick()))).await;
    ticks[index].0.clone()
}

/// Append the startup marker to the log file
fn write_startup_marker(config: &Config) -> std::io::Result<()> {
    use std::io::Write;

    std::fs::create_dir_all(&config.state.dir)?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.state.log_path())?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.state.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> std::io::Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    std::fs::create_dir_all(&config.state.dir)?;
    let file_appender = tracing_appender::rolling::never(&config.state.dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
