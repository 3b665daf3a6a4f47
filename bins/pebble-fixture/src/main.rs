use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use fileops_fixture::{FixtureConfig, FixtureRunner, ReadinessProbeConfig};

/// Start Pebble, run a test command against it, then kill Pebble.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Pebble binary (overrides config)
    #[arg(long, value_name = "BIN")]
    pebble: Option<String>,

    /// Working directory handed to Pebble as $PEBBLE (overrides config)
    #[arg(long, value_name = "DIR")]
    workdir: Option<PathBuf>,

    /// Address for `pebble run --http` (overrides config)
    #[arg(long, value_name = "ADDR")]
    http: Option<String>,

    /// Settle delay in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    settle: Option<u64>,

    /// Delay before teardown in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    teardown_delay: Option<u64>,

    /// Probe this URL once after settling; tests don't run if it fails
    #[arg(long, value_name = "URL")]
    probe: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Test command and its arguments
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug)?;

    let config = build_config(&args)?;
    info!(
        "Fixture: {} in {} on {}",
        config.pebble_binary,
        config.working_directory.display(),
        config.http_address
    );

    let mut runner = FixtureRunner::new(config);
    let interrupted = tokio::select! {
        code = runner.run(&args.command) => Ok(code),
        signal = shutdown_signal() => Err(signal),
    };
    let code = match interrupted {
        Ok(code) => code,
        Err(signal) => {
            warn!("Interrupted by signal {}; tearing down", signal);
            runner.teardown().await;
            128 + signal
        }
    };

    std::process::exit(code);
}

fn build_config(args: &Args) -> Result<FixtureConfig> {
    let mut config = match &args.config {
        Some(path) => FixtureConfig::load_from_file(path)?,
        None => FixtureConfig::default(),
    };

    if let Some(pebble) = &args.pebble {
        config.pebble_binary = pebble.clone();
    }
    if let Some(workdir) = &args.workdir {
        config.working_directory = workdir.clone();
    }
    if let Some(http) = &args.http {
        config.http_address = http.clone();
    }
    if let Some(ms) = args.settle {
        config.settle_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = args.teardown_delay {
        config.teardown_delay = Duration::from_millis(ms);
    }
    if let Some(url) = &args.probe {
        let probe = config.readiness_probe.get_or_insert_with(ReadinessProbeConfig::default);
        probe.endpoint = Some(url.clone());
    }

    config.validate()?;
    Ok(config)
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Resolves with the number of the first SIGINT or SIGTERM received.
async fn shutdown_signal() -> i32 {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("Failed to create SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("Failed to create SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("Received SIGTERM signal");
            15
        }
        _ = sigint.recv() => {
            info!("Received SIGINT signal");
            2
        }
    }
}
