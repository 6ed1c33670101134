//! # Mecanum Teleop
//!
//! Drive a mecanum-wheeled robot from a game controller over TCP.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use mecanum_teleop::config::{Config, LoggingConfig, Overrides};
use mecanum_teleop::control_loop::{ControlLoop, LoopSettings};
use mecanum_teleop::controller::hotplug::EvdevInputSource;
use mecanum_teleop::controller::mapper::InputMapper;
use mecanum_teleop::link::resolver::{resolve_target, resolver_for};
use mecanum_teleop::link::CommandLink;

/// File name prefix for daily log files
const LOG_FILE_NAME: &str = "mecanum-teleop.log";

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "mecanum-teleop", version, about)]
struct Args {
    /// Configuration file (default: config/default.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Robot IP address or hostname
    #[arg(long)]
    host: Option<String>,

    /// Robot TCP port
    #[arg(short, long)]
    port: Option<u16>,

    /// Robot MAC address, looked up in the neighbor table
    #[arg(long, value_name = "MAC")]
    mac: Option<String>,

    /// Wheel power scale, 0.0 exclusive to 1.0
    #[arg(long)]
    max_speed: Option<f32>,

    /// Stick deadzone, 0.0 to 1.0 exclusive
    #[arg(long)]
    deadzone: Option<f32>,

    /// Control loop rate in Hz
    #[arg(long, value_name = "HZ")]
    rate: Option<u32>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            host: self.host.clone(),
            port: self.port,
            mac_address: self.mac.clone(),
            max_speed: self.max_speed,
            deadzone: self.deadzone,
            loop_rate_hz: self.rate,
            log_level: self.log_level.clone(),
        }
    }
}

/// Install the tracing subscriber
///
/// `RUST_LOG` directives take precedence over the configured level. When a
/// log directory is configured, output goes to a daily rolling file instead
/// of stdout; the returned guard must be held until exit.
fn init_logging(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: Level = logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", logging.level))?;
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if logging.directory.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&logging.directory, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// Main entry point for Mecanum Teleop
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Parse arguments, load and validate configuration
///    - Set up logging
///    - Resolve the robot address (fatal on failure)
///
/// 2. **Main Loop**
///    - Read the active controller at the configured rate (default 30 Hz)
///    - Send one 4-byte frame per tick, reconnecting when the link drops
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or the robot address cannot
/// be resolved. Nothing after startup ends the program except a quit request.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_with_overrides(args.config.as_deref(), &args.overrides())
        .context("Failed to load configuration")?;
    let _log_guard = init_logging(&config.logging)?;

    info!("Mecanum Teleop v{} starting...", env!("CARGO_PKG_VERSION"));

    let registry = config
        .profile_registry()
        .context("Invalid controller profile")?;
    info!("{} controller profiles loaded", registry.len());

    let target = resolve_target(resolver_for(&config.link).as_ref(), config.link.port)
        .context("Failed to resolve robot address")?;

    let source = EvdevInputSource::new(Duration::from_millis(config.control.rescan_interval_ms));
    let link = CommandLink::tcp(Duration::from_millis(config.link.connect_timeout_ms));

    let (quit_tx, quit_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
        let _ = quit_tx.send(true);
    });

    info!("Press Ctrl+C to exit");
    let mut control = ControlLoop::new(
        source,
        InputMapper::new(registry),
        link,
        target,
        LoopSettings::from_config(&config),
        quit_rx,
    );
    let stats = control.run().await;
    info!("Total frames sent: {}", stats.frames_sent);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_args_to_overrides() {
        let args = Args::parse_from([
            "mecanum-teleop",
            "--host",
            "192.168.1.42",
            "-p",
            "10000",
            "--max-speed",
            "0.5",
            "--deadzone",
            "0.1",
            "--rate",
            "50",
            "--log-level",
            "debug",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.host.as_deref(), Some("192.168.1.42"));
        assert_eq!(overrides.port, Some(10000));
        assert_eq!(overrides.max_speed, Some(0.5));
        assert_eq!(overrides.deadzone, Some(0.1));
        assert_eq!(overrides.loop_rate_hz, Some(50));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert!(overrides.mac_address.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_defaults_are_empty() {
        let args = Args::parse_from(["mecanum-teleop"]);
        let overrides = args.overrides();
        assert!(overrides.host.is_none());
        assert!(overrides.port.is_none());
        assert!(overrides.max_speed.is_none());
    }

    #[test]
    fn test_args_reject_bad_port() {
        assert!(Args::try_parse_from(["mecanum-teleop", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(LOG_FILE_NAME, "mecanum-teleop.log");
    }
}
