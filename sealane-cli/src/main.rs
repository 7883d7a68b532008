//! Sealane CLI - Command-line interface
//!
//! Runs the GPS relay on the boat's laptop and a terminal monitor that follows
//! the relayed feed, optionally against a planned route.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::{init, monitor, relay};
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "sealane")]
#[command(version = sealane::VERSION)]
#[command(about = "Live GPS relay and route delay monitor", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.sealane/config.ini
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable debug logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay a TCP GPS source (GPS2IP, SensorLog) to WebSocket subscribers
    Relay(relay::RelayArgs),

    /// Follow a relay and print fixes, delay and throttle alert
    Monitor(monitor::MonitorArgs),

    /// Create the configuration file with default settings
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        e.exit();
    }
}

fn dispatch(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => init::run(config_path, force),
        Commands::Relay(args) => relay::run(args, CliRunner::new(config_path, cli.debug)?),
        Commands::Monitor(args) => monitor::run(args, CliRunner::new(config_path, cli.debug)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_relay_flags() {
        let cli = Cli::parse_from([
            "sealane",
            "relay",
            "--host",
            "10.0.0.2",
            "--port",
            "11123",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Relay(args) => {
                assert_eq!(args.host.as_deref(), Some("10.0.0.2"));
                assert_eq!(args.port, Some(11123));
                assert_eq!(args.format, Some(commands::common::FormatArg::Json));
            }
            _ => panic!("expected relay command"),
        }
    }

    #[test]
    fn test_parse_monitor_route() {
        let cli = Cli::parse_from([
            "sealane",
            "--debug",
            "monitor",
            "--waypoint",
            "-33.85,151.21",
            "--waypoint",
            "-33.84,151.25",
            "--start",
            "09:30",
            "--speed",
            "6",
        ]);
        assert!(cli.debug);
        match cli.command {
            Commands::Monitor(args) => {
                assert_eq!(args.waypoints.len(), 2);
                assert_eq!(args.waypoints[0].latitude, -33.85);
                assert_eq!(args.start.map(|t| t.hour), Some(9));
                assert_eq!(args.speed, Some(6.0));
            }
            _ => panic!("expected monitor command"),
        }
    }
}
