//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use sealane::config::ConfigFileError;
use sealane::relay::RelayError;
use sealane::route::RouteError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file error
    Config(ConfigFileError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to start the async runtime or signal handler
    Runtime(String),
    /// Relay stopped with an error
    Relay(RelayError),
    /// Route or planned speed rejected
    Route(RouteError),
    /// Listener gave up reconnecting
    FeedHalted { url: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Relay(RelayError::SourceUnreachable { .. }) => {
                eprintln!();
                eprintln!("Check that:");
                eprintln!("  1. The GPS app (GPS2IP, SensorLog) is running in TCP server mode");
                eprintln!("  2. Phone and computer are on the same network");
                eprintln!("  3. --host and --port match the address shown in the app");
            }
            CliError::Relay(RelayError::Bind { .. }) => {
                eprintln!();
                eprintln!("Another relay may already be running. Try --listen-port.");
            }
            CliError::FeedHalted { .. } => {
                eprintln!();
                eprintln!("Is the relay running? Start it with: sealane relay");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to start: {}", msg),
            CliError::Relay(e) => write!(f, "Relay error: {}", e),
            CliError::Route(e) => write!(f, "Route error: {}", e),
            CliError::FeedHalted { url } => {
                write!(f, "Lost the feed at {} after all reconnection attempts", url)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Relay(e) => Some(e),
            CliError::Route(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<RelayError> for CliError {
    fn from(e: RelayError) -> Self {
        CliError::Relay(e)
    }
}

impl From<RouteError> for CliError {
    fn from(e: RouteError) -> Self {
        CliError::Route(e)
    }
}
