//! CLI runner for common setup.
//!
//! Encapsulates config loading, logging initialization, the tokio runtime and
//! the Ctrl+C handler so command handlers stay short.

use std::path::Path;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;

use sealane::config::ConfigFile;
use sealane::logging::{init_logging_full, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Keeps the log file writer alive while the runner exists
    _logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Load the config file (or defaults) and initialize logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to use instead of `~/.sealane/config.ini`
    /// * `debug_mode` - When true, enables debug-level logging regardless of RUST_LOG
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let logging_guard =
            init_logging_full(&config.logging.directory, &config.logging.file, debug_mode)
                .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Sealane v{}", sealane::VERSION);
        info!(
            command,
            log_dir = %self.config.logging.directory.display(),
            "Sealane CLI started"
        );
    }

    /// Multi-threaded runtime for the command's async work.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        Runtime::new().map_err(|e| CliError::Runtime(e.to_string()))
    }

    /// Token cancelled on Ctrl+C.
    pub fn shutdown_token(&self) -> Result<CancellationToken, CliError> {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();

        ctrlc::set_handler(move || {
            info!("Shutdown requested");
            on_signal.cancel();
        })
        .map_err(|e| CliError::Runtime(format!("Failed to set signal handler: {}", e)))?;

        Ok(cancel)
    }
}
