//! Reading and writing `~/.sealane/config.ini`.
//!
//! Key mapping is in [`super::parser`] and the commented output format in
//! [`super::writer`]; this module only deals with paths and I/O.

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::settings::ConfigFile;

/// Name of the per-user directory holding config and logs.
const CONFIG_DIR_NAME: &str = ".sealane";

const CONFIG_FILE_NAME: &str = "config.ini";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// The file exists but is not readable INI.
    #[error("Cannot read config file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Cannot write config file: {0}")]
    WriteError(String),

    /// A key holds a value the pipeline cannot use.
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Cannot create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load `~/.sealane/config.ini`, or the defaults when there is none.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. Keys not present keep their default values.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        super::parser::parse_ini(&Ini::load_from_file(path)?)
    }

    /// Write the settings to `path`, creating missing parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(ConfigFileError::DirectoryError)?;
        }
        std::fs::write(path, super::writer::to_config_string(self))
            .map_err(|e| ConfigFileError::WriteError(format!("{}: {}", path.display(), e)))
    }

    /// Write defaults to `path` unless a file is already there.
    ///
    /// With `overwrite` an existing file is replaced. Returns whether
    /// anything was written.
    pub fn write_defaults(path: &Path, overwrite: bool) -> Result<bool, ConfigFileError> {
        if path.exists() && !overwrite {
            return Ok(false);
        }
        Self::default().save_to(path)?;
        Ok(true)
    }
}

/// Per-user directory, `~/.sealane` (or `./.sealane` without a home).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::live_feed::{WireFormat, DEFAULT_FEED_URL};
    use crate::navigation::ThrottleShape;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConfigFile::default();

        assert_eq!(config.source.host, "192.168.50.25");
        assert_eq!(config.source.port, 11123);
        assert_eq!(config.source.format, WireFormat::Nmea);
        assert_eq!(config.relay.listen_port, 3001);
        assert_eq!(config.listener.url, DEFAULT_FEED_URL);
        assert_eq!(
            config.listener.max_reconnect_attempts,
            DEFAULT_MAX_RECONNECT_ATTEMPTS
        );
        assert_eq!(config.navigation.throttle_policy, ThrottleShape::Power);
        assert_eq!(config.navigation.throttle_threshold_secs, 300.0);
        assert_eq!(config.logging.file, DEFAULT_LOG_FILE);
        assert!(config.logging.directory.ends_with(".sealane/logs"));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.ini");

        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_unreadable_ini_is_read_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[source\nhost = boat.local\n").unwrap();

        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigFileError::ReadError(_))
        ));
    }

    #[test]
    fn test_save_to_nested_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("boat").join("config.ini");

        ConfigFile::default().save_to(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_defaults_respects_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[source]\nhost = boat.local\n").unwrap();

        assert!(!ConfigFile::write_defaults(&path, false).unwrap());
        assert_eq!(ConfigFile::load_from(&path).unwrap().source.host, "boat.local");

        assert!(ConfigFile::write_defaults(&path, true).unwrap());
        assert_eq!(ConfigFile::load_from(&path).unwrap(), ConfigFile::default());
    }

    #[test]
    fn test_config_file_path() {
        assert!(config_file_path().ends_with(".sealane/config.ini"));
    }
}
