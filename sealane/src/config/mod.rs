//! User configuration.
//!
//! Settings are read from `~/.sealane/config.ini`; every key is optional and
//! falls back to the defaults in [`defaults`]. [`ConfigFile`] converts the
//! file sections into the configs the relay, listener and estimator take.
//!
//! # Example
//!
//! ```
//! use sealane::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let relay = config.relay_config();
//! assert_eq!(relay.source_address(), "192.168.50.25:11123");
//! ```

mod convert;
pub mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, ListenerSettings, LoggingSettings, NavigationSettings, RelaySettings,
    SourceSettings,
};
