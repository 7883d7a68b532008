//! Init command - write the default configuration file.

use std::path::Path;

use sealane::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Run the init command.
///
/// An existing file is left alone unless `force` is set.
pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path);

    if ConfigFile::write_defaults(&path, force)? {
        println!("Created configuration file: {}", path.display());
        println!();
        println!("Edit [source] host and port to match your GPS app, then run:");
        println!("  sealane relay");
    } else {
        println!("Configuration file already exists: {}", path.display());
        println!("Use --force to overwrite it with defaults.");
    }
    Ok(())
}
