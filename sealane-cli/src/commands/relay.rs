//! Relay command - bridge a TCP GPS source to WebSocket subscribers.

use clap::Args;
use std::net::{Ipv4Addr, SocketAddr};

use sealane::config::ConfigFile;
use sealane::relay::{Relay, RelayConfig};

use super::common::FormatArg;
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the relay command.
///
/// Unset flags fall back to the `[source]` and `[relay]` config sections.
#[derive(Debug, Args)]
pub struct RelayArgs {
    /// GPS source host (GPS2IP default: 192.168.50.25)
    #[arg(long)]
    pub host: Option<String>,

    /// GPS source TCP port (GPS2IP default: 11123)
    #[arg(long)]
    pub port: Option<u16>,

    /// WebSocket port for subscribers
    #[arg(long)]
    pub listen_port: Option<u16>,

    /// Line format sent by the source
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,
}

/// Merge command-line flags over the config file.
pub fn resolve_config(args: &RelayArgs, file: &ConfigFile) -> RelayConfig {
    let mut config = file.relay_config();
    if let Some(host) = &args.host {
        config.source_host = host.clone();
    }
    if let Some(port) = args.port {
        config.source_port = port;
    }
    if let Some(listen_port) = args.listen_port {
        config.listen_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, listen_port));
    }
    if let Some(format) = args.format {
        config.format = format.into();
    }
    config
}

/// Run the relay command.
pub fn run(args: RelayArgs, runner: CliRunner) -> Result<(), CliError> {
    runner.log_startup("relay");
    let config = resolve_config(&args, runner.config());

    println!("Sealane GPS Relay v{}", sealane::VERSION);
    println!("========================");
    println!();
    println!("Source:  tcp://{} ({})", config.source_address(), config.format);
    println!("Listen:  ws://{}", config.listen_addr);
    println!(
        "Retries: {} every {:.1}s",
        config.reconnect.max_attempts,
        config.reconnect.delay.as_secs_f64()
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = runner.runtime()?;
    let cancel = runner.shutdown_token()?;

    runtime.block_on(async move {
        let relay = Relay::bind(config).await?;
        relay.run(cancel).await
    })?;

    println!();
    println!("Relay stopped.");
    Ok(())
}
