//! Relay error types.

use std::net::SocketAddr;

use thiserror::Error;

/// Fatal relay errors.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The WebSocket listener could not be bound.
    #[error("failed to bind relay listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The GPS source stayed unreachable through every retry.
    #[error("GPS source {address} unreachable after {attempts} reconnection attempts")]
    SourceUnreachable { address: String, attempts: u32 },
}
