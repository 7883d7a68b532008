//! Error types for the live position feed.

use thiserror::Error;

/// Errors returned to readers of the [`LiveFeedStore`](super::LiveFeedStore).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// No fix has been received yet.
    #[error("no position has been received yet")]
    NoPosition,

    /// The feed dropped to disconnected while waiting for a fix.
    #[error("feed disconnected before a position arrived")]
    Disconnected,
}

/// Errors raised by a [`FeedConnector`](super::FeedConnector) transport.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection could not be opened.
    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// The open connection failed while reading.
    #[error("feed stream error: {0}")]
    Stream(String),
}
