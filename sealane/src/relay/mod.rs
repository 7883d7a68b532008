//! Ingestion relay.
//!
//! Connects out to a GPS source speaking newline framed NMEA or SensorLog
//! JSON over TCP, and republishes every line to WebSocket subscribers:
//!
//! ```text
//! GPS2IP / SensorLog --TCP--> Relay --WebSocket--> FeedListener(s)
//! ```
//!
//! The source connection is retried with the shared
//! [`ReconnectPolicy`](crate::reconnect::ReconnectPolicy); when it is
//! exhausted [`Relay::run`] returns [`RelayError::SourceUnreachable`].

mod config;
mod error;
mod hub;
mod server;
mod source;

pub use config::{
    RelayConfig, DEFAULT_LISTEN_PORT, DEFAULT_SOURCE_HOST, DEFAULT_SOURCE_PORT,
    DEFAULT_SUBSCRIBER_QUEUE,
};
pub use error::RelayError;
pub use hub::{PublishStats, SubscriberHub, SubscriberId, Subscription};
pub use server::Relay;
