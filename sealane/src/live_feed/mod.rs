//! Live position feed.
//!
//! A phone or GPS receiver streams fixes to the relay; the [`FeedListener`]
//! subscribes to the relay, decodes each line and keeps the newest fix in a
//! [`LiveFeedStore`] that navigation code reads.
//!
//! # Usage
//!
//! ```ignore
//! use sealane::live_feed::{FeedListener, ListenerConfig, LiveFeedStore, WebSocketConnector};
//!
//! let store = LiveFeedStore::new();
//! let listener = FeedListener::new(
//!     WebSocketConnector::new("ws://localhost:3001"),
//!     store.clone(),
//!     ListenerConfig::default(),
//! );
//! listener.start();
//!
//! let position = store.wait_for_position().await?;
//! println!("{}, {}", position.latitude, position.longitude);
//! ```
//!
//! # Components
//!
//! - [`state`] - `Position`, `ConnectionPhase`, `FeedSnapshot`, `FeedEvent`
//! - [`store`] - `LiveFeedStore`, the single-writer shared state
//! - [`protocol`] - NMEA RMC and SensorLog JSON parsing, line framing
//! - [`connector`] - `FeedConnector` transports (WebSocket, TCP)
//! - [`listener`] - `FeedListener` connection state machine
//! - [`track`] - speed and course derived from recent fixes

pub mod connector;
mod error;
pub mod listener;
mod logger;
pub mod protocol;
pub mod state;
pub mod store;
pub mod track;

pub use connector::{
    FeedConnector, LineStream, TcpLineConnector, WebSocketConnector, DEFAULT_FEED_URL,
};
pub use error::{ConnectionError, FeedError};
pub use listener::{
    FeedListener, ListenerConfig, DEFAULT_CHECK_INTERVAL, DEFAULT_STALE_THRESHOLD,
};
pub use protocol::{parse_line, ParseError, UnknownWireFormat, WireFormat};
pub use state::{ConnectionPhase, FeedErrorKind, FeedEvent, FeedSnapshot, Position};
pub use store::LiveFeedStore;
pub use track::TrackHistory;

// Position logger for voyage analysis (DEBUG level only)
pub use logger::{spawn_position_logger, DEFAULT_LOG_INTERVAL};
