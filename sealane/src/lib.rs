//! Sealane - live GPS position pipeline and route navigation for small boats
//!
//! A phone or GPS receiver on board streams fixes over TCP; the [`relay`]
//! republishes them to WebSocket subscribers, the [`live_feed`] listener keeps
//! the newest fix in a shared store, and [`navigation`] turns that fix plus a
//! planned [`route`] into delay, throttle and crossing signals.
//!
//! # High-Level API
//!
//! ```ignore
//! use sealane::geo::GeoPoint;
//! use sealane::live_feed::{FeedListener, WebSocketConnector};
//! use sealane::navigation::NavigationEstimator;
//! use sealane::route::{EtaTable, Route, TimeOfDay};
//!
//! let route = Route::new(vec![
//!     GeoPoint::new(59.3293, 18.0686),
//!     GeoPoint::new(59.3326, 18.0649),
//! ])?;
//! let start = TimeOfDay::from_hms_milli(12, 0, 0, 0).unwrap();
//! let eta = EtaTable::build(&route, start, 5.0)?;
//!
//! let listener = FeedListener::with_defaults(WebSocketConnector::new("ws://localhost:3001"));
//! listener.start();
//!
//! let estimator = NavigationEstimator::default();
//! let result = estimator
//!     .estimate_from_feed(listener.store(), &eta, 1, TimeOfDay::now())
//!     .await?;
//! println!("late: {} alert: {:.2}", result.is_late, result.throttle_alert);
//! ```

pub mod config;
pub mod geo;
pub mod live_feed;
pub mod logging;
pub mod navigation;
pub mod reconnect;
pub mod relay;
pub mod route;

/// Version of the Sealane library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
