//! Live feed store - the latest fix shared between the listener and readers.
//!
//! The store has a single writer (the [`FeedListener`](super::FeedListener)
//! task) and any number of readers. Every write replaces the whole
//! [`FeedSnapshot`] through a `tokio::sync::watch` channel, so a reader never
//! sees a position paired with another fix's timestamp.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use sealane::live_feed::{LiveFeedStore, Position};
//!
//! let store = LiveFeedStore::new();
//! assert!(!store.is_fresh(Duration::from_secs(5)));
//!
//! store.publish_position(Position::new(59.3293, 18.0686).unwrap());
//! assert!(store.is_fresh(Duration::from_secs(5)));
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

use super::error::FeedError;
use super::state::{ConnectionPhase, FeedSnapshot, Position};

/// Cloneable handle to the shared feed state.
///
/// Clones share the same underlying value.
#[derive(Clone)]
pub struct LiveFeedStore {
    tx: Arc<watch::Sender<FeedSnapshot>>,
}

impl LiveFeedStore {
    /// Create an empty store in the `Disconnected` phase.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FeedSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> FeedSnapshot {
        self.tx.borrow().clone()
    }

    pub fn latest_position(&self) -> Option<Position> {
        self.tx.borrow().latest_position.clone()
    }

    pub fn last_update(&self) -> Option<Instant> {
        self.tx.borrow().last_update
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.tx.borrow().phase
    }

    /// True if the latest fix arrived at most `threshold` ago.
    pub fn is_fresh(&self, threshold: Duration) -> bool {
        self.is_fresh_at(Instant::now(), threshold)
    }

    /// Freshness evaluated at a given instant.
    pub fn is_fresh_at(&self, now: Instant, threshold: Duration) -> bool {
        self.tx.borrow().is_fresh_at(now, threshold)
    }

    /// The latest fix, or [`FeedError::NoPosition`] without waiting.
    pub fn require_position(&self) -> Result<Position, FeedError> {
        self.latest_position().ok_or(FeedError::NoPosition)
    }

    /// Wait until a fix is available.
    ///
    /// Resolves immediately if one is already stored. Otherwise waits for the
    /// next fix and fails with [`FeedError::Disconnected`] if the feed is
    /// marked disconnected first. There is no built-in timeout; wrap the call
    /// in `tokio::time::timeout` when one is needed.
    pub async fn wait_for_position(&self) -> Result<Position, FeedError> {
        let mut rx = self.tx.subscribe();
        if let Some(position) = rx.borrow_and_update().latest_position.clone() {
            return Ok(position);
        }

        loop {
            if rx.changed().await.is_err() {
                return Err(FeedError::Disconnected);
            }
            let snapshot = rx.borrow_and_update();
            if let Some(position) = &snapshot.latest_position {
                return Ok(position.clone());
            }
            if snapshot.phase == ConnectionPhase::Disconnected {
                return Err(FeedError::Disconnected);
            }
        }
    }

    /// Receiver that is notified on every write.
    pub fn subscribe(&self) -> watch::Receiver<FeedSnapshot> {
        self.tx.subscribe()
    }

    /// Store a fix received now and mark the feed connected.
    pub fn publish_position(&self, position: Position) {
        self.publish_position_at(position, Instant::now());
    }

    /// Store a fix with an explicit arrival time.
    pub fn publish_position_at(&self, position: Position, received_at: Instant) {
        self.tx.send_modify(|snapshot| {
            snapshot.latest_position = Some(position);
            snapshot.last_update = Some(received_at);
            snapshot.phase = ConnectionPhase::Connected;
        });
    }

    /// Change the connection phase, keeping the last fix.
    pub fn set_phase(&self, phase: ConnectionPhase) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.phase == phase {
                // Disconnected is always announced so waiters can give up.
                return phase == ConnectionPhase::Disconnected;
            }
            snapshot.phase = phase;
            true
        });
    }
}

impl Default for LiveFeedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LiveFeedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFeedStore")
            .field("snapshot", &*self.tx.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fix(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon).unwrap()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = LiveFeedStore::new();
        let snapshot = store.snapshot();
        assert!(snapshot.latest_position.is_none());
        assert!(snapshot.last_update.is_none());
        assert_eq!(snapshot.phase, ConnectionPhase::Disconnected);
        assert_eq!(store.require_position(), Err(FeedError::NoPosition));
    }

    #[test]
    fn test_publish_replaces_position_and_timestamp_together() {
        let store = LiveFeedStore::new();
        let first = Instant::now();
        store.publish_position_at(fix(59.0, 18.0), first);
        store.publish_position_at(fix(59.1, 18.1), first + Duration::from_secs(1));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.latest_position, Some(fix(59.1, 18.1)));
        assert_eq!(snapshot.last_update, Some(first + Duration::from_secs(1)));
        assert_eq!(snapshot.phase, ConnectionPhase::Connected);
    }

    #[test]
    fn test_set_phase_keeps_position() {
        let store = LiveFeedStore::new();
        store.publish_position(fix(59.0, 18.0));
        store.set_phase(ConnectionPhase::Stale);

        assert_eq!(store.phase(), ConnectionPhase::Stale);
        assert!(store.latest_position().is_some());
    }

    #[test]
    fn test_clones_share_state() {
        let store = LiveFeedStore::new();
        let reader = store.clone();
        store.publish_position(fix(10.0, 20.0));
        assert_eq!(reader.latest_position(), Some(fix(10.0, 20.0)));
    }

    #[test]
    fn test_is_fresh_at_boundaries() {
        let store = LiveFeedStore::new();
        let received = Instant::now();
        store.publish_position_at(fix(59.0, 18.0), received);

        let threshold = Duration::from_secs(2);
        assert!(store.is_fresh_at(received + Duration::from_millis(2000), threshold));
        assert!(!store.is_fresh_at(received + Duration::from_millis(2001), threshold));
        assert!(!store.is_fresh_at(received + Duration::from_millis(4000), Duration::from_secs(3)));
    }

    #[tokio::test]
    async fn test_wait_for_position_resolves_immediately() {
        let store = LiveFeedStore::new();
        store.publish_position(fix(59.0, 18.0));
        assert_eq!(store.wait_for_position().await, Ok(fix(59.0, 18.0)));
    }

    #[tokio::test]
    async fn test_wait_for_position_waits_for_next_fix() {
        let store = LiveFeedStore::new();
        store.set_phase(ConnectionPhase::Connecting);

        let writer = store.clone();
        let waiter = tokio::spawn(async move { store.wait_for_position().await });
        tokio::task::yield_now().await;

        writer.publish_position(fix(1.0, 2.0));
        assert_eq!(waiter.await.unwrap(), Ok(fix(1.0, 2.0)));
    }

    #[tokio::test]
    async fn test_wait_for_position_fails_on_disconnect() {
        let store = LiveFeedStore::new();
        let writer = store.clone();
        let waiter = tokio::spawn(async move { store.wait_for_position().await });
        tokio::task::yield_now().await;

        writer.set_phase(ConnectionPhase::Connecting);
        writer.set_phase(ConnectionPhase::Disconnected);
        assert_eq!(waiter.await.unwrap(), Err(FeedError::Disconnected));
    }
}
