//! Subscriber fan-out.
//!
//! Every subscriber gets its own small bounded queue. Publishing never waits:
//! a subscriber whose queue is full simply misses that frame.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

/// Identifier of an attached subscriber.
pub type SubscriberId = u64;

/// Receiving half handed to a subscriber connection.
pub struct Subscription {
    pub id: SubscriberId,
    pub frames: mpsc::Receiver<Arc<str>>,
}

/// Outcome of one [`SubscriberHub::publish`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishStats {
    pub delivered: usize,
    pub skipped: usize,
}

/// Set of attached subscribers.
pub struct SubscriberHub {
    subscribers: Mutex<HashMap<SubscriberId, mpsc::Sender<Arc<str>>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl SubscriberHub {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Register a new subscriber.
    pub fn attach(&self) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, frames) = mpsc::channel(self.queue_capacity);
        self.lock().insert(id, tx);
        Subscription { id, frames }
    }

    pub fn detach(&self, id: SubscriberId) {
        self.lock().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Offer `frame` to every subscriber without waiting.
    ///
    /// Subscribers whose receiver is gone are removed.
    pub fn publish(&self, frame: &str) -> PublishStats {
        let frame: Arc<str> = Arc::from(frame);
        let mut stats = PublishStats::default();

        self.lock().retain(|id, tx| match tx.try_send(Arc::clone(&frame)) {
            Ok(()) => {
                stats.delivered += 1;
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::trace!(subscriber = *id, "Subscriber queue full, frame skipped");
                stats.skipped += 1;
                true
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });

        stats
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<Arc<str>>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let hub = SubscriberHub::new(4);
        let mut a = hub.attach();
        let mut b = hub.attach();
        assert_eq!(hub.len(), 2);

        let stats = hub.publish("$GPRMC,1");
        assert_eq!(stats.delivered, 2);
        assert_eq!(a.frames.recv().await.as_deref(), Some("$GPRMC,1"));
        assert_eq!(b.frames.recv().await.as_deref(), Some("$GPRMC,1"));
    }

    #[test]
    fn test_full_queue_skips_without_blocking() {
        let hub = SubscriberHub::new(2);
        let mut slow = hub.attach();

        assert_eq!(hub.publish("1").delivered, 1);
        assert_eq!(hub.publish("2").delivered, 1);
        let stats = hub.publish("3");
        assert_eq!(stats, PublishStats { delivered: 0, skipped: 1 });

        assert_eq!(slow.frames.try_recv().ok().as_deref(), Some("1"));
        assert_eq!(slow.frames.try_recv().ok().as_deref(), Some("2"));
        assert!(slow.frames.try_recv().is_err());
        // Still attached.
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_closed_subscriber_is_removed() {
        let hub = SubscriberHub::new(2);
        let gone = hub.attach();
        let _kept = hub.attach();
        drop(gone);

        assert_eq!(hub.publish("x").delivered, 1);
        assert_eq!(hub.len(), 1);
    }

    #[test]
    fn test_detach() {
        let hub = SubscriberHub::new(2);
        let subscription = hub.attach();
        hub.detach(subscription.id);
        assert!(hub.is_empty());
    }
}
