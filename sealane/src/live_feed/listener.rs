//! Feed listener - connection state machine feeding the [`LiveFeedStore`].
//!
//! The [`FeedListener`] owns one connection task at a time. The task opens a
//! connection through a [`FeedConnector`], parses each line, stores the
//! resulting fix and broadcasts [`FeedEvent`]s.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --start()--> Connecting --first fix--> Connected
//!       ^                        |                        |
//!       |                     error/close            no fix within
//!       |                        v                  stale threshold
//!       +------ retry delay -- Disconnected <-- Stale <---+
//! ```
//!
//! - An open but silent connection stays `Connecting`.
//! - Each failure asks the [`ReconnectPolicy`] for a delay; once it is
//!   exhausted the task ends and the listener stays `Disconnected` until
//!   the next [`start`](FeedListener::start).
//! - A successful open resets the retry budget.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::connector::FeedConnector;
use super::error::ConnectionError;
use super::protocol::{parse_line, WireFormat};
use super::state::{ConnectionPhase, FeedErrorKind, FeedEvent};
use super::store::LiveFeedStore;
use super::track::TrackHistory;
use crate::reconnect::{ReconnectPolicy, ReconnectState};

/// Default age after which a connected feed is considered stale.
pub const DEFAULT_STALE_THRESHOLD: Duration = Duration::from_secs(5);

/// Default interval between staleness checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Configuration for the feed listener.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Line format expected on the feed.
    pub format: WireFormat,

    /// Maximum fix age while connected.
    pub stale_threshold: Duration,

    /// How often the fix age is checked.
    pub check_interval: Duration,

    /// Retry behaviour after a failure.
    pub reconnect: ReconnectPolicy,

    /// Estimate missing speed and course from recent fixes.
    pub derive_motion: bool,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            format: WireFormat::Nmea,
            stale_threshold: DEFAULT_STALE_THRESHOLD,
            check_interval: DEFAULT_CHECK_INTERVAL,
            reconnect: ReconnectPolicy::default(),
            derive_motion: true,
        }
    }
}

/// Running connection task.
struct Session {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl Session {
    fn shutdown(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Client side of the live feed.
///
/// `start()` and `stop()` must be called from within a Tokio runtime.
pub struct FeedListener<C: FeedConnector> {
    connector: Arc<C>,
    store: LiveFeedStore,
    config: ListenerConfig,
    events: broadcast::Sender<FeedEvent>,
    session: Mutex<Option<Session>>,
}

impl<C: FeedConnector> FeedListener<C> {
    /// Create a listener writing into `store`.
    pub fn new(connector: C, store: LiveFeedStore, config: ListenerConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            connector: Arc::new(connector),
            store,
            config,
            events,
            session: Mutex::new(None),
        }
    }

    /// Create a listener with default configuration and a fresh store.
    pub fn with_defaults(connector: C) -> Self {
        Self::new(connector, LiveFeedStore::new(), ListenerConfig::default())
    }

    pub fn store(&self) -> &LiveFeedStore {
        &self.store
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.store.phase()
    }

    /// Receive events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.events.subscribe()
    }

    /// True while a connection task exists, including during retry delays.
    pub fn is_running(&self) -> bool {
        self.lock_session()
            .as_ref()
            .is_some_and(|session| !session.handle.is_finished())
    }

    /// Begin connecting.
    ///
    /// Does nothing while `Connecting` or `Connected`. Otherwise any pending
    /// retry is cancelled, the retry budget is reset and a new connection
    /// attempt starts immediately.
    pub fn start(&self) {
        let mut session = self.lock_session();

        let running = session
            .as_ref()
            .is_some_and(|current| !current.handle.is_finished());
        if running && self.store.phase().is_active() {
            debug!(phase = %self.store.phase(), "Feed listener already active");
            return;
        }
        if let Some(previous) = session.take() {
            previous.shutdown();
        }

        self.store.set_phase(ConnectionPhase::Connecting);

        let cancel = CancellationToken::new();
        let worker = Worker {
            connector: Arc::clone(&self.connector),
            store: self.store.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
        };
        let handle = tokio::spawn(worker.run(cancel.clone()));
        *session = Some(Session { cancel, handle });
    }

    /// Close the connection and cancel any pending retry.
    pub fn stop(&self) {
        if let Some(current) = self.lock_session().take() {
            current.shutdown();
        }

        let was_connected = self.store.phase() == ConnectionPhase::Connected;
        self.store.set_phase(ConnectionPhase::Disconnected);
        if was_connected {
            let _ = self.events.send(FeedEvent::Disconnected);
        }
        info!(feed = %self.connector.target(), "Feed listener stopped");
    }

    fn lock_session(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: FeedConnector> Drop for FeedListener<C> {
    fn drop(&mut self) {
        if let Some(current) = self.lock_session().take() {
            current.shutdown();
        }
    }
}

/// Why a connection ended.
enum SessionEnd {
    ConnectFailed(ConnectionError),
    Failed(ConnectionError),
    Closed,
    Stale,
}

/// State moved into the connection task.
struct Worker<C> {
    connector: Arc<C>,
    store: LiveFeedStore,
    config: ListenerConfig,
    events: broadcast::Sender<FeedEvent>,
}

impl<C: FeedConnector> Worker<C> {
    async fn run(self, cancel: CancellationToken) {
        let target = self.connector.target();
        info!(
            feed = %target,
            format = %self.config.format,
            stale_threshold_ms = self.config.stale_threshold.as_millis() as u64,
            "Feed listener started"
        );

        let mut reconnect = self.config.reconnect.tracker();

        loop {
            self.store.set_phase(ConnectionPhase::Connecting);

            let end = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                end = self.session(&target, &mut reconnect) => end,
            };

            let was_connected = self.store.phase() == ConnectionPhase::Connected;
            match end {
                SessionEnd::ConnectFailed(e) => {
                    warn!(feed = %target, error = %e, "Feed connection failed");
                    self.emit(FeedEvent::Error(FeedErrorKind::Connection));
                }
                SessionEnd::Failed(e) => {
                    warn!(feed = %target, error = %e, "Feed connection error");
                    self.emit(FeedEvent::Error(FeedErrorKind::Connection));
                }
                SessionEnd::Closed => {
                    info!(feed = %target, "Feed connection closed by remote");
                }
                SessionEnd::Stale => {
                    warn!(
                        feed = %target,
                        stale_threshold_ms = self.config.stale_threshold.as_millis() as u64,
                        "No GPS data received within stale threshold, dropping connection"
                    );
                    self.store.set_phase(ConnectionPhase::Stale);
                    self.emit(FeedEvent::Error(FeedErrorKind::Stale));
                }
            }

            self.store.set_phase(ConnectionPhase::Disconnected);
            if was_connected {
                self.emit(FeedEvent::Disconnected);
            }

            match reconnect.next_delay() {
                Some(delay) => {
                    info!(
                        attempt = reconnect.attempts(),
                        max_attempts = reconnect.max_attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "Scheduling feed reconnect"
                    );
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => {
                    warn!(
                        max_attempts = reconnect.max_attempts(),
                        "Max reconnection attempts reached, feed listener halted"
                    );
                    return;
                }
            }
        }
    }

    /// One connection from open to close.
    async fn session(&self, target: &str, reconnect: &mut ReconnectState) -> SessionEnd {
        let mut lines = match self.connector.connect().await {
            Ok(lines) => lines,
            Err(e) => return SessionEnd::ConnectFailed(e),
        };
        reconnect.reset();
        info!(feed = %target, "Feed socket open, waiting for data");

        let mut track = TrackHistory::new();
        let mut connected = false;
        let period = self.config.check_interval;
        let mut check = tokio::time::interval_at(Instant::now() + period, period);
        check.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                line = lines.next() => match line {
                    Some(Ok(line)) => self.handle_line(&line, &mut track, &mut connected),
                    Some(Err(e)) => return SessionEnd::Failed(e),
                    None => return SessionEnd::Closed,
                },
                _ = check.tick() => {
                    if connected && !self.store.is_fresh(self.config.stale_threshold) {
                        return SessionEnd::Stale;
                    }
                }
            }
        }
    }

    fn handle_line(&self, line: &str, track: &mut TrackHistory, connected: &mut bool) {
        let mut position = match parse_line(line, self.config.format) {
            Ok(position) => position,
            Err(e) if e.is_routine() => {
                trace!(error = %e, "Skipped feed line");
                return;
            }
            Err(e) => {
                debug!(error = %e, line, "Dropped malformed feed line");
                self.emit(FeedEvent::Error(FeedErrorKind::Parse));
                return;
            }
        };

        let received_at = Instant::now();
        if self.config.derive_motion {
            track.enrich(&mut position, received_at);
        }

        debug!(
            lat = position.latitude,
            lon = position.longitude,
            speed_kn = ?position.speed_knots,
            course = ?position.course_deg,
            derived_speed_kn = ?position.derived_speed_knots,
            "Feed position received"
        );
        self.store.publish_position_at(position.clone(), received_at);

        if !*connected {
            *connected = true;
            info!("Feed connected, receiving positions");
            self.emit(FeedEvent::Connected);
        }
        self.emit(FeedEvent::PositionUpdated(position));
    }

    fn emit(&self, event: FeedEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_feed::connector::LineStream;
    use futures::stream;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";

    /// What the next `connect()` call does.
    enum Script {
        Refuse,
        /// Deliver these lines, then either close or stay open silently.
        Lines(Vec<&'static str>, bool),
    }

    struct MockConnector {
        scripts: Mutex<VecDeque<Script>>,
        attempts: Arc<AtomicUsize>,
    }

    impl MockConnector {
        fn new(scripts: Vec<Script>) -> (Self, Arc<AtomicUsize>) {
            let attempts = Arc::new(AtomicUsize::new(0));
            let connector = Self {
                scripts: Mutex::new(scripts.into()),
                attempts: Arc::clone(&attempts),
            };
            (connector, attempts)
        }
    }

    impl FeedConnector for MockConnector {
        fn connect(&self) -> impl Future<Output = Result<LineStream, ConnectionError>> + Send {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Script::Refuse);

            async move {
                match script {
                    Script::Refuse => Err(ConnectionError::Connect {
                        target: "mock".to_string(),
                        reason: "connection refused".to_string(),
                    }),
                    Script::Lines(lines, hold_open) => {
                        let items: Vec<Result<String, ConnectionError>> =
                            lines.into_iter().map(|line| Ok(line.to_string())).collect();
                        let lines = stream::iter(items);
                        let stream: LineStream = if hold_open {
                            Box::pin(lines.chain(stream::pending()))
                        } else {
                            Box::pin(lines)
                        };
                        Ok(stream)
                    }
                }
            }
        }

        fn target(&self) -> String {
            "mock".to_string()
        }
    }

    fn config(max_attempts: u32) -> ListenerConfig {
        ListenerConfig {
            reconnect: ReconnectPolicy::new(max_attempts, Duration::from_secs(5)),
            ..ListenerConfig::default()
        }
    }

    fn listener(scripts: Vec<Script>, config: ListenerConfig) -> (FeedListener<MockConnector>, Arc<AtomicUsize>) {
        let (connector, attempts) = MockConnector::new(scripts);
        (
            FeedListener::new(connector, LiveFeedStore::new(), config),
            attempts,
        )
    }

    fn drain(events: &mut broadcast::Receiver<FeedEvent>) -> Vec<FeedEvent> {
        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        seen
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_socket_stays_connecting() {
        let (listener, attempts) = listener(vec![Script::Lines(vec![], true)], config(3));
        listener.start();

        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(listener.phase(), ConnectionPhase::Connecting);
        assert!(listener.store().latest_position().is_none());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_record_marks_connected() {
        let (listener, _) = listener(vec![Script::Lines(vec![RMC], true)], config(3));
        let mut events = listener.subscribe();
        listener.start();

        assert_eq!(events.recv().await.unwrap(), FeedEvent::Connected);
        match events.recv().await.unwrap() {
            FeedEvent::PositionUpdated(position) => {
                assert!((position.latitude - 48.1173).abs() < 1e-4);
                assert_eq!(position.speed_knots, Some(22.4));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(listener.phase(), ConnectionPhase::Connected);
        assert!(listener.store().latest_position().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_lines_are_dropped() {
        let (listener, _) = listener(
            vec![Script::Lines(
                vec!["$GPGSV,3,1,11", "$GPRMC,garbage", RMC],
                true,
            )],
            config(3),
        );
        let mut events = listener.subscribe();
        listener.start();

        assert_eq!(
            events.recv().await.unwrap(),
            FeedEvent::Error(FeedErrorKind::Parse)
        );
        assert_eq!(events.recv().await.unwrap(), FeedEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            FeedEvent::PositionUpdated(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_budget_halts_after_fourth_failure() {
        let (listener, attempts) = listener(vec![], config(3));
        let mut events = listener.subscribe();
        listener.start();

        tokio::time::sleep(Duration::from_secs(120)).await;

        // Initial attempt plus three retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
        assert_eq!(listener.phase(), ConnectionPhase::Disconnected);
        assert!(!listener.is_running());

        let errors = drain(&mut events)
            .into_iter()
            .filter(|event| *event == FeedEvent::Error(FeedErrorKind::Connection))
            .count();
        assert_eq!(errors, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_open_resets_budget() {
        let scripts = vec![
            Script::Refuse,
            Script::Refuse,
            Script::Lines(vec![], false),
            Script::Refuse,
            Script::Refuse,
        ];
        let (listener, attempts) = listener(scripts, config(2));
        listener.start();

        tokio::time::sleep(Duration::from_secs(120)).await;

        assert_eq!(attempts.load(Ordering::SeqCst), 5);
        assert!(!listener.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_feed_is_dropped() {
        let (listener, _) = listener(vec![Script::Lines(vec![RMC], true)], config(0));
        let mut events = listener.subscribe();
        listener.start();

        assert_eq!(events.recv().await.unwrap(), FeedEvent::Connected);
        assert!(matches!(
            events.recv().await.unwrap(),
            FeedEvent::PositionUpdated(_)
        ));
        assert_eq!(
            events.recv().await.unwrap(),
            FeedEvent::Error(FeedErrorKind::Stale)
        );
        assert_eq!(events.recv().await.unwrap(), FeedEvent::Disconnected);

        assert_eq!(listener.phase(), ConnectionPhase::Disconnected);
        // The last fix is kept but no longer fresh.
        assert!(listener.store().latest_position().is_some());
        assert!(!listener.store().is_fresh(DEFAULT_STALE_THRESHOLD));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_noop_while_active() {
        let (listener, attempts) = listener(vec![Script::Lines(vec![], true)], config(3));
        listener.start();
        listener.start();
        tokio::time::sleep(Duration::from_secs(1)).await;
        listener.start();

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert!(listener.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_then_start_reconnects() {
        let (listener, attempts) = listener(
            vec![
                Script::Lines(vec![RMC], true),
                Script::Lines(vec![RMC], true),
            ],
            config(3),
        );
        let mut events = listener.subscribe();
        listener.start();
        assert_eq!(events.recv().await.unwrap(), FeedEvent::Connected);

        listener.stop();
        assert_eq!(listener.phase(), ConnectionPhase::Disconnected);
        assert!(!listener.is_running());

        listener.start();
        let seen: Vec<FeedEvent> = {
            let mut seen = Vec::new();
            while seen.last() != Some(&FeedEvent::Connected) || seen.len() < 2 {
                seen.push(events.recv().await.unwrap());
            }
            seen
        };
        assert!(seen.contains(&FeedEvent::Disconnected));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(listener.phase(), ConnectionPhase::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_position_through_listener() {
        let (listener, _) = listener(vec![Script::Lines(vec![RMC], true)], config(3));
        let store = listener.store().clone();
        listener.start();

        let position = tokio::time::timeout(Duration::from_secs(5), store.wait_for_position())
            .await
            .unwrap()
            .unwrap();
        assert!((position.longitude - 11.5167).abs() < 1e-4);
    }
}
