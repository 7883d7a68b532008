//! Periodic position logging for voyage analysis.
//!
//! Spawns a background task that logs the live feed at a fixed interval,
//! useful for reviewing a session afterwards.
//!
//! # Output Format
//!
//! Logs are emitted at DEBUG level with structured fields:
//! - `lat`, `lon` - Position in decimal degrees
//! - `sog_kn` - Speed over ground in knots
//! - `cog` - Course over ground in degrees
//! - `age_ms` - Age of the fix
//! - `phase` - Listener connection phase

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::state::FeedSnapshot;
use super::store::LiveFeedStore;

/// Default logging interval (20 seconds).
pub const DEFAULT_LOG_INTERVAL: Duration = Duration::from_secs(20);

/// Spawns a background task that periodically logs the latest fix.
///
/// Stops when `cancellation` fires. Callers should only spawn it when DEBUG
/// logging is enabled:
///
/// ```ignore
/// if tracing::enabled!(tracing::Level::DEBUG) {
///     spawn_position_logger(store.clone(), cancel.clone(), DEFAULT_LOG_INTERVAL);
/// }
/// ```
pub fn spawn_position_logger(
    store: LiveFeedStore,
    cancellation: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    log_snapshot(&store.snapshot(), Instant::now());
                }
                _ = cancellation.cancelled() => {
                    tracing::debug!("Position logger stopped");
                    break;
                }
            }
        }
    })
}

fn log_snapshot(snapshot: &FeedSnapshot, now: Instant) {
    match &snapshot.latest_position {
        Some(position) => {
            let age_ms = snapshot
                .age_at(now)
                .map(|age| age.as_millis() as u64)
                .unwrap_or_default();

            tracing::debug!(
                lat = format!("{:.5}", position.latitude),
                lon = format!("{:.5}", position.longitude),
                sog_kn = %format_optional(position.speed_over_ground(), 1),
                cog = %format_optional(position.course_over_ground(), 0),
                age_ms,
                phase = %snapshot.phase,
                "Position update"
            );
        }
        None => {
            tracing::debug!(phase = %snapshot.phase, "Position update (no fix yet)");
        }
    }
}

/// Formats an optional reading, `-` when absent.
fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(value) => format!("{:.*}", decimals, value),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live_feed::Position;

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(5.26), 1), "5.3");
        assert_eq!(format_optional(Some(271.4), 0), "271");
        assert_eq!(format_optional(None, 1), "-");
    }

    #[tokio::test(start_paused = true)]
    async fn test_logger_stops_on_cancel() {
        let store = LiveFeedStore::new();
        store.publish_position(Position::new(59.0, 18.0).unwrap());
        let cancel = CancellationToken::new();

        let handle = spawn_position_logger(store, cancel.clone(), Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();

        assert!(handle.await.is_ok());
    }
}
