//! Outbound connection to the GPS source.

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::RelayConfig;
use super::error::RelayError;
use super::hub::SubscriberHub;
use crate::live_feed::protocol::{line_frames, parse_sensorlog_json};
use crate::live_feed::WireFormat;

/// Keep the source connected and forward its lines until cancelled.
///
/// Returns `Ok(())` on cancellation and [`RelayError::SourceUnreachable`]
/// once the reconnect policy is exhausted.
pub(super) async fn pump_source(
    config: &RelayConfig,
    hub: &SubscriberHub,
    cancel: &CancellationToken,
) -> Result<(), RelayError> {
    let address = config.source_address();
    let mut reconnect = config.reconnect.tracker();

    loop {
        info!(source = %address, "Connecting to GPS source");

        let connected = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            connected = TcpStream::connect(address.as_str()) => connected,
        };

        match connected {
            Ok(stream) => {
                reconnect.reset();
                info!(source = %address, "Connected to GPS source");

                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    outcome = forward_lines(stream, config.format, hub) => outcome,
                };
                match outcome {
                    Ok(forwarded) => {
                        info!(source = %address, forwarded, "GPS source closed the connection")
                    }
                    Err(e) => warn!(source = %address, error = %e, "GPS source connection error"),
                }
            }
            Err(e) => warn!(source = %address, error = %e, "GPS source connection failed"),
        }

        match reconnect.next_delay() {
            Some(delay) => {
                info!(
                    attempt = reconnect.attempts(),
                    max_attempts = reconnect.max_attempts(),
                    delay_ms = delay.as_millis() as u64,
                    "Reconnecting to GPS source"
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => {
                error!(
                    source = %address,
                    max_attempts = reconnect.max_attempts(),
                    "Max reconnection attempts reached"
                );
                return Err(RelayError::SourceUnreachable {
                    address,
                    attempts: reconnect.max_attempts(),
                });
            }
        }
    }
}

/// Forward every accepted line to the hub. Returns the number forwarded.
async fn forward_lines<R: AsyncRead + Unpin>(
    reader: R,
    format: WireFormat,
    hub: &SubscriberHub,
) -> std::io::Result<u64> {
    let mut frames = line_frames(reader);
    let mut forwarded = 0;

    while let Some(line) = frames.next().await {
        let line = line?;
        if !accepts(format, &line) {
            continue;
        }
        let stats = hub.publish(&line);
        debug!(
            delivered = stats.delivered,
            skipped = stats.skipped,
            "Frame relayed"
        );
        forwarded += 1;
    }

    Ok(forwarded)
}

/// JSON sources are validated before relaying; other lines pass verbatim.
fn accepts(format: WireFormat, line: &str) -> bool {
    match format {
        WireFormat::Json => match parse_sensorlog_json(line) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Dropped malformed JSON line");
                false
            }
        },
        WireFormat::Nmea | WireFormat::Auto => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::reconnect::ReconnectPolicy;
    use tokio::net::TcpListener;

    #[test]
    fn test_json_format_validates_lines() {
        assert!(accepts(
            WireFormat::Json,
            r#"{"locationLatitude":1.0,"locationLongitude":2.0}"#
        ));
        assert!(!accepts(WireFormat::Json, "{truncated"));
        assert!(accepts(WireFormat::Nmea, "$GPGSV,anything"));
    }

    #[tokio::test]
    async fn test_forward_lines_publishes_each_line() {
        let hub = SubscriberHub::new(8);
        let mut subscription = hub.attach();
        let input: &[u8] = b"$GPRMC,a\r\n\n$GPRMC,b\n";

        let forwarded = forward_lines(input, WireFormat::Nmea, &hub).await.unwrap();

        assert_eq!(forwarded, 2);
        assert_eq!(subscription.frames.recv().await.as_deref(), Some("$GPRMC,a"));
        assert_eq!(subscription.frames.recv().await.as_deref(), Some("$GPRMC,b"));
    }

    #[tokio::test]
    async fn test_unreachable_source_is_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = RelayConfig {
            reconnect: ReconnectPolicy::new(2, Duration::from_millis(10)),
            ..RelayConfig::default().with_source("127.0.0.1", port)
        };
        let hub = SubscriberHub::new(4);

        let result = pump_source(&config, &hub, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(RelayError::SourceUnreachable { attempts: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_stops_pump() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let hub = SubscriberHub::new(4);

        let result = pump_source(&RelayConfig::default(), &hub, &cancel).await;
        assert!(result.is_ok());
    }
}
