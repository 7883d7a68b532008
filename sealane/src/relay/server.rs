//! WebSocket side of the relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::config::RelayConfig;
use super::error::RelayError;
use super::hub::SubscriberHub;
use super::source::pump_source;

/// Pause after a failed accept before trying again.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Longest wait for a subscriber to acknowledge the close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Bridges one GPS source to any number of WebSocket subscribers.
///
/// ```ignore
/// let relay = Relay::bind(RelayConfig::default()).await?;
/// let cancel = CancellationToken::new();
/// relay.run(cancel).await?;
/// ```
pub struct Relay {
    config: RelayConfig,
    listener: TcpListener,
    hub: Arc<SubscriberHub>,
}

impl Relay {
    /// Bind the subscriber listener. The source is not contacted yet.
    pub async fn bind(config: RelayConfig) -> Result<Self, RelayError> {
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(|source| RelayError::Bind {
                addr: config.listen_addr,
                source,
            })?;
        let hub = Arc::new(SubscriberHub::new(config.subscriber_queue));

        Ok(Self {
            config,
            listener,
            hub,
        })
    }

    /// Address subscribers connect to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Shared subscriber set.
    pub fn hub(&self) -> Arc<SubscriberHub> {
        Arc::clone(&self.hub)
    }

    /// Run until cancelled or until the source is given up on.
    ///
    /// Every subscriber task, including those still in the WebSocket
    /// handshake, has finished before this returns.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), RelayError> {
        let listen_addr = self
            .listener
            .local_addr()
            .unwrap_or(self.config.listen_addr);
        info!(
            listen = %listen_addr,
            source = %self.config.source_address(),
            format = %self.config.format,
            "GPS relay started"
        );

        let shutdown = cancel.child_token();
        let tracker = TaskTracker::new();
        tracker.spawn(accept_subscribers(
            self.listener,
            Arc::clone(&self.hub),
            tracker.clone(),
            shutdown.clone(),
        ));

        let result = pump_source(&self.config, &self.hub, &cancel).await;

        shutdown.cancel();
        tracker.close();
        tracker.wait().await;
        info!("GPS relay stopped");

        result
    }
}

async fn accept_subscribers(
    listener: TcpListener,
    hub: Arc<SubscriberHub>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
) {
    loop {
        let accepted = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                tracker.spawn(serve_subscriber(
                    stream,
                    peer,
                    Arc::clone(&hub),
                    shutdown.clone(),
                ));
            }
            Err(e) => {
                warn!(error = %e, "Failed to accept subscriber connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}

async fn serve_subscriber(
    stream: TcpStream,
    peer: SocketAddr,
    hub: Arc<SubscriberHub>,
    shutdown: CancellationToken,
) {
    let handshake = tokio::select! {
        biased;
        _ = shutdown.cancelled() => {
            debug!(%peer, "Relay stopping, handshake abandoned");
            return;
        }
        handshake = tokio_tungstenite::accept_async(stream) => handshake,
    };
    let socket = match handshake {
        Ok(socket) => socket,
        Err(e) => {
            debug!(%peer, error = %e, "WebSocket handshake failed");
            return;
        }
    };
    let (mut sink, mut incoming) = socket.split();
    let mut subscription = hub.attach();
    info!(%peer, subscribers = hub.len(), "Subscriber connected");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            frame = subscription.frames.recv() => match frame {
                Some(frame) => {
                    let sent = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break,
                        sent = sink.send(Message::text(frame.to_string())) => sent,
                    };
                    if let Err(e) = sent {
                        debug!(%peer, error = %e, "Send to subscriber failed");
                        break;
                    }
                }
                None => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(%peer, error = %e, "Subscriber connection error");
                    break;
                }
            },
        }
    }

    hub.detach(subscription.id);
    if tokio::time::timeout(CLOSE_TIMEOUT, sink.close()).await.is_err() {
        debug!(%peer, "Subscriber did not acknowledge close");
    }
    info!(%peer, subscribers = hub.len(), "Subscriber disconnected");
}
