//! Conversion from file settings to component configs.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::settings::ConfigFile;
use crate::live_feed::ListenerConfig;
use crate::navigation::EstimatorConfig;
use crate::reconnect::ReconnectPolicy;
use crate::relay::{RelayConfig, DEFAULT_SUBSCRIBER_QUEUE};

impl ConfigFile {
    /// Relay configuration for `[source]` and `[relay]`.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            source_host: self.source.host.clone(),
            source_port: self.source.port,
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.relay.listen_port)),
            format: self.source.format,
            reconnect: ReconnectPolicy::new(
                self.relay.max_reconnect_attempts,
                secs_to_duration(self.relay.reconnect_delay_secs),
            ),
            subscriber_queue: DEFAULT_SUBSCRIBER_QUEUE,
        }
    }

    /// Listener configuration for `[listener]`.
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig {
            format: self.listener.format,
            stale_threshold: secs_to_duration(self.listener.stale_threshold_secs),
            check_interval: Duration::from_millis(self.listener.check_interval_ms),
            reconnect: ReconnectPolicy::new(
                self.listener.max_reconnect_attempts,
                secs_to_duration(self.listener.reconnect_delay_secs),
            ),
            ..ListenerConfig::default()
        }
    }

    /// Estimator configuration for `[navigation]`.
    pub fn estimator_config(&self) -> EstimatorConfig {
        let nav = &self.navigation;
        EstimatorConfig {
            throttle: nav
                .throttle_policy
                .with_parameters(nav.throttle_threshold_secs, nav.throttle_exponent),
            min_moving_speed_knots: nav.min_moving_speed_knots,
        }
    }
}

/// Saturating seconds to `Duration` for settings built in code.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
