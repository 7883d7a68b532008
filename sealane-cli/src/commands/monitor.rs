//! Monitor command - follow a relay and print the live feed.
//!
//! With a route (`--waypoint` repeated, `--speed`, optional `--start`) every
//! fix is also checked against the plan: target waypoint, gate crossings at
//! turns, delay and throttle alert.

use std::time::Duration;

use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{warn, Level};

use sealane::config::ConfigFile;
use sealane::geo::GeoPoint;
use sealane::live_feed::{
    spawn_position_logger, FeedEvent, FeedListener, ListenerConfig, LiveFeedStore, Position,
    WebSocketConnector, DEFAULT_LOG_INTERVAL,
};
use sealane::navigation::{
    CrossingOutline, DelayResult, GateCrossing, GateEvent, NavigationEstimator, RouteProgress,
};
use sealane::route::{EtaTable, Route, TimeOfDay};

use super::common::{format_optional, parse_waypoint, FormatArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// How often the monitor checks whether the listener has given up.
const HALT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Arguments for the monitor command.
#[derive(Debug, Args)]
pub struct MonitorArgs {
    /// Relay WebSocket URL (default: ws://localhost:3001)
    #[arg(long)]
    pub url: Option<String>,

    /// Line format sent by the relay
    #[arg(long, value_enum)]
    pub format: Option<FormatArg>,

    /// Seconds without a fix before the feed is dropped as stale
    #[arg(long, value_name = "SECS")]
    pub stale_threshold: Option<f64>,

    /// Route waypoint in decimal degrees; repeat in route order
    #[arg(
        long = "waypoint",
        value_name = "LAT,LON",
        value_parser = parse_waypoint,
        allow_hyphen_values = true
    )]
    pub waypoints: Vec<GeoPoint>,

    /// Planned departure from the first waypoint, HH:MM[:SS] (default: now)
    #[arg(long, value_name = "HH:MM")]
    pub start: Option<TimeOfDay>,

    /// Planned speed in knots (required with --waypoint)
    #[arg(long, value_name = "KNOTS")]
    pub speed: Option<f64>,
}

/// Merge command-line flags over the `[listener]` config section.
pub fn resolve_listener(
    args: &MonitorArgs,
    file: &ConfigFile,
) -> Result<(String, ListenerConfig), CliError> {
    let url = args.url.clone().unwrap_or_else(|| file.listener.url.clone());
    if !(url.starts_with("ws://") || url.starts_with("wss://")) {
        return Err(CliError::InvalidArgument(format!(
            "--url must start with ws:// or wss:// (got '{}')",
            url
        )));
    }

    let mut config = file.listener_config();
    if let Some(format) = args.format {
        config.format = format.into();
    }
    if let Some(secs) = args.stale_threshold {
        if !(secs.is_finite() && secs > 0.0) {
            return Err(CliError::InvalidArgument(
                "--stale-threshold must be greater than zero".to_string(),
            ));
        }
        config.stale_threshold = Duration::try_from_secs_f64(secs).map_err(|_| {
            CliError::InvalidArgument(format!("--stale-threshold {} is too large", secs))
        })?;
    }

    Ok((url, config))
}

/// A planned route followed while monitoring.
pub struct VoyagePlan {
    eta: EtaTable,
    progress: RouteProgress,
    /// Gates at interior waypoints, keyed by waypoint index.
    gates: Vec<(usize, GateCrossing)>,
    estimator: NavigationEstimator,
}

/// Outcome of checking one fix against the plan.
#[derive(Debug, Clone)]
pub struct PlanReport {
    pub target: usize,
    pub crossed: Vec<usize>,
    pub finished: bool,
    pub delay: Option<DelayResult>,
}

impl VoyagePlan {
    /// Build the plan from command-line waypoints, or `None` without any.
    pub fn from_args(args: &MonitorArgs, file: &ConfigFile) -> Result<Option<Self>, CliError> {
        if args.waypoints.is_empty() {
            return Ok(None);
        }
        let speed = args.speed.ok_or_else(|| {
            CliError::InvalidArgument("--speed is required when a route is given".to_string())
        })?;
        let start = args.start.unwrap_or_else(TimeOfDay::now);

        Self::new(args.waypoints.clone(), start, speed, file).map(Some)
    }

    pub fn new(
        waypoints: Vec<GeoPoint>,
        start: TimeOfDay,
        speed_knots: f64,
        file: &ConfigFile,
    ) -> Result<Self, CliError> {
        let route = Route::new(waypoints)?;
        if route.len() < 2 {
            return Err(CliError::InvalidArgument(
                "a route needs at least two distinct waypoints".to_string(),
            ));
        }
        let eta = EtaTable::build(&route, start, speed_knots)?;

        let extension_m = file.navigation.crossing_extension_m;
        let gates = route
            .waypoints()
            .windows(3)
            .enumerate()
            .filter_map(|(i, leg)| {
                CrossingOutline::at_turn(leg[0], leg[1], leg[2], extension_m)
                    .map(|outline| (i + 1, GateCrossing::new(outline)))
            })
            .collect();

        Ok(Self {
            eta,
            progress: RouteProgress::new(route),
            gates,
            estimator: NavigationEstimator::new(file.estimator_config()),
        })
    }

    pub fn eta(&self) -> &EtaTable {
        &self.eta
    }

    /// Advance the plan with a new fix.
    pub fn update(&mut self, position: &Position, now: TimeOfDay) -> PlanReport {
        let point = position.point();

        let crossed = self
            .gates
            .iter_mut()
            .filter_map(|(index, gate)| (gate.update(point) == GateEvent::Crossed).then_some(*index))
            .collect();

        let target = self.progress.update(point);
        let finished = self.progress.is_finished();
        let delay = if finished {
            None
        } else {
            self.estimator
                .estimate_from_position(&self.eta, target, position, now)
                .ok()
        };

        PlanReport {
            target,
            crossed,
            finished,
            delay,
        }
    }
}

/// Run the monitor command.
pub fn run(args: MonitorArgs, runner: CliRunner) -> Result<(), CliError> {
    runner.log_startup("monitor");
    let (url, listener_config) = resolve_listener(&args, runner.config())?;
    let mut plan = VoyagePlan::from_args(&args, runner.config())?;

    println!("Sealane Feed Monitor v{}", sealane::VERSION);
    println!("==========================");
    println!();
    println!("Relay:  {} ({})", url, listener_config.format);
    if let Some(plan) = &plan {
        println!("Route:");
        for (index, entry) in plan.eta().iter().enumerate() {
            println!(
                "  WP{:<3} {}  planned {}",
                index, entry.waypoint, entry.planned_arrival
            );
        }
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = runner.runtime()?;
    let cancel = runner.shutdown_token()?;

    runtime.block_on(follow_feed(url, listener_config, plan.as_mut(), cancel))
}

async fn follow_feed(
    url: String,
    config: ListenerConfig,
    mut plan: Option<&mut VoyagePlan>,
    cancel: CancellationToken,
) -> Result<(), CliError> {
    let store = LiveFeedStore::new();
    let listener = FeedListener::new(WebSocketConnector::new(url.clone()), store.clone(), config);
    let mut events = listener.subscribe();

    if tracing::enabled!(Level::DEBUG) {
        spawn_position_logger(store, cancel.child_token(), DEFAULT_LOG_INTERVAL);
    }

    listener.start();

    let mut halt_check = tokio::time::interval(HALT_POLL_INTERVAL);
    let outcome = loop {
        tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            event = events.recv() => match event {
                Ok(FeedEvent::Connected) => println!("Connected to {}", url),
                Ok(FeedEvent::PositionUpdated(position)) => {
                    let report = plan
                        .as_deref_mut()
                        .map(|plan| plan.update(&position, TimeOfDay::now()));
                    print_fix(&position, report.as_ref());
                }
                Ok(FeedEvent::Disconnected) => println!("Disconnected from {}", url),
                Ok(FeedEvent::Error(kind)) => println!("Feed error: {}", kind),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Monitor fell behind the feed");
                }
                Err(RecvError::Closed) => break Ok(()),
            },
            _ = halt_check.tick() => {
                if !listener.is_running() {
                    break Err(CliError::FeedHalted { url: url.clone() });
                }
            }
        }
    };

    listener.stop();
    cancel.cancel();
    outcome
}

fn print_fix(position: &Position, report: Option<&PlanReport>) {
    let mut line = format!(
        "{}  {}  {}  {}",
        TimeOfDay::now(),
        position.point(),
        format_optional(position.speed_over_ground(), 1, " kn"),
        format_optional(position.course_over_ground(), 0, "°"),
    );

    if let Some(report) = report {
        for index in &report.crossed {
            println!("Crossed gate at WP{}", index);
        }
        if report.finished {
            line.push_str("  route complete");
        } else {
            line.push_str(&format!("  -> WP{}", report.target));
            if let Some(delay) = &report.delay {
                line.push_str(&format_delay(delay));
            }
        }
    }

    println!("{}", line);
}

fn format_delay(delay: &DelayResult) -> String {
    match delay.predicted_arrival {
        Some(arrival) => format!(
            "  {:.2} NM  ETA {}  {} {}  throttle {:+.2}",
            delay.remaining_distance_nm,
            arrival,
            if delay.is_late { "late" } else { "early" },
            delay.formatted_delay,
            delay.throttle_alert,
        ),
        None => format!("  {:.2} NM  stopped", delay.remaining_distance_nm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> MonitorArgs {
        MonitorArgs {
            url: None,
            format: None,
            stale_threshold: None,
            waypoints: Vec::new(),
            start: None,
            speed: None,
        }
    }

    fn noon() -> TimeOfDay {
        TimeOfDay::from_hms_milli(12, 0, 0, 0).unwrap()
    }

    /// North 0.6 NM, then east.
    fn dogleg() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(59.0, 18.0),
            GeoPoint::new(59.01, 18.0),
            GeoPoint::new(59.01, 18.02),
        ]
    }

    #[test]
    fn test_listener_defaults_from_config() {
        let (url, config) = resolve_listener(&args(), &ConfigFile::default()).unwrap();
        assert_eq!(url, "ws://localhost:3001");
        assert_eq!(config.stale_threshold, Duration::from_secs(5));
    }

    #[test]
    fn test_listener_rejects_http_url() {
        let mut args = args();
        args.url = Some("http://localhost:3001".to_string());
        assert!(resolve_listener(&args, &ConfigFile::default()).is_err());
    }

    #[test]
    fn test_listener_rejects_zero_stale_threshold() {
        let mut args = args();
        args.stale_threshold = Some(0.0);
        assert!(resolve_listener(&args, &ConfigFile::default()).is_err());
    }

    #[test]
    fn test_listener_rejects_overflowing_stale_threshold() {
        let mut args = args();
        args.stale_threshold = Some(1e30);
        let result = resolve_listener(&args, &ConfigFile::default());
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_no_waypoints_means_no_plan() {
        let plan = VoyagePlan::from_args(&args(), &ConfigFile::default()).unwrap();
        assert!(plan.is_none());
    }

    #[test]
    fn test_route_requires_speed() {
        let mut args = args();
        args.waypoints = dogleg();
        assert!(VoyagePlan::from_args(&args, &ConfigFile::default()).is_err());
    }

    #[test]
    fn test_single_waypoint_rejected() {
        let result = VoyagePlan::new(
            vec![GeoPoint::new(59.0, 18.0)],
            noon(),
            5.0,
            &ConfigFile::default(),
        );
        assert!(matches!(result, Err(CliError::InvalidArgument(_))));
    }

    #[test]
    fn test_plan_has_gate_at_turn() {
        let plan = VoyagePlan::new(dogleg(), noon(), 5.0, &ConfigFile::default()).unwrap();
        assert_eq!(plan.gates.len(), 1);
        assert_eq!(plan.gates[0].0, 1);
        assert_eq!(plan.eta().len(), 3);
    }

    #[test]
    fn test_update_reports_delay_to_target() {
        let mut plan = VoyagePlan::new(dogleg(), noon(), 5.0, &ConfigFile::default()).unwrap();
        let position = Position::new(59.002, 18.0).unwrap().with_speed_knots(5.0);

        let report = plan.update(&position, noon());

        assert_eq!(report.target, 1);
        assert!(!report.finished);
        assert!(report.crossed.is_empty());
        let delay = report.delay.unwrap();
        assert!(delay.is_reachable());
        assert!(delay.remaining_distance_nm > 0.4 && delay.remaining_distance_nm < 0.5);
    }

    #[test]
    fn test_stopped_vessel_formats_as_stopped() {
        let mut plan = VoyagePlan::new(dogleg(), noon(), 5.0, &ConfigFile::default()).unwrap();
        let position = Position::new(59.002, 18.0).unwrap();

        let report = plan.update(&position, noon());
        let text = format_delay(&report.delay.unwrap());
        assert!(text.ends_with("stopped"));
    }
}
