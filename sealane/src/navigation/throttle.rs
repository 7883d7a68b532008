//! Throttle alert shaping.
//!
//! Maps a schedule delay in seconds to a correction signal in [-1, +1]:
//! positive when late (speed up), negative when early (ease off).

use std::str::FromStr;

use thiserror::Error;

/// Delay at which the alert saturates (5 minutes).
pub const DEFAULT_THROTTLE_THRESHOLD_SECS: f64 = 300.0;

/// Exponent of the power-law shape.
pub const DEFAULT_THROTTLE_EXPONENT: f64 = 0.3;

/// Shape of the delay to alert mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottlePolicy {
    /// `(min(|d|, threshold) / threshold) ^ exponent`.
    ///
    /// An exponent below 1 makes small delays produce a strong signal.
    PowerLaw { threshold_secs: f64, exponent: f64 },

    /// `min(|d|, threshold) / threshold`.
    Linear { threshold_secs: f64 },
}

impl ThrottlePolicy {
    pub fn power_law(threshold_secs: f64, exponent: f64) -> Self {
        Self::PowerLaw {
            threshold_secs,
            exponent,
        }
    }

    pub fn linear(threshold_secs: f64) -> Self {
        Self::Linear { threshold_secs }
    }

    pub fn threshold_secs(&self) -> f64 {
        match *self {
            Self::PowerLaw { threshold_secs, .. } | Self::Linear { threshold_secs } => {
                threshold_secs
            }
        }
    }

    /// Alert for a signed delay (positive = late).
    ///
    /// Zero or non-finite delays give 0. Magnitude reaches exactly 1 at the
    /// threshold and stays there.
    pub fn alert(&self, raw_delay_secs: f64) -> f64 {
        if raw_delay_secs == 0.0 || !raw_delay_secs.is_finite() {
            return 0.0;
        }

        let threshold = self.threshold_secs();
        let ratio = if threshold > 0.0 {
            raw_delay_secs.abs().min(threshold) / threshold
        } else {
            1.0
        };

        let magnitude = match *self {
            Self::PowerLaw { exponent, .. } => ratio.powf(exponent),
            Self::Linear { .. } => ratio,
        };

        magnitude.copysign(raw_delay_secs)
    }

    /// Configuration name of the shape.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PowerLaw { .. } => "power",
            Self::Linear { .. } => "linear",
        }
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::power_law(DEFAULT_THROTTLE_THRESHOLD_SECS, DEFAULT_THROTTLE_EXPONENT)
    }
}

/// Name of a throttle shape without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThrottleShape {
    #[default]
    Power,
    Linear,
}

impl std::fmt::Display for ThrottleShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Power => write!(f, "power"),
            Self::Linear => write!(f, "linear"),
        }
    }
}

impl ThrottleShape {
    /// Combine the shape with its parameters.
    pub fn with_parameters(self, threshold_secs: f64, exponent: f64) -> ThrottlePolicy {
        match self {
            Self::Power => ThrottlePolicy::power_law(threshold_secs, exponent),
            Self::Linear => ThrottlePolicy::linear(threshold_secs),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown throttle policy '{0}' (expected power or linear)")]
pub struct UnknownThrottleShape(pub String);

impl FromStr for ThrottleShape {
    type Err = UnknownThrottleShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "power" | "power-law" | "powerlaw" => Ok(Self::Power),
            "linear" => Ok(Self::Linear),
            _ => Err(UnknownThrottleShape(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_is_zero() {
        assert_eq!(ThrottlePolicy::default().alert(0.0), 0.0);
        assert_eq!(ThrottlePolicy::linear(300.0).alert(0.0), 0.0);
    }

    #[test]
    fn test_saturates_at_threshold() {
        let policy = ThrottlePolicy::default();
        assert_eq!(policy.alert(300.0), 1.0);
        assert_eq!(policy.alert(3600.0), 1.0);
        assert_eq!(policy.alert(-300.0), -1.0);
        assert_eq!(policy.alert(-10_000.0), -1.0);
    }

    #[test]
    fn test_power_law_front_loads_small_delays() {
        let policy = ThrottlePolicy::default();
        // (60 / 300) ^ 0.3
        let alert = policy.alert(60.0);
        assert!((alert - 0.2f64.powf(0.3)).abs() < 1e-12);
        assert!(alert > 0.6 && alert < 0.62);
        assert!(policy.alert(60.0) > ThrottlePolicy::linear(300.0).alert(60.0));
    }

    #[test]
    fn test_magnitude_monotonic_in_delay() {
        for policy in [ThrottlePolicy::default(), ThrottlePolicy::linear(300.0)] {
            let mut previous = 0.0;
            for step in 1..=400 {
                let delay = step as f64;
                let late = policy.alert(delay);
                let early = policy.alert(-delay);
                assert!(late >= previous, "{} at {}s", policy.name(), delay);
                assert_eq!(early, -late);
                previous = late;
            }
        }
    }

    #[test]
    fn test_linear_shape() {
        let policy = ThrottlePolicy::linear(300.0);
        assert!((policy.alert(150.0) - 0.5).abs() < 1e-12);
        assert!((policy.alert(-30.0) + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_non_finite_delay() {
        assert_eq!(ThrottlePolicy::default().alert(f64::NAN), 0.0);
        assert_eq!(ThrottlePolicy::default().alert(f64::INFINITY), 0.0);
    }

    #[test]
    fn test_shape_from_str() {
        assert_eq!("power".parse::<ThrottleShape>(), Ok(ThrottleShape::Power));
        assert_eq!("Linear".parse::<ThrottleShape>(), Ok(ThrottleShape::Linear));
        assert!("cubic".parse::<ThrottleShape>().is_err());
        assert_eq!(
            ThrottleShape::Linear.with_parameters(120.0, 0.3),
            ThrottlePolicy::linear(120.0)
        );
    }
}
