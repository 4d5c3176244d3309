//! # Simulation Options
//!
//! [`SimulationConfig`] mirrors the `options.json` file: upper-snake keys, every key optional.
//! Raw values are stored as written (milliseconds, seconds, percent); the accessors apply the
//! deceleration factor so that agents only ever see scaled [`Duration`]s.
//!
//! ```json
//! {
//!   "SIMULATION_DECELERATION_FACTOR": 2,
//!   "ORDER_CANCELLATION_PROBABILITY": 10,
//!   "PRINT_COLORED_REPORTS": true
//! }
//! ```

use agent_fabric::FabricSettings;
use rand::Rng;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Cannot read options file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Malformed options file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid option: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct SimulationConfig {
    /// Multiplier applied to every duration and timeout.
    pub simulation_deceleration_factor: f64,
    /// Seconds; dishes projected to take longer are left off the menu.
    pub dish_cooking_time_threshold: f64,
    /// Milliseconds a resource snapshot stays fresh; also the scheduling period.
    pub kitchen_actualized_status_threshold: u64,
    pub min_new_visitor_delay: u64,
    pub max_new_visitor_delay: u64,
    /// Percent.
    pub order_cancellation_probability: u32,
    pub min_order_cancellation_delay: u64,
    pub max_order_cancellation_delay: u64,
    pub min_order_time_recognition_delay: u64,
    pub max_order_time_recognition_delay: u64,
    pub visitor_waiting_time: u64,
    pub check_operation_type_availability: bool,
    pub print_colored_reports: bool,
    /// Milliseconds an operation waits after a rejected proposal.
    pub negotiation_backoff: u64,
    pub registration_attempts: u32,
    /// Milliseconds, not scaled.
    pub registration_retry_delay: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulation_deceleration_factor: 1.0,
            dish_cooking_time_threshold: 3.0,
            kitchen_actualized_status_threshold: 500,
            min_new_visitor_delay: 250,
            max_new_visitor_delay: 1000,
            order_cancellation_probability: 25,
            min_order_cancellation_delay: 500,
            max_order_cancellation_delay: 1000,
            min_order_time_recognition_delay: 300,
            max_order_time_recognition_delay: 2000,
            visitor_waiting_time: 10_000,
            check_operation_type_availability: true,
            print_colored_reports: false,
            negotiation_backoff: 50,
            registration_attempts: 10,
            registration_retry_delay: 200,
        }
    }
}

impl SimulationConfig {
    /// Reads and validates `path`; without a path the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let factor = self.simulation_deceleration_factor;
        if factor.is_nan() || factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "SIMULATION_DECELERATION_FACTOR must be positive, got {}",
                self.simulation_deceleration_factor
            )));
        }
        if self.order_cancellation_probability > 100 {
            return Err(ConfigError::Invalid(format!(
                "ORDER_CANCELLATION_PROBABILITY is a percentage, got {}",
                self.order_cancellation_probability
            )));
        }
        if self.dish_cooking_time_threshold < 0.0 {
            return Err(ConfigError::Invalid(
                "DISH_COOKING_TIME_THRESHOLD must not be negative".into(),
            ));
        }
        for (name, min, max) in [
            ("NEW_VISITOR_DELAY", self.min_new_visitor_delay, self.max_new_visitor_delay),
            (
                "ORDER_CANCELLATION_DELAY",
                self.min_order_cancellation_delay,
                self.max_order_cancellation_delay,
            ),
            (
                "ORDER_TIME_RECOGNITION_DELAY",
                self.min_order_time_recognition_delay,
                self.max_order_time_recognition_delay,
            ),
        ] {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "MIN_{name} ({min}) is greater than MAX_{name} ({max})"
                )));
            }
        }
        if self.registration_attempts == 0 {
            return Err(ConfigError::Invalid("REGISTRATION_ATTEMPTS must be at least 1".into()));
        }
        Ok(())
    }

    pub fn factor(&self) -> f64 {
        self.simulation_deceleration_factor
    }

    /// Scales a duration given in unscaled seconds (operation times, reservations).
    pub fn scaled_seconds(&self, seconds: f64) -> f64 {
        seconds * self.factor()
    }

    /// Scaled threshold in seconds.
    pub fn dish_cooking_time_threshold(&self) -> f64 {
        self.scaled_seconds(self.dish_cooking_time_threshold)
    }

    pub fn staleness_window(&self) -> Duration {
        self.scaled_millis(self.kitchen_actualized_status_threshold)
    }

    pub fn visitor_waiting_time(&self) -> Duration {
        self.scaled_millis(self.visitor_waiting_time)
    }

    pub fn negotiation_backoff(&self) -> Duration {
        self.scaled_millis(self.negotiation_backoff)
    }

    /// Probability in `0.0..=1.0`.
    pub fn order_cancellation_probability(&self) -> f64 {
        f64::from(self.order_cancellation_probability) / 100.0
    }

    pub fn new_visitor_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        self.random_delay(rng, self.min_new_visitor_delay, self.max_new_visitor_delay)
    }

    pub fn order_cancellation_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        self.random_delay(
            rng,
            self.min_order_cancellation_delay,
            self.max_order_cancellation_delay,
        )
    }

    pub fn order_time_recognition_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        self.random_delay(
            rng,
            self.min_order_time_recognition_delay,
            self.max_order_time_recognition_delay,
        )
    }

    pub fn fabric_settings(&self) -> FabricSettings {
        FabricSettings {
            registration_attempts: self.registration_attempts,
            retry_delay: Duration::from_millis(self.registration_retry_delay),
        }
    }

    fn scaled_millis(&self, millis: u64) -> Duration {
        Duration::from_nanos((millis as f64 * self.factor() * 1e6).round() as u64)
    }

    fn random_delay<R: Rng>(&self, rng: &mut R, min: u64, max: u64) -> Duration {
        let millis = if min >= max {
            min
        } else {
            rng.random_range(min..=max)
        };
        self.scaled_millis(millis)
    }
}

/// Converts scaled seconds from the time model into a timer delay.
pub fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_options_file_defaults() {
        let config = SimulationConfig::default();
        assert_eq!(config.staleness_window(), Duration::from_millis(500));
        assert_eq!(config.visitor_waiting_time(), Duration::from_secs(10));
        assert_eq!(config.dish_cooking_time_threshold(), 3.0);
        assert!((config.order_cancellation_probability() - 0.25).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_is_scaled_by_factor() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"SIMULATION_DECELERATION_FACTOR": 2, "KITCHEN_ACTUALIZED_STATUS_THRESHOLD": 100}}"#
        )
        .expect("write");

        let config = SimulationConfig::load(Some(file.path())).expect("load");
        assert_eq!(config.staleness_window(), Duration::from_millis(200));
        assert_eq!(config.dish_cooking_time_threshold(), 6.0);
        assert_eq!(config.scaled_seconds(1.5), 3.0);
        assert_eq!(config.order_cancellation_probability, 25, "untouched keys keep defaults");
    }

    #[test]
    fn test_random_delays_stay_in_bounds() {
        let config = SimulationConfig::default();
        let mut rng = rand::rng();
        for _ in 0..100 {
            let delay = config.new_visitor_delay(&mut rng);
            assert!(delay >= Duration::from_millis(250) && delay <= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let inverted = SimulationConfig {
            min_new_visitor_delay: 10,
            max_new_visitor_delay: 5,
            ..SimulationConfig::default()
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::Invalid(_))));

        let frozen = SimulationConfig {
            simulation_deceleration_factor: 0.0,
            ..SimulationConfig::default()
        };
        assert!(frozen.validate().is_err());

        let certain = SimulationConfig {
            order_cancellation_probability: 101,
            ..SimulationConfig::default()
        };
        assert!(certain.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_reported() {
        let result = SimulationConfig::load(Some(Path::new("/definitely/not/here.json")));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
