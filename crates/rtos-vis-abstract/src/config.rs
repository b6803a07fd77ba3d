use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("speed must be a finite non-negative multiplier, got {0}")]
    InvalidSpeed(f64),
}

/// Tunables of the CAN workload. Changes apply from the next simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskParameters {
    /// Mean time between two interrupts; jitter is 20% of this.
    pub mean_interval: f64,
    /// Time the receive task needs per interrupt.
    pub receive_duration: f64,
    /// Time the parsing task needs per message.
    pub parsing_duration: f64,
}

impl Default for TaskParameters {
    fn default() -> Self {
        Self {
            mean_interval: 3.0,
            receive_duration: 1.0,
            parsing_duration: 0.5,
        }
    }
}

impl TaskParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("mean_interval", self.mean_interval),
            ("receive_duration", self.receive_duration),
            ("parsing_duration", self.parsing_duration),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Width of the visible (and retained) time range, in seconds.
    pub window_size: f64,
    /// Simulated seconds per wall-clock second.
    pub speed: f64,
    pub params: TaskParameters,
    pub seed: u64,
    /// Fixed simulation step in seconds.
    pub time_slice: f64,
    /// Upper bound on wall-clock time processed per frame.
    pub max_frame_time: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            window_size: 20.0,
            speed: 1.0,
            params: TaskParameters::default(),
            seed: 0,
            time_slice: 1.0 / 120.0,
            max_frame_time: 0.25,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.params.validate()?;
        for (name, value) in [
            ("window_size", self.window_size),
            ("time_slice", self.time_slice),
            ("max_frame_time", self.max_frame_time),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(ConfigError::InvalidSpeed(self.speed));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_durations() {
        let params = TaskParameters {
            receive_duration: 0.0,
            ..Default::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::NonPositive {
                name: "receive_duration",
                value: 0.0
            })
        );

        let params = TaskParameters {
            parsing_duration: -1.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn rejects_nan_interval() {
        let params = TaskParameters {
            mean_interval: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::NonPositive {
                name: "mean_interval",
                ..
            })
        ));
    }

    #[test]
    fn rejects_negative_speed() {
        let config = SimConfig {
            speed: -2.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidSpeed(-2.0)));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
            seed = 7
            [params]
            mean_interval = 1.5
            "#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.params.mean_interval, 1.5);
        assert_eq!(config.params.receive_duration, 1.0);
        assert_eq!(config.window_size, 20.0);
    }
}
