use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, preintegration};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Magnitude of gravity, m/s².
    pub gravity: f64,
    pub initial_accel_bias: [f64; 3],
    pub initial_gyro_bias: [f64; 3],
    pub initial_variance: InitialVariance,
    pub preintegration: preintegration::Config,
}

/// Diagonal of the error covariance right after initialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialVariance {
    pub position: f64,
    pub velocity: f64,
    pub attitude: f64,
    pub accel_bias: f64,
    pub gyro_bias: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gravity: 9.81,
            initial_accel_bias: [0.0; 3],
            initial_gyro_bias: [0.0; 3],
            initial_variance: Default::default(),
            preintegration: Default::default(),
        }
    }
}

impl Default for InitialVariance {
    fn default() -> Self {
        Self {
            position: 0.0,
            velocity: 1e-4,
            attitude: 1e-4,
            accel_bias: 1e-6,
            gyro_bias: 1e-8,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "gravity must be positive, got {}",
                self.gravity
            )));
        }
        let InitialVariance {
            position,
            velocity,
            attitude,
            accel_bias,
            gyro_bias,
        } = &self.initial_variance;
        if [position, velocity, attitude, accel_bias, gyro_bias]
            .into_iter()
            .any(|variance| !(variance.is_finite() && *variance >= 0.0))
        {
            return Err(ConfigError::Invalid(
                "initial variances must be finite and non-negative".to_owned(),
            ));
        }
        self.preintegration.validate()
    }
}
