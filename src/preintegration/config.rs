use nalgebra::RealField;
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    eskf::{
        Covariance, NoiseState,
        state::common::{marker::*, *},
    },
};

/// Standard deviations of the inertial sensor, squared when building the step noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Accelerometer white noise, m/s².
    pub accel: f64,
    /// Gyroscope white noise, rad/s.
    pub gyro: f64,
    /// Accelerometer bias random walk.
    pub accel_walk: f64,
    /// Gyroscope bias random walk.
    pub gyro_walk: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            accel: 1e-4,
            gyro: 1e-4,
            accel_walk: 1e-8,
            gyro_walk: 1e-8,
        }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self {
            accel,
            gyro,
            accel_walk,
            gyro_walk,
        } = self;
        [
            ("accel", accel),
            ("gyro", gyro),
            ("accel_walk", accel_walk),
            ("gyro_walk", gyro_walk),
        ]
        .into_iter()
        .try_for_each(|(name, value)| {
            if value.is_finite() && *value >= 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "noise.{name} must be finite and non-negative, got {value}"
                )))
            }
        })
    }
}

impl<T: RealField> From<&NoiseConfig> for Covariance<NoiseState<T>> {
    fn from(value: &NoiseConfig) -> Self {
        let variance = |std: f64| -> T { nalgebra::convert(std * std) };
        let mut cov = Self::default();

        cov.sub_covariance_mut::<AccelNoiseState<T, StepStart>>()
            .fill_diagonal(variance(value.accel));
        cov.sub_covariance_mut::<GyroNoiseState<T, StepStart>>()
            .fill_diagonal(variance(value.gyro));
        cov.sub_covariance_mut::<AccelNoiseState<T, StepEnd>>()
            .fill_diagonal(variance(value.accel));
        cov.sub_covariance_mut::<GyroNoiseState<T, StepEnd>>()
            .fill_diagonal(variance(value.gyro));
        cov.sub_covariance_mut::<AccelWalkState<T>>()
            .fill_diagonal(variance(value.accel_walk));
        cov.sub_covariance_mut::<GyroWalkState<T>>()
            .fill_diagonal(variance(value.gyro_walk));

        cov
    }
}

/// How the averaged angular rate of a step turns into a rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationIncrement {
    /// `q ⊗ (1, w·dt/2)`, renormalized. First order, fine for short steps.
    #[default]
    SmallAngle,
    /// `q ⊗ exp(w·dt)`.
    Exact,
}

/// Bias drift beyond which an interval is re-integrated about the new bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebaseThreshold {
    /// m/s²
    pub accel: f64,
    /// rad/s
    pub gyro: f64,
}

impl Default for RebaseThreshold {
    fn default() -> Self {
        Self {
            accel: 0.10,
            gyro: 0.01,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub noise: NoiseConfig,
    pub rotation_increment: RotationIncrement,
    pub rebase_threshold: RebaseThreshold,
    /// Samples kept for replay, unbounded when absent.
    pub max_history: Option<usize>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.noise.validate()?;

        let RebaseThreshold { accel, gyro } = &self.rebase_threshold;
        if !(*accel > 0.0 && *gyro > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rebase_threshold must be positive, got accel {accel} gyro {gyro}"
            )));
        }
        if self.max_history == Some(0) {
            return Err(ConfigError::Invalid(
                "max_history must keep at least one sample".to_owned(),
            ));
        }
        Ok(())
    }
}
