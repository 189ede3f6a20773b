use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, estimator};

use super::output::OutputConfig;

/// Everything the driver reads once at startup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Yaw of the IMU axes in the vehicle frame, degrees.
    pub imu_misalign_yaw: f64,
    pub buffers: BufferConfig,
    pub join: JoinPolicy,
    pub output: OutputConfig,
    pub estimator: estimator::Config,
}

/// Advisory capacities of the four stream buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub imu: usize,
    pub scan: usize,
    pub scan_info: usize,
    pub outlier: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            imu: 500,
            scan: 3,
            scan_info: 3,
            outlier: 3,
        }
    }
}

/// How the scan info and outlier streams are matched to a scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum JoinPolicy {
    /// The first entry after the estimator time, wherever it lies.
    #[default]
    FirstAfter,
    /// An entry within `tolerance` seconds of the scan.
    Window { tolerance: f64 },
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parses and validates.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.imu_misalign_yaw.is_finite() {
            return Err(ConfigError::Invalid(
                "imu_misalign_yaw must be finite".to_owned(),
            ));
        }
        if let JoinPolicy::Window { tolerance } = self.join {
            if !(tolerance.is_finite() && tolerance >= 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "join tolerance must be finite and non-negative, got {tolerance}"
                )));
            }
        }
        self.output.validate()?;
        self.estimator.validate()
    }
}
