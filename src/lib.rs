#![deny(clippy::unwrap_used)]
#![deny(unused_must_use)]
pub mod error;
pub mod eskf;
pub mod estimator;
pub mod frame;
pub mod fusion;
pub mod measurement;
pub mod preintegration;
mod utils;

pub use error::{ConfigError, PreintegrationError, Stream, SyncError};
pub use estimator::{Estimate, Estimator, FeatureSets, PreintegratedEstimator};
pub use fusion::{Config, Fusion, FusionOutput, Odometry};
pub use measurement::{ImuMeasured, LidarPoint, MeasurementBuffer, PointCloud, ScanInfo};
pub use preintegration::{ImuBias, Preintegration, RelativeMotion};
pub use utils::{RunningMean, ToRadians};
