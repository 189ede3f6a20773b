use nalgebra::{Matrix3, RealField, Rotation3, Scalar, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    estimator::{Estimate, FeatureSets},
    frame::{Framed, RotationFramed, frames},
    measurement::PointCloud,
};

/// Axis convention of the published odometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputConvention {
    /// z forward, x left, y up.
    #[default]
    Yzx,
    /// x forward, y left, z up, as estimated.
    Native,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub convention: OutputConvention,
    pub parent_frame: String,
    pub child_frame: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            convention: Default::default(),
            parent_frame: "camera_init".to_owned(),
            child_frame: "laser_odom".to_owned(),
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parent_frame.is_empty() || self.child_frame.is_empty() {
            return Err(ConfigError::Invalid(
                "output frame ids must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Odometry<T: Scalar> {
    pub timestamp: T,
    pub orientation: UnitQuaternion<T>,
    pub position: Vector3<T>,
    pub parent_frame: String,
    pub child_frame: String,
}

impl<T: RealField> PartialEq for Odometry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.orientation == other.orientation
            && self.position == other.position
            && self.parent_frame == other.parent_frame
            && self.child_frame == other.child_frame
    }
}

/// What the driver emits for every consumed scan.
#[derive(Debug, Clone)]
pub struct FusionOutput<T: Scalar> {
    pub odometry: Odometry<T>,
    /// Stamped with the scan, in the output convention.
    pub features: FeatureSets<T>,
    pub velocity: Vector3<T>,
}

/// Maps estimates onto the published convention.
#[derive(Debug, Clone)]
pub struct OutputAdapter<T: Scalar> {
    axes: RotationFramed<T, fn(frames::World) -> frames::Output>,
    config: OutputConfig,
}

impl<T: RealField> OutputAdapter<T> {
    pub fn new(config: OutputConfig) -> Self {
        let axes = match config.convention {
            OutputConvention::Native => Rotation3::identity(),
            // (x, y, z) -> (y, z, x)
            OutputConvention::Yzx => Rotation3::from_matrix_unchecked(Matrix3::new(
                T::zero(),
                T::one(),
                T::zero(),
                T::zero(),
                T::zero(),
                T::one(),
                T::one(),
                T::zero(),
                T::zero(),
            )),
        };
        Self {
            axes: Framed::new_transform(axes, frames::World, frames::Output),
            config,
        }
    }

    pub fn convention(&self) -> OutputConvention {
        self.config.convention
    }

    pub fn position(&self, position: Vector3<T>) -> Vector3<T> {
        (Framed::new_with_frame(position, frames::World) * self.axes.clone()).into_inner()
    }

    /// The same rotation seen from the output axes, `M·q·Mᵀ`.
    pub fn orientation(&self, orientation: &UnitQuaternion<T>) -> UnitQuaternion<T> {
        let axes = UnitQuaternion::from_rotation_matrix(&self.axes);
        &axes * orientation * axes.inverse()
    }

    pub fn points(&self, points: PointCloud<T>) -> PointCloud<T> {
        points
            .into_iter()
            .map(|point| point.map_position(|position| &*self.axes * position))
            .collect()
    }

    pub fn adapt(&self, estimate: Estimate<T>) -> FusionOutput<T> {
        let Estimate {
            timestamp,
            pose,
            velocity,
            features,
        } = estimate;
        let pose = pose.into_inner();

        FusionOutput {
            odometry: Odometry {
                timestamp,
                orientation: self.orientation(&UnitQuaternion::from_rotation_matrix(&pose.rotation)),
                position: self.position(pose.translation.vector),
                parent_frame: self.config.parent_frame.clone(),
                child_frame: self.config.child_frame.clone(),
            },
            features: FeatureSets {
                corner: self.points(features.corner),
                surface: self.points(features.surface),
                outlier: self.points(features.outlier),
            },
            velocity: self.position(velocity),
        }
    }
}
