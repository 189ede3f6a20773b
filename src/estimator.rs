//! The filter core the [`Fusion`](crate::fusion::Fusion) driver feeds.

mod config;
mod preintegrated;

use nalgebra::{RealField, Scalar, Vector3};

pub use config::{Config, InitialVariance};
pub use preintegrated::PreintegratedEstimator;

use crate::{
    frame::{IsometryFramed, frames},
    measurement::{ImuMeasured, PointCloud, ScanInfo},
};

/// One propagation step, from the estimator time to `timestamp`.
#[derive(Debug, Clone)]
pub struct ImuStep<'a, T: Scalar> {
    pub dt: T,
    /// The end of the step, where the estimator time lands.
    pub timestamp: T,
    pub measured: &'a ImuMeasured<T>,
}

/// A scan together with its companions, joined at `timestamp`.
#[derive(Debug, Clone)]
pub struct ScanFrame<'a, T: Scalar> {
    pub timestamp: T,
    /// The most recent inertial sample buffered when the scan is handed over.
    pub last_imu: &'a ImuMeasured<T>,
    /// The sample closing the step that landed on the scan. The next interval
    /// starts from it.
    pub closing_imu: &'a ImuMeasured<T>,
    pub scan: &'a PointCloud<T>,
    pub info: &'a ScanInfo<T>,
    pub outlier: &'a PointCloud<T>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSets<T: Scalar> {
    /// Points off the ground.
    pub corner: PointCloud<T>,
    /// Ground points.
    pub surface: PointCloud<T>,
    pub outlier: PointCloud<T>,
}

impl<T: Scalar> Default for FeatureSets<T> {
    fn default() -> Self {
        Self {
            corner: Vec::new(),
            surface: Vec::new(),
            outlier: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Estimate<T: Scalar> {
    pub timestamp: T,
    pub pose: IsometryFramed<T, fn(frames::Vehicle) -> frames::World>,
    pub velocity: Vector3<T>,
    pub features: FeatureSets<T>,
}

/// # Contract
/// ```text
///   time ──process_imu──> time + dt ── ... ──> scan time ──process_scan──> Estimate
/// ```
/// `time` never decreases. Steps arrive in timestamp order and the last one
/// before a scan ends exactly at the scan timestamp.
pub trait Estimator<T: RealField> {
    fn time(&self) -> T;

    fn process_imu(&mut self, step: ImuStep<'_, T>);

    /// Corrects the state with a scan. The first call initializes the estimator.
    fn process_scan(&mut self, frame: ScanFrame<'_, T>) -> Estimate<T>;
}
