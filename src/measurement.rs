mod buffer;
mod imu;
mod scan;

use std::ops::{Deref, DerefMut};

pub use buffer::MeasurementBuffer;
pub use imu::{ImuAlignment, ImuMeasured};
pub use scan::{LidarPoint, PointCloud, ScanInfo};

/// A value together with the instant it was taken at.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamped<T, V> {
    pub timestamp: T,
    pub value: V,
}

impl<T, V> Stamped<T, V> {
    pub const fn new(timestamp: T, value: V) -> Self {
        Self { timestamp, value }
    }

    pub fn from_tuple((timestamp, value): (T, V)) -> Self {
        Self::new(timestamp, value)
    }

    pub fn into_tuple(self) -> (T, V) {
        (self.timestamp, self.value)
    }
}

impl<T, V> From<(T, V)> for Stamped<T, V> {
    fn from(value: (T, V)) -> Self {
        Self::from_tuple(value)
    }
}

impl<T, V> Deref for Stamped<T, V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

impl<T, V> DerefMut for Stamped<T, V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.value
    }
}
