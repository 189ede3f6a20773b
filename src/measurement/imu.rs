use nalgebra::{RealField, Rotation3, Scalar, Vector3};

use crate::frame::{Framed, ImuFramed, RotationFramed, VehicleFramed, frames};

/// One raw inertial sample: specific force and angular rate.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuMeasured<T: Scalar> {
    pub acc: Vector3<T>,
    pub gyr: Vector3<T>,
}

impl<T: Scalar> ImuMeasured<T> {
    pub fn new(acc_x: T, acc_y: T, acc_z: T, gyr_x: T, gyr_y: T, gyr_z: T) -> Self {
        Self {
            acc: Vector3::new(acc_x, acc_y, acc_z),
            gyr: Vector3::new(gyr_x, gyr_y, gyr_z),
        }
    }

    pub fn from_vectors(acc: Vector3<T>, gyr: Vector3<T>) -> Self {
        Self { acc, gyr }
    }
}

impl<T: RealField> ImuMeasured<T> {
    pub fn zeros() -> Self {
        Self::from_vectors(Vector3::zeros(), Vector3::zeros())
    }
}

impl<T: RealField> Default for ImuMeasured<T> {
    fn default() -> Self {
        Self::zeros()
    }
}

/// Rotates samples from the IMU axes onto the vehicle axes.
///
/// Both frames share roll and pitch, they differ only by a small yaw
/// misalignment of the mounting.
#[derive(Debug, Clone)]
pub struct ImuAlignment<T: Scalar> {
    imu_to_vehicle: RotationFramed<T, fn(frames::Imu) -> frames::Vehicle>,
}

impl<T: RealField> ImuAlignment<T> {
    /// `yaw` is the angle of the IMU axes in the vehicle frame, radians.
    pub fn from_yaw(yaw: T) -> Self {
        let misalignment = Rotation3::from_euler_angles(T::zero(), T::zero(), yaw);
        Self {
            imu_to_vehicle: Framed::new_transform(
                misalignment.inverse(),
                frames::Imu,
                frames::Vehicle,
            ),
        }
    }

    pub fn identity() -> Self {
        Self::from_yaw(T::zero())
    }

    pub fn align(&self, raw: ImuFramed<ImuMeasured<T>>) -> VehicleFramed<ImuMeasured<T>> {
        let ImuMeasured { acc, gyr } = raw.into_inner();
        let acc = Framed::new_with_frame(acc, frames::Imu) * self.imu_to_vehicle.clone();
        let gyr = Framed::new_with_frame(gyr, frames::Imu) * self.imu_to_vehicle.clone();
        Framed::new(ImuMeasured::from_vectors(acc.into_inner(), gyr.into_inner()))
    }
}

impl<T: RealField> Default for ImuAlignment<T> {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    type TestT = f64;

    #[test]
    fn test_identity_alignment() {
        let raw = ImuMeasured::<TestT>::new(0.1, 0.2, 9.81, 0.01, 0.02, 0.03);
        let aligned = ImuAlignment::identity().align(Framed::new(raw.clone()));
        assert_relative_eq!(aligned.acc, raw.acc);
        assert_relative_eq!(aligned.gyr, raw.gyr);
    }

    #[test]
    fn test_yaw_misalignment() {
        let alignment = ImuAlignment::<TestT>::from_yaw(90f64.to_radians());
        let raw = ImuMeasured::new(1.0, 0.0, 9.81, 0.0, 0.0, 0.5);
        let aligned = alignment.align(Framed::new(raw));

        // rotated back by the mounting yaw
        assert_relative_eq!(aligned.acc, Vector3::new(0.0, -1.0, 9.81), epsilon = 1e-12);
        assert_relative_eq!(aligned.gyr, Vector3::new(0.0, 0.0, 0.5), epsilon = 1e-12);
    }
}
