use nalgebra::{IsometryMatrix3, Rotation3, Vector3};

use super::Framed;

/// The inertial sensor's own axes.
#[derive(Debug)]
pub struct Imu;

/// The platform's axes: x forward, y left, z up.
#[derive(Debug)]
pub struct Vehicle;

/// The odometry origin, sharing the vehicle's axis convention.
#[derive(Debug)]
pub struct World;

/// The axis convention expected by downstream consumers of the odometry.
#[derive(Debug)]
pub struct Output;

pub type ImuFramed<T> = Framed<T, Imu>;
pub type VehicleFramed<T> = Framed<T, Vehicle>;
pub type WorldFramed<T> = Framed<T, World>;

pub type RotationFramed<T, F> = Framed<Rotation3<T>, F>;
pub type IsometryFramed<T, F> = Framed<IsometryMatrix3<T>, F>;

pub type ImuVector<T> = ImuFramed<Vector3<T>>;
pub type VehicleVector<T> = VehicleFramed<Vector3<T>>;
