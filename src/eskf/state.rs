use fusion_odometry_macros::KFState;
use nalgebra::{DimName, DimNameSum, Scalar};

pub mod common;

use common::*;

pub trait KFState {
    type Element: Scalar;
    type Dim: DimName;
}

pub type StateDim<S> = <S as KFState>::Dim;

/// # Overview
/// ```text
/// ├────┬─ Superstate ─┬────┤
///      ├── Substate ──┤
///      │              │
///      Offset         EndOffset
/// ├────╯              │
/// ├───────────────────╯
/// ```
pub trait SubStateOf<Super: KFState>: KFState {
    type Offset: DimName;
}

/// The `Offset` of the `SubState` in the `Super`.
/// See also [`SubStateOf`].
pub type SubStateOffset<S, Super> = <S as SubStateOf<Super>>::Offset;

/// The `Offset` of the end of the `SubState` in the `Super`.
/// See also [`SubStateOf`].
pub type SubStateEndOffset<S, Super> = DimNameSum<<S as SubStateOf<Super>>::Offset, StateDim<S>>;

/// The 15-dimensional error state the filter core linearizes about.
///
/// ```text
/// ├─ δp ─┼─ δv ─┼─ δθ ─┼─ δba ─┼─ δbg ─┤
/// 0      3      6      9       12      15
/// ```
#[derive(KFState)]
#[element(T)]
pub struct ErrorState<T: Scalar> {
    pub position: PositionState<T>,
    pub velocity: VelocityState<T>,
    pub attitude: AttitudeState<T>,
    pub accel_bias: AccelBiasState<T>,
    pub gyro_bias: GyroBiasState<T>,
}

/// The 18-dimensional noise injected by one midpoint step.
///
/// Measurement noise enters twice, once for the sample that opens the step
/// and once for the sample that closes it.
#[derive(KFState)]
#[element(T)]
pub struct NoiseState<T: Scalar> {
    pub accel_start: AccelNoiseState<T, marker::StepStart>,
    pub gyro_start: GyroNoiseState<T, marker::StepStart>,
    pub accel_end: AccelNoiseState<T, marker::StepEnd>,
    pub gyro_end: GyroNoiseState<T, marker::StepEnd>,
    pub accel_walk: AccelWalkState<T>,
    pub gyro_walk: GyroWalkState<T>,
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestT = f64;

    type ErrorOffset<S> = SubStateOffset<S, ErrorState<TestT>>;
    type ErrorEndOffset<S> = SubStateEndOffset<S, ErrorState<TestT>>;
    type NoiseOffset<S> = SubStateOffset<S, NoiseState<TestT>>;

    #[test]
    fn test_error_state_layout() {
        assert_eq!(StateDim::<ErrorState<TestT>>::DIM, 15);

        assert_eq!(ErrorOffset::<PositionState<TestT>>::DIM, 0);
        assert_eq!(ErrorEndOffset::<PositionState<TestT>>::DIM, 3);
        assert_eq!(ErrorOffset::<VelocityState<TestT>>::DIM, 3);
        assert_eq!(ErrorOffset::<AttitudeState<TestT>>::DIM, 6);
        assert_eq!(ErrorOffset::<AccelBiasState<TestT>>::DIM, 9);
        assert_eq!(ErrorOffset::<GyroBiasState<TestT>>::DIM, 12);
        assert_eq!(ErrorEndOffset::<GyroBiasState<TestT>>::DIM, 15);
    }

    #[test]
    fn test_noise_state_layout() {
        assert_eq!(StateDim::<NoiseState<TestT>>::DIM, 18);

        assert_eq!(
            NoiseOffset::<AccelNoiseState<TestT, marker::StepStart>>::DIM,
            0
        );
        assert_eq!(
            NoiseOffset::<GyroNoiseState<TestT, marker::StepStart>>::DIM,
            3
        );
        assert_eq!(NoiseOffset::<AccelNoiseState<TestT, marker::StepEnd>>::DIM, 6);
        assert_eq!(NoiseOffset::<GyroNoiseState<TestT, marker::StepEnd>>::DIM, 9);
        assert_eq!(NoiseOffset::<AccelWalkState<TestT>>::DIM, 12);
        assert_eq!(NoiseOffset::<GyroWalkState<TestT>>::DIM, 15);
    }
}
