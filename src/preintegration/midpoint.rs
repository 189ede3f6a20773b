//! One midpoint step of the preintegration, as a pure function.

use nalgebra::{Matrix3, Quaternion, RealField, Scalar, UnitQuaternion, Vector3};

use crate::{
    eskf::{
        ErrorState, NoiseJacobian, Transition,
        state::common::{marker::*, *},
    },
    measurement::ImuMeasured,
};

use super::{ImuBias, RotationIncrement};

/// Motion relative to the interval anchor, gravity not removed.
#[derive(Debug, Clone)]
pub struct RelativeMotion<T: Scalar> {
    pub delta_p: Vector3<T>,
    pub delta_q: UnitQuaternion<T>,
    pub delta_v: Vector3<T>,
    pub sum_dt: T,
}

impl<T: RealField> PartialEq for RelativeMotion<T> {
    fn eq(&self, other: &Self) -> bool {
        self.delta_p == other.delta_p
            && self.delta_q == other.delta_q
            && self.delta_v == other.delta_v
            && self.sum_dt == other.sum_dt
    }
}

impl<T: RealField> Default for RelativeMotion<T> {
    fn default() -> Self {
        Self {
            delta_p: Vector3::zeros(),
            delta_q: UnitQuaternion::identity(),
            delta_v: Vector3::zeros(),
            sum_dt: T::zero(),
        }
    }
}

/// Linearization of one step.
#[derive(Debug, Clone)]
pub struct StepJacobians<T: RealField> {
    /// `F`, the error at step end with respect to the error at step start.
    pub transition: Transition<ErrorState<T>>,
    /// `V`, the error at step end with respect to the step noise.
    pub noise: NoiseJacobian<T>,
}

/// Integrates the samples `start` and `end`, taken `dt` apart, onto `motion`.
///
/// ```text
///   w   = ½(gyr₀ + gyr₁) − bg
///   q'  = q ⊗ δq(w·dt)
///   a   = ½(q·(acc₀ − ba) + q'·(acc₁ − ba))
///   p'  = p + v·dt + ½a·dt²
///   v'  = v + a·dt
/// ```
pub fn integrate<T>(
    motion: &RelativeMotion<T>,
    start: &ImuMeasured<T>,
    end: &ImuMeasured<T>,
    bias: &ImuBias<T>,
    dt: T,
    increment: RotationIncrement,
) -> (RelativeMotion<T>, StepJacobians<T>)
where
    T: RealField,
{
    let half: T = nalgebra::convert(0.5);

    let w = (&start.gyr + &end.gyr) * half.clone() - &bias.gyro;
    let delta_q = rotate(&motion.delta_q, &w, dt.clone(), increment);

    let acc_0 = &start.acc - &bias.accel;
    let acc_1 = &end.acc - &bias.accel;
    let avg_acc = (&motion.delta_q * &acc_0 + &delta_q * &acc_1) * half.clone();

    let next = RelativeMotion {
        delta_p: &motion.delta_p
            + &motion.delta_v * dt.clone()
            + &avg_acc * (half * dt.clone() * dt.clone()),
        delta_v: &motion.delta_v + avg_acc * dt.clone(),
        sum_dt: motion.sum_dt.clone() + dt.clone(),
        delta_q,
    };

    let jacobians = StepJacobians::new(
        motion.delta_q.clone().to_rotation_matrix().into_inner(),
        next.delta_q.clone().to_rotation_matrix().into_inner(),
        acc_0.cross_matrix(),
        acc_1.cross_matrix(),
        w.cross_matrix(),
        dt,
    );

    (next, jacobians)
}

fn rotate<T: RealField>(
    delta_q: &UnitQuaternion<T>,
    w: &Vector3<T>,
    dt: T,
    increment: RotationIncrement,
) -> UnitQuaternion<T> {
    let q = match increment {
        RotationIncrement::SmallAngle => {
            let half: T = nalgebra::convert(0.5);
            let half_angle = w * (dt * half);
            delta_q.quaternion() * Quaternion::from_parts(T::one(), half_angle)
        }
        RotationIncrement::Exact => {
            (delta_q * UnitQuaternion::from_scaled_axis(w * dt)).into_inner()
        }
    };
    // keeps the product on the unit sphere
    UnitQuaternion::new_normalize(q)
}

impl<T: RealField> StepJacobians<T> {
    /// `r_0`/`r_1` rotate from the step start/end into the anchor frame,
    /// `a_0`, `a_1` and `w` are the skew matrices of the bias corrected samples.
    fn new(
        r_0: Matrix3<T>,
        r_1: Matrix3<T>,
        a_0: Matrix3<T>,
        a_1: Matrix3<T>,
        w: Matrix3<T>,
        dt: T,
    ) -> Self {
        let half: T = nalgebra::convert(0.5);
        let quarter: T = nalgebra::convert(0.25);
        let eighth: T = nalgebra::convert(0.125);
        let dt2 = dt.clone() * dt.clone();
        let dt3 = dt2.clone() * dt.clone();

        let r_sum = &r_0 + &r_1;
        let r_0_a_0 = &r_0 * &a_0;
        let r_1_a_1 = &r_1 * &a_1;
        let rotated_back = Matrix3::identity() - &w * dt.clone();
        let r_1_a_1_back = &r_1_a_1 * &rotated_back;

        let mut transition = Transition::<ErrorState<T>>::identity();

        transition
            .sensitivity_mut::<VelocityState<T>, PositionState<T>>()
            .fill_diagonal(dt.clone());
        transition
            .sensitivity_mut::<AttitudeState<T>, PositionState<T>>()
            .copy_from(&((&r_0_a_0 + &r_1_a_1_back) * -(quarter.clone() * dt2.clone())));
        transition
            .sensitivity_mut::<AccelBiasState<T>, PositionState<T>>()
            .copy_from(&(&r_sum * -(quarter.clone() * dt2.clone())));
        transition
            .sensitivity_mut::<GyroBiasState<T>, PositionState<T>>()
            .copy_from(&(&r_1_a_1 * (quarter.clone() * dt3.clone())));

        transition
            .sensitivity_mut::<AttitudeState<T>, VelocityState<T>>()
            .copy_from(&((&r_0_a_0 + &r_1_a_1_back) * -(half.clone() * dt.clone())));
        transition
            .sensitivity_mut::<AccelBiasState<T>, VelocityState<T>>()
            .copy_from(&(&r_sum * -(half.clone() * dt.clone())));
        transition
            .sensitivity_mut::<GyroBiasState<T>, VelocityState<T>>()
            .copy_from(&(&r_1_a_1 * (half.clone() * dt2.clone())));

        transition
            .sub_covariance_mut::<AttitudeState<T>>()
            .copy_from(&rotated_back);
        transition
            .sensitivity_mut::<GyroBiasState<T>, AttitudeState<T>>()
            .fill_diagonal(-dt.clone());

        let mut noise = NoiseJacobian::<T>::default();

        let p_from_gyro = &r_1_a_1 * -(eighth * dt3);
        let v_from_gyro = &r_1_a_1 * -(quarter.clone() * dt2.clone());

        noise
            .sensitivity_mut::<AccelNoiseState<T, StepStart>, PositionState<T>>()
            .copy_from(&(&r_0 * (quarter.clone() * dt2.clone())));
        noise
            .sensitivity_mut::<GyroNoiseState<T, StepStart>, PositionState<T>>()
            .copy_from(&p_from_gyro);
        noise
            .sensitivity_mut::<AccelNoiseState<T, StepEnd>, PositionState<T>>()
            .copy_from(&(&r_1 * (quarter * dt2)));
        noise
            .sensitivity_mut::<GyroNoiseState<T, StepEnd>, PositionState<T>>()
            .copy_from(&p_from_gyro);

        noise
            .sensitivity_mut::<AccelNoiseState<T, StepStart>, VelocityState<T>>()
            .copy_from(&(&r_0 * (half.clone() * dt.clone())));
        noise
            .sensitivity_mut::<GyroNoiseState<T, StepStart>, VelocityState<T>>()
            .copy_from(&v_from_gyro);
        noise
            .sensitivity_mut::<AccelNoiseState<T, StepEnd>, VelocityState<T>>()
            .copy_from(&(&r_1 * (half.clone() * dt.clone())));
        noise
            .sensitivity_mut::<GyroNoiseState<T, StepEnd>, VelocityState<T>>()
            .copy_from(&v_from_gyro);

        noise
            .sensitivity_mut::<GyroNoiseState<T, StepStart>, AttitudeState<T>>()
            .fill_diagonal(half.clone() * dt.clone());
        noise
            .sensitivity_mut::<GyroNoiseState<T, StepEnd>, AttitudeState<T>>()
            .fill_diagonal(half * dt.clone());

        noise
            .sensitivity_mut::<AccelWalkState<T>, AccelBiasState<T>>()
            .fill_diagonal(dt.clone());
        noise
            .sensitivity_mut::<GyroWalkState<T>, GyroBiasState<T>>()
            .fill_diagonal(dt);

        Self { transition, noise }
    }
}
