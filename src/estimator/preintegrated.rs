use nalgebra::{IsometryMatrix3, RealField, Translation3, UnitQuaternion, Vector3};

use crate::{
    error::PreintegrationError,
    eskf::{Covariance, ErrorState, state::common::*},
    frame::Framed,
    measurement::{ImuMeasured, PointCloud},
    preintegration::{ImuBias, Preintegration, RelativeMotion},
};

use super::{Config, Estimate, Estimator, FeatureSets, ImuStep, InitialVariance, ScanFrame};

#[derive(Debug, Clone)]
struct Nominal<T: RealField> {
    attitude: UnitQuaternion<T>,
    position: Vector3<T>,
    velocity: Vector3<T>,
    bias: ImuBias<T>,
    covariance: Covariance<ErrorState<T>>,
}

/// Dead-reckons through preintegrated intervals.
///
/// Scans only close intervals, their points are split into feature sets
/// for whatever corrects the pose downstream.
///
/// ```text
///   R' = R·Δq
///   p' = p + v·Δt + ½g·Δt² + R·Δp
///   v' = v + g·Δt + R·Δv
///   P' = J·P·Jᵀ + C
/// ```
#[derive(Debug, Clone)]
pub struct PreintegratedEstimator<T: RealField> {
    config: Config,
    gravity: Vector3<T>,
    time: T,
    nominal: Option<Nominal<T>>,
    interval: Option<Preintegration<T>>,
}

impl<T: RealField> PreintegratedEstimator<T> {
    pub fn new(config: Config) -> Self {
        Self {
            gravity: Vector3::new(T::zero(), T::zero(), -nalgebra::convert::<f64, T>(config.gravity)),
            config,
            time: T::zero(),
            nominal: None,
            interval: None,
        }
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.nominal.is_some()
    }

    pub fn pose(&self) -> Option<IsometryMatrix3<T>> {
        self.nominal.as_ref().map(Nominal::pose)
    }

    pub fn velocity(&self) -> Option<&Vector3<T>> {
        self.nominal.as_ref().map(|nominal| &nominal.velocity)
    }

    pub fn bias(&self) -> Option<&ImuBias<T>> {
        self.nominal.as_ref().map(|nominal| &nominal.bias)
    }

    pub fn covariance(&self) -> Option<&Covariance<ErrorState<T>>> {
        self.nominal.as_ref().map(|nominal| &nominal.covariance)
    }

    /// The interval opened by the last scan.
    pub fn interval(&self) -> Option<&Preintegration<T>> {
        self.interval.as_ref()
    }

    /// Revises the bias estimate, re-integrating the open interval when
    /// the drift passes the configured threshold.
    ///
    /// Returns whether the interval was re-integrated.
    pub fn set_bias(&mut self, bias: ImuBias<T>) -> Result<bool, PreintegrationError> {
        let Some(nominal) = self.nominal.as_mut() else {
            log::debug!("bias revised before initialization, ignored");
            return Ok(false);
        };
        nominal.bias = bias.clone();

        let Some(interval) = self.interval.as_mut() else {
            return Ok(false);
        };
        if !interval.needs_rebase(&bias, &self.config.preintegration.rebase_threshold) {
            return Ok(false);
        }
        interval.rebase(bias)?;
        log::debug!("rebased interval of {} samples", interval.len());
        Ok(true)
    }

    fn initialize(&self, last_imu: &ImuMeasured<T>) -> Nominal<T> {
        let to_f = |values: [f64; 3]| Vector3::from(values.map(nalgebra::convert::<f64, T>));

        // level the attitude with the measured specific force, yaw stays free
        let attitude = UnitQuaternion::rotation_between(&last_imu.acc, &Vector3::z())
            .unwrap_or_else(UnitQuaternion::identity);

        log::info!("estimator initialized at {:?}", self.time);

        Nominal {
            attitude,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            bias: ImuBias {
                accel: to_f(self.config.initial_accel_bias),
                gyro: to_f(self.config.initial_gyro_bias),
            },
            covariance: Covariance::from(&self.config.initial_variance),
        }
    }
}

impl<T: RealField> Nominal<T> {
    fn pose(&self) -> IsometryMatrix3<T> {
        IsometryMatrix3::from_parts(
            Translation3::from(self.position.clone()),
            self.attitude.clone().to_rotation_matrix(),
        )
    }

    fn compose(&mut self, interval: &Preintegration<T>, gravity: &Vector3<T>) {
        let RelativeMotion {
            delta_p,
            delta_q,
            delta_v,
            sum_dt,
        } = interval.relative_motion();
        let half: T = nalgebra::convert(0.5);

        self.position += &self.velocity * sum_dt.clone()
            + gravity * (half * sum_dt.clone() * sum_dt.clone())
            + &self.attitude * delta_p;
        self.velocity += gravity * sum_dt.clone() + &self.attitude * delta_v;
        self.attitude = UnitQuaternion::new_normalize((&self.attitude * delta_q).into_inner());

        // P = J.P.J' + C
        let mut covariance = interval.error_state_covariance().clone();
        covariance.quadform_tr(
            T::one(),
            &interval.error_state_transition().0,
            &self.covariance.0,
            T::one(),
        );
        self.covariance = covariance;
    }
}

impl<T: RealField> Estimator<T> for PreintegratedEstimator<T> {
    #[inline]
    fn time(&self) -> T {
        self.time.clone()
    }

    fn process_imu(&mut self, step: ImuStep<'_, T>) {
        let Some(interval) = self.interval.as_mut() else {
            log::trace!("inertial step before initialization, ignored");
            return;
        };
        interval.append(step.dt, step.measured.clone());
        self.time = step.timestamp;
    }

    fn process_scan(&mut self, frame: ScanFrame<'_, T>) -> Estimate<T> {
        let ScanFrame {
            timestamp,
            last_imu,
            closing_imu,
            scan,
            info,
            outlier,
        } = frame;

        self.time = timestamp.clone();
        let nominal = match (self.nominal.take(), self.interval.take()) {
            (Some(mut nominal), Some(interval)) => {
                nominal.compose(&interval, &self.gravity);
                log::trace!(
                    "closed interval of {} samples over {:?}",
                    interval.len(),
                    interval.relative_motion().sum_dt
                );
                nominal
            }
            (Some(nominal), None) => nominal,
            (None, _) => self.initialize(last_imu),
        };

        self.interval = Some(Preintegration::with_config(
            closing_imu.clone(),
            nominal.bias.clone(),
            &self.config.preintegration,
        ));

        let mut features = FeatureSets {
            corner: PointCloud::new(),
            surface: PointCloud::new(),
            outlier: outlier.clone(),
        };
        scan.iter().enumerate().for_each(|(index, point)| {
            let set = if info.is_ground(index) {
                &mut features.surface
            } else {
                &mut features.corner
            };
            set.push(point.clone());
        });

        let estimate = Estimate {
            timestamp,
            pose: Framed::new(nominal.pose()),
            velocity: nominal.velocity.clone(),
            features,
        };
        self.nominal = Some(nominal);
        estimate
    }
}

impl<T: RealField> From<&InitialVariance> for Covariance<ErrorState<T>> {
    fn from(value: &InitialVariance) -> Self {
        let mut cov = Self::default();

        cov.sub_covariance_mut::<PositionState<T>>()
            .fill_diagonal(nalgebra::convert(value.position));
        cov.sub_covariance_mut::<VelocityState<T>>()
            .fill_diagonal(nalgebra::convert(value.velocity));
        cov.sub_covariance_mut::<AttitudeState<T>>()
            .fill_diagonal(nalgebra::convert(value.attitude));
        cov.sub_covariance_mut::<AccelBiasState<T>>()
            .fill_diagonal(nalgebra::convert(value.accel_bias));
        cov.sub_covariance_mut::<GyroBiasState<T>>()
            .fill_diagonal(nalgebra::convert(value.gyro_bias));

        cov
    }
}
