//! Inertial preintegration between two scans.
//!
//! # Overview
//! ```text
//! ├── anchor ──●───●───●───●───●──>> timestamp
//!              │   ╰─┬─╯
//!              │   append(dt, sample)
//!              ╰─────────── relative_motion, jacobian, covariance
//! ```

mod config;
pub mod midpoint;

use nalgebra::{RealField, Scalar, Vector3};

pub use config::{Config, NoiseConfig, RebaseThreshold, RotationIncrement};
pub use midpoint::{RelativeMotion, StepJacobians};

use crate::{
    error::PreintegrationError,
    eskf::{Covariance, ErrorState, NoiseState, StateMatrix, Transition},
    measurement::ImuMeasured,
};

/// Accelerometer and gyroscope biases.
#[derive(Debug, Clone, PartialEq)]
pub struct ImuBias<T: Scalar> {
    pub accel: Vector3<T>,
    pub gyro: Vector3<T>,
}

impl<T: RealField> Default for ImuBias<T> {
    fn default() -> Self {
        Self {
            accel: Vector3::zeros(),
            gyro: Vector3::zeros(),
        }
    }
}

#[derive(Debug, Clone)]
struct Sample<T: Scalar> {
    dt: T,
    measured: ImuMeasured<T>,
}

/// Relative motion accumulated since an anchor sample, linearized about a fixed bias.
#[derive(Debug, Clone)]
pub struct Preintegration<T: RealField> {
    anchor: ImuMeasured<T>,
    latest: ImuMeasured<T>,
    linearized_bias: ImuBias<T>,

    motion: RelativeMotion<T>,
    jacobian: Transition<ErrorState<T>>,
    covariance: Covariance<ErrorState<T>>,

    noise: Covariance<NoiseState<T>>,
    increment: RotationIncrement,

    history: Vec<Sample<T>>,
    max_history: Option<usize>,
    appended: usize,
    truncated: bool,
}

impl<T: RealField> Preintegration<T> {
    /// An empty interval starting at `anchor`, with the default integration settings.
    pub fn new(anchor: ImuMeasured<T>, linearized_bias: ImuBias<T>, noise: &NoiseConfig) -> Self {
        Self::with_config(
            anchor,
            linearized_bias,
            &Config {
                noise: noise.clone(),
                ..Default::default()
            },
        )
    }

    pub fn with_config(anchor: ImuMeasured<T>, linearized_bias: ImuBias<T>, config: &Config) -> Self {
        Self {
            latest: anchor.clone(),
            anchor,
            linearized_bias,
            motion: Default::default(),
            jacobian: Transition::identity(),
            covariance: Default::default(),
            noise: Covariance::from(&config.noise),
            increment: config.rotation_increment,
            history: Vec::new(),
            max_history: config.max_history,
            appended: 0,
            truncated: false,
        }
    }

    /// Integrates one sample taken `dt` after the previous one.
    ///
    /// # Panics
    /// If `dt` is not positive.
    pub fn append(&mut self, dt: T, measured: ImuMeasured<T>) {
        assert!(
            dt > T::zero(),
            "preintegration step must move forward in time, got dt = {dt:?}"
        );

        self.propagate(dt.clone(), &measured);
        self.appended += 1;

        if self.truncated {
            return;
        }
        if self
            .max_history
            .is_some_and(|max_history| self.history.len() >= max_history)
        {
            log::warn!(
                "preintegration history exceeded {} samples, rebase disabled for this interval",
                self.history.len()
            );
            self.history = Vec::new();
            self.truncated = true;
            return;
        }
        self.history.push(Sample { dt, measured });
    }

    fn propagate(&mut self, dt: T, measured: &ImuMeasured<T>) {
        let (motion, StepJacobians { transition, noise }) = midpoint::integrate(
            &self.motion,
            &self.latest,
            measured,
            &self.linearized_bias,
            dt,
            self.increment,
        );

        self.jacobian = StateMatrix(&transition.0 * &self.jacobian.0);

        // P = F.P.F' + V.Q.V'
        let mut covariance = Covariance::<ErrorState<T>>::default();
        covariance.quadform_tr(T::one(), &noise.0, &self.noise.0, T::zero());
        covariance.quadform_tr(T::one(), &transition.0, &self.covariance.0, T::one());
        self.covariance = covariance;

        self.motion = motion;
        self.latest = measured.clone();
    }

    /// Re-integrates the whole interval about a new bias linearization point.
    ///
    /// Fails, leaving the interval untouched, once its history was truncated.
    pub fn rebase(&mut self, linearized_bias: ImuBias<T>) -> Result<(), PreintegrationError> {
        if self.truncated {
            return Err(PreintegrationError::HistoryTruncated {
                dropped: self.appended,
            });
        }

        self.linearized_bias = linearized_bias;
        self.motion = Default::default();
        self.jacobian = Transition::identity();
        self.covariance = Default::default();
        self.latest = self.anchor.clone();

        let history = std::mem::take(&mut self.history);
        history
            .iter()
            .for_each(|Sample { dt, measured }| self.propagate(dt.clone(), measured));
        self.history = history;

        log::trace!("rebased {} samples", self.appended);
        Ok(())
    }

    /// Whether `bias` drifted from the linearization point past `threshold`.
    pub fn needs_rebase(&self, bias: &ImuBias<T>, threshold: &RebaseThreshold) -> bool {
        let accel_drift = (&bias.accel - &self.linearized_bias.accel).norm();
        let gyro_drift = (&bias.gyro - &self.linearized_bias.gyro).norm();
        accel_drift > nalgebra::convert(threshold.accel)
            || gyro_drift > nalgebra::convert(threshold.gyro)
    }

    #[inline]
    pub fn relative_motion(&self) -> &RelativeMotion<T> {
        &self.motion
    }

    #[inline]
    pub fn error_state_transition(&self) -> &Transition<ErrorState<T>> {
        &self.jacobian
    }

    #[inline]
    pub fn error_state_covariance(&self) -> &Covariance<ErrorState<T>> {
        &self.covariance
    }

    #[inline]
    pub fn linearized_bias(&self) -> &ImuBias<T> {
        &self.linearized_bias
    }

    #[inline]
    pub fn anchor(&self) -> &ImuMeasured<T> {
        &self.anchor
    }

    /// Number of samples appended since the anchor.
    #[inline]
    pub fn len(&self) -> usize {
        self.appended
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.appended == 0
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}
