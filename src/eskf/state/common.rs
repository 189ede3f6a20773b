pub mod marker;
use std::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
};

use nalgebra::{Scalar, U3, Vector3};

pub struct MarkedState<S, M>(pub S, PhantomData<M>);

impl<S, M> MarkedState<S, M> {
    pub const fn new(state: S) -> Self {
        Self(state, PhantomData)
    }
}

impl<S: Default, M> Default for MarkedState<S, M> {
    fn default() -> Self {
        Self(S::default(), PhantomData)
    }
}

impl<S: Clone, M> Clone for MarkedState<S, M> {
    fn clone(&self) -> Self {
        Self::new(self.0.clone())
    }
}

impl<S, M> Deref for MarkedState<S, M> {
    type Target = S;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, M> DerefMut for MarkedState<S, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

pub type Vector3State<T, S> = MarkedState<Vector3<T>, S>;

pub type PositionState<T> = Vector3State<T, marker::Position>;
pub type VelocityState<T> = Vector3State<T, marker::Velocity>;
pub type AttitudeState<T> = Vector3State<T, marker::Attitude>;
pub type AccelBiasState<T> = Vector3State<T, marker::AccelBias>;
pub type GyroBiasState<T> = Vector3State<T, marker::GyroBias>;

pub type AccelNoiseState<T, At> = Vector3State<T, marker::AccelNoise<At>>;
pub type GyroNoiseState<T, At> = Vector3State<T, marker::GyroNoise<At>>;
pub type AccelWalkState<T> = Vector3State<T, marker::AccelWalk>;
pub type GyroWalkState<T> = Vector3State<T, marker::GyroWalk>;

impl<T: Scalar, M> super::KFState for Vector3State<T, M> {
    type Element = T;
    type Dim = U3;
}
