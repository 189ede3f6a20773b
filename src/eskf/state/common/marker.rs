use std::marker::PhantomData;

pub struct Position;
pub struct Velocity;
pub struct Attitude;
pub struct AccelBias;
pub struct GyroBias;

pub struct AccelNoise<At>(PhantomData<At>);
pub struct GyroNoise<At>(PhantomData<At>);
pub struct AccelWalk;
pub struct GyroWalk;

/// The sample that opens a midpoint step.
pub struct StepStart;
/// The sample that closes a midpoint step.
pub struct StepEnd;
