use std::{iter::Sum, time::Duration};

use num_traits::float::FloatCore;

pub trait ToRadians {
    fn to_radians(self) -> Self;
}

impl<T: FloatCore> ToRadians for T {
    #[inline(always)]
    fn to_radians(self) -> Self {
        <T as FloatCore>::to_radians(self)
    }
}

/// Incremental mean of durations, `mean' = (mean * n + x) / (n + 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMean {
    count: u32,
    mean: Duration,
}

impl RunningMean {
    pub fn push(&mut self, sample: Duration) {
        self.mean = (self.mean * self.count + sample) / (self.count + 1);
        self.count += 1;
    }

    #[inline(always)]
    pub fn mean(&self) -> Duration {
        self.mean
    }

    #[inline(always)]
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Sum<Duration> for RunningMean {
    fn sum<I>(iter: I) -> Self
    where
        I: Iterator<Item = Duration>,
    {
        iter.fold(Self::default(), |mut acc, current| {
            acc.push(current);
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mean: RunningMean = [10, 20, 30]
            .into_iter()
            .map(Duration::from_millis)
            .sum();
        assert_eq!(mean.count(), 3);
        assert_eq!(mean.mean(), Duration::from_millis(20));
    }

    #[test]
    fn test_to_radians() {
        approx::assert_relative_eq!(
            <f64 as ToRadians>::to_radians(180.0),
            std::f64::consts::PI
        );
    }
}
