//! Synchronization of the inertial, scan, scan info and outlier streams.

mod channel;
mod config;
mod output;

use std::time::Instant;

use nalgebra::RealField;

pub use channel::{FusionHandle, Message};
pub use config::{BufferConfig, Config, JoinPolicy};
pub use output::{FusionOutput, Odometry, OutputAdapter, OutputConfig, OutputConvention};

use crate::{
    error::{Stream, SyncError},
    estimator::{Estimator, ImuStep, PreintegratedEstimator, ScanFrame},
    frame::Framed,
    measurement::{ImuAlignment, ImuMeasured, MeasurementBuffer, PointCloud, ScanInfo},
    utils::{RunningMean, ToRadians},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for every stream to deliver at least once.
    Uninitialized,
    Tracking,
}

/// Number of entries buffered per stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buffered {
    pub imu: usize,
    pub scan: usize,
    pub scan_info: usize,
    pub outlier: usize,
}

/// # Input
/// ```text
/// ├──┬──┬──┬──┬──┬──┬──┬──┬──┬──>> timestamp
///    IMU         │           │
///                scan        scan
///                info        info
///                outlier     outlier
/// ```
/// Every push runs one synchronization pass. A scan is consumed once the
/// inertial stream covers it, the estimator is stepped up to exactly the scan
/// timestamp and everything up to there is dropped from the buffers.
pub struct Fusion<T: RealField, E> {
    estimator: E,
    imus: MeasurementBuffer<T, ImuMeasured<T>>,
    scans: MeasurementBuffer<T, PointCloud<T>>,
    infos: MeasurementBuffer<T, ScanInfo<T>>,
    outliers: MeasurementBuffer<T, PointCloud<T>>,
    alignment: ImuAlignment<T>,
    join: JoinPolicy,
    output: OutputAdapter<T>,
    phase: Phase,
    stats: RunningMean,
}

/// The scan picked for the next pass and its companions' timestamps.
struct Joined<T> {
    scan: T,
    info: T,
    outlier: T,
}

impl<T> Fusion<T, PreintegratedEstimator<T>>
where
    T: RealField + ToRadians,
{
    /// A driver over the [`PreintegratedEstimator`] configured by `config.estimator`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, PreintegratedEstimator::new(config.estimator.clone()))
    }
}

impl<T, E> Fusion<T, E>
where
    T: RealField + ToRadians,
    E: Estimator<T>,
{
    pub fn new(config: &Config, estimator: E) -> Self {
        let yaw = nalgebra::convert::<f64, T>(config.imu_misalign_yaw).to_radians();
        let buffers = &config.buffers;

        Self {
            estimator,
            imus: MeasurementBuffer::with_capacity_hint(buffers.imu),
            scans: MeasurementBuffer::with_capacity_hint(buffers.scan),
            infos: MeasurementBuffer::with_capacity_hint(buffers.scan_info),
            outliers: MeasurementBuffer::with_capacity_hint(buffers.outlier),
            alignment: ImuAlignment::from_yaw(yaw),
            join: config.join,
            output: OutputAdapter::new(config.output.clone()),
            phase: Phase::Uninitialized,
            stats: RunningMean::default(),
        }
    }
}

impl<T, E> Fusion<T, E>
where
    T: RealField,
    E: Estimator<T>,
{
    /// Buffers a raw inertial sample, aligned onto the vehicle axes.
    pub fn push_imu(
        &mut self,
        timestamp: T,
        raw: ImuMeasured<T>,
    ) -> Result<Vec<FusionOutput<T>>, SyncError<T>> {
        let aligned = self.alignment.align(Framed::new(raw));
        self.imus.add(timestamp, aligned.into_inner());
        self.synchronize()
    }

    pub fn push_scan(
        &mut self,
        timestamp: T,
        scan: PointCloud<T>,
    ) -> Result<Vec<FusionOutput<T>>, SyncError<T>> {
        self.scans.add(timestamp, scan);
        self.synchronize()
    }

    pub fn push_scan_info(
        &mut self,
        timestamp: T,
        info: ScanInfo<T>,
    ) -> Result<Vec<FusionOutput<T>>, SyncError<T>> {
        self.infos.add(timestamp, info);
        self.synchronize()
    }

    pub fn push_outlier(
        &mut self,
        timestamp: T,
        outlier: PointCloud<T>,
    ) -> Result<Vec<FusionOutput<T>>, SyncError<T>> {
        self.outliers.add(timestamp, outlier);
        self.synchronize()
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mean wall time spent per consumed scan.
    #[inline]
    pub fn stats(&self) -> &RunningMean {
        &self.stats
    }

    #[inline]
    pub fn estimator(&self) -> &E {
        &self.estimator
    }

    #[inline]
    pub fn estimator_mut(&mut self) -> &mut E {
        &mut self.estimator
    }

    pub fn buffered(&self) -> Buffered {
        Buffered {
            imu: self.imus.len(),
            scan: self.scans.len(),
            scan_info: self.infos.len(),
            outlier: self.outliers.len(),
        }
    }

    /// Drops the next pending scan and its companions, returning its timestamp.
    ///
    /// Lets the stream continue past a scan that cannot be joined.
    pub fn skip_scan(&mut self) -> Option<T> {
        let time = self.estimator.time();
        let (scan_time, _) = self.scans.first_after(&time)?;
        let scan_time = scan_time.clone();

        self.scans.discard_up_to(&scan_time);
        self.infos.discard_up_to(&scan_time);
        self.outliers.discard_up_to(&scan_time);
        log::warn!("skipped scan at {scan_time:?}");
        Some(scan_time)
    }

    fn synchronize(&mut self) -> Result<Vec<FusionOutput<T>>, SyncError<T>> {
        if self.imus.is_empty()
            || self.scans.is_empty()
            || self.infos.is_empty()
            || self.outliers.is_empty()
        {
            log::trace!("waiting for every stream, buffered {:?}", self.buffered());
            return Ok(Vec::new());
        }

        match self.phase {
            Phase::Uninitialized => Ok(self.initialize().into_iter().collect()),
            Phase::Tracking => self.track(),
        }
    }

    /// Snaps to the latest scan, older backlog is dropped.
    fn initialize(&mut self) -> Option<FusionOutput<T>> {
        let Self {
            estimator,
            imus,
            scans,
            infos,
            outliers,
            ..
        } = self;

        let (scan_time, scan) = scans.last()?;
        let last_imu = imus.last_value()?;
        // the inertial stream may still lag the newest scan
        let closing_imu = imus
            .first_from(scan_time)
            .map_or(last_imu, |(_, measured)| measured);
        let estimate = estimator.process_scan(ScanFrame {
            timestamp: scan_time.clone(),
            last_imu,
            closing_imu,
            scan,
            info: infos.last_value()?,
            outlier: outliers.last_value()?,
        });

        self.phase = Phase::Tracking;
        self.discard_consumed();
        log::info!("fusion initialized at {:?}", self.estimator.time());

        Some(self.output.adapt(estimate))
    }

    fn track(&mut self) -> Result<Vec<FusionOutput<T>>, SyncError<T>> {
        let mut outputs = Vec::new();

        loop {
            let joined = match self.next_joined() {
                Ok(Some(joined)) => joined,
                Ok(None) => break,
                // the failing scan is still pending and fails again on the next pass
                Err(error) if !outputs.is_empty() => {
                    log::debug!("{error}, after {} scans", outputs.len());
                    break;
                }
                Err(error) => return Err(error),
            };
            let started = Instant::now();

            let Some(output) = self.consume(joined) else {
                break;
            };
            outputs.push(output);

            self.stats.push(started.elapsed());
            log::debug!(
                "scan {} processed, mean duration {:?}",
                self.stats.count(),
                self.stats.mean()
            );
        }
        Ok(outputs)
    }

    /// The next scan that can be consumed right now, if any.
    ///
    /// Nothing is mutated, a scan that is not ready yet is picked again on
    /// the next pass.
    fn next_joined(&self) -> Result<Option<Joined<T>>, SyncError<T>> {
        let time = self.estimator.time();
        let Some((scan, _)) = self.scans.first_after(&time) else {
            return Ok(None);
        };

        let Some(info) = self.join_companion(Stream::ScanInfo, &self.infos, &time, scan)? else {
            return Ok(None);
        };
        let Some(outlier) = self.join_companion(Stream::Outlier, &self.outliers, &time, scan)? else {
            return Ok(None);
        };

        match self.imus.last_timestamp() {
            Some(last_imu) if last_imu >= *scan => Ok(Some(Joined {
                scan: scan.clone(),
                info,
                outlier,
            })),
            last_imu => {
                log::trace!("inertial stream at {last_imu:?} behind scan at {scan:?}");
                Ok(None)
            }
        }
    }

    fn join_companion<V>(
        &self,
        stream: Stream,
        buffer: &MeasurementBuffer<T, V>,
        time: &T,
        scan: &T,
    ) -> Result<Option<T>, SyncError<T>> {
        match self.join {
            JoinPolicy::FirstAfter => {
                let Some((timestamp, _)) = buffer.first_after(time) else {
                    log::trace!("{stream} stream has nothing after {time:?}");
                    return Ok(None);
                };
                if timestamp != scan {
                    log::debug!("{stream} at {timestamp:?} joined to scan at {scan:?}");
                }
                Ok(Some(timestamp.clone()))
            }
            JoinPolicy::Window { tolerance } => {
                let tolerance: T = nalgebra::convert(tolerance);
                let earliest = scan.clone() - tolerance.clone();
                // entries at or before the cursor are stale, they never join
                let candidate = if earliest > *time {
                    buffer.first_from(&earliest)
                } else {
                    buffer.first_after(time)
                };

                match candidate {
                    None => {
                        log::trace!("{stream} stream pending for scan at {scan:?}");
                        Ok(None)
                    }
                    Some((timestamp, _)) if *timestamp <= scan.clone() + tolerance.clone() => {
                        Ok(Some(timestamp.clone()))
                    }
                    Some((timestamp, _)) => Err(SyncError::StreamMismatch {
                        stream,
                        scan_time: scan.clone(),
                        nearest: Some(timestamp.clone()),
                    }),
                }
            }
        }
    }

    /// Steps the estimator up to the scan and hands it over.
    fn consume(&mut self, joined: Joined<T>) -> Option<FusionOutput<T>> {
        let Self {
            estimator,
            imus,
            scans,
            infos,
            outliers,
            ..
        } = self;
        let Joined {
            scan: scan_time,
            info: info_time,
            outlier: outlier_time,
        } = joined;

        let mut time = estimator.time();
        while time < scan_time {
            let Some((imu_time, measured)) = imus.first_after(&time) else {
                break;
            };
            let end = if *imu_time < scan_time {
                imu_time.clone()
            } else {
                scan_time.clone()
            };
            estimator.process_imu(ImuStep {
                dt: end.clone() - time.clone(),
                timestamp: end,
                measured,
            });

            let advanced = estimator.time();
            if advanced <= time {
                log::warn!("estimator did not advance past {time:?}, scan deferred");
                return None;
            }
            time = advanced;
        }

        let (_, scan) = scans.first_from(&scan_time)?;
        let estimate = estimator.process_scan(ScanFrame {
            timestamp: scan_time.clone(),
            last_imu: imus.last_value()?,
            closing_imu: imus.first_from(&scan_time)?.1,
            scan,
            info: infos.first_from(&info_time)?.1,
            outlier: outliers.first_from(&outlier_time)?.1,
        });

        self.discard_consumed();
        Some(self.output.adapt(estimate))
    }

    fn discard_consumed(&mut self) {
        let time = self.estimator.time();
        self.imus.discard_up_to(&time);
        self.scans.discard_up_to(&time);
        self.infos.discard_up_to(&time);
        self.outliers.discard_up_to(&time);
    }
}
