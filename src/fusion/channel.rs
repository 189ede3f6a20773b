//! Funnels messages from any number of producers into one driver thread.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, bounded};
use nalgebra::{RealField, Scalar};

use crate::{
    estimator::Estimator,
    measurement::{ImuMeasured, PointCloud, ScanInfo, Stamped},
};

use super::{Fusion, FusionOutput};

/// One message of any of the four streams.
#[derive(Debug, Clone)]
pub enum Message<T: Scalar> {
    Imu(Stamped<T, ImuMeasured<T>>),
    Scan(Stamped<T, PointCloud<T>>),
    ScanInfo(Stamped<T, ScanInfo<T>>),
    Outlier(Stamped<T, PointCloud<T>>),
}

/// A driver running on its own thread.
pub struct FusionHandle<T: RealField, E> {
    /// Clone to feed from several producers. Dropping every sender stops the driver.
    pub sender: Sender<Message<T>>,
    pub outputs: Receiver<FusionOutput<T>>,
    /// Yields the driver once it stopped.
    pub join: JoinHandle<Fusion<T, E>>,
}

impl<T, E> Fusion<T, E>
where
    T: RealField,
    E: Estimator<T>,
{
    /// Routes `message` to the matching `push_*`.
    pub fn push(
        &mut self,
        message: Message<T>,
    ) -> Result<Vec<FusionOutput<T>>, crate::error::SyncError<T>> {
        match message {
            Message::Imu(Stamped { timestamp, value }) => self.push_imu(timestamp, value),
            Message::Scan(Stamped { timestamp, value }) => self.push_scan(timestamp, value),
            Message::ScanInfo(Stamped { timestamp, value }) => {
                self.push_scan_info(timestamp, value)
            }
            Message::Outlier(Stamped { timestamp, value }) => self.push_outlier(timestamp, value),
        }
    }

    /// Consumes `inbox` until every sender is gone, forwarding outputs to `outbox`.
    ///
    /// A scan that cannot be joined is skipped, and the scans queued behind it
    /// are processed right away.
    pub fn run(mut self, inbox: Receiver<Message<T>>, outbox: Sender<FusionOutput<T>>) -> Self {
        for message in inbox.iter() {
            let mut pass = self.push(message);
            let outputs = loop {
                match pass {
                    Ok(outputs) => break outputs,
                    Err(error) => {
                        log::warn!("{error}");
                        if self.skip_scan().is_none() {
                            break Vec::new();
                        }
                        pass = self.synchronize();
                    }
                }
            };
            if outputs
                .into_iter()
                .try_for_each(|output| outbox.send(output))
                .is_err()
            {
                log::info!("output receiver dropped, fusion stopped");
                break;
            }
        }
        self
    }

    /// Moves the driver onto a thread named `fusion`, with channels of `capacity`.
    ///
    /// Both channels are bounded: once `capacity` outputs sit unread in
    /// [`FusionHandle::outputs`], the thread blocks and stops draining messages.
    pub fn spawn(self, capacity: usize) -> std::io::Result<FusionHandle<T, E>>
    where
        E: Send + 'static,
    {
        let (sender, inbox) = bounded(capacity);
        let (outbox, outputs) = bounded(capacity);

        let join = std::thread::Builder::new()
            .name("fusion".to_owned())
            .spawn(move || self.run(inbox, outbox))?;

        Ok(FusionHandle {
            sender,
            outputs,
            join,
        })
    }
}
