use std::fmt;

use thiserror::Error;

/// Failure to obtain a usable [`Config`](crate::fusion::Config).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// The companion streams joined to every scan by the
/// [`Fusion`](crate::fusion::Fusion) driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    ScanInfo,
    Outlier,
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stream::ScanInfo => "scan info",
            Stream::Outlier => "outlier",
        })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError<T> {
    /// A companion stream has no entry near the scan and never will,
    /// its next entry already lies past the join window.
    #[error("{stream} stream has no entry matching scan at {scan_time:?} (nearest {nearest:?})")]
    StreamMismatch {
        stream: Stream,
        scan_time: T,
        nearest: Option<T>,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreintegrationError {
    #[error("sample history was truncated after {dropped} samples, cannot replay the interval")]
    HistoryTruncated { dropped: usize },
}
