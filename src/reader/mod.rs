//! Access to the day-partitioned source recordings.
//!
//! Each recorded day lives in its own partition. A [`DayWindowReader`]
//! opens a partition and slices a fixed-duration window of voltage and
//! current samples starting at a given timestamp.

pub mod csv_day;
pub mod memory;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub use csv_day::CsvDayReader;
pub use memory::MemoryDayReader;

/// A slice of samples from one day's recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    /// Voltage samples in source order
    pub voltage: Vec<f64>,
    /// Current samples in source order, same length as `voltage`
    pub current: Vec<f64>,
    /// Auxiliary noise channel, only present when requested
    pub noise: Option<Vec<f64>>,
}

impl Window {
    /// Create a window without a noise channel.
    pub fn new(voltage: Vec<f64>, current: Vec<f64>) -> Self {
        debug_assert_eq!(voltage.len(), current.len());
        Self {
            voltage,
            current,
            noise: None,
        }
    }

    /// Number of samples per channel.
    pub fn len(&self) -> usize {
        self.voltage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_empty()
    }
}

/// Errors raised while reading a window from a partition.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("partition {path} is unavailable: {reason}")]
    PartitionUnavailable { path: PathBuf, reason: String },

    #[error(
        "window ends at sample {requested_end} but partition {path} holds only {available} samples"
    )]
    WindowOutOfRange {
        path: PathBuf,
        requested_end: usize,
        available: usize,
    },

    #[error("malformed partition {path} at line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

/// Opens a day partition and slices a window out of it.
pub trait DayWindowReader {
    /// Load `duration` worth of samples starting at `timestamp`.
    ///
    /// Implementations must fail with [`ReaderError::WindowOutOfRange`]
    /// instead of returning a truncated window.
    fn load_window(
        &self,
        partition: &Path,
        timestamp: NaiveDateTime,
        duration: Duration,
        include_noise: bool,
    ) -> Result<Window, ReaderError>;
}

impl<R: DayWindowReader + ?Sized> DayWindowReader for &R {
    fn load_window(
        &self,
        partition: &Path,
        timestamp: NaiveDateTime,
        duration: Duration,
        include_noise: bool,
    ) -> Result<Window, ReaderError> {
        (**self).load_window(partition, timestamp, duration, include_noise)
    }
}

/// Maps a calendar date to its partition on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    pub base_path: PathBuf,
    pub extension: String,
}

impl PartitionLayout {
    pub fn new(base_path: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            extension: extension.into(),
        }
    }

    /// Path of the partition holding `date`, e.g. `base/2018-08-23.csv`.
    pub fn resolve(&self, date: NaiveDate) -> PathBuf {
        let name = date.format("%Y-%m-%d").to_string();
        if self.extension.is_empty() {
            self.base_path.join(name)
        } else {
            self.base_path.join(format!("{name}.{}", self.extension))
        }
    }
}

/// Sample index range covered by a window, counted from midnight.
pub fn sample_range(timestamp: NaiveDateTime, duration: Duration, sampling_rate: u32) -> Range<usize> {
    let rate = u128::from(sampling_rate);
    let time = timestamp.time();
    let since_midnight_ns = u128::from(time.num_seconds_from_midnight()) * 1_000_000_000
        + u128::from(time.nanosecond() % 1_000_000_000);

    let start = (since_midnight_ns * rate / 1_000_000_000) as usize;
    let len = (duration.as_nanos() * rate / 1_000_000_000) as usize;
    start..start + len
}
