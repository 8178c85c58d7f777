//! In-memory day partitions.
//!
//! Holds whole-day recordings keyed by partition path. Useful for tests
//! and demos where no source dataset is available on disk.

use crate::reader::{sample_range, DayWindowReader, ReaderError, Window};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A reader serving windows from partitions held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDayReader {
    sampling_rate: u32,
    partitions: HashMap<PathBuf, Window>,
}

impl MemoryDayReader {
    pub fn new(sampling_rate: u32) -> Self {
        Self {
            sampling_rate,
            partitions: HashMap::new(),
        }
    }

    /// Register a full day of samples under `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, day: Window) {
        self.partitions.insert(path.into(), day);
    }

    /// Builder form of [`MemoryDayReader::insert`].
    pub fn with_partition(mut self, path: impl Into<PathBuf>, day: Window) -> Self {
        self.insert(path, day);
        self
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }
}

impl DayWindowReader for MemoryDayReader {
    fn load_window(
        &self,
        partition: &Path,
        timestamp: NaiveDateTime,
        duration: Duration,
        include_noise: bool,
    ) -> Result<Window, ReaderError> {
        let day = self
            .partitions
            .get(partition)
            .ok_or_else(|| ReaderError::PartitionUnavailable {
                path: partition.to_path_buf(),
                reason: "no such partition".to_string(),
            })?;

        let range = sample_range(timestamp, duration, self.sampling_rate);
        let out_of_range = |available: usize| ReaderError::WindowOutOfRange {
            path: partition.to_path_buf(),
            requested_end: range.end,
            available,
        };

        // Channels may differ in length; the shortest one bounds the window.
        let available = day.voltage.len().min(day.current.len());
        if range.end > available {
            return Err(out_of_range(available));
        }

        let noise = if include_noise {
            let samples = day
                .noise
                .as_ref()
                .ok_or_else(|| ReaderError::PartitionUnavailable {
                    path: partition.to_path_buf(),
                    reason: "partition has no noise channel".to_string(),
                })?;
            let samples = samples
                .get(range.clone())
                .ok_or_else(|| out_of_range(samples.len()))?;
            Some(samples.to_vec())
        } else {
            None
        };

        Ok(Window {
            voltage: day.voltage[range.clone()].to_vec(),
            current: day.current[range].to_vec(),
            noise,
        })
    }
}
