//! Day partitions stored as CSV files.
//!
//! A partition holds one row per sample with a `voltage`, `current` and
//! optional `noise` column. The first row is the sample taken at
//! midnight of that day; rows follow at the configured sampling rate.

use crate::reader::{sample_range, DayWindowReader, ReaderError, Window};
use chrono::NaiveDateTime;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const VOLTAGE_COLUMN: &str = "voltage";
const CURRENT_COLUMN: &str = "current";
const NOISE_COLUMN: &str = "noise";

/// Reads windows out of CSV day partitions.
#[derive(Debug, Clone)]
pub struct CsvDayReader {
    sampling_rate: u32,
}

impl CsvDayReader {
    pub fn new(sampling_rate: u32) -> Self {
        Self { sampling_rate }
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }
}

impl DayWindowReader for CsvDayReader {
    fn load_window(
        &self,
        partition: &Path,
        timestamp: NaiveDateTime,
        duration: Duration,
        include_noise: bool,
    ) -> Result<Window, ReaderError> {
        let unavailable = |reason: String| ReaderError::PartitionUnavailable {
            path: partition.to_path_buf(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(partition)
            .map_err(|e| unavailable(e.to_string()))?;

        let headers = reader
            .headers()
            .map_err(|e| unavailable(e.to_string()))?
            .clone();
        let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
        let voltage_idx = column(VOLTAGE_COLUMN)
            .ok_or_else(|| unavailable(format!("missing '{VOLTAGE_COLUMN}' column")))?;
        let current_idx = column(CURRENT_COLUMN)
            .ok_or_else(|| unavailable(format!("missing '{CURRENT_COLUMN}' column")))?;
        let noise_idx = if include_noise {
            Some(
                column(NOISE_COLUMN)
                    .ok_or_else(|| unavailable(format!("missing '{NOISE_COLUMN}' column")))?,
            )
        } else {
            None
        };

        let range = sample_range(timestamp, duration, self.sampling_rate);
        let mut voltage = Vec::with_capacity(range.len());
        let mut current = Vec::with_capacity(range.len());
        let mut noise = noise_idx.map(|_| Vec::with_capacity(range.len()));
        let mut available = 0;

        for (idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| unavailable(e.to_string()))?;
            available = idx + 1;
            if idx < range.start {
                continue;
            }
            if idx >= range.end {
                break;
            }

            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let value = |col: usize, name: &str| -> Result<f64, ReaderError> {
                let raw = record.get(col).unwrap_or("");
                raw.parse().map_err(|_| ReaderError::Malformed {
                    path: partition.to_path_buf(),
                    line,
                    reason: format!("invalid {name} value '{raw}'"),
                })
            };

            voltage.push(value(voltage_idx, VOLTAGE_COLUMN)?);
            current.push(value(current_idx, CURRENT_COLUMN)?);
            if let (Some(col), Some(samples)) = (noise_idx, noise.as_mut()) {
                samples.push(value(col, NOISE_COLUMN)?);
            }
        }

        if voltage.len() < range.len() {
            return Err(ReaderError::WindowOutOfRange {
                path: partition.to_path_buf(),
                requested_end: range.end,
                available,
            });
        }

        debug!(
            partition = %partition.display(),
            start = range.start,
            samples = voltage.len(),
            "loaded window"
        );

        Ok(Window {
            voltage,
            current,
            noise,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Write;

    fn write_partition(dir: &Path, rows: usize, with_noise: bool) -> std::path::PathBuf {
        let path = dir.join("2018-08-23.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        if with_noise {
            writeln!(file, "voltage,current,noise").unwrap();
        } else {
            writeln!(file, "voltage,current").unwrap();
        }
        for i in 0..rows {
            let v = i as f64 * 0.5;
            let c = -(i as f64) * 0.25;
            if with_noise {
                writeln!(file, "{v},{c},{}", i as f64 * 0.01).unwrap();
            } else {
                writeln!(file, "{v},{c}").unwrap();
            }
        }
        path
    }

    fn at_secs(s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 8, 23)
            .unwrap()
            .and_hms_opt(0, 0, s)
            .unwrap()
    }

    #[test]
    fn test_slices_window_from_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_partition(dir.path(), 40, false);
        let reader = CsvDayReader::new(4);

        let window = reader
            .load_window(&path, at_secs(2), Duration::from_secs(3), false)
            .unwrap();

        assert_eq!(window.len(), 12);
        assert_eq!(window.voltage[0], 8.0 * 0.5);
        assert_eq!(window.current[11], -19.0 * 0.25);
        assert!(window.noise.is_none());
    }

    #[test]
    fn test_includes_noise_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_partition(dir.path(), 10, true);
        let reader = CsvDayReader::new(2);

        let window = reader
            .load_window(&path, at_secs(0), Duration::from_secs(2), true)
            .unwrap();
        assert_eq!(window.noise.as_ref().map(Vec::len), Some(4));

        let window = reader
            .load_window(&path, at_secs(0), Duration::from_secs(2), false)
            .unwrap();
        assert!(window.noise.is_none());
    }

    #[test]
    fn test_window_past_end_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_partition(dir.path(), 10, false);
        let reader = CsvDayReader::new(2);

        let err = reader
            .load_window(&path, at_secs(3), Duration::from_secs(3), false)
            .unwrap_err();
        assert!(matches!(
            err,
            ReaderError::WindowOutOfRange {
                requested_end: 12,
                available: 10,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_partition() {
        let reader = CsvDayReader::new(2);
        let err = reader
            .load_window(
                Path::new("/nonexistent/2018-08-23.csv"),
                at_secs(0),
                Duration::from_secs(1),
                false,
            )
            .unwrap_err();
        assert!(matches!(err, ReaderError::PartitionUnavailable { .. }));
    }

    #[test]
    fn test_malformed_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2018-08-23.csv");
        std::fs::write(&path, "voltage,current\n1.0,2.0\nabc,3.0\n").unwrap();
        let reader = CsvDayReader::new(1);

        let err = reader
            .load_window(&path, at_secs(0), Duration::from_secs(2), false)
            .unwrap_err();
        assert!(matches!(err, ReaderError::Malformed { line: 3, .. }));
    }

    #[test]
    fn test_ragged_row_before_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("2018-08-23.csv");
        std::fs::write(&path, "voltage,current\n1.0,2.0\n3.0\n4.0,5.0\n6.0,7.0\n").unwrap();
        let reader = CsvDayReader::new(1);

        let err = reader
            .load_window(&path, at_secs(2), Duration::from_secs(2), false)
            .unwrap_err();
        assert!(matches!(err, ReaderError::PartitionUnavailable { .. }));
    }
}
