//! Round-trip check of exported event files.
//!
//! Re-reads one exported file and compares it sample by sample against a
//! fresh read of the same window from the source partition. The result is
//! informational: nothing happens automatically when differences are
//! non-zero. Both reads are timed so the access speedup can be reported.

use crate::catalog::Event;
use crate::export::{event_file_path, read_event_file, EventFileError};
use crate::reader::{DayWindowReader, PartitionLayout, ReaderError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

/// Errors raised while verifying an export.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("could not read source window: {0}")]
    Source(#[from] ReaderError),

    #[error("could not read exported file: {0}")]
    Export(#[from] EventFileError),

    #[error("{channel} length differs: source has {source_len} samples, export has {exported_len}")]
    LengthMismatch {
        channel: &'static str,
        source_len: usize,
        exported_len: usize,
    },
}

/// Outcome of comparing one exported file with its source window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub id: u64,
    /// Samples per channel
    pub samples: usize,
    pub max_voltage_diff: f64,
    pub max_current_diff: f64,
    /// Time spent reading the window from the day partition
    pub source_read: Duration,
    /// Time spent reading the exported file
    pub export_read: Duration,
}

impl VerificationResult {
    /// Whether both channels match exactly.
    pub fn is_lossless(&self) -> bool {
        self.max_voltage_diff == 0.0 && self.max_current_diff == 0.0
    }

    /// How many times faster the exported file was to read.
    pub fn speedup(&self) -> Option<f64> {
        let export = self.export_read.as_secs_f64();
        if export > 0.0 {
            Some(self.source_read.as_secs_f64() / export)
        } else {
            None
        }
    }
}

/// Compares exported files against their source windows.
pub struct ExportVerifier<R> {
    reader: R,
    layout: PartitionLayout,
    window_duration: Duration,
}

impl<R: DayWindowReader> ExportVerifier<R> {
    pub fn new(reader: R, layout: PartitionLayout, window_duration: Duration) -> Self {
        Self {
            reader,
            layout,
            window_duration,
        }
    }

    /// Verify the exported file of `event` inside `output_dir`.
    pub fn verify(&self, event: &Event, output_dir: &Path) -> Result<VerificationResult, VerifyError> {
        let partition = self.layout.resolve(event.partition_date());

        let started = Instant::now();
        let source = self
            .reader
            .load_window(&partition, event.timestamp, self.window_duration, false)?;
        let source_read = started.elapsed();

        let started = Instant::now();
        let exported = read_event_file(&event_file_path(output_dir, event.id))?;
        let export_read = started.elapsed();

        let max_voltage_diff = max_abs_diff("voltage", &source.voltage, &exported.voltage)?;
        let max_current_diff = max_abs_diff("current", &source.current, &exported.current)?;

        let result = VerificationResult {
            id: event.id,
            samples: source.len(),
            max_voltage_diff,
            max_current_diff,
            source_read,
            export_read,
        };

        info!(
            id = event.id,
            max_voltage_diff,
            max_current_diff,
            source_read_secs = source_read.as_secs_f64(),
            export_read_secs = export_read.as_secs_f64(),
            "verified export"
        );

        Ok(result)
    }
}

/// Absolute difference of one sample pair.
///
/// Two NaNs compare equal; a NaN against a number is an infinite difference.
fn sample_diff(a: f64, b: f64) -> f64 {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => 0.0,
        (false, false) if a == b => 0.0,
        (false, false) => (a - b).abs(),
        _ => f64::INFINITY,
    }
}

/// Element-wise maximum absolute difference of two equal-length channels.
fn max_abs_diff(channel: &'static str, source: &[f64], exported: &[f64]) -> Result<f64, VerifyError> {
    if source.len() != exported.len() {
        return Err(VerifyError::LengthMismatch {
            channel,
            source_len: source.len(),
            exported_len: exported.len(),
        });
    }

    Ok(source
        .iter()
        .zip(exported)
        .map(|(&a, &b)| sample_diff(a, b))
        .fold(0.0, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_event_file;
    use crate::reader::{MemoryDayReader, Window};
    use chrono::NaiveDate;

    fn setup(dir: &Path) -> (ExportVerifier<MemoryDayReader>, Event) {
        let date = NaiveDate::from_ymd_opt(2018, 8, 23).unwrap();
        let layout = PartitionLayout::new(dir.join("days"), "csv");
        let day = Window::new(
            (0..100).map(|i| (i as f64 * 0.37).sin()).collect(),
            (0..100).map(|i| (i as f64 * 0.11).cos()).collect(),
        );
        let reader = MemoryDayReader::new(10).with_partition(layout.resolve(date), day);
        let event = Event::new(1, date, date.and_hms_opt(0, 0, 2).unwrap(), "fridge");

        (
            ExportVerifier::new(reader, layout, Duration::from_secs(3)),
            event,
        )
    }

    #[test]
    fn test_lossless_export_has_zero_diff() {
        let dir = tempfile::tempdir().unwrap();
        let (verifier, event) = setup(dir.path());

        let window = verifier
            .reader
            .load_window(
                &verifier.layout.resolve(event.date),
                event.timestamp,
                Duration::from_secs(3),
                false,
            )
            .unwrap();
        write_event_file(&event_file_path(dir.path(), event.id), &window).unwrap();

        let result = verifier.verify(&event, dir.path()).unwrap();
        assert_eq!(result.samples, 30);
        assert_eq!(result.max_voltage_diff, 0.0);
        assert_eq!(result.max_current_diff, 0.0);
        assert!(result.is_lossless());
    }

    #[test]
    fn test_reports_differences() {
        let dir = tempfile::tempdir().unwrap();
        let (verifier, event) = setup(dir.path());

        let mut window = verifier
            .reader
            .load_window(
                &verifier.layout.resolve(event.date),
                event.timestamp,
                Duration::from_secs(3),
                false,
            )
            .unwrap();
        window.current[5] += 0.5;
        write_event_file(&event_file_path(dir.path(), event.id), &window).unwrap();

        let result = verifier.verify(&event, dir.path()).unwrap();
        assert_eq!(result.max_voltage_diff, 0.0);
        assert!((result.max_current_diff - 0.5).abs() < 1e-12);
        assert!(!result.is_lossless());
    }

    #[test]
    fn test_nan_mismatch_is_not_lossless() {
        assert_eq!(max_abs_diff("voltage", &[1.0, f64::NAN], &[1.0, 5.0]).unwrap(), f64::INFINITY);
        assert_eq!(max_abs_diff("voltage", &[1.0, 5.0], &[1.0, f64::NAN]).unwrap(), f64::INFINITY);
        assert_eq!(max_abs_diff("voltage", &[f64::NAN, 2.0], &[f64::NAN, 2.0]).unwrap(), 0.0);
        assert_eq!(
            max_abs_diff("current", &[f64::INFINITY], &[f64::INFINITY]).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_nan_in_export_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let (verifier, event) = setup(dir.path());

        let mut window = verifier
            .reader
            .load_window(
                &verifier.layout.resolve(event.date),
                event.timestamp,
                Duration::from_secs(3),
                false,
            )
            .unwrap();
        window.voltage[7] = f64::NAN;
        write_event_file(&event_file_path(dir.path(), event.id), &window).unwrap();

        let result = verifier.verify(&event, dir.path()).unwrap();
        assert_eq!(result.max_voltage_diff, f64::INFINITY);
        assert_eq!(result.max_current_diff, 0.0);
        assert!(!result.is_lossless());
    }

    #[test]
    fn test_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (verifier, event) = setup(dir.path());

        let short = Window::new(vec![0.0; 5], vec![0.0; 5]);
        write_event_file(&event_file_path(dir.path(), event.id), &short).unwrap();

        let err = verifier.verify(&event, dir.path()).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::LengthMismatch {
                channel: "voltage",
                source_len: 30,
                exported_len: 5
            }
        ));
    }

    #[test]
    fn test_missing_export() {
        let dir = tempfile::tempdir().unwrap();
        let (verifier, event) = setup(dir.path());

        let err = verifier.verify(&event, dir.path()).unwrap_err();
        assert!(matches!(err, VerifyError::Export(_)));
    }

    #[test]
    fn test_speedup() {
        let result = VerificationResult {
            id: 1,
            samples: 10,
            max_voltage_diff: 0.0,
            max_current_diff: 0.0,
            source_read: Duration::from_millis(6600),
            export_read: Duration::from_millis(110),
        };
        let speedup = result.speedup().unwrap();
        assert!((speedup - 60.0).abs() < 1e-9);
    }
}
