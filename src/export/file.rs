//! Event file codec.
//!
//! An event file holds exactly two comma-separated rows: the voltage
//! samples followed by the current samples, in source order. Values are
//! written with the shortest representation that parses back to the same
//! `f64`, so a read after a write is lossless and reruns are byte-identical.

use crate::reader::Window;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while reading or writing an event file.
#[derive(Debug, Error)]
pub enum EventFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("expected 2 rows, found {0}")]
    RowCount(usize),

    #[error("invalid sample '{value}' in row {row}, column {column}")]
    Parse {
        row: usize,
        column: usize,
        value: String,
    },
}

/// Path of the file for event `id` inside `dir`.
pub fn event_file_path(dir: &Path, id: u64) -> PathBuf {
    dir.join(format!("{id}.csv"))
}

/// Write a window as a two-row event file, replacing any existing file.
pub fn write_event_file(path: &Path, window: &Window) -> Result<(), EventFileError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    writer.write_record(samples_record(&window.voltage))?;
    writer.write_record(samples_record(&window.current))?;
    writer.flush()?;

    Ok(())
}

/// Read an event file back into a window.
pub fn read_event_file(path: &Path) -> Result<Window, EventFileError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::with_capacity(2);
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        rows.push(parse_row(row, &record)?);
    }

    if rows.len() != 2 {
        return Err(EventFileError::RowCount(rows.len()));
    }

    let current = rows.pop().unwrap_or_default();
    let voltage = rows.pop().unwrap_or_default();
    Ok(Window {
        voltage,
        current,
        noise: None,
    })
}

fn samples_record(samples: &[f64]) -> Vec<String> {
    if samples.is_empty() {
        return vec![String::new()];
    }
    samples.iter().map(f64::to_string).collect()
}

fn parse_row(row: usize, record: &csv::StringRecord) -> Result<Vec<f64>, EventFileError> {
    // An empty sequence is written as a single empty field.
    if record.len() == 1 && record.get(0) == Some("") {
        return Ok(Vec::new());
    }

    record
        .iter()
        .enumerate()
        .map(|(column, value)| {
            value.trim().parse().map_err(|_| EventFileError::Parse {
                row,
                column,
                value: value.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = event_file_path(dir.path(), 7);
        assert!(path.ends_with("7.csv"));

        let window = Window::new(vec![230.5, -1.25, 0.0], vec![0.1, 0.2, -0.3]);
        write_event_file(&path, &window).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["230.5,-1.25,0", "0.1,0.2,-0.3"]);
    }

    #[test]
    fn test_precision_survives_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.csv");

        let voltage: Vec<f64> = (0..50).map(|i| (i as f64 * 0.7311).sin() * 325.27).collect();
        let current: Vec<f64> = (0..50).map(|i| 1.0 / (i as f64 + 3.0)).collect();
        let window = Window::new(voltage, current);

        write_event_file(&path, &window).unwrap();
        let back = read_event_file(&path).unwrap();

        assert_eq!(back, window);
    }

    #[test]
    fn test_overwrite_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.csv");
        let window = Window::new(vec![1.0 / 3.0, 2.0], vec![3.5, 1e-7]);

        write_event_file(&path, &window).unwrap();
        let first = std::fs::read(&path).unwrap();
        write_event_file(&path, &window).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_rejects_wrong_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.csv");
        std::fs::write(&path, "1,2,3\n").unwrap();

        assert!(matches!(
            read_event_file(&path),
            Err(EventFileError::RowCount(1))
        ));
    }

    #[test]
    fn test_rejects_non_numeric_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.csv");
        std::fs::write(&path, "1,2\n3,x\n").unwrap();

        assert!(matches!(
            read_event_file(&path),
            Err(EventFileError::Parse { row: 1, column: 1, .. })
        ));
    }
}
