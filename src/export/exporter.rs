//! The event exporter.
//!
//! For each labeled event, in ascending id order, the exporter resolves
//! the event's day partition, reads a fixed-duration window starting at
//! the event timestamp and writes it to `<output_dir>/<id>.csv`.
//!
//! The first failure aborts the run. Files written before the failure
//! stay on disk; a rerun overwrites them with identical content.

use crate::catalog::{types::is_unlabeled, Event};
use crate::export::file::{event_file_path, write_event_file, EventFileError};
use crate::export::progress::{NoProgress, Progress, ProgressSink};
use crate::reader::{DayWindowReader, PartitionLayout, ReaderError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

/// Settings for an export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding the day partitions
    pub base_path: PathBuf,
    /// Directory receiving the event files
    pub output_dir: PathBuf,
    /// Denominator for percent complete
    pub total_expected_events: u64,
    /// Length of the window read per event
    pub window_duration: Duration,
    /// File extension of day partitions
    pub partition_extension: String,
}

impl ExportConfig {
    pub fn partition_layout(&self) -> PartitionLayout {
        PartitionLayout::new(&self.base_path, &self.partition_extension)
    }
}

/// Errors that abort an export run.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("event {id}: partition for {date} unavailable: {source}")]
    PartitionUnavailable {
        id: u64,
        date: NaiveDate,
        #[source]
        source: ReaderError,
    },

    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: EventFileError,
    },
}

/// One file produced by the exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedFile {
    pub id: u64,
    pub path: PathBuf,
    /// Samples per channel
    pub samples: usize,
}

/// Outcome of a completed export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    /// Files written, in the order they were produced
    pub files: Vec<ExportedFile>,
    /// Unlabeled events that were passed in and ignored
    pub skipped: usize,
    pub elapsed: Duration,
}

impl ExportReport {
    pub fn exported_count(&self) -> usize {
        self.files.len()
    }
}

/// Writes one flat file per labeled event.
pub struct EventExporter<R> {
    config: ExportConfig,
    reader: R,
    progress: Box<dyn ProgressSink>,
}

impl<R: DayWindowReader> EventExporter<R> {
    /// Create an exporter that reports no progress.
    pub fn new(config: ExportConfig, reader: R) -> Self {
        Self {
            config,
            reader,
            progress: Box::new(NoProgress),
        }
    }

    /// Report progress to `sink`.
    pub fn with_progress(mut self, sink: impl ProgressSink + 'static) -> Self {
        self.progress = Box::new(sink);
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export `events` into the configured output directory.
    pub fn export(&mut self, events: &[Event]) -> Result<ExportReport, ExportError> {
        let output_dir = self.config.output_dir.clone();
        self.export_to(events, &output_dir)
    }

    /// Export `events` into `output_dir`, creating it if needed.
    pub fn export_to(
        &mut self,
        events: &[Event],
        output_dir: &Path,
    ) -> Result<ExportReport, ExportError> {
        let started = Instant::now();
        let layout = self.config.partition_layout();

        std::fs::create_dir_all(output_dir).map_err(|e| ExportError::Write {
            path: output_dir.to_path_buf(),
            source: EventFileError::Io(e),
        })?;

        let mut ordered: Vec<&Event> = events.iter().collect();
        ordered.sort_by_key(|e| e.id);

        info!(
            events = ordered.len(),
            output_dir = %output_dir.display(),
            "starting export"
        );

        let mut files = Vec::with_capacity(ordered.len());
        let mut skipped = 0;

        for event in ordered {
            if is_unlabeled(&event.label) {
                debug!(id = event.id, "skipping unlabeled event");
                skipped += 1;
                continue;
            }

            self.progress.on_progress(&Progress::compute(
                event.id,
                self.config.total_expected_events,
                started.elapsed(),
            ));

            let partition = layout.resolve(event.partition_date());
            let window = self
                .reader
                .load_window(
                    &partition,
                    event.timestamp,
                    self.config.window_duration,
                    false,
                )
                .map_err(|source| ExportError::PartitionUnavailable {
                    id: event.id,
                    date: event.date,
                    source,
                })?;

            let path = event_file_path(output_dir, event.id);
            write_event_file(&path, &window).map_err(|source| ExportError::Write {
                path: path.clone(),
                source,
            })?;

            debug!(
                id = event.id,
                label = %event.label,
                samples = window.len(),
                path = %path.display(),
                "exported event"
            );

            files.push(ExportedFile {
                id: event.id,
                path,
                samples: window.len(),
            });
        }

        let report = ExportReport {
            output_dir: output_dir.to_path_buf(),
            files,
            skipped,
            elapsed: started.elapsed(),
        };

        self.progress.on_finished(&report);
        info!(
            exported = report.exported_count(),
            skipped = report.skipped,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "export finished"
        );

        Ok(report)
    }
}
