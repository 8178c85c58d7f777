//! Exporting labeled events into per-event flat files.
//!
//! This module contains:
//! - The exporter driving one window read and one file write per event
//! - The two-row CSV codec used for event files
//! - Progress reporting hooks

pub mod exporter;
pub mod file;
pub mod progress;

// Re-export commonly used types
pub use exporter::{EventExporter, ExportConfig, ExportError, ExportReport, ExportedFile};
pub use file::{event_file_path, read_event_file, write_event_file, EventFileError};
pub use progress::{ConsoleProgress, NoProgress, Progress, ProgressSink};
