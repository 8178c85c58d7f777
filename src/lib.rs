//! Event Extract - per-event flat files from day-partitioned recordings.
//!
//! Reading a single event out of a day-partitioned voltage/current
//! recording means opening and scanning a whole day. This library
//! extracts every labeled event once into its own small CSV file so that
//! repeated experiments can re-read events cheaply.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Event Extract                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Catalog   │──▶│  Exporter   │──▶│  <id>.csv   │       │
//! │  │ (label CSV) │   │ (10s window)│   │ (2 rows)    │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           ▲                 │               │
//! │                           │                 ▼               │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │ Day Window  │──▶│  Verifier   │       │
//! │                    │   Reader    │   │ (diagnostic)│       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use event_extract::{catalog::EventCatalog, export::EventExporter, reader::CsvDayReader, Config};
//!
//! let config = Config::load().expect("Failed to load config");
//! let catalog = EventCatalog::load(&config.metadata_path).expect("Failed to load catalog");
//!
//! let reader = CsvDayReader::new(config.sampling_rate);
//! let mut exporter = EventExporter::new(config.export_config(), reader);
//! let report = exporter.export(catalog.events()).expect("Export failed");
//! println!("Exported {} events", report.exported_count());
//! ```

pub mod catalog;
pub mod config;
pub mod export;
pub mod features;
pub mod reader;
pub mod verify;

// Re-export key types at crate root for convenience
pub use catalog::{Event, EventCatalog, LoadError};
pub use config::{Config, ConfigError};
pub use export::{
    ConsoleProgress, EventExporter, ExportConfig, ExportError, ExportReport, Progress,
    ProgressSink,
};
pub use features::{SpectralConfig, SpectralFeatures};
pub use reader::{CsvDayReader, DayWindowReader, PartitionLayout, ReaderError, Window};
pub use verify::{ExportVerifier, VerificationResult, VerifyError};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
