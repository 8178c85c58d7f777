//! Event catalog: the table of labeled events to extract.
//!
//! The catalog is loaded once from the event metadata table and
//! excludes every row whose component is the `unlabeled` sentinel.

pub mod loader;
pub mod types;

// Re-export commonly used types
pub use loader::{EventCatalog, LoadError};
pub use types::{Event, UNLABELED};
