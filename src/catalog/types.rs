//! Event types.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Component value marking events without a known classification.
pub const UNLABELED: &str = "unlabeled";

/// A single labeled occurrence in the recordings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unique id, also the ordering key and output file name
    pub id: u64,
    /// Day whose partition holds the recording
    pub date: NaiveDate,
    /// Start of the event
    pub timestamp: NaiveDateTime,
    /// Classification (appliance/component name)
    pub label: String,
}

impl Event {
    pub fn new(id: u64, date: NaiveDate, timestamp: NaiveDateTime, label: impl Into<String>) -> Self {
        Self {
            id,
            date,
            timestamp,
            label: label.into(),
        }
    }

    /// The day partition this event is read from.
    pub fn partition_date(&self) -> NaiveDate {
        self.date
    }

    /// Output file name for this event.
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.id)
    }
}

/// Whether a component label is the unlabeled sentinel.
pub fn is_unlabeled(label: &str) -> bool {
    label.trim() == UNLABELED
}
