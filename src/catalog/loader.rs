//! Loading the event catalog from the metadata table.
//!
//! The table is a CSV file with (at least) the columns `ID`, `Date`,
//! `Timestamp` and `Component`. Columns are located by header name, so
//! their order and any extra columns do not matter.

use crate::catalog::types::{is_unlabeled, Event};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashSet};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

const ID_COLUMN: &str = "ID";
const DATE_COLUMN: &str = "Date";
const TIMESTAMP_COLUMN: &str = "Timestamp";
const COMPONENT_COLUMN: &str = "Component";

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const TIME_FORMAT: &str = "%H:%M:%S%.f";

/// Errors raised while loading the catalog.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read event table: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse event table: {0}")]
    Csv(#[from] csv::Error),

    #[error("event table is missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("malformed row at line {line}: {reason}")]
    Malformed { line: u64, reason: String },

    #[error("event id {0} appears more than once")]
    DuplicateId(u64),
}

/// In-memory table of labeled events, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<Event>,
    skipped_unlabeled: usize,
}

impl EventCatalog {
    /// Load the catalog from a CSV file.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let file = std::fs::File::open(path)?;
        let catalog = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            events = catalog.len(),
            skipped = catalog.skipped_unlabeled,
            "loaded event catalog"
        );
        Ok(catalog)
    }

    /// Load the catalog from any CSV source.
    pub fn from_reader<R: Read>(source: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(source);

        let headers = reader.headers()?.clone();
        let column = |name: &'static str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or(LoadError::MissingColumn(name))
        };
        let id_idx = column(ID_COLUMN)?;
        let date_idx = column(DATE_COLUMN)?;
        let timestamp_idx = column(TIMESTAMP_COLUMN)?;
        let component_idx = column(COMPONENT_COLUMN)?;

        let mut events = Vec::new();
        let mut seen = HashSet::new();
        let mut skipped_unlabeled = 0;

        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let label = field(component_idx);
            if is_unlabeled(label) {
                skipped_unlabeled += 1;
                continue;
            }

            let id: u64 = field(id_idx).parse().map_err(|e| LoadError::Malformed {
                line,
                reason: format!("invalid ID '{}': {e}", field(id_idx)),
            })?;

            let date = parse_date(field(date_idx)).ok_or_else(|| LoadError::Malformed {
                line,
                reason: format!("invalid Date '{}'", field(date_idx)),
            })?;

            let timestamp =
                parse_timestamp(field(timestamp_idx), date).ok_or_else(|| LoadError::Malformed {
                    line,
                    reason: format!("invalid Timestamp '{}'", field(timestamp_idx)),
                })?;

            if !seen.insert(id) {
                return Err(LoadError::DuplicateId(id));
            }

            events.push(Event::new(id, date, timestamp, label));
        }

        events.sort_by_key(|e| e.id);
        debug!(
            events = events.len(),
            skipped_unlabeled, "parsed event table"
        );

        Ok(Self {
            events,
            skipped_unlabeled,
        })
    }

    /// Build a catalog from already-parsed events.
    ///
    /// Unlabeled events are dropped and the rest ordered by id.
    pub fn from_events(events: impl IntoIterator<Item = Event>) -> Self {
        let mut skipped_unlabeled = 0;
        let mut events: Vec<Event> = events
            .into_iter()
            .filter(|e| {
                let keep = !is_unlabeled(&e.label);
                if !keep {
                    skipped_unlabeled += 1;
                }
                keep
            })
            .collect();
        events.sort_by_key(|e| e.id);

        Self {
            events,
            skipped_unlabeled,
        }
    }

    /// Labeled events in ascending id order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Look up an event by id.
    pub fn get(&self, id: u64) -> Option<&Event> {
        self.events
            .binary_search_by_key(&id, |e| e.id)
            .ok()
            .map(|idx| &self.events[idx])
    }

    /// Number of rows dropped because they were unlabeled.
    pub fn skipped_unlabeled(&self) -> usize {
        self.skipped_unlabeled
    }

    /// Number of events per label.
    pub fn label_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.label.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Parse a timestamp that is either a full date-time or a time of day on `date`.
fn parse_timestamp(raw: &str, date: NaiveDate) -> Option<NaiveDateTime> {
    parse_datetime(raw).or_else(|| {
        NaiveTime::parse_from_str(raw, TIME_FORMAT)
            .ok()
            .map(|time| date.and_time(time))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "\
ID,Date,Timestamp,Component
3,2018-08-24,2018-08-24 08:30:00,kettle
1,2018-08-23,12:00:00,fridge
2,2018-08-23,12:05:00,unlabeled
";

    #[test]
    fn test_filters_unlabeled_and_orders_by_id() {
        let catalog = EventCatalog::from_reader(TABLE.as_bytes()).unwrap();

        let ids: Vec<u64> = catalog.events().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(catalog.skipped_unlabeled(), 1);
        assert!(catalog.get(2).is_none());
    }

    #[test]
    fn test_time_of_day_combines_with_date() {
        let catalog = EventCatalog::from_reader(TABLE.as_bytes()).unwrap();
        let event = catalog.get(1).unwrap();

        let date = NaiveDate::from_ymd_opt(2018, 8, 23).unwrap();
        assert_eq!(event.date, date);
        assert_eq!(event.timestamp, date.and_hms_opt(12, 0, 0).unwrap());
        assert_eq!(event.label, "fridge");
    }

    #[test]
    fn test_full_timestamp_and_fractional_seconds() {
        let table = "ID,Date,Timestamp,Component\n\
                     9,2018-08-23,2018-08-23T01:02:03.250,dryer\n";
        let catalog = EventCatalog::from_reader(table.as_bytes()).unwrap();
        let event = catalog.get(9).unwrap();

        let expected = NaiveDate::from_ymd_opt(2018, 8, 23)
            .unwrap()
            .and_hms_milli_opt(1, 2, 3, 250)
            .unwrap();
        assert_eq!(event.timestamp, expected);
    }

    #[test]
    fn test_columns_located_by_name() {
        let table = "Component,Extra,Timestamp,Date,ID\n\
                     lamp,x,07:00:00,2018-09-01,5\n";
        let catalog = EventCatalog::from_reader(table.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(5).unwrap().label, "lamp");
    }

    #[test]
    fn test_missing_column() {
        let table = "ID,Date,Component\n1,2018-08-23,fridge\n";
        let err = EventCatalog::from_reader(table.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn("Timestamp")));
    }

    #[test]
    fn test_malformed_row() {
        let table = "ID,Date,Timestamp,Component\nabc,2018-08-23,12:00:00,fridge\n";
        let err = EventCatalog::from_reader(table.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { line: 2, .. }));

        let table = "ID,Date,Timestamp,Component\n1,yesterday,12:00:00,fridge\n";
        let err = EventCatalog::from_reader(table.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Malformed { .. }));
    }

    #[test]
    fn test_duplicate_id() {
        let table = "ID,Date,Timestamp,Component\n\
                     1,2018-08-23,12:00:00,fridge\n\
                     1,2018-08-23,13:00:00,kettle\n";
        let err = EventCatalog::from_reader(table.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::DuplicateId(1)));
    }

    #[test]
    fn test_missing_file() {
        let err = EventCatalog::load(Path::new("/nonexistent/events.csv")).unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_label_counts() {
        let table = "ID,Date,Timestamp,Component\n\
                     1,2018-08-23,12:00:00,fridge\n\
                     2,2018-08-23,12:10:00,fridge\n\
                     3,2018-08-23,12:20:00,kettle\n";
        let catalog = EventCatalog::from_reader(table.as_bytes()).unwrap();
        let counts = catalog.label_counts();
        assert_eq!(counts.get("fridge"), Some(&2));
        assert_eq!(counts.get("kettle"), Some(&1));
    }

    #[test]
    fn test_from_events_drops_unlabeled() {
        let date = NaiveDate::from_ymd_opt(2018, 8, 23).unwrap();
        let at = date.and_hms_opt(12, 0, 0).unwrap();
        let catalog = EventCatalog::from_events(vec![
            Event::new(2, date, at, "fridge"),
            Event::new(1, date, at, "unlabeled"),
        ]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.skipped_unlabeled(), 1);
    }
}
