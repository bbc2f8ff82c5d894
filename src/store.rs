//! Snapshot metric store
//!
//! Keeps only the latest sample per series. The scrape loop writes into it and
//! the refresh loop queries it; both go through the [`MetricStore`] trait and
//! share one explicitly constructed store.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::labels::{LabelSet, SeriesId, METRIC_NAME_LABEL};

/// Label used to discover sub-entities when none is configured
pub const DEFAULT_ENTITY_LABEL: &str = "controller";

/// Returned by [`MetricStore::write`]; callers may ignore it
pub type SeriesHandle = SeriesId;

/// The latest observed value of one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub labels: LabelSet,
    /// Milliseconds since the Unix epoch, as supplied by the producer
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(labels: LabelSet, timestamp: i64, value: f64) -> Self {
        Self {
            labels,
            timestamp,
            value,
        }
    }

    pub fn metric_name(&self) -> &str {
        self.labels.metric_name()
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name)
    }

    /// A NaN value marks a series that vanished from the latest scrape
    pub fn is_stale(&self) -> bool {
        self.value.is_nan()
    }
}

/// Latest-value metric storage shared by the scrape and refresh loops
pub trait MetricStore: Send + Sync {
    /// Store a sample, replacing whatever was stored for the same label set
    fn write(&self, labels: LabelSet, timestamp: i64, value: f64) -> SeriesHandle;

    /// All samples named `metric` whose labels contain every predicate pair
    fn query(&self, metric: &str, predicate: &[(&str, &str)]) -> Vec<Sample>;

    /// Sorted, distinct values of the entity label across stored series
    fn entity_names(&self) -> Vec<String>;

    /// Copy of every stored sample
    fn snapshot(&self) -> Vec<Sample>;

    /// Name of the label that identifies a sub-entity
    fn entity_label(&self) -> &str;
}

/// In-memory [`MetricStore`] guarded by a single mutex
#[derive(Debug)]
pub struct SnapshotStore {
    series: Mutex<HashMap<SeriesId, Sample>>,
    entity_label: String,
}

impl SnapshotStore {
    pub fn new(entity_label: impl Into<String>) -> Self {
        Self {
            series: Mutex::new(HashMap::new()),
            entity_label: entity_label.into(),
        }
    }

    /// Number of distinct series ever written
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking writer cannot leave a half-inserted entry behind, so a
    // poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<SeriesId, Sample>> {
        self.series.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_ENTITY_LABEL)
    }
}

impl MetricStore for SnapshotStore {
    fn write(&self, labels: LabelSet, timestamp: i64, value: f64) -> SeriesHandle {
        let id = labels.series_id();
        let sample = Sample::new(labels, timestamp, value);
        self.lock().insert(id, sample);
        id
    }

    fn query(&self, metric: &str, predicate: &[(&str, &str)]) -> Vec<Sample> {
        self.lock()
            .values()
            .filter(|sample| {
                sample.labels.get(METRIC_NAME_LABEL) == Some(metric)
                    && sample.labels.matches(predicate)
            })
            .cloned()
            .collect()
    }

    fn entity_names(&self) -> Vec<String> {
        let names: BTreeSet<String> = self
            .lock()
            .values()
            .filter_map(|sample| sample.label(&self.entity_label))
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect();

        names.into_iter().collect()
    }

    fn snapshot(&self) -> Vec<Sample> {
        self.lock().values().cloned().collect()
    }

    fn entity_label(&self) -> &str {
        &self.entity_label
    }
}
