//! Label sets and series identity
//!
//! A series is identified by its full label set, including the metric name
//! under `__name__`. Labels are kept sorted by name so that two sets built
//! from the same pairs in any order compare, hash and print identically.

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Reserved label carrying the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";
/// Reserved label carrying a histogram bucket's upper bound
pub const BUCKET_LABEL: &str = "le";
/// Reserved label carrying a summary quantile
pub const QUANTILE_LABEL: &str = "quantile";
/// Target label injected by the scraper
pub const INSTANCE_LABEL: &str = "instance";
/// Target label injected by the scraper
pub const JOB_LABEL: &str = "job";

const SEPARATOR: u8 = 0xff;

/// Identity of a series: the blake3 digest of its label set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesId([u8; 32]);

impl SeriesId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// An unordered set of (name, value) pairs, stored sorted by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet(Vec<(String, String)>);

impl LabelSet {
    /// Build a label set from pairs. If a name repeats, the last value wins.
    pub fn new<I, K, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let sorted: BTreeMap<String, String> = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self(sorted.into_iter().collect())
    }

    /// Returns the value of the label with the given name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
            .map(|index| self.0[index].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Set a label, replacing any existing value for `name`
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.binary_search_by(|(n, _)| n.as_str().cmp(name.as_str())) {
            Ok(index) => self.0[index].1 = value,
            Err(index) => self.0.insert(index, (name, value)),
        }
    }

    /// The metric name carried under `__name__`, empty if absent
    pub fn metric_name(&self) -> &str {
        self.get(METRIC_NAME_LABEL).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every (name, value) pair of `predicate` is present verbatim
    pub fn matches(&self, predicate: &[(&str, &str)]) -> bool {
        predicate
            .iter()
            .all(|(name, value)| self.get(name) == Some(*value))
    }

    /// Deterministic, order-independent digest of the label set
    ///
    /// Names and values are separated by a byte that cannot occur in UTF-8,
    /// so `{a="bc"}` and `{ab="c"}` hash differently. The digest is stable
    /// across processes and Rust releases.
    pub fn series_id(&self) -> SeriesId {
        let mut hasher = blake3::Hasher::new();
        for (name, value) in &self.0 {
            hasher.update(name.as_bytes());
            hasher.update(&[SEPARATOR]);
            hasher.update(value.as_bytes());
            hasher.update(&[SEPARATOR]);
        }
        SeriesId(hasher.finalize().into())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={:?}", name, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for LabelSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
