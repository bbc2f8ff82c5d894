//! Series list shown in the live view
//!
//! Rows are keyed by the canonical text of a series' label set and kept in
//! key order. Each refresh reconciles the rows against a store snapshot
//! instead of rebuilding the list, so the selection does not jump around.

use crate::error::ViewError;
use crate::labels::{INSTANCE_LABEL, JOB_LABEL, METRIC_NAME_LABEL};
use crate::store::Sample;

/// One displayed series
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesRow {
    pub key: String,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct SeriesList {
    pub(crate) rows: Vec<SeriesRow>,
}

impl SeriesList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a snapshot into the list
    ///
    /// Stale (NaN) samples remove their row, new series are inserted at
    /// their sorted position and existing rows get the new text.
    pub fn apply(&mut self, samples: &[Sample]) -> Result<(), ViewError> {
        for sample in samples {
            let key = series_key(sample);
            let found: Vec<usize> = self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row.key == key)
                .map(|(index, _)| index)
                .collect();

            match found.as_slice() {
                [] => {
                    if sample.is_stale() {
                        continue;
                    }
                    let position = self.rows.partition_point(|row| row.key < key);
                    self.rows.insert(
                        position,
                        SeriesRow {
                            key,
                            text: series_text(sample),
                        },
                    );
                }
                [index] => {
                    if sample.is_stale() {
                        self.rows.remove(*index);
                    } else {
                        self.rows[*index].text = series_text(sample);
                    }
                }
                _ => {
                    return Err(ViewError::AmbiguousMatch {
                        key,
                        count: found.len(),
                    })
                }
            }
        }

        Ok(())
    }

    pub fn rows(&self) -> &[SeriesRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sort and lookup key of a series
pub fn series_key(sample: &Sample) -> String {
    sample.labels.to_string()
}

/// `metric{label=value,...} value`, target labels hidden
pub fn series_text(sample: &Sample) -> String {
    let pairs: Vec<String> = sample
        .labels
        .iter()
        .filter(|(name, _)| ![METRIC_NAME_LABEL, INSTANCE_LABEL, JOB_LABEL].contains(name))
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();

    format!(
        "{}{{{}}} {}",
        sample.metric_name(),
        pairs.join(","),
        format_value(sample.value)
    )
}

/// Integers without a fraction, everything else in shortest form
pub fn format_value(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSet;

    fn sample(name: &str, controller: &str, value: f64) -> Sample {
        Sample::new(
            LabelSet::new([
                ("__name__", name),
                ("controller", controller),
                ("instance", "localhost:8080"),
                ("job", "metrics-viewer"),
            ]),
            0,
            value,
        )
    }

    #[test]
    fn test_series_text_hides_target_labels() {
        let s = sample("reconcile_total", "pods", 12.0);
        assert_eq!(series_text(&s), "reconcile_total{controller=pods} 12");
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(0.25), "0.25");
        assert_eq!(format_value(f64::INFINITY), "inf");
    }

    #[test]
    fn test_apply_inserts_sorted_and_updates() {
        let mut list = SeriesList::new();
        list.apply(&[sample("b", "x", 1.0), sample("a", "x", 2.0)]).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.rows()[0].text.starts_with("a{"));

        list.apply(&[sample("b", "x", 5.0)]).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.rows()[1].text, "b{controller=x} 5");
    }

    #[test]
    fn test_stale_samples_remove_rows() {
        let mut list = SeriesList::new();
        list.apply(&[sample("a", "x", 1.0), sample("b", "x", 1.0)]).unwrap();

        list.apply(&[sample("a", "x", f64::NAN)]).unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.rows()[0].text.starts_with("b{"));

        // a stale series that was never shown stays hidden
        list.apply(&[sample("c", "x", f64::NAN)]).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_duplicate_rows_are_reported() {
        let s = sample("a", "x", 1.0);
        let row = SeriesRow {
            key: series_key(&s),
            text: series_text(&s),
        };
        let mut list = SeriesList {
            rows: vec![row.clone(), row],
        };

        let err = list.apply(&[s]).unwrap_err();
        assert!(matches!(err, ViewError::AmbiguousMatch { count: 2, .. }));
    }
}
