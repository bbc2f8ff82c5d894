//! Prometheus text format expansion
//!
//! `prometheus-parse` folds histogram and summary lines into one value per
//! family. The store wants the flat series a Prometheus server would record,
//! so this module expands them back: one `<name>_bucket` sample per `le` and
//! one sample per `quantile`.

use chrono::{DateTime, Utc};
use prometheus_parse::{Scrape, Value};

use crate::error::ScrapeError;
use crate::histogram::INF_BUCKET;
use crate::labels::{LabelSet, BUCKET_LABEL, METRIC_NAME_LABEL, QUANTILE_LABEL};

/// One flattened sample ready for [`MetricStore::write`]
///
/// [`MetricStore::write`]: crate::store::MetricStore::write
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedSample {
    pub labels: LabelSet,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub value: f64,
}

/// Parse a text exposition and expand it into flat samples
///
/// `target_labels` (typically `instance` and `job`) are added to every
/// sample unless the target already exposes a label with the same name.
/// Samples without an explicit timestamp are stamped with `default_ts`.
pub fn parse_exposition(
    text: &str,
    target_labels: &[(String, String)],
    default_ts: DateTime<Utc>,
) -> Result<Vec<ScrapedSample>, ScrapeError> {
    let lines = text.lines().map(|s| Ok(s.to_owned()));
    let scrape = Scrape::parse_at(lines, default_ts)?;

    let mut samples = Vec::with_capacity(scrape.samples.len());

    for sample in &scrape.samples {
        let mut base = LabelSet::new(sample.labels.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        for (name, value) in target_labels {
            if !base.contains(name) {
                base.insert(name.as_str(), value.as_str());
            }
        }

        let timestamp = sample.timestamp.timestamp_millis();
        let mut push = |name: &str, extra: Option<(&str, String)>, value: f64| {
            let mut labels = base.clone();
            labels.insert(METRIC_NAME_LABEL, name);
            if let Some((label, label_value)) = extra {
                labels.insert(label, label_value);
            }
            samples.push(ScrapedSample {
                labels,
                timestamp,
                value,
            });
        };

        match &sample.value {
            Value::Counter(v) | Value::Gauge(v) | Value::Untyped(v) => {
                push(&sample.metric, None, *v);
            }
            Value::Histogram(buckets) => {
                let name = bucket_metric_name(&sample.metric);
                for bucket in buckets {
                    push(
                        &name,
                        Some((BUCKET_LABEL, format_bound(bucket.less_than))),
                        bucket.count,
                    );
                }
            }
            Value::Summary(quantiles) => {
                for quantile in quantiles {
                    push(
                        &sample.metric,
                        Some((QUANTILE_LABEL, format_bound(quantile.quantile))),
                        quantile.count,
                    );
                }
            }
        }
    }

    Ok(samples)
}

/// `<family>_bucket`, whether or not the parser kept the suffix
fn bucket_metric_name(metric: &str) -> String {
    format!("{}_bucket", metric.strip_suffix("_bucket").unwrap_or(metric))
}

/// Render a bound the way Prometheus does: shortest form, `+Inf` for infinity
fn format_bound(bound: f64) -> String {
    if bound == f64::INFINITY {
        INF_BUCKET.to_string()
    } else if bound == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        bound.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXPOSITION: &str = r#"# HELP workqueue_depth Current depth of workqueue
# TYPE workqueue_depth gauge
workqueue_depth{name="pods"} 3
# HELP reconcile_total Total reconciliations
# TYPE reconcile_total counter
reconcile_total{controller="pods",result="success"} 12
# HELP reconcile_time_seconds Reconcile latency
# TYPE reconcile_time_seconds histogram
reconcile_time_seconds_bucket{controller="pods",le="0.05"} 4
reconcile_time_seconds_bucket{controller="pods",le="0.5"} 9
reconcile_time_seconds_bucket{controller="pods",le="+Inf"} 10
reconcile_time_seconds_sum{controller="pods"} 1.5
reconcile_time_seconds_count{controller="pods"} 10
"#;

    fn targets() -> Vec<(String, String)> {
        vec![
            ("instance".to_string(), "localhost:8080".to_string()),
            ("job".to_string(), "metrics-viewer".to_string()),
        ]
    }

    fn scrape_time() -> DateTime<Utc> {
        DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
    }

    fn named<'a>(samples: &'a [ScrapedSample], name: &str) -> Vec<&'a ScrapedSample> {
        samples
            .iter()
            .filter(|s| s.labels.metric_name() == name)
            .collect()
    }

    #[test]
    fn test_plain_samples_get_name_and_target_labels() {
        let samples = parse_exposition(EXPOSITION, &targets(), scrape_time()).unwrap();

        let depth = named(&samples, "workqueue_depth");
        assert_eq!(depth.len(), 1);
        assert_eq!(depth[0].value, 3.0);
        assert_eq!(depth[0].labels.get("name"), Some("pods"));
        assert_eq!(depth[0].labels.get("instance"), Some("localhost:8080"));
        assert_eq!(depth[0].labels.get("job"), Some("metrics-viewer"));

        let total = named(&samples, "reconcile_total");
        assert_eq!(total.len(), 1);
        assert_eq!(total[0].labels.get("result"), Some("success"));
    }

    #[test]
    fn test_histogram_expands_to_buckets() {
        let samples = parse_exposition(EXPOSITION, &targets(), scrape_time()).unwrap();

        let buckets = named(&samples, "reconcile_time_seconds_bucket");
        let mut bounds: Vec<_> = buckets
            .iter()
            .map(|s| (s.labels.get("le").unwrap().to_string(), s.value))
            .collect();
        bounds.sort_by(|a, b| a.1.total_cmp(&b.1));

        assert_eq!(
            bounds,
            vec![
                ("0.05".to_string(), 4.0),
                ("0.5".to_string(), 9.0),
                ("+Inf".to_string(), 10.0),
            ]
        );
        assert!(buckets
            .iter()
            .all(|s| s.labels.get("controller") == Some("pods")));
    }

    #[test]
    fn test_exposed_labels_win_over_target_labels() {
        let text = "up{job=\"exposed\"} 1\n";
        let samples = parse_exposition(text, &targets(), scrape_time()).unwrap();

        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].labels.get("job"), Some("exposed"));
        assert_eq!(samples[0].labels.get("instance"), Some("localhost:8080"));
    }

    #[test]
    fn test_timestamps_default_to_scrape_time() {
        let text = "up 1\nlast_seen 2 1600000000000\n";
        let samples = parse_exposition(text, &targets(), scrape_time()).unwrap();

        assert_eq!(named(&samples, "up")[0].timestamp, 1_700_000_000_000);
        assert_eq!(named(&samples, "last_seen")[0].timestamp, 1_600_000_000_000);
    }

    #[test]
    fn test_format_bound() {
        assert_eq!(format_bound(f64::INFINITY), "+Inf");
        assert_eq!(format_bound(0.05), "0.05");
        assert_eq!(format_bound(1.0), "1");
        assert_eq!(format_bound(2.5), "2.5");
    }

    #[test]
    fn test_bucket_metric_name() {
        assert_eq!(bucket_metric_name("latency"), "latency_bucket");
        assert_eq!(bucket_metric_name("latency_bucket"), "latency_bucket");
    }

    #[test]
    fn test_empty_exposition() {
        assert!(parse_exposition("", &targets(), scrape_time()).unwrap().is_empty());
    }
}
