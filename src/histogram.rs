//! Cumulative histogram reconstruction
//!
//! Prometheus histograms arrive as one `<name>_bucket` series per upper bound
//! (`le`), each counting observations at or below that bound. This module
//! gathers those series for one entity, orders them by bound and exposes a
//! restartable cursor for charting.

use crate::error::HistogramError;
use crate::labels::BUCKET_LABEL;
use crate::store::{MetricStore, Sample};

/// `le` value of the bucket that counts every observation
pub const INF_BUCKET: &str = "+Inf";

/// One cumulative bucket
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    /// Raw `le` label, e.g. `"0.05"` or `"+Inf"`
    pub label: String,
    /// Cumulative count, truncated toward zero
    pub value: i64,
    /// Numeric upper bound; `+Inf` maps to `f64::MAX`
    pub bound: f64,
}

impl Bucket {
    /// Build a bucket from a `_bucket` sample
    pub fn from_sample(sample: &Sample) -> Result<Self, HistogramError> {
        let label = sample
            .label(BUCKET_LABEL)
            .ok_or_else(|| HistogramError::MissingBucketLabel {
                metric: sample.metric_name().to_string(),
                labels: sample.labels.to_string(),
            })?;

        Ok(Self {
            label: label.to_string(),
            bound: parse_bound(label)?,
            value: sample.value as i64,
        })
    }

    /// True for the sentinel returned once iteration is exhausted
    pub fn is_empty(&self) -> bool {
        self.label.is_empty()
    }
}

/// Parse an `le` label into a sortable bound
pub fn parse_bound(label: &str) -> Result<f64, HistogramError> {
    if label == INF_BUCKET {
        return Ok(f64::MAX);
    }

    label
        .parse::<f64>()
        .map_err(|source| HistogramError::InvalidBucketBound {
            label: label.to_string(),
            source,
        })
}

/// Percentile calculation result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Percentiles {
    pub p50: Option<f64>,
    pub p90: Option<f64>,
    pub p99: Option<f64>,
}

/// Sorted buckets of one histogram plus an iteration cursor
#[derive(Debug, Clone, Default)]
pub struct HistogramData {
    buckets: Vec<Bucket>,
    position: usize,
}

impl HistogramData {
    /// Rebuild the histogram `metric` for the entity whose `entity_label`
    /// equals `entity`
    ///
    /// # Errors
    /// Fails on the first bucket sample that lacks an `le` label or whose
    /// bound does not parse; no partial histogram is returned.
    pub fn build<S>(
        store: &S,
        metric: &str,
        entity_label: &str,
        entity: &str,
    ) -> Result<Self, HistogramError>
    where
        S: MetricStore + ?Sized,
    {
        let samples = store.query(metric, &[(entity_label, entity)]);
        Self::from_samples(&samples)
    }

    /// Order bucket samples by bound, `+Inf` last
    pub fn from_samples(samples: &[Sample]) -> Result<Self, HistogramError> {
        let mut buckets = samples
            .iter()
            .map(Bucket::from_sample)
            .collect::<Result<Vec<_>, _>>()?;

        buckets.sort_by(|a, b| a.bound.total_cmp(&b.bound));

        Ok(Self {
            buckets,
            position: 0,
        })
    }

    /// Rewind the cursor to the first bucket
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// True until the cursor reaches the last bucket
    ///
    /// The last bucket holds the total count and is never yielded.
    pub fn has_next(&self) -> bool {
        self.position + 1 < self.buckets.len()
    }

    /// Next bucket with a non-zero count, or an empty [`Bucket`] once none
    /// remains before the last bucket
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Bucket {
        while self.has_next() {
            let bucket = &self.buckets[self.position];
            self.position += 1;
            if bucket.value != 0 {
                return bucket.clone();
            }
        }
        Bucket::default()
    }

    /// Largest count over every bucket, the last one included
    pub fn max(&self) -> i64 {
        self.buckets.iter().map(|b| b.value).max().unwrap_or(0).max(0)
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Rewind and collect everything the cursor yields
    pub fn chart_buckets(&mut self) -> Vec<Bucket> {
        self.reset();
        let mut chart = Vec::new();
        while self.has_next() {
            let bucket = self.next();
            if bucket.is_empty() {
                break;
            }
            chart.push(bucket);
        }
        chart
    }

    /// Estimate a quantile (0.0 to 1.0) by linear interpolation
    ///
    /// # Algorithm
    /// 1. Take the total count from the last bucket
    /// 2. Target rank = ceil(quantile * total)
    /// 3. Find the first bucket whose cumulative count reaches the rank
    /// 4. Interpolate between the previous bound and that bucket's bound
    ///
    /// A rank that only the `+Inf` bucket reaches yields the highest finite
    /// bound.
    pub fn percentile(&self, quantile: f64) -> Option<f64> {
        let total = self.buckets.last()?.value;
        if total <= 0 {
            return None;
        }

        let target_rank = (quantile * total as f64).ceil() as i64;

        let mut prev_count = 0;
        let mut prev_bound = 0.0;

        for bucket in &self.buckets {
            if bucket.value >= target_rank {
                if bucket.bound == f64::MAX {
                    return Some(prev_bound);
                }

                if bucket.value == prev_count {
                    return Some(bucket.bound);
                }

                let bucket_count = bucket.value - prev_count;
                let rank_in_bucket = target_rank - prev_count;
                let fraction = rank_in_bucket as f64 / bucket_count as f64;

                return Some(prev_bound + fraction * (bucket.bound - prev_bound));
            }

            prev_count = bucket.value;
            prev_bound = bucket.bound;
        }

        None
    }

    /// P50, P90 and P99
    pub fn percentiles(&self) -> Percentiles {
        Percentiles {
            p50: self.percentile(0.50),
            p90: self.percentile(0.90),
            p99: self.percentile(0.99),
        }
    }
}
