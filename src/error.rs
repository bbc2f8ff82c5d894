use std::num::ParseFloatError;
use thiserror::Error;

/// Malformed histogram input found while rebuilding buckets
#[derive(Debug, Error)]
pub enum HistogramError {
    /// A bucket sample carries no `le` label
    #[error("bucket sample of {metric} has no le label: {labels}")]
    MissingBucketLabel { metric: String, labels: String },
    /// The `le` label is neither `+Inf` nor a number
    #[error("invalid bucket bound {label:?}: {source}")]
    InvalidBucketBound {
        label: String,
        #[source]
        source: ParseFloatError,
    },
}

/// Failure of a single scrape; the next tick retries
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to fetch metrics: {0}")]
    Request(#[from] reqwest::Error),
    #[error("failed to fetch metrics: HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read metrics response: {0}")]
    Body(#[source] reqwest::Error),
    #[error("failed to parse metrics: {0}")]
    Parse(#[from] std::io::Error),
}

/// Inconsistent state in the series list view
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("found {count} rows for series {key}")]
    AmbiguousMatch { key: String, count: usize },
}
