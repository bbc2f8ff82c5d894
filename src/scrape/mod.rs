//! Scrape source for the snapshot store
//!
//! This module fetches the target's Prometheus text exposition over HTTP,
//! expands it into labelled samples and writes them into a [`MetricStore`]
//! on a fixed interval.
//!
//! [`MetricStore`]: crate::store::MetricStore

pub mod fetcher;
pub mod parser;
mod scrape_loop;

pub use fetcher::MetricsFetcher;
pub use parser::{parse_exposition, ScrapedSample};
pub use scrape_loop::{ScrapeLoop, ScrapeReport, ScrapeStatus};
