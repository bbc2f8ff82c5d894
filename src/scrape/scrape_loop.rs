//! Scrape loop
//!
//! Fetches the target on a fixed interval, writes every sample into the
//! shared store and marks series that vanished since the previous
//! successful scrape with a NaN staleness marker.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::fetcher::MetricsFetcher;
use super::parser::parse_exposition;
use crate::error::ScrapeError;
use crate::labels::{LabelSet, SeriesId};
use crate::store::MetricStore;

/// Outcome of the most recent scrape, published to the UI
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeStatus {
    Pending,
    Ok { at: DateTime<Utc>, samples: usize },
    Failed { at: DateTime<Utc>, message: String },
}

/// Summary of one successful scrape
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeReport {
    pub samples: usize,
    /// Series present in the previous scrape but missing from this one
    pub stale: usize,
    pub duration: Duration,
}

/// Periodically scrapes one target into a [`MetricStore`]
pub struct ScrapeLoop {
    fetcher: MetricsFetcher,
    store: Arc<dyn MetricStore>,
    target_labels: Vec<(String, String)>,
    interval: Duration,
    // Series written by the last successful scrape
    seen: HashMap<SeriesId, LabelSet>,
    status: watch::Sender<ScrapeStatus>,
}

impl ScrapeLoop {
    pub fn new(
        fetcher: MetricsFetcher,
        store: Arc<dyn MetricStore>,
        target_labels: Vec<(String, String)>,
        interval: Duration,
    ) -> Self {
        let (status, _) = watch::channel(ScrapeStatus::Pending);
        Self {
            fetcher,
            store,
            target_labels,
            interval,
            seen: HashMap::new(),
            status,
        }
    }

    /// Receive the status of every finished scrape
    pub fn subscribe(&self) -> watch::Receiver<ScrapeStatus> {
        self.status.subscribe()
    }

    /// Fetch once, write every sample and mark vanished series stale
    ///
    /// A failed scrape writes nothing, so the store keeps the last good
    /// values and the next success computes staleness against them.
    pub async fn scrape_once(&mut self) -> Result<ScrapeReport, ScrapeError> {
        let started = Instant::now();

        let result = self.fetch_and_write().await;

        let status = match &result {
            Ok(current) => ScrapeStatus::Ok {
                at: Utc::now(),
                samples: current.len(),
            },
            Err(e) => ScrapeStatus::Failed {
                at: Utc::now(),
                message: e.to_string(),
            },
        };
        self.status.send_replace(status);

        let current = result?;
        let samples = current.len();
        let stale = self.mark_stale(current);

        Ok(ScrapeReport {
            samples,
            stale,
            duration: started.elapsed(),
        })
    }

    /// Scrape on every tick until the task is dropped
    pub async fn run(mut self) {
        info!(
            url = %self.fetcher.url(),
            interval_ms = self.interval.as_millis() as u64,
            "Starting scrape loop"
        );

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match self.scrape_once().await {
                Ok(report) => debug!(
                    samples = report.samples,
                    stale = report.stale,
                    duration_ms = report.duration.as_millis() as u64,
                    "Scrape finished"
                ),
                Err(e) => warn!(url = %self.fetcher.url(), error = %e, "Scrape failed"),
            }
        }
    }

    async fn fetch_and_write(&self) -> Result<HashMap<SeriesId, LabelSet>, ScrapeError> {
        let text = self.fetcher.fetch().await?;
        let samples = parse_exposition(&text, &self.target_labels, Utc::now())?;

        let mut current = HashMap::with_capacity(samples.len());
        for sample in samples {
            let id = self
                .store
                .write(sample.labels.clone(), sample.timestamp, sample.value);
            current.insert(id, sample.labels);
        }

        Ok(current)
    }

    fn mark_stale(&mut self, current: HashMap<SeriesId, LabelSet>) -> usize {
        let now = Utc::now().timestamp_millis();
        let mut stale = 0;
        for (id, labels) in self.seen.drain() {
            if !current.contains_key(&id) {
                self.store.write(labels, now, f64::NAN);
                stale += 1;
            }
        }

        self.seen = current;
        stale
    }
}
