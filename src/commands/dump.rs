//! Dump command implementation
//!
//! Scrapes the target once and prints every live series, sorted by key.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use metrics_viewer::config::{load_config, validate_config};
use metrics_viewer::store::{MetricStore, Sample, SnapshotStore};
use metrics_viewer::view::{series_key, series_text};

use crate::cli::ScrapeArgs;

/// Execute the dump command
pub async fn execute(
    config_path: Option<&Path>,
    host: String,
    scrape_args: ScrapeArgs,
    json: bool,
) -> Result<()> {
    let mut cfg = load_config(config_path)?;
    scrape_args.apply(&mut cfg);
    validate_config(&cfg)?;

    let store = Arc::new(SnapshotStore::new(cfg.display.entity_label.clone()));
    let mut scrape_loop = super::scrape_loop(&cfg, &host, store.clone())?;

    let report = scrape_loop.scrape_once().await?;
    info!(samples = report.samples, "Scraped {}", host);

    let samples = live_samples(store.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&samples)?);
    } else {
        for sample in &samples {
            println!("{}", series_text(sample));
        }
    }

    Ok(())
}

/// Non-stale samples ordered by series key
fn live_samples(store: &dyn MetricStore) -> Vec<Sample> {
    let mut samples: Vec<Sample> = store
        .snapshot()
        .into_iter()
        .filter(|s| !s.is_stale())
        .collect();
    samples.sort_by_cached_key(series_key);
    samples
}
