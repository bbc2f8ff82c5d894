//! Command implementations for the CLI
//!
//! - view: live terminal view of the target's metrics
//! - dump: scrape once and print the snapshot

pub mod dump;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use metrics_viewer::config::ViewerConfig;
use metrics_viewer::labels::{INSTANCE_LABEL, JOB_LABEL};
use metrics_viewer::scrape::{fetcher::target_url, MetricsFetcher, ScrapeLoop};
use metrics_viewer::store::MetricStore;

/// Build the scrape loop for `host` from the effective configuration
pub fn scrape_loop(
    cfg: &ViewerConfig,
    host: &str,
    store: Arc<dyn MetricStore>,
) -> anyhow::Result<ScrapeLoop> {
    if host.trim().is_empty() {
        anyhow::bail!("Host cannot be empty");
    }

    let url = target_url(&cfg.scrape.scheme, host, &cfg.scrape.metrics_path);
    let fetcher = MetricsFetcher::new(url, Duration::from_secs_f64(cfg.scrape.timeout_secs));

    let target_labels = vec![
        (INSTANCE_LABEL.to_string(), host.to_string()),
        (JOB_LABEL.to_string(), cfg.scrape.job.clone()),
    ];

    Ok(ScrapeLoop::new(
        fetcher,
        store,
        target_labels,
        Duration::from_secs_f64(cfg.scrape.interval_secs),
    ))
}
