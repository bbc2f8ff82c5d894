use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::DEFAULT_ENTITY_LABEL;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_NAME: &str = "metrics-viewer";
/// Prefix of environment overrides, e.g. `METRICS_VIEWER__SCRAPE__INTERVAL_SECS`
pub const ENV_PREFIX: &str = "METRICS_VIEWER";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerConfig {
    pub scrape: ScrapeConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScrapeConfig {
    pub scheme: String,
    pub metrics_path: String,
    pub job: String,
    pub interval_secs: f64,
    pub timeout_secs: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    pub interval_secs: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DisplayConfig {
    /// Label that partitions metrics by controller
    pub entity_label: String,
    /// Cumulative bucket series charted for the selected entity
    pub histogram_metric: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub level: String,
}

/// Load configuration: defaults, then the config file, then environment
///
/// An explicit `path` must exist; the default `metrics-viewer.{toml,yaml,json}`
/// in the working directory is optional. The result is not validated yet:
/// callers apply command line overrides first, then call [`validate_config`].
pub fn load_config(path: Option<&Path>) -> anyhow::Result<ViewerConfig> {
    let file = match path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    let config = config::Config::builder()
        .set_default("scrape.scheme", "http")?
        .set_default("scrape.metrics_path", "/metrics")?
        .set_default("scrape.job", "metrics-viewer")?
        .set_default("scrape.interval_secs", 1.0)?
        .set_default("scrape.timeout_secs", 0.5)?
        .set_default("refresh.interval_secs", 1.0)?
        .set_default("display.entity_label", DEFAULT_ENTITY_LABEL)?
        .set_default(
            "display.histogram_metric",
            "controller_runtime_reconcile_time_seconds_bucket",
        )?
        .set_default("logging.directory", ".")?
        .set_default("logging.level", "info")?
        .add_source(file)
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    Ok(config.try_deserialize()?)
}

pub fn validate_config(cfg: &ViewerConfig) -> anyhow::Result<()> {
    match cfg.scrape.scheme.as_str() {
        "http" | "https" => {}
        other => anyhow::bail!("Invalid scheme: '{}'. Must be http or https", other),
    }

    validate_interval("scrape interval", cfg.scrape.interval_secs)?;
    validate_interval("refresh interval", cfg.refresh.interval_secs)?;

    if cfg.scrape.timeout_secs <= 0.0 || cfg.scrape.timeout_secs > cfg.scrape.interval_secs {
        anyhow::bail!(
            "Invalid scrape timeout: {}. Must be positive and not exceed the scrape interval ({})",
            cfg.scrape.timeout_secs,
            cfg.scrape.interval_secs
        );
    }

    if cfg.display.entity_label.is_empty() {
        anyhow::bail!("Entity label cannot be empty");
    }

    if cfg.display.histogram_metric.is_empty() {
        anyhow::bail!("Histogram metric cannot be empty");
    }

    Ok(())
}

fn validate_interval(what: &str, secs: f64) -> anyhow::Result<()> {
    if !(0.1..=60.0).contains(&secs) {
        anyhow::bail!(
            "Invalid {}: {}. Must be between 0.1 and 60 seconds",
            what,
            secs
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = load_config(None).unwrap();
        assert_eq!(cfg.scrape.scheme, "http");
        assert_eq!(cfg.scrape.metrics_path, "/metrics");
        assert_eq!(cfg.scrape.interval_secs, 1.0);
        assert_eq!(cfg.scrape.timeout_secs, 0.5);
        assert_eq!(cfg.display.entity_label, "controller");
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scrape]\ninterval_secs = 2.0\n\n[display]\nentity_label = \"name\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.scrape.interval_secs, 2.0);
        assert_eq!(cfg.scrape.timeout_secs, 0.5);
        assert_eq!(cfg.display.entity_label, "name");
    }

    #[test]
    fn test_load_leaves_validation_to_caller() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scrape]\ntimeout_secs = 2.0").unwrap();

        let cfg = load_config(Some(file.path())).unwrap();
        assert_eq!(cfg.scrape.timeout_secs, 2.0);
        assert!(validate_config(&cfg).is_err());
    }

    #[test]
    fn test_explicit_file_must_exist() {
        assert!(load_config(Some(Path::new("/nonexistent/metrics-viewer.toml"))).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = load_config(None).unwrap();
        cfg.scrape.timeout_secs = 5.0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = load_config(None).unwrap();
        cfg.refresh.interval_secs = 0.0;
        assert!(validate_config(&cfg).is_err());

        let mut cfg = load_config(None).unwrap();
        cfg.scrape.scheme = "ftp".to_string();
        assert!(validate_config(&cfg).is_err());
    }
}
