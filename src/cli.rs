use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use metrics_viewer::config::ViewerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "metrics-viewer",
    version,
    about = "Live terminal view of a process's Prometheus metrics"
)]
pub struct Cli {
    /// Configuration file path (defaults to ./metrics-viewer.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Display the live metrics view
    View {
        /// Target host and port, e.g. localhost:8080
        host: String,

        #[command(flatten)]
        scrape: ScrapeArgs,

        /// Refresh interval in seconds
        #[arg(long)]
        refresh_interval: Option<f64>,

        /// Label identifying controllers
        #[arg(long)]
        entity_label: Option<String>,

        /// Bucket series to chart for the selected controller
        #[arg(long)]
        histogram: Option<String>,
    },

    /// Scrape once and print the latest value of every series
    Dump {
        /// Target host and port, e.g. localhost:8080
        host: String,

        #[command(flatten)]
        scrape: ScrapeArgs,

        /// Print a JSON array instead of text lines
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

/// Scrape settings that override the config file
#[derive(Args, Debug, Clone, Default)]
pub struct ScrapeArgs {
    /// http or https
    #[arg(long)]
    pub scheme: Option<String>,

    /// Metrics endpoint path
    #[arg(long)]
    pub path: Option<String>,

    /// Scrape interval in seconds
    #[arg(long)]
    pub scrape_interval: Option<f64>,

    /// Scrape timeout in seconds
    #[arg(long)]
    pub scrape_timeout: Option<f64>,
}

impl ScrapeArgs {
    pub fn apply(&self, cfg: &mut ViewerConfig) {
        if let Some(scheme) = &self.scheme {
            cfg.scrape.scheme = scheme.clone();
        }
        if let Some(path) = &self.path {
            cfg.scrape.metrics_path = path.clone();
        }
        if let Some(interval) = self.scrape_interval {
            cfg.scrape.interval_secs = interval;
        }
        if let Some(timeout) = self.scrape_timeout {
            cfg.scrape.timeout_secs = timeout;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_view() {
        let args = vec![
            "metrics-viewer",
            "view",
            "localhost:8080",
            "--scrape-interval",
            "2",
            "--histogram",
            "latency_bucket",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::View {
                host,
                scrape,
                histogram,
                ..
            } => {
                assert_eq!(host, "localhost:8080");
                assert_eq!(scrape.scrape_interval, Some(2.0));
                assert_eq!(histogram.as_deref(), Some("latency_bucket"));
            }
            _ => panic!("Expected View command"),
        }
    }

    #[test]
    fn test_cli_parsing_dump_json() {
        let args = vec!["metrics-viewer", "--config", "alt.toml", "dump", "host:9090", "--json"];
        let cli = Cli::try_parse_from(args).unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        match cli.command {
            Commands::Dump { host, json, .. } => {
                assert_eq!(host, "host:9090");
                assert!(json);
            }
            _ => panic!("Expected Dump command"),
        }
    }

    #[test]
    fn test_view_requires_host() {
        assert!(Cli::try_parse_from(vec!["metrics-viewer", "view"]).is_err());
    }

    #[test]
    fn test_scrape_args_override_config() {
        let mut cfg = metrics_viewer::config::load_config(None).unwrap();
        let args = ScrapeArgs {
            scheme: Some("https".to_string()),
            path: None,
            scrape_interval: Some(5.0),
            scrape_timeout: None,
        };
        args.apply(&mut cfg);

        assert_eq!(cfg.scrape.scheme, "https");
        assert_eq!(cfg.scrape.metrics_path, "/metrics");
        assert_eq!(cfg.scrape.interval_secs, 5.0);
    }

    #[test]
    fn test_scrape_args_fix_invalid_file_value() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scrape]\ntimeout_secs = 2.0").unwrap();

        let mut cfg = metrics_viewer::config::load_config(Some(file.path())).unwrap();
        let args = ScrapeArgs {
            scrape_timeout: Some(0.5),
            ..Default::default()
        };
        args.apply(&mut cfg);

        assert!(metrics_viewer::config::validate_config(&cfg).is_ok());
    }
}
