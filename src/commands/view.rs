//! View command implementation
//!
//! Runs the scrape loop in a background task and the refresh loop in the
//! foreground, both sharing one snapshot store.

use anyhow::Result;
use crossterm::{
    cursor::Show,
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::FutureExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, path::Path, sync::Arc, time::Duration};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::info;

use metrics_viewer::{
    config::{load_config, validate_config, ViewerConfig},
    init_file_tracing,
    scrape::ScrapeStatus,
    store::SnapshotStore,
    ui::ViewerApp,
};

use crate::cli::ScrapeArgs;

/// Execute the view command
///
/// # Arguments
/// * `config_path` - Optional config file overriding ./metrics-viewer.toml
/// * `host` - Target host and port
/// * `scrape_args` - Scrape overrides from the command line
/// * `refresh_interval` - Refresh interval override in seconds
/// * `entity_label` - Controller label override
/// * `histogram` - Charted bucket metric override
pub async fn execute(
    config_path: Option<&Path>,
    host: String,
    scrape_args: ScrapeArgs,
    refresh_interval: Option<f64>,
    entity_label: Option<String>,
    histogram: Option<String>,
) -> Result<()> {
    // 1. Merge command line overrides into the config
    let mut cfg = load_config(config_path)?;
    scrape_args.apply(&mut cfg);
    if let Some(secs) = refresh_interval {
        cfg.refresh.interval_secs = secs;
    }
    if let Some(label) = entity_label {
        cfg.display.entity_label = label;
    }
    if let Some(metric) = histogram {
        cfg.display.histogram_metric = metric;
    }
    validate_config(&cfg)?;

    // 2. Log to a file, the terminal belongs to the view
    let _guard = init_file_tracing(&cfg.logging.directory, &cfg.logging.level);

    // 3. Run the view
    run_view(cfg, host).await
}

async fn run_view(cfg: ViewerConfig, host: String) -> Result<()> {
    let store = Arc::new(SnapshotStore::new(cfg.display.entity_label.clone()));

    let scrape_loop = super::scrape_loop(&cfg, &host, store.clone())?;
    let mut status = scrape_loop.subscribe();
    let scraper = tokio::spawn(scrape_loop.run());

    info!(host = %host, "Starting metrics view");

    // Raw mode and the alternate screen are undone on every exit path
    let result = match enable_raw_mode() {
        Ok(()) => {
            let result = run_terminal(&cfg, host, store.as_ref(), &mut status);
            result.and(restore_terminal())
        }
        Err(e) => Err(e.into()),
    };

    scraper.abort();

    info!("Metrics view stopped");
    result
}

fn run_terminal(
    cfg: &ViewerConfig,
    host: String,
    store: &SnapshotStore,
    status: &mut watch::Receiver<ScrapeStatus>,
) -> Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.clear()?;

    let mut app = ViewerApp::new(host, cfg.display.histogram_metric.clone());
    let mut refresh_timer = interval(Duration::from_secs_f64(cfg.refresh.interval_secs));

    // Main loop
    loop {
        terminal.draw(|f| app.render(f))?;

        // Handle events with timeout
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key) {
                    return Ok(());
                }

                if matches!(key.code, KeyCode::Char('r') | KeyCode::Char('R')) {
                    refresh(&mut app, store, status);
                }

                // Switching controller changes the chart shape
                if matches!(
                    key.code,
                    KeyCode::Tab | KeyCode::BackTab | KeyCode::Left | KeyCode::Right
                ) {
                    refresh(&mut app, store, status);
                    terminal.clear()?;
                }
            }
        }

        // Check if interval elapsed
        if refresh_timer.tick().now_or_never().is_some() {
            refresh(&mut app, store, status);
        }
    }
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen, Show)?;
    Ok(())
}

/// Copy the latest scrape status and store contents into the app
fn refresh(app: &mut ViewerApp, store: &SnapshotStore, status: &mut watch::Receiver<ScrapeStatus>) {
    app.scrape_status = status.borrow_and_update().clone();
    app.refresh(store);
}
