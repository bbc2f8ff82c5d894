//! Terminal UI for the live metrics view
//!
//! Renders the series list next to a bar chart of the selected controller's
//! histogram, using ratatui.

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};
use tracing::warn;

use crate::histogram::{Bucket, HistogramData, Percentiles};
use crate::scrape::ScrapeStatus;
use crate::store::MetricStore;
use crate::view::SeriesList;

/// Application state for the live view
pub struct ViewerApp {
    pub target: String,
    pub histogram_metric: String,
    pub series: SeriesList,
    pub entities: Vec<String>,
    pub selected: usize,
    pub histogram: Option<HistogramData>,
    /// Buckets yielded by the histogram cursor, recomputed on refresh
    pub chart: Vec<Bucket>,
    /// Times the chart was rebuilt because the bucket layout changed
    pub chart_rebuilds: u64,
    pub scroll: usize,
    pub scrape_status: ScrapeStatus,
    pub last_update: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl ViewerApp {
    /// Create a new viewer application
    pub fn new(target: String, histogram_metric: String) -> Self {
        Self {
            target,
            histogram_metric,
            series: SeriesList::new(),
            entities: Vec::new(),
            selected: 0,
            histogram: None,
            chart: Vec::new(),
            chart_rebuilds: 0,
            scroll: 0,
            scrape_status: ScrapeStatus::Pending,
            last_update: None,
            error_message: None,
        }
    }

    /// Handle keyboard input, returns true when the user wants to quit
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::Right => self.select_offset(1),
            KeyCode::BackTab | KeyCode::Left => self.select_offset(-1),
            KeyCode::Down => {
                self.scroll = (self.scroll + 1).min(self.series.len().saturating_sub(1));
            }
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            _ => {}
        }
        false
    }

    pub fn selected_entity(&self) -> Option<&str> {
        self.entities.get(self.selected).map(String::as_str)
    }

    fn select_offset(&mut self, offset: isize) {
        if self.entities.is_empty() {
            return;
        }
        let len = self.entities.len() as isize;
        self.selected = (self.selected as isize + offset).rem_euclid(len) as usize;
    }

    /// Pull the latest snapshot from the store
    ///
    /// A malformed histogram or an inconsistent list is reported in the
    /// error banner; the rest of the frame is still updated.
    pub fn refresh<S>(&mut self, store: &S)
    where
        S: MetricStore + ?Sized,
    {
        let mut errors = Vec::new();

        if let Err(e) = self.series.apply(&store.snapshot()) {
            warn!(error = %e, "Skipping series list update");
            errors.push(e.to_string());
        }
        self.scroll = self.scroll.min(self.series.len().saturating_sub(1));

        self.update_entities(store.entity_names());

        match self.selected_entity().map(str::to_owned) {
            Some(entity) => {
                match HistogramData::build(
                    store,
                    &self.histogram_metric,
                    store.entity_label(),
                    &entity,
                ) {
                    Ok(histogram) => self.set_histogram(histogram),
                    Err(e) => {
                        warn!(entity = %entity, error = %e, "Failed to build histogram");
                        errors.push(format!("Histogram error: {}", e));
                        self.histogram = None;
                        self.chart.clear();
                    }
                }
            }
            None => {
                self.histogram = None;
                self.chart.clear();
            }
        }

        self.error_message = if errors.is_empty() {
            None
        } else {
            Some(errors.join(" | "))
        };
        self.last_update = Some(Utc::now());
    }

    /// Replace the entity list, keeping the current selection by name
    fn update_entities(&mut self, entities: Vec<String>) {
        let current = self.selected_entity().map(str::to_owned);
        self.entities = entities;
        self.selected = current
            .and_then(|name| self.entities.iter().position(|e| *e == name))
            .unwrap_or(0);
    }

    fn set_histogram(&mut self, mut histogram: HistogramData) {
        let previous = self.histogram.as_ref().map(HistogramData::bucket_count);
        if previous != Some(histogram.bucket_count()) {
            self.chart_rebuilds += 1;
        }
        self.chart = histogram.chart_buckets();
        self.histogram = Some(histogram);
    }

    /// Render the UI
    pub fn render(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(5), // Header
                Constraint::Min(10),   // Body
                Constraint::Length(3), // Footer
            ])
            .split(f.area());

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(chunks[1]);

        self.render_header(f, chunks[0]);
        self.render_series(f, body[0]);
        self.render_histogram(f, body[1]);
        self.render_footer(f, chunks[2]);
    }

    /// Render header with title and scrape state
    fn render_header(&self, f: &mut Frame, area: Rect) {
        let last_update = self
            .last_update
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "Never".to_string());

        let scrape = match &self.scrape_status {
            ScrapeStatus::Pending => Span::styled("waiting", Style::default().fg(Color::Yellow)),
            ScrapeStatus::Ok { samples, .. } => Span::styled(
                format!("ok ({} samples)", format_number(*samples as i64)),
                Style::default().fg(Color::Green),
            ),
            ScrapeStatus::Failed { at, .. } => Span::styled(
                format!("failed at {}", at.format("%H:%M:%S")),
                Style::default().fg(Color::Red),
            ),
        };

        let entity = self.selected_entity().unwrap_or("-").to_string();

        let title = vec![
            Line::from(vec![
                Span::styled(
                    "Metrics Viewer",
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" - "),
                Span::styled(self.target.clone(), Style::default().fg(Color::Yellow)),
                Span::raw("  |  Scrape: "),
                scrape,
                Span::raw("  |  Last update: "),
                Span::styled(last_update, Style::default().fg(Color::Green)),
            ]),
            Line::from(vec![
                Span::raw("Controller: "),
                Span::styled(
                    format!("{} ({}/{})", entity, self.selected_position(), self.entities.len()),
                    Style::default().fg(Color::Magenta),
                ),
            ]),
            Line::from(Span::styled(
                "Press 'q' to quit | 'r' to refresh | Tab/←/→ to switch controller | ↑/↓ to scroll",
                Style::default().fg(Color::DarkGray),
            )),
        ];

        let paragraph = Paragraph::new(title).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }

    fn selected_position(&self) -> usize {
        if self.entities.is_empty() {
            0
        } else {
            self.selected + 1
        }
    }

    /// Render the series table
    fn render_series(&self, f: &mut Frame, area: Rect) {
        let rows: Vec<Row> = if self.series.is_empty() {
            vec![Row::new(vec![Cell::from(
                "No data available yet. Waiting for metrics...",
            )])]
        } else {
            self.series
                .rows()
                .iter()
                .skip(self.scroll)
                .map(|row| Row::new(vec![Cell::from(row.text.clone())]))
                .collect()
        };

        let table = Table::new(rows, [Constraint::Percentage(100)]).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Series ({})", self.series.len())),
        );

        f.render_widget(table, area);
    }

    /// Render the bar chart of the selected histogram
    fn render_histogram(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(self.histogram_metric.clone());

        match &self.histogram {
            Some(histogram) if !self.chart.is_empty() => {
                let bars: Vec<Bar> = self
                    .chart
                    .iter()
                    .map(|bucket| {
                        Bar::default()
                            .value(bucket.value.max(0) as u64)
                            .label(Line::from(bucket.label.clone()))
                            .text_value(format_number(bucket.value))
                    })
                    .collect();

                let chart = BarChart::default()
                    .block(block)
                    .data(BarGroup::default().bars(&bars))
                    .bar_width(6)
                    .bar_gap(1)
                    .bar_style(Style::default().fg(Color::Cyan))
                    .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
                    .max(histogram.max() as u64);

                f.render_widget(chart, chunks[0]);
            }
            _ => {
                let message = if self.entities.is_empty() {
                    "No controllers discovered yet"
                } else {
                    "No observations for this controller"
                };
                let paragraph = Paragraph::new(Line::from(Span::styled(
                    message,
                    Style::default().fg(Color::DarkGray),
                )))
                .block(block);
                f.render_widget(paragraph, chunks[0]);
            }
        }

        let (percentiles, buckets) = match &self.histogram {
            Some(histogram) => (histogram.percentiles(), histogram.bucket_count()),
            None => (Percentiles::default(), 0),
        };

        let summary = Paragraph::new(Line::from(vec![
            Span::styled("P50/P90/P99: ", Style::default().fg(Color::Cyan)),
            Span::raw(format_percentiles(&percentiles)),
            Span::raw(format!(
                "  |  {} buckets, layout changes: {}",
                buckets, self.chart_rebuilds
            )),
        ]))
        .block(Block::default().borders(Borders::ALL));
        f.render_widget(summary, chunks[1]);
    }

    /// Render footer with errors
    fn render_footer(&self, f: &mut Frame, area: Rect) {
        let line = if let Some(error) = &self.error_message {
            Line::from(Span::styled(
                format!("Error: {}", error),
                Style::default().fg(Color::Red),
            ))
        } else if let ScrapeStatus::Failed { message, .. } = &self.scrape_status {
            Line::from(vec![
                Span::styled(
                    format!("Scrape error: {}", message),
                    Style::default().fg(Color::Red),
                ),
                Span::styled(
                    " (retrying on next interval...)",
                    Style::default().fg(Color::Yellow),
                ),
            ])
        } else if self.series.is_empty() {
            Line::from(Span::styled(
                "Waiting for metrics data...",
                Style::default().fg(Color::Yellow),
            ))
        } else {
            Line::from(vec![
                Span::styled("Total: ", Style::default().fg(Color::Cyan)),
                Span::raw(format!(
                    "{} series | {} controllers",
                    format_number(self.series.len() as i64),
                    self.entities.len()
                )),
            ])
        };

        let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        f.render_widget(paragraph, area);
    }
}

/// Format number with thousand separators
fn format_number(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut result = String::new();
    if n < 0 {
        result.push('-');
    }
    let len = s.len();

    for (i, c) in s.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }

    result
}

/// Format percentile bounds as P50/P90/P99
fn format_percentiles(p: &Percentiles) -> String {
    match (p.p50, p.p90, p.p99) {
        (Some(p50), Some(p90), Some(p99)) => format!("{:.3}/{:.3}/{:.3}", p50, p90, p99),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelSet;
    use crate::store::SnapshotStore;
    use crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};

    const METRIC: &str = "reconcile_time_seconds_bucket";

    fn write_bucket(store: &SnapshotStore, controller: &str, le: &str, value: f64) {
        store.write(
            LabelSet::new([("__name__", METRIC), ("controller", controller), ("le", le)]),
            0,
            value,
        );
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(123), "123");
        assert_eq!(format_number(1234), "1,234");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(-1234), "-1,234");
    }

    #[test]
    fn test_format_percentiles() {
        let p = Percentiles {
            p50: Some(0.1),
            p90: Some(0.25),
            p99: Some(1.0),
        };
        assert_eq!(format_percentiles(&p), "0.100/0.250/1.000");
        assert_eq!(format_percentiles(&Percentiles::default()), "N/A");
    }

    #[test]
    fn test_viewer_app_creation() {
        let app = ViewerApp::new("localhost:8080".to_string(), METRIC.to_string());
        assert!(app.series.is_empty());
        assert!(app.selected_entity().is_none());
        assert!(app.last_update.is_none());
        assert!(app.error_message.is_none());
    }

    #[test]
    fn test_refresh_builds_chart_for_selected_entity() {
        let store = SnapshotStore::default();
        for (le, value) in [("0.1", 1.0), ("0.5", 0.0), ("1", 4.0), ("+Inf", 6.0)] {
            write_bucket(&store, "pods", le, value);
        }

        let mut app = ViewerApp::new("t".to_string(), METRIC.to_string());
        app.refresh(&store);

        assert_eq!(app.selected_entity(), Some("pods"));
        let chart: Vec<_> = app.chart.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(chart, vec!["0.1", "1"]);
        assert_eq!(app.histogram.as_ref().map(|h| h.max()), Some(6));
        assert_eq!(app.series.len(), 4);
        assert_eq!(app.chart_rebuilds, 1);
        assert!(app.error_message.is_none());
    }

    #[test]
    fn test_layout_change_counts_rebuild() {
        let store = SnapshotStore::default();
        write_bucket(&store, "pods", "0.1", 1.0);
        write_bucket(&store, "pods", "+Inf", 2.0);

        let mut app = ViewerApp::new("t".to_string(), METRIC.to_string());
        app.refresh(&store);
        app.refresh(&store);
        assert_eq!(app.chart_rebuilds, 1);

        write_bucket(&store, "pods", "0.5", 1.0);
        app.refresh(&store);
        assert_eq!(app.chart_rebuilds, 2);
    }

    #[test]
    fn test_selection_survives_new_entities() {
        let store = SnapshotStore::default();
        write_bucket(&store, "b", "+Inf", 1.0);

        let mut app = ViewerApp::new("t".to_string(), METRIC.to_string());
        app.refresh(&store);
        assert_eq!(app.selected_entity(), Some("b"));

        write_bucket(&store, "a", "+Inf", 1.0);
        app.refresh(&store);
        assert_eq!(app.entities, vec!["a", "b"]);
        assert_eq!(app.selected_entity(), Some("b"));

        assert!(!app.handle_key(key(KeyCode::Tab)));
        assert_eq!(app.selected_entity(), Some("a"));
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.selected_entity(), Some("b"));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn test_malformed_histogram_reported_in_banner() {
        let store = SnapshotStore::default();
        store.write(
            LabelSet::new([("__name__", METRIC), ("controller", "pods")]),
            0,
            1.0,
        );

        let mut app = ViewerApp::new("t".to_string(), METRIC.to_string());
        app.refresh(&store);

        let error = app.error_message.clone().unwrap();
        assert!(error.starts_with("Histogram error"));
        assert_eq!(app.series.len(), 1);
    }

    #[test]
    fn test_switch_to_malformed_histogram_clears_chart() {
        let store = SnapshotStore::default();
        for (le, value) in [("0.1", 1.0), ("1", 4.0), ("+Inf", 6.0)] {
            write_bucket(&store, "a", le, value);
        }
        store.write(
            LabelSet::new([("__name__", METRIC), ("controller", "b")]),
            0,
            1.0,
        );

        let mut app = ViewerApp::new("t".to_string(), METRIC.to_string());
        app.refresh(&store);
        assert_eq!(app.selected_entity(), Some("a"));
        assert!(!app.chart.is_empty());

        app.handle_key(key(KeyCode::Tab));
        app.refresh(&store);

        assert_eq!(app.selected_entity(), Some("b"));
        assert!(app.error_message.is_some());
        assert!(app.histogram.is_none());
        assert!(app.chart.is_empty());
    }

    #[test]
    fn test_render_does_not_panic() {
        let store = SnapshotStore::default();
        for (le, value) in [("0.1", 1.0), ("1", 4.0), ("+Inf", 6.0)] {
            write_bucket(&store, "pods", le, value);
        }
        let mut app = ViewerApp::new("localhost:8080".to_string(), METRIC.to_string());
        app.refresh(&store);

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| app.render(f)).unwrap();

        let empty = ViewerApp::new("localhost:8080".to_string(), METRIC.to_string());
        terminal.draw(|f| empty.render(f)).unwrap();
    }
}
