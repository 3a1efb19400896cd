use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, Wrap},
};
use std::time::Duration;

use crate::client::HistoryOrigin;
use crate::data::{BakerLookup, DalMetrics, FetchStatus};
use crate::stats::{HistoryEntry, active_ratio, format_date, gauge_ratio};

pub const NO_HISTORY_MESSAGE: &str = "No historical data available.";

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    BakerAddress(String),
}

/// What the event loop should do after a key press
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    Refresh,
    LookupBaker(String),
}

pub struct Dashboard {
    pub should_quit: bool,
    pub input: InputMode,
    history_offset: usize,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            input: InputMode::Normal,
            history_offset: 0,
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Action> {
        if let InputMode::BakerAddress(buffer) = &mut self.input {
            match key.code {
                KeyCode::Esc => self.input = InputMode::Normal,
                KeyCode::Enter => {
                    let address = buffer.trim().to_string();
                    self.input = InputMode::Normal;
                    if !address.is_empty() {
                        return Some(Action::LookupBaker(address));
                    }
                }
                KeyCode::Backspace => {
                    buffer.pop();
                }
                KeyCode::Char(c) => buffer.push(c),
                _ => {}
            }
            return None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.quit();
                Some(Action::Quit)
            }
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Char('b') => {
                self.input = InputMode::BakerAddress(String::new());
                None
            }
            KeyCode::Down => {
                self.history_offset = self.history_offset.saturating_add(1);
                None
            }
            KeyCode::Up => {
                self.history_offset = self.history_offset.saturating_sub(1);
                None
            }
            _ => None,
        }
    }

    pub fn render(&mut self, frame: &mut Frame, metrics: &DalMetrics) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4), // header
                Constraint::Length(5), // gauges
                Constraint::Min(8),    // history
                Constraint::Length(4), // baker lookup
                Constraint::Length(3), // help
            ])
            .split(frame.area());

        self.render_header(frame, chunks[0], metrics);
        self.render_gauges(frame, chunks[1], metrics);
        self.render_history(frame, chunks[2], metrics);
        self.render_baker_lookup(frame, chunks[3], metrics);
        self.render_help(frame, chunks[4]);
    }

    fn render_header(&self, frame: &mut Frame, area: Rect, metrics: &DalMetrics) {
        let cycle = metrics
            .stats
            .as_ref()
            .map(|s| s.cycle.to_string())
            .unwrap_or_else(|| "...".to_string());

        let (status_text, status_style) = match &metrics.fetch_status {
            FetchStatus::Loading => ("Loading".to_string(), Style::default().fg(Color::Yellow)),
            FetchStatus::Ok => ("OK".to_string(), Style::default().fg(Color::Green)),
            FetchStatus::Stale => ("Stale".to_string(), Style::default().fg(Color::Yellow)),
            FetchStatus::Error(err) => (format!("Error: {}", err), Style::default().fg(Color::Red)),
        };

        let elapsed = metrics.last_updated.elapsed();
        let last_update = if elapsed < Duration::from_secs(1) {
            "< 1s ago".to_string()
        } else {
            format!("{}s ago", elapsed.as_secs())
        };

        let content = vec![
            Line::from(Span::styled(
                format!("Tezos Mainnet DAL-o-meter: Cycle {}", cycle),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![
                Span::raw("Status: "),
                Span::styled(status_text, status_style),
                Span::raw(" | Source: "),
                Span::styled(&metrics.stats_url, Style::default().fg(Color::Cyan)),
                Span::raw(" | Updated: "),
                Span::styled(last_update, Style::default().fg(Color::Yellow)),
                Span::raw(" | Every: "),
                Span::styled(
                    format!("{}s", metrics.refresh_interval.as_secs()),
                    Style::default().fg(Color::Cyan),
                ),
            ]),
        ];

        let paragraph = Paragraph::new(content)
            .block(Block::default().title("DAL").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_gauges(&self, frame: &mut Frame, area: Rect, metrics: &DalMetrics) {
        if let FetchStatus::Error(err) = &metrics.fetch_status {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                format!("Error: {}", err),
                Style::default().fg(Color::Red),
            )))
            .block(Block::default().title("Statistics").borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        }
        let Some(stats) = metrics.stats.as_ref() else {
            let paragraph = Paragraph::new("Loading DAL statistics...")
                .block(Block::default().title("Statistics").borders(Borders::ALL));
            frame.render_widget(paragraph, area);
            return;
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(area);

        let participation = metrics.participation_percentage();
        let adoption = metrics.adoption_percentage();
        let gauges = [
            (
                "Active DAL Bakers",
                active_ratio(Some(stats)),
                format!("{}/{}", stats.dal_active_bakers, stats.total_bakers),
            ),
            (
                "Baking Power",
                gauge_ratio(stats.dal_baking_power_percentage),
                format!("{:.1}%", stats.dal_baking_power_percentage),
            ),
            (
                "DAL Participation",
                gauge_ratio(participation),
                format!("{:.1}%", participation),
            ),
            (
                "DAL Adoption",
                gauge_ratio(adoption),
                format!("{:.1}%", adoption),
            ),
        ];

        for ((title, ratio, label), column) in gauges.into_iter().zip(columns.iter()) {
            let gauge = Gauge::default()
                .block(Block::default().title(title).borders(Borders::ALL))
                .gauge_style(Style::default().fg(Color::Blue).bg(Color::DarkGray))
                .ratio(ratio.clamp(0.0, 1.0))
                .label(label);
            frame.render_widget(gauge, *column);
        }
    }

    fn render_history(&mut self, frame: &mut Frame, area: Rect, metrics: &DalMetrics) {
        let title = match metrics.history_origin {
            HistoryOrigin::Fallback => "Cycle History (bundled copy)",
            _ => "Cycle History",
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        if metrics.history.is_empty() {
            let paragraph = Paragraph::new(Line::from(Span::styled(
                NO_HISTORY_MESSAGE,
                Style::default().fg(Color::DarkGray),
            )))
            .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let entries = newest_first(&metrics.history);
        self.history_offset = self.history_offset.min(entries.len().saturating_sub(1));

        let header = Row::new([
            "Cycle",
            "Date",
            "Active DAL Bakers",
            "Baking Power (%)",
            "DAL Participation (%)",
            "DAL Adoption (%)",
        ])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

        let rows = entries
            .iter()
            .skip(self.history_offset)
            .enumerate()
            .map(|(idx, entry)| {
                let style = if idx % 2 == 0 {
                    Style::default()
                } else {
                    Style::default().fg(Color::Gray)
                };
                Row::new(vec![
                    Cell::from(entry.cycle.to_string()),
                    Cell::from(format_date(&entry.timestamp)),
                    Cell::from(entry.dal_active_bakers.to_string()),
                    Cell::from(format!("{:.1}%", entry.dal_baking_power_percentage)),
                    Cell::from(format!("{:.1}%", entry.dal_participation_percentage)),
                    Cell::from(format!("{:.1}%", entry.dal_adoption_percentage)),
                ])
                .style(style)
            });

        let widths = [
            Constraint::Length(7),
            Constraint::Length(12),
            Constraint::Length(18),
            Constraint::Length(17),
            Constraint::Length(22),
            Constraint::Length(17),
        ];
        let table = Table::new(rows, widths).header(header).block(block);
        frame.render_widget(table, area);
    }

    fn render_baker_lookup(&self, frame: &mut Frame, area: Rect, metrics: &DalMetrics) {
        let line = if let InputMode::BakerAddress(buffer) = &self.input {
            Line::from(vec![
                Span::raw("Baker address: "),
                Span::styled(buffer.clone(), Style::default().fg(Color::Yellow)),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
            ])
        } else {
            match &metrics.baker_lookup {
                None => Line::from(Span::styled(
                    "Press 'b' to check a baker's DAL status.",
                    Style::default().fg(Color::DarkGray),
                )),
                Some(BakerLookup::Pending(address)) => {
                    Line::from(format!("Checking {}...", address))
                }
                Some(BakerLookup::Found { address, status }) => {
                    let (word, style) = if status.online {
                        ("online", Style::default().fg(Color::Green))
                    } else {
                        ("offline", Style::default().fg(Color::Red))
                    };
                    let mut spans = vec![
                        Span::raw(format!("Baker {} is currently ", address)),
                        Span::styled(word, style.add_modifier(Modifier::BOLD)),
                        Span::raw(" on the DAL network."),
                    ];
                    if let Some(checked) = &status.last_checked {
                        spans.push(Span::styled(
                            format!(" (checked {})", checked),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    Line::from(spans)
                }
                Some(BakerLookup::NotFound { reason, .. }) => Line::from(Span::styled(
                    format!("Not found: {}", reason),
                    Style::default().fg(Color::Yellow),
                )),
                Some(BakerLookup::Failed { message, .. }) => {
                    Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red)))
                }
            }
        };

        let paragraph = Paragraph::new(vec![line])
            .wrap(Wrap { trim: true })
            .block(Block::default().title("Baker Status").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_help(&self, frame: &mut Frame, area: Rect) {
        let help = match self.input {
            InputMode::Normal => Line::from(vec![
                Span::styled("'q'", Style::default().fg(Color::Yellow)),
                Span::raw(" quit  "),
                Span::styled("'r'", Style::default().fg(Color::Yellow)),
                Span::raw(" refresh  "),
                Span::styled("'b'", Style::default().fg(Color::Yellow)),
                Span::raw(" baker status  "),
                Span::styled("Up/Down", Style::default().fg(Color::Yellow)),
                Span::raw(" scroll history"),
            ]),
            InputMode::BakerAddress(_) => Line::from(vec![
                Span::styled("Enter", Style::default().fg(Color::Yellow)),
                Span::raw(" check  "),
                Span::styled("Esc", Style::default().fg(Color::Yellow)),
                Span::raw(" cancel"),
            ]),
        };

        let paragraph =
            Paragraph::new(help).block(Block::default().title("Help").borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }
}

fn newest_first(history: &[HistoryEntry]) -> Vec<&HistoryEntry> {
    let mut entries: Vec<&HistoryEntry> = history.iter().collect();
    entries.sort_by(|a, b| b.cycle.cmp(&a.cycle));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{BakerStatus, RawStats};
    use crossterm::event::KeyModifiers;
    use ratatui::{Terminal, backend::TestBackend};

    fn metrics() -> DalMetrics {
        DalMetrics::new(
            "http://localhost/dal_stats.json".to_string(),
            Duration::from_secs(3600),
        )
    }

    fn stats() -> RawStats {
        RawStats {
            timestamp: "2025-03-14T10:00:00Z".to_string(),
            cycle: 852,
            total_bakers: 289,
            dal_active_bakers: 62,
            dal_inactive_bakers: 100,
            unclassified_bakers: 20,
            non_attesting_bakers: 39,
            dal_baking_power_percentage: 28.1,
            total_baking_power: None,
            dal_baking_power: None,
        }
    }

    fn entry(cycle: i64) -> HistoryEntry {
        HistoryEntry {
            timestamp: format!("2025-03-{:02}T10:00:00Z", cycle - 840),
            cycle,
            dal_active_bakers: 60,
            dal_baking_power_percentage: 27.46,
            dal_participation_percentage: 24.0,
            dal_adoption_percentage: 45.0,
            total_bakers: None,
            dal_inactive_bakers: None,
            unclassified_bakers: None,
            non_attesting_bakers: None,
        }
    }

    fn draw(dashboard: &mut Dashboard, metrics: &DalMetrics) -> String {
        let backend = TestBackend::new(140, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| dashboard.render(f, metrics)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn empty_history_renders_no_data_message() {
        let mut m = metrics();
        m.stats = Some(stats());
        m.fetch_status = FetchStatus::Ok;
        let screen = draw(&mut Dashboard::new(), &m);
        assert!(screen.contains(NO_HISTORY_MESSAGE));
        assert!(!screen.contains("Error"));
    }

    #[test]
    fn gauges_show_derived_percentages() {
        let mut m = metrics();
        m.stats = Some(stats());
        m.fetch_status = FetchStatus::Ok;
        let screen = draw(&mut Dashboard::new(), &m);
        assert!(screen.contains("Cycle 852"));
        assert!(screen.contains("62/289"));
        assert!(screen.contains("28.1%"));
        assert!(screen.contains("24.8%"));
        assert!(screen.contains("45.0%"));
    }

    #[test]
    fn stats_error_replaces_gauges() {
        let mut m = metrics();
        m.fetch_status = FetchStatus::Error("Unable to load DAL statistics".to_string());
        let screen = draw(&mut Dashboard::new(), &m);
        assert!(screen.contains("Error: Unable to load DAL statistics"));
        assert!(screen.contains("Cycle ..."));
        assert!(!screen.contains("DAL Participation"));
    }

    #[test]
    fn history_table_lists_newest_cycle_first() {
        let mut m = metrics();
        m.stats = Some(stats());
        m.fetch_status = FetchStatus::Ok;
        m.history = vec![entry(850), entry(852), entry(851)];
        m.history_origin = HistoryOrigin::Remote;
        let screen = draw(&mut Dashboard::new(), &m);
        let first = screen.find("2025-03-12").unwrap();
        let last = screen.find("2025-03-10").unwrap();
        assert!(first < last);
        assert!(screen.contains("27.5%"));
    }

    #[test]
    fn baker_input_mode_collects_address() {
        let mut dashboard = Dashboard::new();
        assert_eq!(dashboard.handle_key(key(KeyCode::Char('b'))), None);
        for c in "tz1abc".chars() {
            dashboard.handle_key(key(KeyCode::Char(c)));
        }
        dashboard.handle_key(key(KeyCode::Backspace));
        // 'q' is text while typing an address
        assert_eq!(dashboard.handle_key(key(KeyCode::Char('q'))), None);
        assert!(!dashboard.should_quit);
        assert_eq!(
            dashboard.handle_key(key(KeyCode::Enter)),
            Some(Action::LookupBaker("tz1abq".to_string()))
        );
        assert_eq!(dashboard.input, InputMode::Normal);
    }

    #[test]
    fn escape_cancels_input_then_quits() {
        let mut dashboard = Dashboard::new();
        dashboard.handle_key(key(KeyCode::Char('b')));
        assert_eq!(dashboard.handle_key(key(KeyCode::Esc)), None);
        assert_eq!(dashboard.input, InputMode::Normal);
        assert_eq!(dashboard.handle_key(key(KeyCode::Esc)), Some(Action::Quit));
        assert!(dashboard.should_quit);
    }

    #[test]
    fn refresh_key() {
        let mut dashboard = Dashboard::new();
        assert_eq!(dashboard.handle_key(key(KeyCode::Char('r'))), Some(Action::Refresh));
    }

    #[test]
    fn baker_result_is_rendered() {
        let mut m = metrics();
        m.baker_lookup = Some(BakerLookup::Found {
            address: "tz1burnburnburnburnburnburnburjAYjjX".to_string(),
            status: BakerStatus {
                online: false,
                cycle: None,
                last_checked: None,
            },
        });
        let screen = draw(&mut Dashboard::new(), &m);
        assert!(screen.contains("is currently offline on the DAL network."));

        m.baker_lookup = Some(BakerLookup::NotFound {
            address: "tz1x".to_string(),
            reason: "tz1x is not a baker address".to_string(),
        });
        let screen = draw(&mut Dashboard::new(), &m);
        assert!(screen.contains("Not found: tz1x is not a baker address"));
    }
}
