use std::fs::OpenOptions;
use std::io;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState};
use tracing::info;
use tracing_subscriber::EnvFilter;

use betsmart_terminal::api_football::ApiFootball;
use betsmart_terminal::clock::{Clock, SystemClock};
use betsmart_terminal::config::AppConfig;
use betsmart_terminal::dashboard::{DashboardState, NO_DATA_MESSAGE, Status, View, take_snapshot};
use betsmart_terminal::http_client::HttpTransport;
use betsmart_terminal::odds::NormalizeOptions;
use betsmart_terminal::quota_reset::{QuotaResetEstimator, format_countdown};

const LOG_FILE: &str = "betsmart.log";
const DEFAULT_LOG_FILTER: &str = "betsmart_terminal=info";

struct App {
    api: ApiFootball<HttpTransport, SystemClock>,
    reset: QuotaResetEstimator<SystemClock>,
    opts: NormalizeOptions,
    state: DashboardState,
    should_quit: bool,
    refresh_every: Duration,
    last_refresh: Instant,
    fetch_ttl: chrono::Duration,
}

impl App {
    fn new(cfg: AppConfig) -> Self {
        let reset = QuotaResetEstimator::new(SystemClock, cfg.api.reset_ttl);
        let fetch_ttl = cfg.api.fetch_ttl;
        Self {
            api: ApiFootball::new(cfg.api, HttpTransport, SystemClock),
            reset,
            opts: cfg.normalize,
            state: DashboardState::new(),
            should_quit: false,
            refresh_every: Duration::from_secs(cfg.refresh_secs),
            last_refresh: Instant::now(),
            fetch_ttl,
        }
    }

    fn refresh(&mut self, announce: bool) {
        if announce {
            self.state.push_log("[INFO] Refreshing data...");
        }
        let snap = take_snapshot(&mut self.api, &self.opts, SystemClock.now());
        self.state.apply_snapshot(snap);
        self.last_refresh = Instant::now();
    }

    fn maybe_refresh(&mut self) {
        if self.last_refresh.elapsed() >= self.refresh_every {
            self.refresh(false);
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('r') => self.refresh(true),
            KeyCode::Char('f') => {
                self.api.invalidate();
                self.state.push_log("[INFO] Cache cleared");
                self.refresh(true);
            }
            KeyCode::Tab => self.state.toggle_view(),
            KeyCode::Char('j') | KeyCode::Down => self.state.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.state.select_prev(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            KeyCode::Esc => self.state.help_overlay = false,
            _ => {}
        }
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cfg = AppConfig::from_env()?;

    if std::env::args().any(|arg| arg == "--json") {
        return print_json(cfg);
    }

    init_logging()?;
    info!(base_url = %cfg.api.base_url, "starting dashboard");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(cfg);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn init_logging() -> Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .with_context(|| format!("open {LOG_FILE}"))?;
    let filter = EnvFilter::try_from_env("BETSMART_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file))
        .init();
    Ok(())
}

/// One pass without the terminal UI; rows go to stdout as JSON.
fn print_json(cfg: AppConfig) -> Result<()> {
    let mut api = ApiFootball::new(cfg.api, HttpTransport, SystemClock);
    let snap = take_snapshot(&mut api, &cfg.normalize, SystemClock.now());
    if let Some(err) = snap.odds.error() {
        eprintln!("odds fetch failed: {err}");
    }
    let json = serde_json::to_string_pretty(&snap.rows).context("serialize rows")?;
    println!("{json}");
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    // First frame goes up before the blocking initial fetch.
    terminal.draw(|f| ui(f, app))?;
    app.refresh(true);

    loop {
        app.maybe_refresh();

        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(&app.state))
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(32)])
        .split(chunks[1]);

    match app.state.view {
        View::Odds => render_odds(frame, body[0], &app.state),
        View::Fixtures => render_fixtures(frame, body[0], &app.state, &app.opts),
    }
    render_sidebar(frame, body[1], app);

    let footer = Paragraph::new("r Refresh | f Force | Tab View | j/k/↑/↓ Move | ? Help | q Quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size(), app.fetch_ttl);
    }
}

fn header_text(state: &DashboardState) -> String {
    let view = match state.view {
        View::Odds => "Odds (incl. draws)",
        View::Fixtures => "Fixtures",
    };
    let date = state
        .date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("BETSMART | {view} | {date}")
}

fn render_odds(frame: &mut Frame, area: Rect, state: &DashboardState) {
    if state.rows.is_empty() {
        render_empty(frame, area, state);
        return;
    }

    let header = Row::new([
        "League", "Home", "Away", "Time", "Bookmaker", "Market", "Selection", "Odd",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = state.rows.iter().map(|r| {
        Row::new([
            Cell::from(r.league.as_str()),
            Cell::from(r.home.as_str()),
            Cell::from(r.away.as_str()),
            Cell::from(r.kickoff.as_str()),
            Cell::from(r.bookmaker.as_str()),
            Cell::from(r.market.as_str()),
            Cell::from(r.selection.as_str()),
            Cell::from(r.odd.to_string()),
        ])
    });
    let widths = [
        Constraint::Percentage(16),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Length(6),
        Constraint::Percentage(14),
        Constraint::Percentage(14),
        Constraint::Percentage(10),
        Constraint::Length(6),
    ];
    render_table(frame, area, rows, widths.to_vec(), header, state.selected);
}

fn render_fixtures(frame: &mut Frame, area: Rect, state: &DashboardState, opts: &NormalizeOptions) {
    if state.fixtures.is_empty() {
        render_empty(frame, area, state);
        return;
    }

    let header = Row::new(["Time", "League", "Home", "Away", "Status"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let rows = state.fixtures.iter().map(|f| {
        Row::new([
            Cell::from(f.kickoff(opts.kickoff_clock)),
            Cell::from(f.league.as_str()),
            Cell::from(f.home.as_str()),
            Cell::from(f.away.as_str()),
            Cell::from(f.status.as_str()),
        ])
    });
    let widths = vec![
        Constraint::Length(6),
        Constraint::Percentage(30),
        Constraint::Percentage(28),
        Constraint::Percentage(28),
        Constraint::Length(6),
    ];
    render_table(frame, area, rows, widths, header, state.selected);
}

fn render_table<'a>(
    frame: &mut Frame,
    area: Rect,
    rows: impl IntoIterator<Item = Row<'a>>,
    widths: Vec<Constraint>,
    header: Row<'a>,
    selected: usize,
) {
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(Style::default().fg(Color::White).bg(Color::DarkGray));
    let mut table_state = TableState::default().with_selected(Some(selected));
    frame.render_stateful_widget(table, area, &mut table_state);
}

fn empty_text(status: &Status) -> String {
    match status {
        Status::Idle => "Loading today's fixtures and odds...".to_string(),
        Status::NoData { reason: Some(reason) } => format!("{NO_DATA_MESSAGE}\n{reason}"),
        Status::NoData { reason: None } | Status::Updated { .. } => NO_DATA_MESSAGE.to_string(),
    }
}

fn render_empty(frame: &mut Frame, area: Rect, state: &DashboardState) {
    let text = empty_text(&state.status);
    let empty = Paragraph::new(text)
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(empty, area);
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &mut App) {
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(1)])
        .split(area);

    let remaining = format_countdown(app.reset.remaining_time());
    let quota = app
        .api
        .quota_remaining()
        .map(|q| q.to_string())
        .unwrap_or_else(|| "-".to_string());
    let updated = match &app.state.status {
        Status::Updated { at } => at.format("%H:%M:%S UTC").to_string(),
        _ => "-".to_string(),
    };
    let text = format!(
        "API reset in: {remaining}\nRequests made: {}\nQuota left:    {quota}\nUpdated:       {updated}\nRows:          {}",
        app.api.requests_made(),
        app.state.rows.len(),
    );
    let info = Paragraph::new(text).block(Block::default().title("API").borders(Borders::ALL));
    frame.render_widget(info, parts[0]);

    let visible = parts[1].height.saturating_sub(2) as usize;
    let skip = app.state.logs.len().saturating_sub(visible);
    let logs = app
        .state
        .logs
        .iter()
        .skip(skip)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");
    let log = Paragraph::new(logs)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().title("Log").borders(Borders::ALL));
    frame.render_widget(log, parts[1]);
}

fn ttl_label(ttl: chrono::Duration) -> String {
    let secs = ttl.num_seconds();
    if secs >= 60 && secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{secs} s")
    }
}

fn help_text(fetch_ttl: chrono::Duration) -> String {
    let refresh = format!(
        "  r            Refresh (cached results reused for {})",
        ttl_label(fetch_ttl)
    );
    [
        "BetSmart - Help",
        "",
        refresh.as_str(),
        "  f            Force refresh (clears the cache)",
        "  Tab          Toggle odds / fixtures",
        "  j/k or ↑/↓   Move selection",
        "  ?            Toggle help",
        "  q            Quit",
        "",
        "Odds shown: Match Winner, Draw No Bet, and Draw selections.",
        "Bet responsibly.",
    ]
    .join("\n")
}

fn render_help_overlay(frame: &mut Frame, area: Rect, fetch_ttl: chrono::Duration) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = help_text(fetch_ttl);
    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}

#[cfg(test)]
mod tests {
    use betsmart_terminal::dashboard::{NO_DATA_MESSAGE, Status};

    use super::{empty_text, help_text, ttl_label};

    #[test]
    fn help_reports_configured_cache_window() {
        assert!(help_text(chrono::Duration::minutes(10)).contains("reused for 10 min"));
        assert!(help_text(chrono::Duration::seconds(90)).contains("reused for 90 s"));
        assert_eq!(ttl_label(chrono::Duration::seconds(30)), "30 s");
        assert_eq!(ttl_label(chrono::Duration::hours(1)), "60 min");
    }

    #[test]
    fn empty_pane_text_follows_status() {
        assert_eq!(empty_text(&Status::Idle), "Loading today's fixtures and odds...");
        assert_eq!(empty_text(&Status::NoData { reason: None }), NO_DATA_MESSAGE);
        let with_reason = empty_text(&Status::NoData {
            reason: Some("http 500: boom".to_string()),
        });
        assert_eq!(with_reason, format!("{NO_DATA_MESSAGE}\nhttp 500: boom"));
    }
}
