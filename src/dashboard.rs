use std::collections::VecDeque;

use chrono::{DateTime, NaiveDate, Utc};

use crate::api_football::{ApiFootball, FetchOutcome};
use crate::clock::Clock;
use crate::fixtures::{Fixture, summarize_fixtures};
use crate::http_client::Transport;
use crate::odds::{NormalizeOptions, NormalizedRow, analyze_odds};

pub const NO_DATA_MESSAGE: &str = "No data found for today. Try again later.";
const MAX_LOGS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Odds,
    Fixtures,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    Idle,
    Updated { at: DateTime<Utc> },
    NoData { reason: Option<String> },
}

/// Output of one pass over both endpoints.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub fixtures: FetchOutcome,
    pub odds: FetchOutcome,
    pub rows: Vec<NormalizedRow>,
    pub fetched_at: DateTime<Utc>,
}

/// Fetches fixtures then odds (sequentially) and normalizes the odds.
pub fn take_snapshot<T: Transport, C: Clock>(
    api: &mut ApiFootball<T, C>,
    opts: &NormalizeOptions,
    fetched_at: DateTime<Utc>,
) -> Snapshot {
    let date = api.today();
    let fixtures = api.get_matches(date);
    let odds = api.get_odds(date);
    let rows = analyze_odds(odds.items(), opts);
    Snapshot {
        date,
        fixtures,
        odds,
        rows,
        fetched_at,
    }
}

#[derive(Debug)]
pub struct DashboardState {
    pub view: View,
    pub status: Status,
    pub date: Option<NaiveDate>,
    pub rows: Vec<NormalizedRow>,
    pub fixtures: Vec<Fixture>,
    pub selected: usize,
    pub help_overlay: bool,
    pub logs: VecDeque<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl DashboardState {
    pub fn new() -> Self {
        Self {
            view: View::Odds,
            status: Status::Idle,
            date: None,
            rows: Vec::new(),
            fixtures: Vec::new(),
            selected: 0,
            help_overlay: false,
            logs: VecDeque::new(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    /// Either endpoint coming back without data hides the tables.
    pub fn apply_snapshot(&mut self, snap: Snapshot) {
        self.date = Some(snap.date);
        if snap.fixtures.has_data() && snap.odds.has_data() {
            self.fixtures = summarize_fixtures(snap.fixtures.items());
            self.rows = snap.rows;
            self.status = Status::Updated { at: snap.fetched_at };
            self.push_log(format!(
                "[INFO] {} fixtures, {} odds rows for {}",
                self.fixtures.len(),
                self.rows.len(),
                snap.date
            ));
        } else {
            let reason = snap
                .fixtures
                .error()
                .or_else(|| snap.odds.error())
                .map(|e| e.to_string());
            if let Some(reason) = reason.as_ref() {
                self.push_log(format!("[WARN] Fetch failed: {reason}"));
            } else {
                self.push_log(format!("[INFO] No fixtures or odds for {}", snap.date));
            }
            self.fixtures.clear();
            self.rows.clear();
            self.status = Status::NoData { reason };
        }
        self.clamp_selection();
    }

    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            View::Odds => View::Fixtures,
            View::Fixtures => View::Odds,
        };
        self.selected = 0;
    }

    pub fn visible_len(&self) -> usize {
        match self.view {
            View::Odds => self.rows.len(),
            View::Fixtures => self.fixtures.len(),
        }
    }

    pub fn select_next(&mut self) {
        let len = self.visible_len();
        if len > 0 && self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }
}
