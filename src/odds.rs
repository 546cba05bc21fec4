use std::fmt;

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::Value;

pub const UNKNOWN: &str = "Unknown";
pub const NOT_AVAILABLE: &str = "N/A";
pub const NO_KICKOFF: &str = "--:--";

/// Markets kept regardless of selection.
pub const TRACKED_MARKETS: [&str; 2] = ["Match Winner", "Draw No Bet"];
pub const DRAW_SELECTION: &str = "Draw";

/// Decimal odd as quoted by a bookmaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Odd {
    Decimal(f64),
    Unavailable,
}

impl Odd {
    /// Upstream quotes odds as strings ("1.50"); plain numbers are accepted too.
    pub fn from_value(value: Option<&Value>) -> Self {
        let parsed = match value {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        match parsed {
            Some(v) if v.is_finite() => Odd::Decimal(v),
            _ => Odd::Unavailable,
        }
    }
}

impl fmt::Display for Odd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Odd::Decimal(v) => write!(f, "{v:.2}"),
            Odd::Unavailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

/// One priced selection that passed the market filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRow {
    pub league: String,
    pub home: String,
    pub away: String,
    pub kickoff: String,
    pub bookmaker: String,
    pub market: String,
    pub selection: String,
    pub odd: Odd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KickoffClock {
    #[default]
    Utc,
    /// Wall clock of the machine running the pipeline.
    Local,
}

impl KickoffClock {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "utc" => Some(KickoffClock::Utc),
            "local" => Some(KickoffClock::Local),
            _ => None,
        }
    }

    pub fn format(self, timestamp: Option<i64>) -> String {
        let Some(dt) = timestamp.and_then(|ts| DateTime::from_timestamp(ts, 0)) else {
            return NO_KICKOFF.to_string();
        };
        match self {
            KickoffClock::Utc => dt.format("%H:%M").to_string(),
            KickoffClock::Local => dt.with_timezone(&Local).format("%H:%M").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketFilter {
    /// Keep a "Draw" selection under any market name, not only tracked ones.
    pub draw_in_any_market: bool,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            draw_in_any_market: true,
        }
    }
}

impl MarketFilter {
    pub fn accepts(&self, market: &str, selection: &str) -> bool {
        if is_tracked_market(market) {
            return true;
        }
        self.draw_in_any_market && is_draw_selection(selection)
    }
}

pub fn is_tracked_market(market: &str) -> bool {
    TRACKED_MARKETS.contains(&market)
}

pub fn is_draw_selection(selection: &str) -> bool {
    selection == DRAW_SELECTION
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NormalizeOptions {
    pub kickoff_clock: KickoffClock,
    pub filter: MarketFilter,
}

/// Flattens raw odds entries into filtered rows, in traversal order.
///
/// Upstream strings are kept verbatim, blank ones included. Placeholders only
/// replace fields that are absent or not strings.
pub fn analyze_odds(odds: &[Value], opts: &NormalizeOptions) -> Vec<NormalizedRow> {
    let mut rows = Vec::new();

    for game in odds {
        let league = pick_path(game, &["league", "name"]).unwrap_or_else(|| UNKNOWN.to_string());
        let home =
            pick_path(game, &["teams", "home", "name"]).unwrap_or_else(|| UNKNOWN.to_string());
        let away =
            pick_path(game, &["teams", "away", "name"]).unwrap_or_else(|| UNKNOWN.to_string());
        let kickoff = opts
            .kickoff_clock
            .format(pick_timestamp(game.get("fixture")));

        for bookmaker in array_at(game, "bookmakers") {
            let bookmaker_name =
                pick_path(bookmaker, &["name"]).unwrap_or_else(|| UNKNOWN.to_string());

            for bet in array_at(bookmaker, "bets") {
                let market = pick_path(bet, &["name"]).unwrap_or_else(|| UNKNOWN.to_string());

                for value in array_at(bet, "values") {
                    let selection =
                        pick_path(value, &["value"]).unwrap_or_else(|| NOT_AVAILABLE.to_string());
                    if !opts.filter.accepts(&market, &selection) {
                        continue;
                    }
                    rows.push(NormalizedRow {
                        league: league.clone(),
                        home: home.clone(),
                        away: away.clone(),
                        kickoff: kickoff.clone(),
                        bookmaker: bookmaker_name.clone(),
                        market: market.clone(),
                        selection,
                        odd: Odd::from_value(value.get("odd")),
                    });
                }
            }
        }
    }

    rows
}

fn array_at<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub(crate) fn pick_path(value: &Value, path: &[&str]) -> Option<String> {
    let mut cur = value;
    for key in path {
        cur = cur.get(*key)?;
    }
    cur.as_str().map(str::to_string)
}

pub(crate) fn pick_timestamp(fixture: Option<&Value>) -> Option<i64> {
    let ts = fixture?.get("timestamp")?;
    ts.as_i64()
        .or_else(|| ts.as_f64().map(|v| v as i64))
        .or_else(|| ts.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
}
