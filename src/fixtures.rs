use serde::Serialize;
use serde_json::Value;

use crate::odds::{KickoffClock, UNKNOWN, pick_path, pick_timestamp};

/// One scheduled match from the fixtures endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fixture {
    pub id: u64,
    pub kickoff_ts: Option<i64>,
    pub league: String,
    pub home: String,
    pub away: String,
    pub status: String,
}

impl Fixture {
    pub fn kickoff(&self, clock: KickoffClock) -> String {
        clock.format(self.kickoff_ts)
    }
}

pub fn summarize_fixtures(raw: &[Value]) -> Vec<Fixture> {
    raw.iter().map(fixture_from_value).collect()
}

fn fixture_from_value(entry: &Value) -> Fixture {
    let fixture = entry.get("fixture");
    let id = fixture
        .and_then(|f| f.get("id"))
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .unwrap_or(0);
    let status = fixture
        .and_then(|f| pick_path(f, &["status", "short"]))
        .unwrap_or_default();

    Fixture {
        id,
        kickoff_ts: pick_timestamp(fixture),
        league: pick_path(entry, &["league", "name"]).unwrap_or_else(|| UNKNOWN.to_string()),
        home: pick_path(entry, &["teams", "home", "name"]).unwrap_or_else(|| UNKNOWN.to_string()),
        away: pick_path(entry, &["teams", "away", "name"]).unwrap_or_else(|| UNKNOWN.to_string()),
        status,
    }
}
