use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ApiConfig;
use crate::http_client::{HttpReply, Transport};
use crate::ttl_cache::TtlCache;

const API_KEY_HEADER: &str = "x-apisports-key";
const CONTAINER_FIELD: &str = "response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Fixtures,
    Odds,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Fixtures => "fixtures",
            Endpoint::Odds => "odds",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {snippet}")]
    Status { status: u16, snippet: String },
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("payload has no `response` array")]
    MissingContainer,
}

/// Result of one upstream query. Failures are values, never panics.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Data(Vec<Value>),
    Empty,
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn items(&self) -> &[Value] {
        match self {
            FetchOutcome::Data(items) => items,
            FetchOutcome::Empty | FetchOutcome::Failed(_) => &[],
        }
    }

    /// Collapses every non-data outcome to an empty list.
    pub fn into_items(self) -> Vec<Value> {
        match self {
            FetchOutcome::Data(items) => items,
            FetchOutcome::Empty | FetchOutcome::Failed(_) => Vec::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        matches!(self, FetchOutcome::Data(_))
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }
}

/// Interprets an upstream reply. Pure; used by the fetcher and by tests.
pub fn parse_reply(reply: &HttpReply) -> FetchOutcome {
    if !reply.is_success() {
        return FetchOutcome::Failed(FetchError::Status {
            status: reply.status,
            snippet: snippet(&reply.body),
        });
    }
    parse_response_json(&reply.body)
}

pub fn parse_response_json(raw: &str) -> FetchOutcome {
    let root: Value = match serde_json::from_str(raw.trim()) {
        Ok(root) => root,
        Err(err) => return FetchOutcome::Failed(FetchError::InvalidJson(err.to_string())),
    };

    if let Some(message) = api_errors(&root) {
        return FetchOutcome::Failed(FetchError::Api(message));
    }

    match root.get(CONTAINER_FIELD) {
        Some(Value::Array(items)) if items.is_empty() => FetchOutcome::Empty,
        Some(Value::Array(items)) => FetchOutcome::Data(items.clone()),
        _ => FetchOutcome::Failed(FetchError::MissingContainer),
    }
}

// API-Football answers 200 with `errors` populated for bad keys and exhausted quotas.
// It is `[]` when clean and an object keyed by error kind otherwise.
fn api_errors(root: &Value) -> Option<String> {
    match root.get("errors")? {
        Value::Object(map) if !map.is_empty() => Some(
            map.iter()
                .map(|(k, v)| match v.as_str() {
                    Some(s) => format!("{k}: {s}"),
                    None => format!("{k}: {v}"),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Value::Array(list) if !list.is_empty() => Some(
            list.iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join("; "),
        ),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(220)
        .collect()
}

/// Client for the fixtures and odds endpoints with a per-date result cache.
pub struct ApiFootball<T: Transport, C: Clock> {
    cfg: ApiConfig,
    transport: T,
    clock: C,
    cache: TtlCache<(Endpoint, NaiveDate), FetchOutcome>,
    requests_made: u64,
    quota_remaining: Option<u64>,
}

impl<T: Transport, C: Clock> ApiFootball<T, C> {
    pub fn new(cfg: ApiConfig, transport: T, clock: C) -> Self {
        let cache = TtlCache::new(cfg.fetch_ttl);
        Self {
            cfg,
            transport,
            clock,
            cache,
            requests_made: 0,
            quota_remaining: None,
        }
    }

    /// Today's calendar date in UTC.
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    pub fn get_matches(&mut self, date: NaiveDate) -> FetchOutcome {
        self.fetch(Endpoint::Fixtures, date)
    }

    pub fn get_odds(&mut self, date: NaiveDate) -> FetchOutcome {
        self.fetch(Endpoint::Odds, date)
    }

    pub fn get_matches_today(&mut self) -> FetchOutcome {
        let today = self.today();
        self.get_matches(today)
    }

    pub fn get_odds_today(&mut self) -> FetchOutcome {
        let today = self.today();
        self.get_odds(today)
    }

    /// Network requests issued since construction. Cache hits are not counted.
    pub fn requests_made(&self) -> u64 {
        self.requests_made
    }

    /// Last quota figure reported by the upstream, if any.
    pub fn quota_remaining(&self) -> Option<u64> {
        self.quota_remaining
    }

    pub fn invalidate(&mut self) {
        self.cache.clear();
    }

    fn fetch(&mut self, endpoint: Endpoint, date: NaiveDate) -> FetchOutcome {
        let now = self.clock.now();
        let key = (endpoint, date);
        if let Some(hit) = self.cache.get(&key, now) {
            debug!(endpoint = endpoint.path(), %date, "cache hit");
            return hit;
        }
        self.cache.purge_expired(now);

        // Failures stay cached for the same window; only `invalidate` retries early.
        let outcome = self.request(endpoint, date);
        match &outcome {
            FetchOutcome::Failed(err) => {
                warn!(endpoint = endpoint.path(), %date, error = %err, "fetch failed");
            }
            ok => {
                info!(endpoint = endpoint.path(), %date, items = ok.len(), "fetched");
            }
        }
        self.cache.insert(key, outcome.clone(), now);
        outcome
    }

    fn request(&mut self, endpoint: Endpoint, date: NaiveDate) -> FetchOutcome {
        let url = format!("{}/{}", self.cfg.base_url, endpoint.path());
        let date_param = date.format("%Y-%m-%d").to_string();
        let query = [
            ("date", date_param.as_str()),
            ("timezone", self.cfg.timezone.as_str()),
        ];
        let headers = [(API_KEY_HEADER, self.cfg.api_key.as_str())];

        self.requests_made += 1;
        match self.transport.get(&url, &query, &headers) {
            Ok(reply) => {
                if reply.quota_remaining.is_some() {
                    self.quota_remaining = reply.quota_remaining;
                }
                parse_reply(&reply)
            }
            Err(err) => FetchOutcome::Failed(FetchError::Transport(format!("{err:#}"))),
        }
    }
}
