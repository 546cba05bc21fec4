use std::env;

use anyhow::{Context, Result};
use chrono::Duration;

use crate::odds::{KickoffClock, MarketFilter, NormalizeOptions};

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_CACHE_TTL_SECS: i64 = 600;
const MAX_CACHE_TTL_SECS: i64 = 86_400;
const DEFAULT_REFRESH_SECS: u64 = 60;
const MIN_REFRESH_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: String,
    pub timezone: String,
    pub fetch_ttl: Duration,
    pub reset_ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub normalize: NormalizeOptions,
    pub refresh_secs: u64,
}

impl ApiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            fetch_ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
            reset_ttl: Duration::seconds(DEFAULT_CACHE_TTL_SECS),
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = non_blank(lookup("API_FOOTBALL_KEY").as_deref())
            .context("API_FOOTBALL_KEY missing; set it in the environment or .env")?;
        let base_url = non_blank(lookup("API_FOOTBALL_BASE_URL").as_deref())
            .map(|s| s.trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timezone = non_blank(lookup("API_FOOTBALL_TIMEZONE").as_deref())
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());

        Ok(Self {
            api_key,
            base_url,
            timezone,
            fetch_ttl: Duration::seconds(parse_ttl_secs(lookup("FETCH_CACHE_TTL_SECS").as_deref())),
            reset_ttl: Duration::seconds(parse_ttl_secs(lookup("RESET_CACHE_TTL_SECS").as_deref())),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api = ApiConfig::from_lookup(&lookup)?;
        let filter = MarketFilter {
            draw_in_any_market: parse_bool(lookup("ODDS_DRAW_ANY_MARKET").as_deref(), true),
        };

        Ok(Self {
            api,
            normalize: NormalizeOptions {
                kickoff_clock: parse_kickoff_clock(lookup("KICKOFF_CLOCK").as_deref()),
                filter,
            },
            refresh_secs: parse_refresh_secs(lookup("DASHBOARD_REFRESH_SECS").as_deref()),
        })
    }
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_ttl_secs(raw: Option<&str>) -> i64 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_CACHE_TTL_SECS)
        .clamp(1, MAX_CACHE_TTL_SECS)
}

fn parse_refresh_secs(raw: Option<&str>) -> u64 {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_REFRESH_SECS)
        .max(MIN_REFRESH_SECS)
}

fn parse_bool(raw: Option<&str>, default: bool) -> bool {
    raw.map(|v| {
        let t = v.trim().to_ascii_lowercase();
        !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
    })
    .unwrap_or(default)
}

fn parse_kickoff_clock(raw: Option<&str>) -> KickoffClock {
    raw.and_then(KickoffClock::parse).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Duration;

    use super::{
        ApiConfig, AppConfig, DEFAULT_BASE_URL, parse_bool, parse_kickoff_clock,
        parse_refresh_secs, parse_ttl_secs,
    };
    use crate::odds::KickoffClock;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn new_config_uses_upstream_defaults() {
        let cfg = ApiConfig::new("key");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.timezone, "UTC");
        assert_eq!(cfg.fetch_ttl, Duration::minutes(10));
        assert_eq!(cfg.reset_ttl, Duration::minutes(10));
    }

    #[test]
    fn ttl_is_clamped_and_defaults_on_garbage() {
        assert_eq!(parse_ttl_secs(None), 600);
        assert_eq!(parse_ttl_secs(Some(" 120 ")), 120);
        assert_eq!(parse_ttl_secs(Some("0")), 1);
        assert_eq!(parse_ttl_secs(Some("-5")), 1);
        assert_eq!(parse_ttl_secs(Some("999999")), 86_400);
        assert_eq!(parse_ttl_secs(Some("ten")), 600);
    }

    #[test]
    fn refresh_interval_has_a_floor() {
        assert_eq!(parse_refresh_secs(None), 60);
        assert_eq!(parse_refresh_secs(Some("3")), 10);
        assert_eq!(parse_refresh_secs(Some(" 90 ")), 90);
        assert_eq!(parse_refresh_secs(Some("-1")), 60);
    }

    #[test]
    fn bool_falsy_spellings() {
        for falsy in ["0", "false", "OFF", " no ", ""] {
            assert!(!parse_bool(Some(falsy), true), "{falsy:?} should be false");
        }
        assert!(parse_bool(Some("yes"), false));
        assert!(parse_bool(None, true));
        assert!(!parse_bool(None, false));
    }

    #[test]
    fn kickoff_clock_falls_back_to_utc() {
        assert_eq!(parse_kickoff_clock(Some("local")), KickoffClock::Local);
        assert_eq!(parse_kickoff_clock(Some("venue")), KickoffClock::Utc);
        assert_eq!(parse_kickoff_clock(None), KickoffClock::Utc);
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        assert!(ApiConfig::from_lookup(lookup(&[])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("API_FOOTBALL_KEY", "  ")])).is_err());
    }

    #[test]
    fn app_config_reads_every_setting() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("API_FOOTBALL_KEY", " abc "),
            ("API_FOOTBALL_BASE_URL", "http://localhost:8080/"),
            ("API_FOOTBALL_TIMEZONE", "Europe/Madrid"),
            ("FETCH_CACHE_TTL_SECS", "30"),
            ("KICKOFF_CLOCK", "local"),
            ("ODDS_DRAW_ANY_MARKET", "off"),
            ("DASHBOARD_REFRESH_SECS", " 15 "),
        ]))
        .expect("config");

        assert_eq!(cfg.api.api_key, "abc");
        assert_eq!(cfg.api.base_url, "http://localhost:8080");
        assert_eq!(cfg.api.timezone, "Europe/Madrid");
        assert_eq!(cfg.api.fetch_ttl, Duration::seconds(30));
        assert_eq!(cfg.api.reset_ttl, Duration::minutes(10));
        assert_eq!(cfg.normalize.kickoff_clock, KickoffClock::Local);
        assert!(!cfg.normalize.filter.draw_in_any_market);
        assert_eq!(cfg.refresh_secs, 15);
    }
}
