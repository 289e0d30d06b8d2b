use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::http_client::http_client;
use crate::state::MatchRecord;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("HTTP {status} - {reason}")]
    Status { status: u16, reason: String },
    #[error("invalid json: {0}")]
    Decode(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The feed answered but flagged itself unsuccessful; carries its own message.
    #[error("{0}")]
    Rejected(String),
    #[error("Invalid JSON response")]
    Malformed,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// Where match batches come from. Implementations bound their own I/O time.
pub trait DataSource {
    fn fetch_matches(&mut self) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFeedSource {
    url: String,
    timeout: Duration,
}

impl HttpFeedSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    fn busted_url(&self) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{sep}_t={}", self.url, Utc::now().timestamp_millis())
    }
}

impl DataSource for HttpFeedSource {
    fn fetch_matches(&mut self) -> Result<Value, FetchError> {
        let client = http_client(self.timeout).map_err(|err| FetchError::Transport(format!("{err:#}")))?;
        let url = self.busted_url();
        debug!(%url, "fetching match feed");

        let resp = client
            .get(&url)
            .header(CACHE_CONTROL, "no-cache, no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .map_err(|err| FetchError::Transport(err.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        let body = resp
            .text()
            .map_err(|err| FetchError::Transport(format!("failed reading body: {err}")))?;
        decode_body(&body)
    }
}

/// Reads a feed snapshot from disk; handy for replaying a captured payload.
#[derive(Debug, Clone)]
pub struct FileFeedSource {
    path: PathBuf,
}

impl FileFeedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DataSource for FileFeedSource {
    fn fetch_matches(&mut self) -> Result<Value, FetchError> {
        let raw = fs::read_to_string(&self.path)
            .map_err(|err| FetchError::Transport(format!("{}: {err}", self.path.display())))?;
        decode_body(&raw)
    }
}

pub fn decode_body(raw: &str) -> Result<Value, FetchError> {
    serde_json::from_str(raw.trim()).map_err(|err| FetchError::Decode(err.to_string()))
}

/// Checks the envelope (`success` + `matches`) and extracts the batch.
pub fn parse_feed_payload(root: &Value) -> Result<Vec<MatchRecord>, PayloadError> {
    let success = root.get("success").and_then(Value::as_bool).unwrap_or(false);
    let matches = root.get("matches").and_then(Value::as_array);
    let Some(matches) = matches.filter(|_| success) else {
        return Err(match root.get("error").and_then(Value::as_str).map(str::trim) {
            Some(msg) if !msg.is_empty() => PayloadError::Rejected(msg.to_string()),
            _ => PayloadError::Malformed,
        });
    };

    let mut out = Vec::with_capacity(matches.len());
    for item in matches {
        match parse_match_record(item) {
            Some(record) => out.push(record),
            None => warn!("skipping feed record without an id"),
        }
    }
    Ok(out)
}

pub fn parse_feed_json(raw: &str) -> Result<Vec<MatchRecord>, CycleError> {
    let root = decode_body(raw)?;
    Ok(parse_feed_payload(&root)?)
}

/// Ill-typed fields read as absent; only a missing id drops the record.
pub fn parse_match_record(v: &Value) -> Option<MatchRecord> {
    let id = match v.get("id")? {
        Value::String(s) if !s.trim().is_empty() => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };

    Some(MatchRecord {
        id,
        home: pick_string(v, &["home", "homeTeam"]).unwrap_or_default(),
        away: pick_string(v, &["away", "awayTeam"]).unwrap_or_default(),
        utc_kickoff: pick_string(v, &["utcDate", "utcKickoff"]).and_then(|s| parse_utc(&s)),
        is_live: pick_bool(v, &["isLive"]),
        is_finished: pick_bool(v, &["isFinished"]),
        home_score: pick_int(v, &["homeScore"]),
        away_score: pick_int(v, &["awayScore"]),
        current_minute: pick_int(v, &["currentTime", "currentMinute"]),
        competition_code: pick_string(v, &["competitionCode"]),
        competition: pick_string(v, &["competition"]),
        matchday_label: pick_string(v, &["matchday", "matchdayLabel"]),
        is_today: pick_bool(v, &["isToday"]),
        is_tomorrow: pick_bool(v, &["isTomorrow"]),
        local_time: pick_string(v, &["localTime"]),
    })
}

fn pick_string(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match v.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn pick_bool(v: &Value, keys: &[&str]) -> bool {
    keys.iter()
        .find_map(|key| v.get(*key).and_then(Value::as_bool))
        .unwrap_or(false)
}

fn pick_int(v: &Value, keys: &[&str]) -> Option<i32> {
    keys.iter().find_map(|key| match v.get(*key)? {
        Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    })
}

fn parse_utc(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    // Zone-less timestamps are taken as UTC.
    let naive = trimmed.trim_end_matches('Z');
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
}
