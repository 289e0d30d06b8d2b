use std::env;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, FixedOffset, Offset, Utc};

pub const DEFAULT_FEED_URL: &str = "https://helloxsports.in/api/matches.json";

const DEFAULT_POLL_SECS: u64 = 30;
const DEFAULT_LIVE_POLL_SECS: u64 = 10;
const DEFAULT_RETRY_SECS: u64 = 30;
const DEFAULT_TICK_MS: u64 = 1000;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MATCH_DURATION_MINS: i64 = 150;
// IST, the zone the board was first published for.
const DEFAULT_DISPLAY_OFFSET_MINS: i32 = 330;

#[derive(Debug, Clone)]
pub struct BoardConfig {
    pub feed_url: String,
    pub poll_interval: Duration,
    pub live_poll_interval: Duration,
    pub retry_delay: Duration,
    pub tick_interval: Duration,
    pub request_timeout: Duration,
    /// Synthesized length of an API fixture, kickoff to final whistle.
    pub match_duration: ChronoDuration,
    /// Offset used to present kickoff times on the board.
    pub display_offset: FixedOffset,
    pub slots_path: PathBuf,
    pub log_path: Option<PathBuf>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            live_poll_interval: Duration::from_secs(DEFAULT_LIVE_POLL_SECS),
            retry_delay: Duration::from_secs(DEFAULT_RETRY_SECS),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            match_duration: ChronoDuration::minutes(DEFAULT_MATCH_DURATION_MINS),
            display_offset: offset_from_minutes(DEFAULT_DISPLAY_OFFSET_MINS),
            slots_path: PathBuf::from("slots.json"),
            log_path: None,
        }
    }
}

impl BoardConfig {
    /// Reads `.env.local`/`.env` (if present) and then the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let feed_url = lookup("FEED_URL")
            .map(|val| val.trim().to_string())
            .filter(|val| !val.is_empty())
            .unwrap_or(defaults.feed_url);
        let poll_secs = lookup("POLL_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_SECS)
            .max(5);
        let live_poll_secs = lookup("LIVE_POLL_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_LIVE_POLL_SECS)
            .max(2);
        let retry_secs = lookup("RETRY_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_SECS)
            .max(1);
        let tick_ms = lookup("TICK_MS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TICK_MS)
            .max(100);
        let timeout_secs = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|val| val.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS)
            .clamp(1, 120);
        let duration_mins = lookup("MATCH_DURATION_MINS")
            .and_then(|val| val.trim().parse::<i64>().ok())
            .unwrap_or(DEFAULT_MATCH_DURATION_MINS)
            .clamp(1, 24 * 60);
        let offset_mins = lookup("DISPLAY_OFFSET_MINS")
            .and_then(|val| val.trim().parse::<i32>().ok())
            .unwrap_or(DEFAULT_DISPLAY_OFFSET_MINS)
            .clamp(-720, 840);
        let slots_path = lookup("SLOTS_FILE")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.slots_path);
        let log_path = lookup("BOARD_LOG")
            .filter(|val| !val.trim().is_empty())
            .map(PathBuf::from);

        Self {
            feed_url,
            poll_interval: Duration::from_secs(poll_secs),
            live_poll_interval: Duration::from_secs(live_poll_secs),
            retry_delay: Duration::from_secs(retry_secs),
            tick_interval: Duration::from_millis(tick_ms),
            request_timeout: Duration::from_secs(timeout_secs),
            match_duration: ChronoDuration::minutes(duration_mins),
            display_offset: offset_from_minutes(offset_mins),
            slots_path,
            log_path,
        }
    }
}

fn offset_from_minutes(mins: i32) -> FixedOffset {
    FixedOffset::east_opt(mins * 60).unwrap_or_else(|| Utc.fix())
}
