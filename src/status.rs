use chrono::{DateTime, Duration as ChronoDuration, FixedOffset, Utc};

use crate::state::{CustomWindow, DerivedStatus, MatchRecord, StatusKind, WindowPhase};

pub const LIVE_TEXT: &str = "● LIVE";
pub const FULL_TIME_TEXT: &str = "Full Time";
pub const STARTING_TEXT: &str = "Starting...";
pub const TBD_TEXT: &str = "TBD";
pub const CUSTOM_TEXT: &str = "Custom Match";
pub const UNKNOWN_TEXT: &str = "--";

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Closed window: `now == start` and `now == end` are both live.
pub fn classify_window(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> WindowPhase {
    if now < start {
        WindowPhase::Scheduled
    } else if now <= end {
        WindowPhase::Live
    } else {
        WindowPhase::Finished
    }
}

/// Status of a feed record. Explicit live/finished flags beat the clock.
pub fn derive_api_status(
    now: DateTime<Utc>,
    kickoff: Option<DateTime<Utc>>,
    is_live: bool,
    is_finished: bool,
    home_score: Option<i32>,
    away_score: Option<i32>,
) -> DerivedStatus {
    if is_live {
        return DerivedStatus::new(StatusKind::Live, LIVE_TEXT);
    }
    if is_finished {
        return DerivedStatus::new(StatusKind::Finished, FULL_TIME_TEXT);
    }
    let Some(kickoff) = kickoff else {
        return DerivedStatus::new(StatusKind::Scheduled, TBD_TEXT);
    };

    let diff = kickoff - now;
    if diff <= ChronoDuration::zero() {
        let scored = matches!((home_score, away_score), (Some(h), Some(a)) if h >= 0 && a >= 0);
        return if scored {
            DerivedStatus::new(StatusKind::Live, LIVE_TEXT)
        } else {
            DerivedStatus::new(StatusKind::Starting, STARTING_TEXT)
        };
    }
    DerivedStatus::new(StatusKind::Scheduled, countdown_text(diff))
}

/// `derive_api_status` for a whole record, adding the running minute to live text.
pub fn record_status(now: DateTime<Utc>, record: &MatchRecord) -> DerivedStatus {
    let mut status = derive_api_status(
        now,
        record.utc_kickoff,
        record.is_live,
        record.is_finished,
        record.home_score,
        record.away_score,
    );
    if record.is_live
        && let Some(minute) = record.current_minute.filter(|m| *m > 0)
    {
        status.text = format!("{LIVE_TEXT} {minute}'");
    }
    status
}

pub fn custom_status(now: DateTime<Utc>, window: Option<&CustomWindow>) -> DerivedStatus {
    let Some(window) = window else {
        return DerivedStatus::new(StatusKind::Unknown, CUSTOM_TEXT);
    };
    match classify_window(now, window.start, window.end) {
        WindowPhase::Live => DerivedStatus::new(StatusKind::Live, LIVE_TEXT),
        WindowPhase::Finished => DerivedStatus::new(StatusKind::Finished, FULL_TIME_TEXT),
        WindowPhase::Scheduled => {
            DerivedStatus::new(StatusKind::Scheduled, countdown_text(window.start - now))
        }
    }
}

/// Largest-unit countdown: `1d 2h 3m`, `2h 3m 4s`, `3m 4s` or `4s`.
pub fn countdown_text(diff: ChronoDuration) -> String {
    let ms = diff.num_milliseconds().max(0);
    let days = ms / MS_PER_DAY;
    let hours = (ms % MS_PER_DAY) / MS_PER_HOUR;
    let minutes = (ms % MS_PER_HOUR) / MS_PER_MINUTE;
    let seconds = (ms % MS_PER_MINUTE) / MS_PER_SECOND;

    if days > 0 {
        format!("{days}d {hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn kickoff_local(kickoff: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    kickoff.with_timezone(&offset)
}

/// Synthesized final whistle for a feed record; the feed itself carries no end time.
pub fn implied_end(kickoff: DateTime<Utc>, duration: ChronoDuration) -> DateTime<Utc> {
    kickoff + duration
}
