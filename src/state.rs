use std::collections::VecDeque;

use chrono::{DateTime, FixedOffset, Utc};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchRecord {
    pub id: String,
    pub home: String,
    pub away: String,
    pub utc_kickoff: Option<DateTime<Utc>>,
    pub is_live: bool,
    pub is_finished: bool,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    // Only meaningful while live.
    pub current_minute: Option<i32>,
    pub competition_code: Option<String>,
    pub competition: Option<String>,
    pub matchday_label: Option<String>,
    pub is_today: bool,
    pub is_tomorrow: bool,
    /// Feed-supplied local kickoff, "HH:MM".
    pub local_time: Option<String>,
}

impl MatchRecord {
    pub fn competition_display_name(&self) -> String {
        competition_display_name(self.competition_code.as_deref())
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_live {
            "LIVE"
        } else if self.is_finished {
            "Finished"
        } else {
            "UPCOMING"
        }
    }

    /// `Matchday N` when the feed names one, else the competition name.
    pub fn round_label(&self) -> String {
        match self.matchday_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => format!("Matchday {label}"),
            _ => self.competition.clone().unwrap_or_default(),
        }
    }

    pub fn score_line(&self, offset: FixedOffset) -> String {
        let home = score_text(self.home_score);
        let away = score_text(self.away_score);
        if self.is_live {
            match self.current_minute {
                Some(minute) if minute > 0 => format!("{home}-{away} {minute}'"),
                _ => format!("{home}-{away}"),
            }
        } else if self.is_finished {
            format!("{home} - {away}")
        } else {
            self.kickoff_12h(offset).unwrap_or_default()
        }
    }

    pub fn kickoff_12h(&self, offset: FixedOffset) -> Option<String> {
        if let Some(time) = self.local_time.as_deref().and_then(format_12_hour) {
            return Some(time);
        }
        let local = self.utc_kickoff?.with_timezone(&offset);
        format_12_hour(&local.format("%H:%M").to_string())
    }
}

fn score_text(score: Option<i32>) -> String {
    score.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn competition_display_name(code: Option<&str>) -> String {
    let code = code.map(str::trim).unwrap_or_default();
    let name = match code {
        "PL" => "PREMIER LEAGUE",
        "PD" => "LA LIGA",
        "BL1" => "BUNDESLIGA",
        "SA" => "SERIE A",
        "FL1" => "LIGUE 1",
        "DED" => "EREDIVISIE",
        "CL" => "CHAMPIONS LEAGUE",
        "EC" => "EUROS",
        "WC" => "WORLD CUP",
        "" => "FOOTBALL",
        other => other,
    };
    name.to_string()
}

/// "13:30" -> "1:30 PM". Returns `None` for anything that is not `H:MM`.
pub fn format_12_hour(time24: &str) -> Option<String> {
    let (hours, minutes) = time24.trim().split_once(':')?;
    let hour = hours.trim().parse::<u32>().ok()?;
    let minutes = minutes.get(..2).unwrap_or(minutes);
    if hour > 23 || minutes.len() != 2 || !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let ampm = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    Some(format!("{display_hour}:{minutes} {ampm}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Api,
    Custom,
}

/// Author-supplied live window of a custom slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// What an API slot remembers between cycles to find "its" fixture again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotHints {
    pub match_id: Option<String>,
    pub home: Option<String>,
    pub away: Option<String>,
}

impl SlotHints {
    pub fn remember(&mut self, record: &MatchRecord) {
        self.match_id = Some(record.id.clone());
        self.home = Some(record.home.clone());
        self.away = Some(record.away.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub slot_id: String,
    pub kind: SlotKind,
    pub custom_window: Option<CustomWindow>,
    pub hints: SlotHints,
    pub assigned_match_id: Option<String>,
    pub last_status: Option<DerivedStatus>,
}

impl Slot {
    pub fn api(slot_id: impl Into<String>) -> Self {
        Self {
            slot_id: slot_id.into(),
            kind: SlotKind::Api,
            custom_window: None,
            hints: SlotHints::default(),
            assigned_match_id: None,
            last_status: None,
        }
    }

    pub fn custom(slot_id: impl Into<String>, window: Option<CustomWindow>) -> Self {
        Self {
            slot_id: slot_id.into(),
            kind: SlotKind::Custom,
            custom_window: window,
            hints: SlotHints::default(),
            assigned_match_id: None,
            last_status: None,
        }
    }

    pub fn with_hints(mut self, hints: SlotHints) -> Self {
        self.hints = hints;
        self
    }

    pub fn is_custom(&self) -> bool {
        self.kind == SlotKind::Custom
    }
}

/// Temporal phase of a closed `[start, end]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPhase {
    Scheduled,
    Live,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Scheduled,
    Live,
    /// Kickoff has passed but the feed shows neither a live flag nor scores yet.
    /// A transitional sub-state of `Live`.
    Starting,
    Finished,
    Unknown,
}

impl StatusKind {
    pub fn is_live(self) -> bool {
        matches!(self, StatusKind::Live | StatusKind::Starting)
    }
}

impl From<WindowPhase> for StatusKind {
    fn from(phase: WindowPhase) -> Self {
        match phase {
            WindowPhase::Scheduled => StatusKind::Scheduled,
            WindowPhase::Live => StatusKind::Live,
            WindowPhase::Finished => StatusKind::Finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedStatus {
    pub kind: StatusKind,
    pub text: String,
}

impl DerivedStatus {
    pub fn new(kind: StatusKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    Render {
        slot_id: String,
        status: DerivedStatus,
        record: Option<MatchRecord>,
    },
    NotFound {
        slot_id: String,
    },
    PageSummary {
        live: usize,
        total: usize,
    },
    Error(Option<String>),
    Log(String),
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotView {
    pub slot_id: String,
    pub kind: SlotKind,
    pub status: Option<DerivedStatus>,
    pub record: Option<MatchRecord>,
    pub not_found: bool,
}

/// Presentation-side mirror of the engine: whatever the renderer was last told.
#[derive(Debug, Clone, Default)]
pub struct SlotBoard {
    pub slots: Vec<SlotView>,
    pub summary: Option<(usize, usize)>,
    pub error: Option<String>,
    pub logs: VecDeque<String>,
    pub stopped: bool,
    /// Number of deltas that actually changed something.
    pub changes: u64,
}

impl SlotBoard {
    pub fn new(slots: &[Slot]) -> Self {
        Self {
            slots: slots
                .iter()
                .map(|slot| SlotView {
                    slot_id: slot.slot_id.clone(),
                    kind: slot.kind,
                    status: None,
                    record: None,
                    not_found: false,
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn slot(&self, slot_id: &str) -> Option<&SlotView> {
        self.slots.iter().find(|view| view.slot_id == slot_id)
    }

    fn slot_mut(&mut self, slot_id: &str) -> &mut SlotView {
        let idx = match self.slots.iter().position(|view| view.slot_id == slot_id) {
            Some(idx) => idx,
            None => {
                self.slots.push(SlotView {
                    slot_id: slot_id.to_string(),
                    kind: SlotKind::Api,
                    status: None,
                    record: None,
                    not_found: false,
                });
                self.slots.len() - 1
            }
        };
        &mut self.slots[idx]
    }

    pub fn page_title(&self) -> String {
        match self.summary {
            Some((live, total)) if live > 0 => format!("🔴 Live Matches ({live}/{total})"),
            Some((_, total)) => format!("All Matches Today ({total})"),
            None => "Loading matches...".to_string(),
        }
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn apply_delta(board: &mut SlotBoard, delta: Delta) {
    match delta {
        Delta::Render {
            slot_id,
            status,
            record,
        } => {
            let view = board.slot_mut(&slot_id);
            // A record-less render (custom slot, tick) keeps the card's last fixture.
            let record = record.or_else(|| view.record.clone());
            if view.status.as_ref() == Some(&status) && view.record == record && !view.not_found {
                return;
            }
            view.status = Some(status);
            view.record = record;
            view.not_found = false;
            board.changes += 1;
        }
        Delta::NotFound { slot_id } => {
            let view = board.slot_mut(&slot_id);
            if view.not_found {
                return;
            }
            view.not_found = true;
            view.record = None;
            view.status = None;
            board.changes += 1;
        }
        Delta::PageSummary { live, total } => {
            if board.summary != Some((live, total)) {
                board.summary = Some((live, total));
                board.changes += 1;
            }
        }
        Delta::Error(message) => {
            if board.error != message {
                board.error = message;
                board.changes += 1;
            }
        }
        Delta::Log(line) => board.push_log(line),
        Delta::Stopped => board.stopped = true,
    }
}
