use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::state::{CustomWindow, Slot, SlotHints};

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("no match slots found")]
    NoSlots,
    #[error("cannot read slot file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("duplicate slot id {0:?}")]
    DuplicateId(String),
    #[error("invalid slot file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entry of the slot file, as the host page author writes it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    custom: bool,
    #[serde(default)]
    match_id: Option<String>,
    #[serde(default)]
    home: Option<String>,
    #[serde(default)]
    away: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default, alias = "gameEnds")]
    end: Option<String>,
}

pub fn discover_slots(path: &Path) -> Result<Vec<Slot>, DiscoveryError> {
    let raw = fs::read_to_string(path).map_err(|source| DiscoveryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_slots_json(&raw)
}

/// Slots keep file order. Entries without an id are numbered by position, from 1,
/// skipping numbers another entry already uses. Repeated explicit ids are rejected.
pub fn parse_slots_json(raw: &str) -> Result<Vec<Slot>, DiscoveryError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Err(DiscoveryError::NoSlots);
    }
    let entries: Vec<SlotEntry> = serde_json::from_str(trimmed)?;
    if entries.is_empty() {
        return Err(DiscoveryError::NoSlots);
    }

    let explicit_ids: Vec<Option<String>> = entries
        .iter()
        .map(|entry| {
            entry
                .id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .collect();
    let mut taken = HashSet::new();
    for id in explicit_ids.iter().flatten() {
        if !taken.insert(id.clone()) {
            return Err(DiscoveryError::DuplicateId(id.clone()));
        }
    }

    let mut slots = Vec::with_capacity(entries.len());
    for (idx, (entry, explicit)) in entries.into_iter().zip(explicit_ids).enumerate() {
        let slot_id = match explicit {
            Some(id) => id,
            None => {
                let mut n = idx + 1;
                while taken.contains(&n.to_string()) {
                    n += 1;
                }
                let id = n.to_string();
                taken.insert(id.clone());
                id
            }
        };
        if entry.custom {
            let window = custom_window(&slot_id, entry.start, entry.end);
            slots.push(Slot::custom(slot_id, window));
            continue;
        }
        slots.push(Slot::api(slot_id).with_hints(SlotHints {
            match_id: entry.match_id,
            home: entry.home,
            away: entry.away,
        }));
    }
    Ok(slots)
}

fn custom_window(slot_id: &str, start: Option<String>, end: Option<String>) -> Option<CustomWindow> {
    let start = start.as_deref().and_then(parse_timestamp)?;
    let Some(end) = end.as_deref().and_then(parse_timestamp) else {
        // Without an end the slot is over as soon as it starts.
        warn!(slot = slot_id, "custom slot has a start but no usable end; it finishes at kickoff");
        return Some(CustomWindow {
            start,
            end: start - ChronoDuration::milliseconds(1),
        });
    };
    Some(CustomWindow { start, end })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
