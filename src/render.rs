use std::collections::HashMap;
use std::sync::mpsc::Sender;

use crate::state::{DerivedStatus, Delta, MatchRecord, SlotBoard, apply_delta};

/// Presentation side of the board. Called for every slot on every tick, so
/// implementations must treat repeated identical calls as no-ops.
pub trait DisplayRenderer {
    fn render(&mut self, slot_id: &str, status: &DerivedStatus, record: Option<&MatchRecord>);
    fn mark_not_found(&mut self, slot_id: &str);
    fn set_page_summary(&mut self, live_count: usize, total_count: usize);
    /// `None` clears whatever error is showing.
    fn show_error(&mut self, message: Option<&str>);
    fn log(&mut self, _line: &str) {}
}

impl DisplayRenderer for SlotBoard {
    fn render(&mut self, slot_id: &str, status: &DerivedStatus, record: Option<&MatchRecord>) {
        apply_delta(
            self,
            Delta::Render {
                slot_id: slot_id.to_string(),
                status: status.clone(),
                record: record.cloned(),
            },
        );
    }

    fn mark_not_found(&mut self, slot_id: &str) {
        apply_delta(
            self,
            Delta::NotFound {
                slot_id: slot_id.to_string(),
            },
        );
    }

    fn set_page_summary(&mut self, live_count: usize, total_count: usize) {
        apply_delta(
            self,
            Delta::PageSummary {
                live: live_count,
                total: total_count,
            },
        );
    }

    fn show_error(&mut self, message: Option<&str>) {
        apply_delta(self, Delta::Error(message.map(str::to_string)));
    }

    fn log(&mut self, line: &str) {
        self.push_log(line);
    }
}

/// Forwards changes to a UI thread. Unchanged per-slot renders are not re-sent.
#[derive(Debug)]
pub struct ChannelRenderer {
    tx: Sender<Delta>,
    last: HashMap<String, Delta>,
    summary: Option<(usize, usize)>,
    error: Option<Option<String>>,
}

impl ChannelRenderer {
    pub fn new(tx: Sender<Delta>) -> Self {
        Self {
            tx,
            last: HashMap::new(),
            summary: None,
            error: None,
        }
    }

    pub fn send(&self, delta: Delta) {
        let _ = self.tx.send(delta);
    }

    fn send_slot(&mut self, slot_id: &str, delta: Delta) {
        if self.last.get(slot_id) == Some(&delta) {
            return;
        }
        self.last.insert(slot_id.to_string(), delta.clone());
        self.send(delta);
    }
}

impl DisplayRenderer for ChannelRenderer {
    fn render(&mut self, slot_id: &str, status: &DerivedStatus, record: Option<&MatchRecord>) {
        let delta = Delta::Render {
            slot_id: slot_id.to_string(),
            status: status.clone(),
            record: record.cloned(),
        };
        self.send_slot(slot_id, delta);
    }

    fn mark_not_found(&mut self, slot_id: &str) {
        let delta = Delta::NotFound {
            slot_id: slot_id.to_string(),
        };
        self.send_slot(slot_id, delta);
    }

    fn set_page_summary(&mut self, live_count: usize, total_count: usize) {
        if self.summary == Some((live_count, total_count)) {
            return;
        }
        self.summary = Some((live_count, total_count));
        self.send(Delta::PageSummary {
            live: live_count,
            total: total_count,
        });
    }

    fn show_error(&mut self, message: Option<&str>) {
        let message = message.map(str::to_string);
        if self.error.as_ref() == Some(&message) {
            return;
        }
        self.error = Some(message.clone());
        self.send(Delta::Error(message));
    }

    fn log(&mut self, line: &str) {
        self.send(Delta::Log(line.to_string()));
    }
}
