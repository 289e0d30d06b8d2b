use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::BoardConfig;
use crate::match_fetch::{CycleError, DataSource, FetchError, parse_feed_payload};
use crate::matcher::{Matcher, MutualSubstring, NamePredicate};
use crate::poller::{BoardEvent, PollController, PollingState};
use crate::render::DisplayRenderer;
use crate::scheduler::{Scheduler, TimerId};
use crate::state::{DerivedStatus, MatchRecord, Slot, StatusKind};
use crate::status::{UNKNOWN_TEXT, custom_status, record_status};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub assigned: usize,
    pub fallbacks: usize,
    pub not_found: usize,
    /// Live fixtures among the records that landed in a slot.
    pub live_count: usize,
    /// Live fixtures in the whole batch, for the page summary.
    pub batch_live: usize,
    pub batch_total: usize,
    pub retargeted: Option<Duration>,
}

#[derive(Debug, Clone)]
struct SlotEntry {
    slot: Slot,
    record: Option<MatchRecord>,
    not_found: bool,
}

/// The board engine: slots, their current fixtures, and the polling schedule.
///
/// Two clocks drive it. `elapsed` is monotonic time since start and feeds the
/// scheduler; `now` is wall-clock UTC and feeds status and countdown text.
#[derive(Debug)]
pub struct Engine<P = MutualSubstring> {
    entries: Vec<SlotEntry>,
    matcher: Matcher<P>,
    controller: PollController,
    scheduler: Scheduler<BoardEvent>,
    tick_interval: Duration,
    tick_timer: Option<TimerId>,
    error: Option<String>,
}

impl Engine {
    pub fn new(slots: Vec<Slot>, cfg: &BoardConfig) -> Self {
        Self::with_matcher(slots, cfg, Matcher::new())
    }
}

impl<P: NamePredicate> Engine<P> {
    pub fn with_matcher(slots: Vec<Slot>, cfg: &BoardConfig, matcher: Matcher<P>) -> Self {
        Self {
            entries: slots
                .into_iter()
                .map(|slot| SlotEntry {
                    slot,
                    record: None,
                    not_found: false,
                })
                .collect(),
            matcher,
            controller: PollController::new(cfg),
            scheduler: Scheduler::new(),
            tick_interval: cfg.tick_interval,
            tick_timer: None,
            error: None,
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.entries.iter().map(|e| &e.slot)
    }

    pub fn slot(&self, slot_id: &str) -> Option<&Slot> {
        self.slots().find(|s| s.slot_id == slot_id)
    }

    pub fn assigned_record(&self, slot_id: &str) -> Option<&MatchRecord> {
        self.entries
            .iter()
            .find(|e| e.slot.slot_id == slot_id)
            .and_then(|e| e.record.as_ref())
    }

    pub fn polling(&self) -> &PollingState {
        self.controller.state()
    }

    pub fn controller(&self) -> &PollController {
        &self.controller
    }

    pub fn scheduler(&self) -> &Scheduler<BoardEvent> {
        &self.scheduler
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.scheduler.next_due()
    }

    /// Arms the fetch and tick timers and paints the first frame. Returns `true`
    /// when the caller should run the opening fetch cycle (the guard is already held).
    /// With no slots the engine stays idle.
    pub fn start<R: DisplayRenderer + ?Sized>(&mut self, renderer: &mut R, now: DateTime<Utc>) -> bool {
        if self.entries.is_empty() {
            warn!("no match slots discovered; board is idle");
            renderer.log("[WARN] No match slots found");
            return false;
        }
        let custom = self.entries.iter().filter(|e| e.slot.is_custom()).count();
        info!(slots = self.entries.len(), custom, "starting match board");
        renderer.log(&format!(
            "[INFO] Found {} slots ({} custom)",
            self.entries.len(),
            custom
        ));

        self.controller.start(&mut self.scheduler);
        if self.tick_timer.is_none() {
            self.tick_timer = Some(self.scheduler.start(self.tick_interval, BoardEvent::Tick));
        }
        self.tick(renderer, now);
        self.controller.try_begin_cycle()
    }

    /// `start` followed by a blocking opening cycle through `source`.
    pub fn boot<S, R>(
        &mut self,
        source: &mut S,
        renderer: &mut R,
        now: DateTime<Utc>,
    ) -> Option<Result<CycleReport, CycleError>>
    where
        S: DataSource + ?Sized,
        R: DisplayRenderer + ?Sized,
    {
        if !self.start(renderer, now) {
            return None;
        }
        let fetched = source.fetch_matches();
        Some(self.finish_cycle(fetched, renderer, now))
    }

    /// Processes every timer due by `elapsed`. Ticks are handled inline; a due
    /// fetch or retry takes the cycle guard and is reported back as `true` so the
    /// caller can perform the I/O and hand the result to [`Engine::finish_cycle`].
    pub fn advance<R: DisplayRenderer + ?Sized>(
        &mut self,
        elapsed: Duration,
        now: DateTime<Utc>,
        renderer: &mut R,
    ) -> bool {
        let mut wants_fetch = false;
        while let Some((id, event)) = self.scheduler.pop_due(elapsed) {
            match event {
                BoardEvent::Tick => self.tick(renderer, now),
                BoardEvent::Fetch | BoardEvent::Retry => {
                    if event == BoardEvent::Retry {
                        self.controller.on_retry_fired(id);
                    }
                    if self.controller.try_begin_cycle() {
                        wants_fetch = true;
                    } else {
                        debug!(?event, "cycle already in flight; skipping");
                    }
                }
            }
        }
        wants_fetch
    }

    /// `advance` plus a blocking fetch through `source` when one comes due.
    pub fn run_due<S, R>(
        &mut self,
        elapsed: Duration,
        now: DateTime<Utc>,
        source: &mut S,
        renderer: &mut R,
    ) -> Option<Result<CycleReport, CycleError>>
    where
        S: DataSource + ?Sized,
        R: DisplayRenderer + ?Sized,
    {
        if !self.advance(elapsed, now, renderer) {
            return None;
        }
        let fetched = source.fetch_matches();
        Some(self.finish_cycle(fetched, renderer, now))
    }

    /// One complete fetch-and-assign cycle. `Ok(None)` when another cycle holds the guard.
    pub fn reconcile<S, R>(
        &mut self,
        source: &mut S,
        renderer: &mut R,
        now: DateTime<Utc>,
    ) -> Result<Option<CycleReport>, CycleError>
    where
        S: DataSource + ?Sized,
        R: DisplayRenderer + ?Sized,
    {
        if !self.controller.try_begin_cycle() {
            debug!("cycle already in flight; skipping");
            return Ok(None);
        }
        let fetched = source.fetch_matches();
        self.finish_cycle(fetched, renderer, now).map(Some)
    }

    /// Second half of a cycle: validate, assign, render, retarget. Errors are
    /// surfaced to the renderer and arm the retry; they are returned for inspection only.
    pub fn finish_cycle<R: DisplayRenderer + ?Sized>(
        &mut self,
        fetched: Result<Value, FetchError>,
        renderer: &mut R,
        now: DateTime<Utc>,
    ) -> Result<CycleReport, CycleError> {
        let result = fetched
            .map_err(CycleError::from)
            .and_then(|root| parse_feed_payload(&root).map_err(CycleError::from))
            .map(|records| self.apply_batch(records, renderer, now));
        self.controller.end_cycle();

        match result {
            Ok(mut report) => {
                if self.error.take().is_some() {
                    renderer.show_error(None);
                }
                report.retargeted = self.controller.on_success(report.live_count, &mut self.scheduler);
                if let Some(interval) = report.retargeted {
                    renderer.log(&format!("[INFO] Polling every {}s", interval.as_secs()));
                }
                debug!(?report, "cycle complete");
                Ok(report)
            }
            Err(err) => {
                let message = format!("Error: {err}");
                warn!(error = %err, "match feed fetch failed");
                renderer.show_error(Some(&message));
                renderer.log(&format!("[WARN] Feed fetch failed: {err}"));
                self.error = Some(message);
                self.controller.on_failure(&mut self.scheduler);
                Err(err)
            }
        }
    }

    fn apply_batch<R: DisplayRenderer + ?Sized>(
        &mut self,
        records: Vec<MatchRecord>,
        renderer: &mut R,
        now: DateTime<Utc>,
    ) -> CycleReport {
        let slots: Vec<Slot> = self.entries.iter().map(|e| e.slot.clone()).collect();
        let assignments = self.matcher.assign(&slots, &records);

        let mut report = CycleReport {
            batch_live: records.iter().filter(|r| r.is_live).count(),
            batch_total: records.len(),
            ..CycleReport::default()
        };

        for (entry, assignment) in self.entries.iter_mut().zip(assignments) {
            if entry.slot.is_custom() {
                let status = custom_status(now, entry.slot.custom_window.as_ref());
                renderer.render(&entry.slot.slot_id, &status, None);
                entry.slot.last_status = Some(status);
                continue;
            }

            match assignment {
                Some(assignment) => {
                    let record = records[assignment.record].clone();
                    let status = record_status(now, &record);
                    report.assigned += 1;
                    if assignment.reason.is_fallback() {
                        report.fallbacks += 1;
                    }
                    if record.is_live {
                        report.live_count += 1;
                    }
                    debug!(slot = %entry.slot.slot_id, record = %record.id, reason = ?assignment.reason, "slot assigned");
                    renderer.render(&entry.slot.slot_id, &status, Some(&record));
                    entry.slot.assigned_match_id = Some(record.id.clone());
                    entry.slot.hints.remember(&record);
                    entry.slot.last_status = Some(status);
                    entry.record = Some(record);
                    entry.not_found = false;
                }
                None => {
                    report.not_found += 1;
                    debug!(slot = %entry.slot.slot_id, "no record for slot");
                    renderer.mark_not_found(&entry.slot.slot_id);
                    entry.slot.assigned_match_id = None;
                    entry.slot.last_status = Some(DerivedStatus::new(StatusKind::Unknown, UNKNOWN_TEXT));
                    entry.record = None;
                    entry.not_found = true;
                }
            }
        }

        renderer.set_page_summary(report.batch_live, report.batch_total);
        report
    }

    /// Recomputes every slot's status for `now` and pushes it to the renderer.
    /// Slots marked not-found keep that state until the next cycle.
    pub fn tick<R: DisplayRenderer + ?Sized>(&mut self, renderer: &mut R, now: DateTime<Utc>) {
        for entry in &mut self.entries {
            let status = entry_status(entry, now);
            if !entry.not_found {
                renderer.render(&entry.slot.slot_id, &status, entry.record.as_ref());
            }
            entry.slot.last_status = Some(status);
        }
    }

    /// Pure view of what `tick` would render at `now`.
    pub fn statuses(&self, now: DateTime<Utc>) -> Vec<(String, DerivedStatus)> {
        self.entries
            .iter()
            .map(|e| (e.slot.slot_id.clone(), entry_status(e, now)))
            .collect()
    }

    /// Cancels every pending timer; nothing fires afterwards.
    pub fn shutdown(&mut self) {
        self.controller.teardown(&mut self.scheduler);
        if let Some(id) = self.tick_timer.take() {
            self.scheduler.cancel(id);
        }
        self.scheduler.cancel_all();
        info!("match board stopped");
    }
}

fn entry_status(entry: &SlotEntry, now: DateTime<Utc>) -> DerivedStatus {
    if entry.slot.is_custom() {
        return custom_status(now, entry.slot.custom_window.as_ref());
    }
    match entry.record.as_ref() {
        Some(record) => record_status(now, record),
        None => DerivedStatus::new(StatusKind::Unknown, UNKNOWN_TEXT),
    }
}
