use std::time::Duration;

use tracing::{debug, info};

use crate::config::BoardConfig;
use crate::scheduler::{Scheduler, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardEvent {
    Fetch,
    Retry,
    Tick,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollingState {
    pub current_interval: Duration,
    pub is_cycle_in_flight: bool,
    pub last_known_live_count: usize,
}

/// Owns the fetch cadence: normal vs live interval, the one-shot retry, and teardown.
#[derive(Debug, Clone)]
pub struct PollController {
    state: PollingState,
    normal: Duration,
    live: Duration,
    retry_delay: Duration,
    fetch_timer: Option<TimerId>,
    retry_timer: Option<TimerId>,
    retargets: u32,
    stopped: bool,
}

impl PollController {
    pub fn new(cfg: &BoardConfig) -> Self {
        Self::from_intervals(cfg.poll_interval, cfg.live_poll_interval, cfg.retry_delay)
    }

    pub fn from_intervals(normal: Duration, live: Duration, retry_delay: Duration) -> Self {
        Self {
            state: PollingState {
                current_interval: normal,
                is_cycle_in_flight: false,
                last_known_live_count: 0,
            },
            normal,
            live,
            retry_delay,
            fetch_timer: None,
            retry_timer: None,
            retargets: 0,
            stopped: false,
        }
    }

    pub fn state(&self) -> &PollingState {
        &self.state
    }

    pub fn fetch_timer(&self) -> Option<TimerId> {
        self.fetch_timer
    }

    pub fn retry_timer(&self) -> Option<TimerId> {
        self.retry_timer
    }

    pub fn retargets(&self) -> u32 {
        self.retargets
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Arms the repeating fetch timer at the current interval. Idempotent.
    pub fn start(&mut self, sched: &mut Scheduler<BoardEvent>) {
        if self.stopped || self.fetch_timer.is_some() {
            return;
        }
        self.fetch_timer = Some(sched.start(self.state.current_interval, BoardEvent::Fetch));
    }

    /// The overlap guard: `false` while another cycle is still out.
    pub fn try_begin_cycle(&mut self) -> bool {
        if self.stopped || self.state.is_cycle_in_flight {
            return false;
        }
        self.state.is_cycle_in_flight = true;
        true
    }

    pub fn end_cycle(&mut self) {
        self.state.is_cycle_in_flight = false;
    }

    /// Returns the new interval when the cadence changed.
    pub fn on_success(
        &mut self,
        live_count: usize,
        sched: &mut Scheduler<BoardEvent>,
    ) -> Option<Duration> {
        if self.stopped {
            return None;
        }
        self.state.last_known_live_count = live_count;
        if let Some(id) = self.retry_timer.take() {
            sched.cancel(id);
        }

        let target = if live_count > 0 { self.live } else { self.normal };
        if target == self.state.current_interval {
            return None;
        }
        self.state.current_interval = target;
        self.retargets += 1;
        if let Some(id) = self.fetch_timer {
            self.fetch_timer = sched.retarget(id, target);
        }
        info!(
            interval_secs = target.as_secs(),
            live_count, "polling cadence retargeted"
        );
        Some(target)
    }

    /// Schedules the one-shot retry unless one is already pending. The interval is left alone.
    pub fn on_failure(&mut self, sched: &mut Scheduler<BoardEvent>) -> bool {
        if self.stopped {
            return false;
        }
        if let Some(id) = self.retry_timer
            && sched.is_active(id)
        {
            debug!("retry already pending");
            return false;
        }
        self.retry_timer = Some(sched.once(self.retry_delay, BoardEvent::Retry));
        true
    }

    pub fn on_retry_fired(&mut self, id: TimerId) {
        if self.retry_timer == Some(id) {
            self.retry_timer = None;
        }
    }

    pub fn teardown(&mut self, sched: &mut Scheduler<BoardEvent>) {
        for id in [self.fetch_timer.take(), self.retry_timer.take()].into_iter().flatten() {
            sched.cancel(id);
        }
        self.state.is_cycle_in_flight = false;
        self.stopped = true;
    }
}
