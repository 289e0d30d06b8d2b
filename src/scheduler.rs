use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer<E> {
    due: Duration,
    seq: u64,
    every: Option<Duration>,
    event: E,
}

/// Single-threaded timer queue on a caller-supplied monotonic clock
/// (time elapsed since the scheduler was created). Nothing fires on its own:
/// the owner polls [`Scheduler::pop_due`] and handles one event at a time.
#[derive(Debug, Clone)]
pub struct Scheduler<E> {
    now: Duration,
    next_id: u64,
    next_seq: u64,
    timers: HashMap<TimerId, Timer<E>>,
    queue: BTreeMap<(Duration, u64), TimerId>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            next_seq: 0,
            timers: HashMap::new(),
            queue: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Repeating timer; first fires one `interval` from now.
    pub fn start(&mut self, interval: Duration, event: E) -> TimerId {
        let interval = interval.max(Duration::from_millis(1));
        self.insert(self.now + interval, Some(interval), event)
    }

    pub fn once(&mut self, delay: Duration, event: E) -> TimerId {
        self.insert(self.now + delay, None, event)
    }

    /// Replaces a repeating timer with one at `interval`, restarting its period from now.
    /// The old id is dead afterwards; the returned id is the only live one.
    pub fn retarget(&mut self, id: TimerId, interval: Duration) -> Option<TimerId> {
        let timer = self.remove(id)?;
        Some(self.start(interval, timer.event))
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.remove(id).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
        self.queue.clear();
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn interval_of(&self, id: TimerId) -> Option<Duration> {
        self.timers.get(&id).and_then(|t| t.every)
    }

    pub fn due_at(&self, id: TimerId) -> Option<Duration> {
        self.timers.get(&id).map(|t| t.due)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_due(&self) -> Option<Duration> {
        self.queue.keys().next().map(|(due, _)| *due)
    }

    /// Moves the clock to `now` (never backwards) and pops the earliest due timer.
    /// Repeating timers are re-armed from their scheduled time, not from `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, E)>
    where
        E: Clone,
    {
        self.now = self.now.max(now);
        let (&(due, seq), &id) = self.queue.iter().next()?;
        if due > self.now {
            return None;
        }
        self.queue.remove(&(due, seq));

        let timer = self.timers.get_mut(&id)?;
        match timer.every {
            Some(every) => {
                let mut next = timer.due + every;
                // After a long stall, skip missed periods instead of firing a burst.
                if next <= self.now {
                    let behind = (self.now - timer.due).as_millis() / every.as_millis().max(1);
                    next = timer.due + every * (behind as u32 + 1);
                }
                timer.due = next;
                timer.seq = self.next_seq;
                self.next_seq += 1;
                self.queue.insert((timer.due, timer.seq), id);
                Some((id, timer.event.clone()))
            }
            None => self.timers.remove(&id).map(|t| (id, t.event)),
        }
    }

    fn insert(&mut self, due: Duration, every: Option<Duration>, event: E) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.insert((due, seq), id);
        self.timers.insert(
            id,
            Timer {
                due,
                seq,
                every,
                event,
            },
        );
        id
    }

    fn remove(&mut self, id: TimerId) -> Option<Timer<E>> {
        let timer = self.timers.remove(&id)?;
        self.queue.remove(&(timer.due, timer.seq));
        Some(timer)
    }
}
