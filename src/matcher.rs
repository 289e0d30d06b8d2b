use std::collections::HashSet;

use crate::state::{MatchRecord, Slot, SlotHints};

/// Decides whether a slot's team name and a feed record's team name denote the same side.
pub trait NamePredicate {
    fn names_match(&self, slot_name: &str, record_name: &str) -> bool;
}

impl<F> NamePredicate for F
where
    F: Fn(&str, &str) -> bool,
{
    fn names_match(&self, slot_name: &str, record_name: &str) -> bool {
        self(slot_name, record_name)
    }
}

/// Case-insensitive "either contains the other", so `Man Utd` and
/// `Man Utd FC` pair up. Blank names never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutualSubstring;

impl NamePredicate for MutualSubstring {
    fn names_match(&self, slot_name: &str, record_name: &str) -> bool {
        let a = slot_name.trim().to_lowercase();
        let b = record_name.trim().to_lowercase();
        if a.is_empty() || b.is_empty() {
            return false;
        }
        a.contains(&b) || b.contains(&a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchReason {
    Identity,
    Names,
    // Fallback buckets, in priority order.
    Live,
    TodayUpcoming,
    TodayFinished,
    Tomorrow,
    FirstRemaining,
}

impl MatchReason {
    pub fn is_fallback(self) -> bool {
        !matches!(self, MatchReason::Identity | MatchReason::Names)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    /// Index into the record slice passed to [`Matcher::assign`].
    pub record: usize,
    pub reason: MatchReason,
}

#[derive(Debug, Clone, Default)]
pub struct Matcher<P = MutualSubstring> {
    names: P,
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            names: MutualSubstring,
        }
    }
}

impl<P: NamePredicate> Matcher<P> {
    pub fn with_predicate(names: P) -> Self {
        Self { names }
    }

    /// One entry per slot, in slot order. Custom slots never take part and always get `None`.
    /// A record id is handed out at most once per call.
    pub fn assign(&self, slots: &[Slot], records: &[MatchRecord]) -> Vec<Option<Assignment>> {
        let mut used: HashSet<&str> = HashSet::new();
        slots
            .iter()
            .map(|slot| {
                if slot.is_custom() {
                    return None;
                }
                let picked = self.pick(&slot.hints, records, &used)?;
                used.insert(records[picked.record].id.as_str());
                Some(picked)
            })
            .collect()
    }

    fn pick(
        &self,
        hints: &SlotHints,
        records: &[MatchRecord],
        used: &HashSet<&str>,
    ) -> Option<Assignment> {
        let free = |idx: &usize| !used.contains(records[*idx].id.as_str());

        if let Some(id) = hints.match_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
            && let Some(idx) = records.iter().position(|r| r.id == id)
            && free(&idx)
        {
            return Some(Assignment {
                record: idx,
                reason: MatchReason::Identity,
            });
        }

        if let (Some(home), Some(away)) = (non_blank(&hints.home), non_blank(&hints.away))
            && let Some(idx) = (0..records.len()).filter(free).find(|idx| {
                let r = &records[*idx];
                self.names.names_match(home, &r.home) && self.names.names_match(away, &r.away)
            })
        {
            return Some(Assignment {
                record: idx,
                reason: MatchReason::Names,
            });
        }

        let available: Vec<usize> = (0..records.len()).filter(free).collect();
        let first_where = |pred: &dyn Fn(&MatchRecord) -> bool| {
            available.iter().copied().find(|idx| pred(&records[*idx]))
        };
        let fallback = [
            (MatchReason::Live, first_where(&|r| r.is_live)),
            (MatchReason::TodayUpcoming, first_where(&|r| r.is_today && !r.is_finished)),
            (MatchReason::TodayFinished, first_where(&|r| r.is_today && r.is_finished)),
            (MatchReason::Tomorrow, first_where(&|r| r.is_tomorrow)),
            (MatchReason::FirstRemaining, available.first().copied()),
        ];
        fallback
            .into_iter()
            .find_map(|(reason, idx)| idx.map(|record| Assignment { record, reason }))
    }
}

fn non_blank(name: &Option<String>) -> Option<&str> {
    name.as_deref().map(str::trim).filter(|n| !n.is_empty())
}
