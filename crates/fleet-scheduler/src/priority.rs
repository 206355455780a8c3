//! Dispatch priority tiers and the ready queue.
//!
//! Priority only shapes throughput: it decides which eligible package takes
//! a free slot first. An aging bonus guarantees lower tiers are never
//! starved while higher-tier packages keep becoming eligible.

use std::fmt;

use serde::Serialize;

use fleet_core::package::{PackageId, PackageKind};

/// Score gap between adjacent tiers, in "passed over" dispatches.
const TIER_SPAN: u64 = 8;

/// Dispatch tier, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Source/data packages with no dependents in the working set.
    Low,
    /// Versioned packages with no dependents in the working set.
    Normal,
    /// Packages that unblock at least one other package.
    High,
}

impl Priority {
    pub fn for_package(kind: PackageKind, has_dependents: bool) -> Self {
        if has_dependents {
            Self::High
        } else if kind.is_content_only() {
            Self::Low
        } else {
            Self::Normal
        }
    }

    fn base_score(self) -> u64 {
        match self {
            Self::Low => 0,
            Self::Normal => TIER_SPAN,
            Self::High => 2 * TIER_SPAN,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        })
    }
}

#[derive(Debug)]
struct ReadyEntry {
    package: PackageId,
    priority: Priority,
    enqueued_at: u64,
    seq: u64,
}

/// Eligible packages waiting for a free concurrency slot.
///
/// `pop` picks the highest `tier score + dispatches since enqueued`; ties go
/// to the earliest enqueued package.
#[derive(Debug, Default)]
pub struct ReadyQueue {
    entries: Vec<ReadyEntry>,
    dispatched: u64,
    next_seq: u64,
}

impl ReadyQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, package: PackageId, priority: Priority) {
        self.entries.push(ReadyEntry {
            package,
            priority,
            enqueued_at: self.dispatched,
            seq: self.next_seq,
        });
        self.next_seq += 1;
    }

    pub fn pop(&mut self) -> Option<(PackageId, Priority)> {
        let now = self.dispatched;
        let best = self
            .entries
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                let score_a = a.priority.base_score() + (now - a.enqueued_at);
                let score_b = b.priority.base_score() + (now - b.enqueued_at);
                score_a.cmp(&score_b).then(b.seq.cmp(&a.seq))
            })
            .map(|(i, _)| i)?;
        let entry = self.entries.swap_remove(best);
        self.dispatched += 1;
        Some((entry.package, entry.priority))
    }

    /// Drop a package that will never be dispatched. Returns whether it was queued.
    pub fn remove(&mut self, package: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.package != package);
        self.entries.len() != before
    }

    pub fn contains(&self, package: &str) -> bool {
        self.entries.iter().any(|e| e.package == package)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_follow_dependents_then_kind() {
        assert_eq!(Priority::for_package(PackageKind::Data, true), Priority::High);
        assert_eq!(Priority::for_package(PackageKind::Unlocked, true), Priority::High);
        assert_eq!(Priority::for_package(PackageKind::Unlocked, false), Priority::Normal);
        assert_eq!(Priority::for_package(PackageKind::Source, false), Priority::Low);
        assert!(Priority::High > Priority::Normal && Priority::Normal > Priority::Low);
    }

    #[test]
    fn higher_tier_pops_first() {
        let mut q = ReadyQueue::new();
        q.push("low".into(), Priority::Low);
        q.push("high".into(), Priority::High);
        q.push("normal".into(), Priority::Normal);
        assert_eq!(q.pop().unwrap().0, "high");
        assert_eq!(q.pop().unwrap().0, "normal");
        assert_eq!(q.pop().unwrap().0, "low");
        assert!(q.pop().is_none());
    }

    #[test]
    fn equal_tiers_are_fifo() {
        let mut q = ReadyQueue::new();
        q.push("first".into(), Priority::Normal);
        q.push("second".into(), Priority::Normal);
        assert_eq!(q.pop().unwrap().0, "first");
        assert_eq!(q.pop().unwrap().0, "second");
    }

    #[test]
    fn low_tier_is_not_starved() {
        let mut q = ReadyQueue::new();
        q.push("low".into(), Priority::Low);
        let mut popped_low_at = None;
        for i in 0..100 {
            q.push(format!("high-{i}"), Priority::High);
            let (pkg, _) = q.pop().unwrap();
            if pkg == "low" {
                popped_low_at = Some(i);
                break;
            }
        }
        let at = popped_low_at.expect("low priority package must eventually be dispatched");
        assert!(at <= 2 * TIER_SPAN as usize + 1, "dispatched after {at} rounds");
    }

    #[test]
    fn remove_drops_entry() {
        let mut q = ReadyQueue::new();
        q.push("a".into(), Priority::High);
        q.push("b".into(), Priority::Low);
        assert!(q.remove("a"));
        assert!(!q.remove("a"));
        assert!(!q.contains("a"));
        assert_eq!(q.len(), 1);
        assert_eq!(q.pop().unwrap().0, "b");
        assert!(q.is_empty());
    }
}
