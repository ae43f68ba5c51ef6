//! Functional unit pool.
//!
//! Each core owns a fixed inventory of typed units. An issued instruction asks
//! for a unit of its kind; the first free one is marked busy and a completion
//! event is scheduled `issue_latency + op_latency` cycles later. When no unit
//! is free the acquisition is retried after a fixed backoff. Allocation is
//! first-fit, so starvation is possible.

use crate::common::FuKind;
use crate::config::FuConfig;
use crate::core::pipeline::EntryRef;
use crate::sim::EventQueue;

/// Timed events handled by the core after its stages run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuEvent {
    /// Unit `unit` finished executing `entry`.
    Done {
        /// Index of the unit to release.
        unit: usize,
        /// Instruction that finished.
        entry: EntryRef,
    },
    /// Re-attempt an acquisition that found every unit busy.
    Retry {
        /// Unit kind required.
        kind: FuKind,
        /// Waiting instruction.
        entry: EntryRef,
    },
}

/// One execution resource.
#[derive(Clone, Copy, Debug)]
struct FunctionalUnit {
    kind: FuKind,
    issue_latency: u64,
    op_latency: u64,
    busy: bool,
}

/// Fixed per-core set of functional units.
#[derive(Debug, Clone)]
pub struct FunctionalUnitPool {
    units: Vec<FunctionalUnit>,
    retry_latency: u64,
    /// Acquisitions that found no free unit.
    pub retries: u64,
}

impl FunctionalUnitPool {
    /// Builds the pool from the configured inventory.
    pub fn new(inventory: &[FuConfig], retry_latency: u64) -> Self {
        let units = inventory
            .iter()
            .flat_map(|fu| {
                (0..fu.count).map(move |_| FunctionalUnit {
                    kind: fu.kind,
                    issue_latency: fu.issue_latency,
                    op_latency: fu.op_latency,
                    busy: false,
                })
            })
            .collect();
        Self {
            units,
            retry_latency,
            retries: 0,
        }
    }

    /// Tries to start `entry` on a unit of `kind`.
    ///
    /// On success the unit is busy until its `FuEvent::Done` fires. On failure a
    /// `FuEvent::Retry` is scheduled after the retry latency.
    ///
    /// # Returns
    ///
    /// True if a unit was granted now.
    pub fn acquire(&mut self, kind: FuKind, entry: EntryRef, events: &mut EventQueue<FuEvent>) -> bool {
        if let Some((unit, fu)) = self
            .units
            .iter_mut()
            .enumerate()
            .find(|(_, u)| u.kind == kind && !u.busy)
        {
            fu.busy = true;
            events.schedule(FuEvent::Done { unit, entry }, fu.issue_latency + fu.op_latency);
            true
        } else {
            self.retries += 1;
            events.schedule(FuEvent::Retry { kind, entry }, self.retry_latency);
            false
        }
    }

    /// Frees `unit`.
    pub fn release(&mut self, unit: usize) {
        if let Some(u) = self.units.get_mut(unit) {
            u.busy = false;
        }
    }

    /// Number of units of `kind` currently busy.
    pub fn busy_count(&self, kind: FuKind) -> usize {
        self.units.iter().filter(|u| u.kind == kind && u.busy).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::EntryKind;

    fn entry(seq: u64) -> EntryRef {
        EntryRef {
            thread: 0,
            seq,
            kind: EntryKind::Rob,
        }
    }

    #[test]
    fn test_busy_unit_forces_retry() {
        let mut pool = FunctionalUnitPool::new(
            &[FuConfig {
                kind: FuKind::IntMult,
                count: 1,
                issue_latency: 1,
                op_latency: 3,
            }],
            5,
        );
        let mut events = EventQueue::new();
        assert!(pool.acquire(FuKind::IntMult, entry(1), &mut events));
        assert!(!pool.acquire(FuKind::IntMult, entry(2), &mut events));
        assert_eq!(pool.retries, 1);

        let scheduled: Vec<_> = events.iter().map(|(due, e)| (due, *e)).collect();
        assert_eq!(
            scheduled,
            vec![
                (4, FuEvent::Done { unit: 0, entry: entry(1) }),
                (5, FuEvent::Retry { kind: FuKind::IntMult, entry: entry(2) }),
            ]
        );

        pool.release(0);
        assert_eq!(pool.busy_count(FuKind::IntMult), 0);
    }
}
