//! Processor core.
//!
//! A `Core` runs its threads through one pipeline cycle at a time. Threads own
//! their private buffers; the core owns what they share:
//! 1. **Queues:** Ready, waiting, and out-of-order completion queues.
//! 2. **Functional units:** The unit pool and its event queue.
//! 3. **Memory ports:** Instruction and data sequencers, with the table of
//!    outstanding accesses keyed by `AccessTag`.
//!
//! Stages run in reverse data-flow order so that work done by a later stage in
//! this cycle is visible to the earlier stage feeding it.

use std::collections::HashMap;

use crate::coherence::{AccessTag, CorePorts};
use crate::common::SimResult;
use crate::config::Config;
use crate::core::pipeline::stages::{
    commit_stage, dispatch_stage, fetch_stage, refresh_lsq_stage, rename_stage, selection_stage,
    wakeup_stage, writeback_stage,
};
use crate::core::pipeline::{EntryRef, OooEventQueue, ReadyQueue, WaitingQueue};
use crate::core::thread::Thread;
use crate::core::units::fu::{FuEvent, FunctionalUnitPool};
use crate::isa::InstructionSet;
use crate::sim::{CycleContext, EventQueue, RoundRobin};

/// What an outstanding memory access was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PendingAccess {
    /// Instruction fetch of `block` for `thread`.
    Fetch {
        /// Thread index.
        thread: usize,
        /// Line address being fetched.
        block: u64,
    },
    /// Data load for an LSQ entry.
    Load(EntryRef),
    /// Committed store; nothing waits for it.
    Store,
}

/// Outstanding accesses of one core.
#[derive(Debug, Clone, Default)]
pub struct AccessTracker {
    next_tag: u64,
    in_flight: HashMap<AccessTag, PendingAccess>,
}

impl AccessTracker {
    /// Records `access` and returns the tag to send with it.
    pub fn issue(&mut self, access: PendingAccess) -> AccessTag {
        let tag = AccessTag(self.next_tag);
        self.next_tag += 1;
        let _ = self.in_flight.insert(tag, access);
        tag
    }

    /// Removes and returns the access completed under `tag`.
    pub fn complete(&mut self, tag: AccessTag) -> Option<PendingAccess> {
        self.in_flight.remove(&tag)
    }

    /// Returns true if nothing is outstanding.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_empty()
    }
}

/// One processor core.
#[derive(Debug, Clone)]
pub struct Core {
    /// Core index.
    pub id: usize,
    /// Hardware threads.
    pub threads: Vec<Thread>,
    /// Entries whose operands are ready.
    pub ready: ReadyQueue,
    /// Entries waiting on operands.
    pub waiting: WaitingQueue,
    /// Finished entries awaiting writeback.
    pub ooo: OooEventQueue,
    /// Execution resources.
    pub fu_pool: FunctionalUnitPool,
    /// Functional unit completions and retries.
    pub events: EventQueue<FuEvent>,
    /// Sequencers of this core.
    pub ports: CorePorts,
    /// Outstanding memory accesses.
    pub accesses: AccessTracker,
    /// Rename arbitration across threads.
    pub rename_rr: RoundRobin,
    /// Dispatch arbitration across threads.
    pub dispatch_rr: RoundRobin,
    /// Commit arbitration across threads.
    pub commit_rr: RoundRobin,
    /// Instructions fetched, renamed, or dispatched per cycle.
    pub decode_width: usize,
    /// Instructions selected per cycle.
    pub issue_width: usize,
    /// Instructions committed per cycle.
    pub commit_width: usize,
    /// Cache line size used by fetch.
    pub line_size: u64,
    /// Idle cycles tolerated before the watchdog aborts.
    pub commit_timeout: u64,
}

impl Core {
    /// Builds core `id` with `threads_per_core` idle threads.
    ///
    /// Thread `t` starts in address space `id * threads_per_core + t`.
    pub fn new(id: usize, config: &Config, isa: &dyn InstructionSet, ports: CorePorts) -> SimResult<Self> {
        let p = &config.processor;
        let threads = (0..p.threads_per_core)
            .map(|t| Thread::new(t, (id * p.threads_per_core + t) as u32, config, isa))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Self {
            id,
            threads,
            ready: ReadyQueue::new(),
            waiting: WaitingQueue::new(),
            ooo: OooEventQueue::new(),
            fu_pool: FunctionalUnitPool::new(&p.functional_units, p.fu_retry_latency),
            events: EventQueue::new(),
            ports,
            accesses: AccessTracker::default(),
            rename_rr: RoundRobin::new(),
            dispatch_rr: RoundRobin::new(),
            commit_rr: RoundRobin::new(),
            decode_width: p.decode_width,
            issue_width: p.issue_width,
            commit_width: p.commit_width,
            line_size: config.memory.l1_i.line_size,
            commit_timeout: config.general.commit_timeout,
        })
    }

    /// Runs every pipeline stage once.
    ///
    /// # Returns
    ///
    /// An error if the watchdog fires or a correct-path instruction cannot be
    /// decoded or executed.
    pub fn advance_one_cycle(&mut self, ctx: &mut CycleContext<'_>) -> SimResult<()> {
        commit_stage(self, ctx)?;
        writeback_stage(self);
        refresh_lsq_stage(self);
        wakeup_stage(self);
        selection_stage(self, ctx);
        dispatch_stage(self);
        rename_stage(self)?;
        fetch_stage(self, ctx)
    }

    /// Handles a memory access finished by the hierarchy.
    pub fn on_access_complete(&mut self, tag: AccessTag) {
        match self.accesses.complete(tag) {
            Some(PendingAccess::Fetch { thread, block }) => {
                if let Some(t) = self.threads.get_mut(thread) {
                    t.fetch_pending = false;
                    t.fetch_block = Some(block);
                }
            }
            Some(PendingAccess::Load(entry)) => {
                if self.is_alive(entry) {
                    self.ooo.push(entry);
                }
            }
            Some(PendingAccess::Store) | None => {}
        }
    }

    /// Runs functional unit events due this cycle, then advances their clock.
    pub fn drain_events(&mut self) {
        while let Some(event) = self.events.pop_due() {
            match event {
                FuEvent::Done { unit, entry } => {
                    self.fu_pool.release(unit);
                    if self.is_alive(entry) {
                        self.ooo.push(entry);
                    }
                }
                FuEvent::Retry { kind, entry } => {
                    if self.is_alive(entry) {
                        let _ = self.fu_pool.acquire(kind, entry, &mut self.events);
                    }
                }
            }
        }
        self.events.advance();
    }

    /// Returns true if `entry` has not been committed or squashed.
    pub fn is_alive(&self, entry: EntryRef) -> bool {
        self.threads.get(entry.thread).is_some_and(|t| t.is_alive(entry))
    }

    /// Every thread has finished and no access is outstanding.
    pub fn is_finished(&self) -> bool {
        self.threads.iter().all(|t| t.finished) && self.accesses.is_empty()
    }
}
