//! Pipeline queues between rename and writeback.
//!
//! 1. **DecodeBuffer:** Bounded FIFO of fetched instructions per thread.
//! 2. **ReadyQueue:** Entries whose operands are ready, in dispatch order.
//! 3. **WaitingQueue:** Entries still waiting on operands.
//! 4. **OooEventQueue:** Entries signaled complete, drained by writeback.
//!
//! The last three hold `EntryRef`s and are shared by all threads of a core.

use std::collections::VecDeque;

use super::entry::{DecodeBufferEntry, EntryRef};

/// Bounded FIFO between fetch and rename.
#[derive(Debug, Clone)]
pub struct DecodeBuffer {
    entries: VecDeque<DecodeBufferEntry>,
    capacity: usize,
}

impl DecodeBuffer {
    /// Creates a buffer holding at most `capacity` instructions.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns true if no more instructions fit.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of buffered instructions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Appends a fetched instruction. The caller checks `is_full` first.
    pub fn push(&mut self, entry: DecodeBufferEntry) {
        debug_assert!(!self.is_full());
        self.entries.push_back(entry);
    }

    /// Oldest instruction.
    pub fn front(&self) -> Option<&DecodeBufferEntry> {
        self.entries.front()
    }

    /// Removes the oldest instruction.
    pub fn pop(&mut self) -> Option<DecodeBufferEntry> {
        self.entries.pop_front()
    }

    /// Drops every buffered instruction; returns how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.entries.len();
        self.entries.clear();
        n
    }
}

/// Entries ready to be selected, oldest dispatch first.
#[derive(Debug, Clone, Default)]
pub struct ReadyQueue {
    entries: Vec<EntryRef>,
}

impl ReadyQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: EntryRef) {
        self.entries.push(entry);
    }

    /// Number of queued entries (including stale ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes every entry, leaving the queue empty.
    pub fn take(&mut self) -> Vec<EntryRef> {
        std::mem::take(&mut self.entries)
    }

    /// Iterates queued entries.
    pub fn iter(&self) -> impl Iterator<Item = &EntryRef> + '_ {
        self.entries.iter()
    }
}

/// Entries waiting for source operands.
#[derive(Debug, Clone, Default)]
pub struct WaitingQueue {
    entries: Vec<EntryRef>,
}

impl WaitingQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&mut self, entry: EntryRef) {
        self.entries.push(entry);
    }

    /// Number of waiting entries (including stale ones).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Takes every entry, leaving the queue empty.
    pub fn take(&mut self) -> Vec<EntryRef> {
        std::mem::take(&mut self.entries)
    }
}

/// Completion notifications awaiting writeback, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct OooEventQueue {
    entries: VecDeque<EntryRef>,
}

impl OooEventQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals that `entry` has finished executing.
    pub fn push(&mut self, entry: EntryRef) {
        self.entries.push_back(entry);
    }

    /// Removes the oldest notification.
    pub fn pop(&mut self) -> Option<EntryRef> {
        self.entries.pop_front()
    }

    /// Number of pending notifications.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
