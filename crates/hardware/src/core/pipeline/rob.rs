//! Reorder Buffer (ROB) for in-order commit.
//!
//! The ROB is a circular buffer of in-flight instructions in program order.
//! It provides:
//! 1. **Allocation:** Appends at the tail at rename; fails when full.
//! 2. **Lookup:** Resolves an `EntryRef` by sequence number; squashed entries are gone.
//! 3. **In-order Commit:** Retires from the head.
//! 4. **Squash:** Pops from the tail during misprediction recovery.
//!
//! The same ring backs the load/store queue.

use super::entry::{RobEntry, Sequenced};

/// Bounded ring of sequence-ordered entries.
#[derive(Debug, Clone)]
pub struct InFlightBuffer<T> {
    /// Fixed-size slot array.
    entries: Vec<Option<T>>,
    /// Index of the oldest entry (commit point).
    head: usize,
    /// Index where the next entry will be allocated.
    tail: usize,
    /// Number of occupied slots.
    count: usize,
}

/// The reorder buffer.
pub type ReorderBuffer = InFlightBuffer<RobEntry>;

impl<T: Sequenced> InFlightBuffer<T> {
    /// Creates a buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let mut entries = Vec::with_capacity(capacity);
        entries.resize_with(capacity, || None);
        Self {
            entries,
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == self.entries.len()
    }

    #[inline]
    fn slot(&self, offset: usize) -> usize {
        (self.head + offset) % self.entries.len()
    }

    /// Appends `entry` at the tail.
    ///
    /// # Returns
    ///
    /// `Err(entry)` if the buffer is full.
    pub fn push(&mut self, entry: T) -> Result<(), T> {
        if self.is_full() {
            return Err(entry);
        }
        debug_assert!(self.tail().is_none_or(|t| t.seq() < entry.seq()));
        self.entries[self.tail] = Some(entry);
        self.tail = (self.tail + 1) % self.entries.len();
        self.count += 1;
        Ok(())
    }

    /// Oldest entry.
    pub fn head(&self) -> Option<&T> {
        if self.count == 0 {
            None
        } else {
            self.entries[self.head].as_ref()
        }
    }

    /// Youngest entry.
    pub fn tail(&self) -> Option<&T> {
        if self.count == 0 {
            None
        } else {
            self.entries[self.slot(self.count - 1)].as_ref()
        }
    }

    /// Removes and returns the oldest entry.
    pub fn pop_head(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        let entry = self.entries[self.head].take();
        self.head = (self.head + 1) % self.entries.len();
        self.count -= 1;
        entry
    }

    /// Removes and returns the youngest entry.
    pub fn pop_tail(&mut self) -> Option<T> {
        if self.count == 0 {
            return None;
        }
        self.tail = (self.tail + self.entries.len() - 1) % self.entries.len();
        self.count -= 1;
        self.entries[self.tail].take()
    }

    fn position(&self, seq: u64) -> Option<usize> {
        (0..self.count)
            .map(|i| self.slot(i))
            .find(|&idx| self.entries[idx].as_ref().is_some_and(|e| e.seq() == seq))
    }

    /// Finds the entry with sequence number `seq`.
    pub fn find(&self, seq: u64) -> Option<&T> {
        self.position(seq).and_then(|idx| self.entries[idx].as_ref())
    }

    /// Finds a mutable reference to the entry with sequence number `seq`.
    pub fn find_mut(&mut self, seq: u64) -> Option<&mut T> {
        self.position(seq).and_then(|idx| self.entries[idx].as_mut())
    }

    /// Iterates entries from head (oldest) to tail.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.count).filter_map(move |i| self.entries[self.slot(i)].as_ref())
    }

    /// Iterates mutable entries from head (oldest) to tail.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        let (head, count) = (self.head, self.count);
        let (wrapped, front) = self.entries.split_at_mut(head);
        let front_len = front.len().min(count);
        let wrapped_len = count - front_len;
        front[..front_len]
            .iter_mut()
            .chain(wrapped[..wrapped_len].iter_mut())
            .filter_map(Option::as_mut)
    }
}
