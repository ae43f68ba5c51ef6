//! Branch Target Buffer (BTB).
//!
//! A set-associative table of branch targets. Each set keeps its ways in an
//! MRU-ordered doubly linked list threaded through the entry arena by index:
//! a hit on update moves the way to the head, and a miss re-tags the tail
//! (least recently used) way. Entries are never allocated or freed after
//! construction.

use crate::common::constants::BRANCH_SHIFT;

use super::BranchKind;

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BtbEntry {
    /// Branch address (tag); zero means the way has never been written.
    pub addr: u64,
    /// Predicted target.
    pub target: u64,
    /// Kind of the branch that owns the entry.
    pub kind: Option<BranchKind>,
    /// More recently used way in the same set.
    prev: Option<usize>,
    /// Less recently used way in the same set.
    next: Option<usize>,
}

/// Head and tail of one set's MRU list.
#[derive(Clone, Copy, Debug)]
struct SetList {
    head: Option<usize>,
    tail: Option<usize>,
}

/// Branch Target Buffer structure.
#[derive(Debug, Clone)]
pub struct Btb {
    /// Entry arena, `assoc` consecutive slots per set.
    entries: Vec<BtbEntry>,
    /// MRU list per set.
    sets: Vec<SetList>,
    assoc: usize,
}

impl Btb {
    /// Creates a BTB.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets. Must be a power of 2.
    /// * `assoc` - Ways per set.
    pub fn new(sets: usize, assoc: usize) -> Self {
        let mut entries = vec![BtbEntry::default(); sets * assoc];
        let mut lists = Vec::with_capacity(sets);
        for set in 0..sets {
            let base = set * assoc;
            for way in 0..assoc {
                let slot = &mut entries[base + way];
                slot.prev = way.checked_sub(1).map(|w| base + w);
                slot.next = (way + 1 < assoc).then_some(base + way + 1);
            }
            lists.push(SetList {
                head: Some(base),
                tail: Some(base + assoc - 1),
            });
        }
        Self {
            entries,
            sets: lists,
            assoc,
        }
    }

    /// Set index for a branch address.
    #[inline]
    pub fn set_of(&self, addr: u64) -> usize {
        ((addr >> BRANCH_SHIFT) as usize) & (self.sets.len() - 1)
    }

    fn find(&self, addr: u64) -> Option<usize> {
        let base = self.set_of(addr) * self.assoc;
        (base..base + self.assoc).find(|&i| self.entries[i].kind.is_some() && self.entries[i].addr == addr)
    }

    /// Looks up the predicted target of the branch at `addr`.
    ///
    /// # Returns
    ///
    /// The stored target on a tag match, otherwise `None`.
    pub fn lookup(&self, addr: u64) -> Option<u64> {
        self.find(addr).map(|i| self.entries[i].target)
    }

    /// Records that the branch at `addr` was taken to `target`.
    ///
    /// Reuses the matching way or replaces the set's LRU way, then makes it MRU.
    pub fn update(&mut self, addr: u64, target: u64, kind: BranchKind) {
        let set = self.set_of(addr);
        let slot = match self.find(addr) {
            Some(slot) => slot,
            None => match self.sets[set].tail {
                Some(tail) => tail,
                None => return,
            },
        };
        let entry = &mut self.entries[slot];
        entry.addr = addr;
        entry.target = target;
        entry.kind = Some(kind);
        self.move_to_front(set, slot);
    }

    fn move_to_front(&mut self, set: usize, slot: usize) {
        if self.sets[set].head == Some(slot) {
            return;
        }
        let BtbEntry { prev, next, .. } = self.entries[slot];
        if let Some(p) = prev {
            self.entries[p].next = next;
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.sets[set].tail = prev,
        }
        let old_head = self.sets[set].head;
        self.entries[slot].prev = None;
        self.entries[slot].next = old_head;
        if let Some(h) = old_head {
            self.entries[h].prev = Some(slot);
        }
        self.sets[set].head = Some(slot);
    }

    /// Branch addresses of `set` from most to least recently used.
    pub fn mru_order(&self, set: usize) -> Vec<u64> {
        let mut order = Vec::with_capacity(self.assoc);
        let mut cursor = self.sets[set].head;
        while let Some(i) = cursor {
            order.push(self.entries[i].addr);
            cursor = self.entries[i].next;
        }
        order
    }
}
