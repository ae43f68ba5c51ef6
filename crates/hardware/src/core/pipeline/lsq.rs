//! Load/Store Queue (LSQ).
//!
//! Memory operations hold a second in-flight record beside their ROB entry. The
//! queue provides:
//! 1. **Disambiguation:** A forward scan that lets a load issue only when no older
//!    store with an unresolved address or value targets the same address.
//! 2. **Forwarding:** A probe for an older in-flight store to the load's address.
//!
//! Stores write the cache only at commit, so a forwarded load never touches it.

use super::entry::LsqEntry;
use super::rob::InFlightBuffer;

/// The load/store queue.
pub type LoadStoreQueue = InFlightBuffer<LsqEntry>;

/// Result of store-to-load forwarding check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForwardResult {
    /// An older in-flight store writes the load's address; value comes from it.
    Hit {
        /// Sequence number of the youngest matching store.
        store_seq: u64,
    },
    /// No older store matches; the load goes to the data cache.
    Miss,
}

impl InFlightBuffer<LsqEntry> {
    /// Probes older stores for the address of the load with sequence `load_seq`.
    pub fn forward(&self, load_seq: u64, paddr: u64) -> ForwardResult {
        self.iter()
            .take_while(|e| e.seq < load_seq)
            .filter(|e| e.is_store && e.paddr == paddr)
            .last()
            .map_or(ForwardResult::Miss, |e| ForwardResult::Hit { store_seq: e.seq })
    }

    /// Sequence numbers of loads allowed to issue, oldest first.
    ///
    /// Scans from the head, collecting addresses of stores that are not yet
    /// resolved (`store_resolved` false). A load qualifies when it is dispatched,
    /// not yet queued or issued, its address is known, and no older unresolved
    /// store shares its address.
    pub fn issuable_loads(&self, mut store_resolved: impl FnMut(&LsqEntry) -> bool) -> Vec<u64> {
        let mut unknown = Vec::new();
        let mut ready = Vec::new();
        for e in self.iter() {
            if e.is_store {
                if !store_resolved(e) {
                    unknown.push(e.paddr);
                }
            } else if e.status.dispatched
                && !e.status.in_ready_queue
                && !e.status.issued
                && e.ea_ready
                && !unknown.contains(&e.paddr)
            {
                ready.push(e.seq);
            }
        }
        ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::entry::EntryStatus;

    fn entry(seq: u64, is_store: bool, paddr: u64) -> LsqEntry {
        LsqEntry {
            seq,
            is_store,
            vaddr: paddr,
            paddr,
            sources: Vec::new(),
            outputs: Vec::new(),
            status: EntryStatus {
                dispatched: true,
                ..EntryStatus::default()
            },
            ea_ready: true,
            speculative: false,
        }
    }

    #[test]
    fn test_forward_picks_youngest_older_store() {
        let mut lsq = LoadStoreQueue::new(8);
        lsq.push(entry(1, true, 0x100)).unwrap();
        lsq.push(entry(2, true, 0x100)).unwrap();
        lsq.push(entry(3, false, 0x100)).unwrap();
        lsq.push(entry(4, true, 0x100)).unwrap();
        assert_eq!(lsq.forward(3, 0x100), ForwardResult::Hit { store_seq: 2 });
        assert_eq!(lsq.forward(3, 0x108), ForwardResult::Miss);
    }

    #[test]
    fn test_unresolved_store_blocks_only_matching_loads() {
        let mut lsq = LoadStoreQueue::new(8);
        lsq.push(entry(1, true, 0x200)).unwrap();
        lsq.push(entry(2, false, 0x200)).unwrap();
        lsq.push(entry(3, false, 0x300)).unwrap();
        assert_eq!(lsq.issuable_loads(|_| false), vec![3]);
        assert_eq!(lsq.issuable_loads(|_| true), vec![2, 3]);
    }

    #[test]
    fn test_younger_store_does_not_block() {
        let mut lsq = LoadStoreQueue::new(8);
        lsq.push(entry(1, false, 0x200)).unwrap();
        lsq.push(entry(2, true, 0x200)).unwrap();
        assert_eq!(lsq.issuable_loads(|_| false), vec![1]);
    }
}
