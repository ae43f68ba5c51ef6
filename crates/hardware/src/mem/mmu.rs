//! Memory management unit.
//!
//! Physical pages are handed out on first touch: the first translation of a
//! `(asid, virtual page)` pair allocates the next physical page number, and the
//! mapping is kept for the rest of the run. Lookups go through an open-chained
//! hash table keyed by both fields, so two address spaces never alias unless
//! they share an ASID.

/// A translated page.
#[derive(Clone, Copy, Debug)]
struct PageEntry {
    /// Address space identifier.
    asid: u32,
    /// Virtual page number.
    vpn: u64,
    /// Physical page number.
    ppn: u64,
}

/// Page-granular virtual-to-physical translator.
#[derive(Debug, Clone)]
pub struct Mmu {
    /// Hash buckets, each a chain of entries.
    buckets: Vec<Vec<PageEntry>>,
    /// Mask used for bucket indexing (buckets - 1).
    mask: usize,
    page_shift: u32,
    next_ppn: u64,
    pages: usize,
}

impl Mmu {
    /// Creates an MMU.
    ///
    /// # Arguments
    ///
    /// * `page_size` - Page size in bytes (power of two).
    /// * `buckets` - Hash bucket count (rounded up to a power of two).
    pub fn new(page_size: u64, buckets: usize) -> Self {
        let buckets = buckets.max(1).next_power_of_two();
        Self {
            buckets: vec![Vec::new(); buckets],
            mask: buckets - 1,
            page_shift: page_size.trailing_zeros(),
            next_ppn: 0,
            pages: 0,
        }
    }

    #[inline]
    fn bucket(&self, asid: u32, vpn: u64) -> usize {
        let h = vpn ^ u64::from(asid).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        (h as usize) & self.mask
    }

    /// Translates `vaddr` in address space `asid`, allocating a page on first use.
    pub fn translate(&mut self, asid: u32, vaddr: u64) -> u64 {
        let vpn = vaddr >> self.page_shift;
        let offset = vaddr & ((1 << self.page_shift) - 1);
        let bucket = self.bucket(asid, vpn);

        let chain = &mut self.buckets[bucket];
        let ppn = if let Some(entry) = chain.iter().find(|e| e.asid == asid && e.vpn == vpn) {
            entry.ppn
        } else {
            let ppn = self.next_ppn;
            self.next_ppn += 1;
            self.pages += 1;
            chain.push(PageEntry { asid, vpn, ppn });
            ppn
        };
        (ppn << self.page_shift) | offset
    }

    /// Number of pages allocated so far.
    pub const fn page_count(&self) -> usize {
        self.pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_is_stable() {
        let mut mmu = Mmu::new(4096, 16);
        let a = mmu.translate(0, 0x1234);
        assert_eq!(mmu.translate(0, 0x1234), a);
        assert_eq!(mmu.translate(0, 0x1000), a & !0xFFF);
        assert_eq!(a & 0xFFF, 0x234);
        assert_eq!(mmu.page_count(), 1);
    }

    #[test]
    fn test_address_spaces_do_not_alias() {
        let mut mmu = Mmu::new(4096, 16);
        let a = mmu.translate(0, 0x8000);
        let b = mmu.translate(1, 0x8000);
        assert_ne!(a, b);
        assert_eq!(mmu.page_count(), 2);
    }

    #[test]
    fn test_pages_allocated_monotonically_despite_collisions() {
        let mut mmu = Mmu::new(4096, 1);
        let pages: Vec<u64> = (0..5).map(|i| mmu.translate(0, i * 4096) >> 12).collect();
        assert_eq!(pages, vec![0, 1, 2, 3, 4]);
    }
}
