//! Sparse guest memory.
//!
//! Pages are allocated only when a region is mapped. Accesses that touch an
//! unmapped byte fail with `SimError::UnmappedAddress` and leave memory unchanged.

use std::collections::HashMap;

use crate::common::{SimError, SimResult};

/// Size of one backing page in bytes.
pub const PAGE_SIZE: u64 = 4096;
const PAGE_MASK: u64 = PAGE_SIZE - 1;

/// Byte-addressable memory made of 4 KiB pages.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    pages: HashMap<u64, Box<[u8]>>,
}

impl Memory {
    /// Creates an empty memory with nothing mapped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `[base, base + len)`, zero-filling pages not already mapped.
    pub fn map(&mut self, base: u64, len: u64) {
        if len == 0 {
            return;
        }
        let first = base / PAGE_SIZE;
        let last = (base + len - 1) / PAGE_SIZE;
        for page in first..=last {
            let _ = self
                .pages
                .entry(page)
                .or_insert_with(|| vec![0; PAGE_SIZE as usize].into_boxed_slice());
        }
    }

    /// Returns true if the byte at `addr` is backed.
    pub fn is_mapped(&self, addr: u64) -> bool {
        self.pages.contains_key(&(addr / PAGE_SIZE))
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.pages.len()
    }

    fn check(&self, addr: u64, len: usize) -> SimResult<()> {
        if len == 0 {
            return Ok(());
        }
        let end = addr
            .checked_add(len as u64 - 1)
            .ok_or(SimError::UnmappedAddress(addr))?;
        for page in addr / PAGE_SIZE..=end / PAGE_SIZE {
            if !self.pages.contains_key(&page) {
                return Err(SimError::UnmappedAddress(addr.max(page * PAGE_SIZE)));
            }
        }
        Ok(())
    }

    /// Copies `buf.len()` bytes starting at `addr` into `buf`.
    pub fn read(&self, addr: u64, buf: &mut [u8]) -> SimResult<()> {
        self.check(addr, buf.len())?;
        let mut done = 0;
        while done < buf.len() {
            let at = addr + done as u64;
            let offset = (at & PAGE_MASK) as usize;
            let chunk = (PAGE_SIZE as usize - offset).min(buf.len() - done);
            let page = self
                .pages
                .get(&(at / PAGE_SIZE))
                .ok_or(SimError::UnmappedAddress(at))?;
            buf[done..done + chunk].copy_from_slice(&page[offset..offset + chunk]);
            done += chunk;
        }
        Ok(())
    }

    /// Writes `data` starting at `addr`.
    pub fn write(&mut self, addr: u64, data: &[u8]) -> SimResult<()> {
        self.check(addr, data.len())?;
        let mut done = 0;
        while done < data.len() {
            let at = addr + done as u64;
            let offset = (at & PAGE_MASK) as usize;
            let chunk = (PAGE_SIZE as usize - offset).min(data.len() - done);
            let page = self
                .pages
                .get_mut(&(at / PAGE_SIZE))
                .ok_or(SimError::UnmappedAddress(at))?;
            page[offset..offset + chunk].copy_from_slice(&data[done..done + chunk]);
            done += chunk;
        }
        Ok(())
    }

    /// Reads a little-endian 32-bit word.
    pub fn read_u32(&self, addr: u64) -> SimResult<u32> {
        let mut bytes = [0; 4];
        self.read(addr, &mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian 64-bit word.
    pub fn read_u64(&self, addr: u64) -> SimResult<u64> {
        let mut bytes = [0; 8];
        self.read(addr, &mut bytes)?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Writes a little-endian 32-bit word.
    pub fn write_u32(&mut self, addr: u64, value: u32) -> SimResult<()> {
        self.write(addr, &value.to_le_bytes())
    }

    /// Writes a little-endian 64-bit word.
    pub fn write_u64(&mut self, addr: u64, value: u64) -> SimResult<()> {
        self.write(addr, &value.to_le_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_access_fails() {
        let mem = Memory::new();
        assert!(matches!(mem.read_u64(0x1000), Err(SimError::UnmappedAddress(0x1000))));
    }

    #[test]
    fn test_access_spanning_pages() {
        let mut mem = Memory::new();
        mem.map(0, 2 * PAGE_SIZE);
        mem.write_u64(PAGE_SIZE - 4, 0x1122_3344_5566_7788).unwrap();
        assert_eq!(mem.read_u64(PAGE_SIZE - 4).unwrap(), 0x1122_3344_5566_7788);
        assert_eq!(mem.read_u32(PAGE_SIZE).unwrap(), 0x1122_3344);
    }

    #[test]
    fn test_partial_overlap_is_rejected_without_writing() {
        let mut mem = Memory::new();
        mem.map(0, PAGE_SIZE);
        assert!(mem.write_u64(PAGE_SIZE - 4, u64::MAX).is_err());
        assert_eq!(mem.read_u32(PAGE_SIZE - 4).unwrap(), 0);
    }

    #[test]
    fn test_map_preserves_existing_contents() {
        let mut mem = Memory::new();
        mem.map(0x2000, 8);
        mem.write_u64(0x2000, 7).unwrap();
        mem.map(0x2000, PAGE_SIZE * 2);
        assert_eq!(mem.read_u64(0x2000).unwrap(), 7);
        assert_eq!(mem.mapped_pages(), 2);
    }
}
