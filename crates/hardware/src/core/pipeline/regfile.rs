//! Physical register files and the rename table.
//!
//! Every thread has one physical file per register class. A register moves
//! through `Free -> Allocated -> WrittenBack -> Architectural` and back to
//! `Free` when a younger mapping of the same architectural register commits,
//! or straight back to `Free` when its producer is squashed.
//!
//! The rename table is total: at construction every architectural register is
//! mapped to its own `Architectural` physical register.

use std::collections::VecDeque;

use crate::common::{RegClass, RegDep, SimError, SimResult};

use super::entry::EntryRef;

/// A physical register: class plus index in that class's file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PhysReg {
    /// Register class.
    pub class: RegClass,
    /// Index within the class's file.
    pub index: usize,
}

/// Lifecycle state of a physical register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PhysRegState {
    /// On the free list.
    #[default]
    Free,
    /// Owned by an in-flight producer that has not written back.
    Allocated,
    /// Value produced; producer not yet committed.
    WrittenBack,
    /// Holds committed architectural state.
    Architectural,
}

impl PhysRegState {
    /// A consumer may read the value.
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::WrittenBack | Self::Architectural)
    }
}

/// One destination rename: architectural register, previous and new mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rename {
    /// Architectural register written.
    pub dep: RegDep,
    /// Mapping before this instruction; freed at commit, restored on squash.
    pub old: PhysReg,
    /// Register allocated for this instruction.
    pub new: PhysReg,
}

#[derive(Clone, Copy, Debug, Default)]
struct PhysicalRegister {
    state: PhysRegState,
    owner: Option<EntryRef>,
}

/// Physical registers of one class.
#[derive(Debug, Clone)]
pub struct PhysicalRegisterFile {
    class: RegClass,
    regs: Vec<PhysicalRegister>,
    free: VecDeque<usize>,
}

impl PhysicalRegisterFile {
    /// Creates a file of `size` free registers.
    pub fn new(class: RegClass, size: usize) -> Self {
        Self {
            class,
            regs: vec![PhysicalRegister::default(); size],
            free: (0..size).collect(),
        }
    }

    /// Takes a free register for `owner`.
    pub fn alloc(&mut self, owner: Option<EntryRef>) -> SimResult<PhysReg> {
        let index = self
            .free
            .pop_front()
            .ok_or(SimError::NoFreePhysicalRegister { class: self.class })?;
        let reg = &mut self.regs[index];
        debug_assert_eq!(reg.state, PhysRegState::Free);
        reg.state = PhysRegState::Allocated;
        reg.owner = owner;
        Ok(PhysReg {
            class: self.class,
            index,
        })
    }

    /// Marks the value of `index` as produced.
    pub fn writeback(&mut self, index: usize) {
        let reg = &mut self.regs[index];
        debug_assert_eq!(reg.state, PhysRegState::Allocated);
        reg.state = PhysRegState::WrittenBack;
    }

    /// Promotes `index` to architectural state when its producer commits.
    pub fn commit(&mut self, index: usize) {
        let reg = &mut self.regs[index];
        debug_assert_eq!(reg.state, PhysRegState::WrittenBack);
        reg.state = PhysRegState::Architectural;
        reg.owner = None;
    }

    /// Returns `index` to the free list.
    pub fn dealloc(&mut self, index: usize) {
        let reg = &mut self.regs[index];
        debug_assert_ne!(reg.state, PhysRegState::Free);
        reg.state = PhysRegState::Free;
        reg.owner = None;
        self.free.push_back(index);
    }

    /// State of register `index`.
    pub fn state(&self, index: usize) -> PhysRegState {
        self.regs[index].state
    }

    /// Producer currently owning register `index`.
    pub fn owner(&self, index: usize) -> Option<EntryRef> {
        self.regs[index].owner
    }

    /// Number of free registers.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Number of registers.
    pub fn size(&self) -> usize {
        self.regs.len()
    }
}

/// The three physical register files of a thread.
#[derive(Debug, Clone)]
pub struct RegisterFiles {
    files: [PhysicalRegisterFile; 3],
}

impl RegisterFiles {
    /// Creates the files with the given sizes (integer, float, misc).
    pub fn new(sizes: [usize; 3]) -> Self {
        Self {
            files: RegClass::ALL.map(|class| PhysicalRegisterFile::new(class, sizes[class.index()])),
        }
    }

    /// The file for `class`.
    pub fn file(&self, class: RegClass) -> &PhysicalRegisterFile {
        &self.files[class.index()]
    }

    fn file_mut(&mut self, class: RegClass) -> &mut PhysicalRegisterFile {
        &mut self.files[class.index()]
    }

    /// Allocates a register of `class` for `owner`.
    pub fn alloc(&mut self, class: RegClass, owner: Option<EntryRef>) -> SimResult<PhysReg> {
        self.file_mut(class).alloc(owner)
    }

    /// See [`PhysicalRegisterFile::writeback`].
    pub fn writeback(&mut self, reg: PhysReg) {
        self.file_mut(reg.class).writeback(reg.index);
    }

    /// See [`PhysicalRegisterFile::commit`].
    pub fn commit(&mut self, reg: PhysReg) {
        self.file_mut(reg.class).commit(reg.index);
    }

    /// See [`PhysicalRegisterFile::dealloc`].
    pub fn dealloc(&mut self, reg: PhysReg) {
        self.file_mut(reg.class).dealloc(reg.index);
    }

    /// State of `reg`.
    pub fn state(&self, reg: PhysReg) -> PhysRegState {
        self.file(reg.class).state(reg.index)
    }

    /// True if `reg` can be read.
    pub fn is_ready(&self, reg: PhysReg) -> bool {
        self.state(reg).is_ready()
    }

    /// True if every register in `regs` can be read.
    pub fn all_ready(&self, regs: &[PhysReg]) -> bool {
        regs.iter().all(|&r| self.is_ready(r))
    }

    /// Free registers of `class`.
    pub fn free_count(&self, class: RegClass) -> usize {
        self.file(class).free_count()
    }
}

/// Architectural-to-physical mapping of one thread.
#[derive(Debug, Clone)]
pub struct RegisterRenameTable {
    maps: [Vec<PhysReg>; 3],
}

impl RegisterRenameTable {
    /// Maps each of the `counts` architectural registers per class to a fresh
    /// architectural physical register taken from `files`.
    pub fn new(files: &mut RegisterFiles, counts: [usize; 3]) -> SimResult<Self> {
        let mut maps: [Vec<PhysReg>; 3] = Default::default();
        for class in RegClass::ALL {
            for _ in 0..counts[class.index()] {
                let reg = files.alloc(class, None)?;
                files.writeback(reg);
                files.commit(reg);
                maps[class.index()].push(reg);
            }
        }
        Ok(Self { maps })
    }

    /// Current mapping of `dep`.
    pub fn lookup(&self, dep: RegDep) -> PhysReg {
        self.maps[dep.class.index()][dep.num]
    }

    /// Points `dep` at `reg`, returning the previous mapping.
    pub fn set(&mut self, dep: RegDep, reg: PhysReg) -> PhysReg {
        std::mem::replace(&mut self.maps[dep.class.index()][dep.num], reg)
    }

    /// Every current mapping.
    pub fn iter(&self) -> impl Iterator<Item = PhysReg> + '_ {
        self.maps.iter().flatten().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_mapping_is_architectural() {
        let mut files = RegisterFiles::new([8, 4, 2]);
        let table = RegisterRenameTable::new(&mut files, [4, 2, 1]).unwrap();
        assert!(table.iter().all(|r| files.state(r) == PhysRegState::Architectural));
        assert_eq!(files.free_count(RegClass::Integer), 4);
        assert_eq!(files.free_count(RegClass::Misc), 1);
    }

    #[test]
    fn test_exhaustion_reports_class() {
        let mut file = PhysicalRegisterFile::new(RegClass::Float, 1);
        let _ = file.alloc(None).unwrap();
        assert!(matches!(
            file.alloc(None),
            Err(SimError::NoFreePhysicalRegister { class: RegClass::Float })
        ));
    }

    #[test]
    fn test_lifecycle_returns_to_free_list() {
        let mut file = PhysicalRegisterFile::new(RegClass::Integer, 2);
        let r = file.alloc(None).unwrap();
        assert!(!file.state(r.index).is_ready());
        file.writeback(r.index);
        assert!(file.state(r.index).is_ready());
        file.commit(r.index);
        file.dealloc(r.index);
        assert_eq!(file.free_count(), 2);
    }
}
