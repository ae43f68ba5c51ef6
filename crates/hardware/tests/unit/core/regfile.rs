//! Physical Register File Tests.

use mcsim_core::common::RegClass;
use mcsim_core::core::pipeline::{EntryKind, EntryRef, PhysRegState, PhysicalRegisterFile};
use proptest::prelude::*;

fn owner(seq: u64) -> EntryRef {
    EntryRef {
        thread: 0,
        seq,
        kind: EntryKind::Rob,
    }
}

#[test]
fn exhausted_file_reports_an_error() {
    let mut file = PhysicalRegisterFile::new(RegClass::Float, 2);
    assert!(file.alloc(Some(owner(0))).is_ok());
    assert!(file.alloc(Some(owner(1))).is_ok());
    assert!(file.alloc(Some(owner(2))).is_err());
    assert_eq!(file.free_count(), 0);
}

proptest! {
    #[test]
    fn allocations_are_distinct_and_owned(size in 1usize..64, count in 0usize..64) {
        let count = count.min(size);
        let mut file = PhysicalRegisterFile::new(RegClass::Integer, size);
        let mut taken = Vec::new();
        for seq in 0..count as u64 {
            let reg = file.alloc(Some(owner(seq))).unwrap();
            prop_assert!(!taken.contains(&reg.index));
            prop_assert_eq!(file.state(reg.index), PhysRegState::Allocated);
            prop_assert_eq!(file.owner(reg.index), Some(owner(seq)));
            taken.push(reg.index);
        }
        prop_assert_eq!(file.free_count(), size - count);

        for index in taken.iter().copied() {
            file.dealloc(index);
        }
        prop_assert_eq!(file.free_count(), size);
    }

    #[test]
    fn committed_registers_drop_their_owner(count in 1usize..16) {
        let mut file = PhysicalRegisterFile::new(RegClass::Integer, 16);
        for seq in 0..count as u64 {
            let reg = file.alloc(Some(owner(seq))).unwrap();
            file.writeback(reg.index);
            prop_assert!(file.state(reg.index).is_ready());
            file.commit(reg.index);
            prop_assert_eq!(file.state(reg.index), PhysRegState::Architectural);
            prop_assert_eq!(file.owner(reg.index), None);
        }
        prop_assert_eq!(file.free_count(), 16 - count);
    }
}
