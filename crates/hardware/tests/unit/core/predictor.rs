//! Branch Predictor Tests.

use mcsim_core::config::PredictorConfig;
use mcsim_core::core::units::bru::btb::Btb;
use mcsim_core::core::units::bru::ras::Ras;
use mcsim_core::core::units::bru::{BranchKind, BranchPredictor};
use mcsim_core::isa::{InstFlags, StaticInstruction};
use proptest::prelude::*;

fn inst(flags: InstFlags) -> StaticInstruction {
    StaticInstruction {
        raw: 0,
        mnemonic: "test",
        size: 4,
        fu: None,
        flags,
        input_deps: Vec::new(),
        output_deps: Vec::new(),
        mem_addr_deps: Vec::new(),
        mem_data_deps: Vec::new(),
    }
}

fn conditional() -> StaticInstruction {
    inst(InstFlags {
        control: true,
        conditional: true,
        ..InstFlags::default()
    })
}

fn call() -> StaticInstruction {
    inst(InstFlags {
        control: true,
        call: true,
        ..InstFlags::default()
    })
}

fn ret() -> StaticInstruction {
    inst(InstFlags {
        control: true,
        ret: true,
        ..InstFlags::default()
    })
}

#[test]
fn two_entry_ras_wraps_on_third_push() {
    let mut ras = Ras::new(2);
    for addr in [0xA0, 0xB0, 0xC0] {
        ras.push(addr);
    }
    assert_eq!(ras.pop(), 0xC0);
    assert_eq!(ras.pop(), 0xB0);
    assert_eq!(ras.pop(), 0xC0);
}

#[test]
fn predictor_returns_match_calls() {
    let mut config = PredictorConfig::default();
    config.ras_size = 2;
    let mut bp = BranchPredictor::new(&config);

    for pc in [0x100, 0x200, 0x300] {
        let (_, record) = bp.lookup(pc, &call());
        assert_eq!(record.unwrap().return_addr, pc + 4);
    }
    let popped: Vec<u64> = (0..3).map(|_| bp.lookup(0x900, &ret()).0).collect();
    assert_eq!(popped, vec![0x304, 0x204, 0x304]);
    assert_eq!(bp.stats.ras_lookups, 3);
}

#[test]
fn recover_replays_the_mispredicted_call() {
    let mut bp = BranchPredictor::new(&PredictorConfig::default());
    let (_, outer) = bp.lookup(0x100, &call());
    let (_, wrong) = bp.lookup(0x200, &call());
    let _ = bp.lookup(0x300, &call());

    bp.recover(0x200, &wrong.unwrap());
    assert_eq!(bp.ras().top(), 0x204);
    assert_eq!(bp.lookup(0x900, &ret()).0, 0x204);
    assert_eq!(bp.lookup(0x900, &ret()).0, outer.unwrap().return_addr);
    assert_eq!(bp.stats.recoveries, 1);
}

#[test]
fn btb_evicts_least_recently_used_way() {
    let mut btb = Btb::new(1, 2);
    btb.update(0x10, 0x1000, BranchKind::Conditional);
    btb.update(0x20, 0x2000, BranchKind::Conditional);
    btb.update(0x10, 0x1000, BranchKind::Conditional);
    btb.update(0x30, 0x3000, BranchKind::Unconditional);

    assert_eq!(btb.lookup(0x20), None);
    assert_eq!(btb.lookup(0x10), Some(0x1000));
    assert_eq!(btb.lookup(0x30), Some(0x3000));
    assert_eq!(btb.mru_order(0), vec![0x30, 0x10]);
}

#[test]
fn untaken_branches_never_enter_the_btb() {
    let mut bp = BranchPredictor::new(&PredictorConfig::default());
    let br = conditional();
    for _ in 0..4 {
        let (target, record) = bp.lookup(0x400, &br);
        bp.update(0x400, 0x404, false, target != 0, target == 0, &record.unwrap());
    }
    assert_eq!(bp.btb().lookup(0x400), None);
    assert_eq!(bp.lookup(0x400, &br).0, 0);
}

proptest! {
    #[test]
    fn counters_stay_saturated(outcomes in prop::collection::vec((0u64..64, any::<bool>()), 1..200)) {
        let mut bp = BranchPredictor::new(&PredictorConfig::default());
        let br = conditional();
        for (slot, taken) in outcomes {
            let pc = 0x1000 + slot * 4;
            let (target, record) = bp.lookup(pc, &br);
            let record = record.unwrap();
            let actual = if taken { 0x2000 } else { pc + 4 };
            let predicted = if target == 0 { pc + 4 } else { target };
            bp.update(pc, actual, taken, target != 0, predicted == actual, &record);

            prop_assert!(bp.bimodal_counter(record.bimodal_idx.unwrap()) <= 3);
            prop_assert!(bp.two_level_counter(record.two_level_idx.unwrap()) <= 3);
            prop_assert!(bp.choice_counter(record.choice_idx.unwrap()) <= 3);
        }
    }

    #[test]
    fn ras_top_stays_in_bounds(size in 1usize..8, ops in prop::collection::vec(0u8..3, 0..100)) {
        let mut ras = Ras::new(size);
        for (i, op) in ops.into_iter().enumerate() {
            match op {
                0 => ras.push(i as u64),
                1 => {
                    let _ = ras.pop();
                }
                _ => ras.restore(i),
            }
            prop_assert!(ras.tos() < ras.capacity());
        }
    }
}
