//! End-to-end programs on the mini ISA.
//!
//! Each case runs to completion and checks the final integer registers of
//! thread 0 and how many instructions it committed.

use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::harness::TestContext;

const SUM_LOOP: &str = "
        li r1, 10
        li r2, 0
    loop:
        add r2, r2, r1
        addi r1, r1, -1
        bnez r1, loop
        halt
";

const CALLS: &str = "
        call bump
        call bump
        halt
    bump:
        addi r5, r5, 1
        ret
";

const STORE_LOAD: &str = "
        lui r2, 0x10
        li r3, 7
        st r3, 8(r2)
        ld r4, 8(r2)
        addi r4, r4, 7
        halt
";

const MUL_DIV: &str = "
        li r1, 6
        li r2, 7
        mul r3, r1, r2
        div r4, r3, r1
        halt
";

const FLAG_LOOP: &str = "
        li r2, 5
    loop:
        addi r1, r1, 1
        cmp r1, r2
        bf loop
        halt
";

const LOGIC: &str = "
        lui r1, 0x12
        ori r1, r1, 0x34
        li r2, 0xF0
        and r3, r1, r2
        or r4, r3, r2
        xor r5, r4, r1
        sub r6, r2, r3
        slt r7, r3, r2
        halt
";

/// Fills eight words, then sums them back with a second loop.
const ARRAY_SUM: &str = "
        lui r2, 0x10
        li r1, 8
    fill:
        st r1, 0(r2)
        addi r2, r2, 8
        addi r1, r1, -1
        bnez r1, fill
        lui r2, 0x10
        li r1, 8
    sum:
        ld r3, 0(r2)
        add r4, r4, r3
        addi r2, r2, 8
        addi r1, r1, -1
        bnez r1, sum
        halt
";

#[rstest]
#[case::sum_loop(SUM_LOOP, &[(2, 55), (1, 0)], 33)]
#[case::calls(CALLS, &[(5, 2), (31, 0x1008)], 7)]
#[case::store_load(STORE_LOAD, &[(3, 7), (4, 14)], 6)]
#[case::mul_div(MUL_DIV, &[(3, 42), (4, 7)], 5)]
#[case::flag_loop(FLAG_LOOP, &[(1, 5), (2, 5)], 17)]
#[case::logic(LOGIC, &[(1, 0x12_0034), (3, 0x30), (4, 0xF0), (5, 0x12_00C4), (6, 0xC0), (7, 1)], 9)]
#[case::array_sum(ARRAY_SUM, &[(4, 36), (1, 0)], 2 + 4 * 8 + 2 + 5 * 8 + 1)]
fn program_results(#[case] source: &str, #[case] expected: &[(usize, u64)], #[case] committed: u64) {
    let mut ctx = TestContext::new().load(0, source);
    let stats = ctx.run();

    let actual: Vec<(usize, u64)> = expected.iter().map(|&(r, _)| (r, ctx.reg(0, r))).collect();
    assert_eq!(actual, expected.to_vec());
    assert_eq!(stats.threads[0].stats.committed, committed);
}

#[test]
fn floating_point_chain() {
    let mut ctx = TestContext::new().load(
        0,
        "
        li r1, 3
        fcvt f1, r1
        fadd f2, f1, f1
        fmul f3, f2, f2
        fdiv f4, f3, f1
        halt
    ",
    );
    let _ = ctx.run();

    let fp = |r: usize| f64::from_bits(ctx.thread(0).state.fp[r]);
    assert_eq!(fp(3), 36.0);
    assert_eq!(fp(4), 12.0);
}

#[test]
fn same_program_on_every_core_gives_same_result() {
    let mut ctx = TestContext::with_config(crate::common::harness::small_config(2, 2));
    for t in 0..4 {
        ctx = ctx.load(t, SUM_LOOP);
    }
    let stats = ctx.run();

    for t in 0..4 {
        assert_eq!(ctx.reg(t, 2), 55);
    }
    assert_eq!(stats.committed, 4 * 33);
}
