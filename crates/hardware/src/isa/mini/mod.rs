//! The mini reference ISA.
//!
//! A 64-bit load/store machine with 32 integer registers (`r0` reads as zero),
//! 32 floating-point registers, and one flag register written by `cmp`. All
//! instructions are 4 bytes; branch and jump offsets count instructions.
//!
//! 1. **Encoding:** `instruction` defines the word layout and opcodes.
//! 2. **Semantics:** `MiniIsa` implements `InstructionSet`.
//! 3. **Assembler:** `asm` turns source text into a loadable `Program`.

/// Line-oriented assembler.
pub mod asm;

/// Word layout and opcodes.
pub mod instruction;

use crate::common::constants::INSTRUCTION_SIZE;
use crate::common::{FuKind, RegClass, RegDep, SimError, SimResult};
use crate::mem::Memory;

use super::{ArchState, DynamicInstruction, InstFlags, InstructionSet, StaticInstruction};
use instruction::{InstructionBits, LINK_REG, Opcode};

pub use asm::{Program, assemble, assemble_at};

/// Integer registers.
pub const INT_REGS: usize = 32;
/// Floating-point registers.
pub const FP_REGS: usize = 32;
/// Flag registers.
pub const MISC_REGS: usize = 1;

const FLAG: RegDep = RegDep::misc(0);

/// The mini instruction set.
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniIsa;

impl MiniIsa {
    /// Creates the ISA.
    pub const fn new() -> Self {
        Self
    }
}

/// Integer dependency on `r`, or nothing for the zero register.
fn int(r: usize) -> Option<RegDep> {
    (r != 0).then_some(RegDep::int(r))
}

fn ints(regs: &[usize]) -> Vec<RegDep> {
    regs.iter().copied().filter_map(int).collect()
}

fn branch_target(pc: u64, raw: u32) -> u64 {
    pc.wrapping_add((raw.simm() * INSTRUCTION_SIZE as i64) as u64)
}

fn write_int(state: &mut ArchState, r: usize, value: u64) {
    if r != 0 {
        state.int[r] = value;
    }
}

impl InstructionSet for MiniIsa {
    fn register_count(&self, class: RegClass) -> usize {
        match class {
            RegClass::Integer => INT_REGS,
            RegClass::Float => FP_REGS,
            RegClass::Misc => MISC_REGS,
        }
    }

    fn decode(&self, pc: u64, memory: &Memory) -> SimResult<StaticInstruction> {
        let raw = memory.read_u32(pc)?;
        let op = Opcode::from_bits(raw.opcode()).ok_or(SimError::IllegalInstruction { pc, raw })?;
        let (rd, rs1, rs2) = (raw.rd(), raw.rs1(), raw.rs2());

        let mut inst = StaticInstruction {
            raw,
            mnemonic: op.mnemonic(),
            size: INSTRUCTION_SIZE,
            fu: Some(FuKind::IntAlu),
            flags: InstFlags::default(),
            input_deps: Vec::new(),
            output_deps: Vec::new(),
            mem_addr_deps: Vec::new(),
            mem_data_deps: Vec::new(),
        };

        match op {
            Opcode::Nop => {
                inst.fu = None;
                inst.flags.nop = true;
            }
            Opcode::Add | Opcode::Sub | Opcode::And | Opcode::Or | Opcode::Xor | Opcode::Slt => {
                inst.input_deps = ints(&[rs1, rs2]);
                inst.output_deps = ints(&[rd]);
            }
            Opcode::Addi | Opcode::Ori => {
                inst.input_deps = ints(&[rs1]);
                inst.output_deps = ints(&[rd]);
            }
            Opcode::Lui => inst.output_deps = ints(&[rd]),
            Opcode::Mul | Opcode::Div => {
                inst.fu = Some(if op == Opcode::Mul {
                    FuKind::IntMult
                } else {
                    FuKind::IntDiv
                });
                inst.input_deps = ints(&[rs1, rs2]);
                inst.output_deps = ints(&[rd]);
            }
            Opcode::Cmp => {
                inst.input_deps = ints(&[rs1, rs2]);
                inst.output_deps = vec![FLAG];
            }
            Opcode::Fadd | Opcode::Fmul | Opcode::Fdiv => {
                inst.fu = Some(match op {
                    Opcode::Fadd => FuKind::FpAdd,
                    Opcode::Fmul => FuKind::FpMult,
                    _ => FuKind::FpDiv,
                });
                inst.input_deps = vec![RegDep::fp(rs1), RegDep::fp(rs2)];
                inst.output_deps = vec![RegDep::fp(rd)];
            }
            Opcode::Fcvt => {
                inst.fu = Some(FuKind::FpAdd);
                inst.input_deps = ints(&[rs1]);
                inst.output_deps = vec![RegDep::fp(rd)];
            }
            Opcode::Ld | Opcode::Fld => {
                inst.fu = Some(FuKind::ReadPort);
                inst.flags.load = true;
                inst.mem_addr_deps = ints(&[rs1]);
                inst.input_deps = inst.mem_addr_deps.clone();
                inst.output_deps = if op == Opcode::Ld {
                    ints(&[rd])
                } else {
                    vec![RegDep::fp(rd)]
                };
            }
            Opcode::St | Opcode::Fst => {
                inst.fu = Some(FuKind::WritePort);
                inst.flags.store = true;
                inst.mem_addr_deps = ints(&[rs1]);
                inst.mem_data_deps = if op == Opcode::St {
                    ints(&[rd])
                } else {
                    vec![RegDep::fp(rd)]
                };
                inst.input_deps = inst
                    .mem_addr_deps
                    .iter()
                    .chain(&inst.mem_data_deps)
                    .copied()
                    .collect();
            }
            Opcode::Beqz | Opcode::Bnez => {
                inst.flags.control = true;
                inst.flags.conditional = true;
                inst.input_deps = ints(&[rs1]);
            }
            Opcode::Bf => {
                inst.flags.control = true;
                inst.flags.conditional = true;
                inst.input_deps = vec![FLAG];
            }
            Opcode::J => {
                inst.fu = None;
                inst.flags.control = true;
            }
            Opcode::Call => {
                inst.flags.control = true;
                inst.flags.call = true;
                inst.output_deps = ints(&[LINK_REG]);
            }
            Opcode::Ret => {
                inst.flags.control = true;
                inst.flags.ret = true;
                inst.input_deps = ints(&[LINK_REG]);
            }
            Opcode::Halt => {
                inst.fu = None;
                inst.flags.halt = true;
            }
        }
        Ok(inst)
    }

    fn execute(
        &self,
        pc: u64,
        inst: StaticInstruction,
        state: &mut ArchState,
        memory: &mut Memory,
    ) -> SimResult<DynamicInstruction> {
        let raw = inst.raw;
        let op = Opcode::from_bits(raw.opcode()).ok_or(SimError::IllegalInstruction { pc, raw })?;
        let (rd, a, b) = (raw.rd(), state.int[raw.rs1()], state.int[raw.rs2()]);
        let fa = f64::from_bits(state.fp[raw.rs1()]);
        let fb = f64::from_bits(state.fp[raw.rs2()]);
        let ea = a.wrapping_add(raw.simm() as u64);
        let fallthrough = pc + INSTRUCTION_SIZE;

        let mut next_pc = fallthrough;
        let mut effective_addr = None;

        match op {
            Opcode::Nop => {}
            Opcode::Add => write_int(state, rd, a.wrapping_add(b)),
            Opcode::Sub => write_int(state, rd, a.wrapping_sub(b)),
            Opcode::And => write_int(state, rd, a & b),
            Opcode::Or => write_int(state, rd, a | b),
            Opcode::Xor => write_int(state, rd, a ^ b),
            Opcode::Slt => write_int(state, rd, u64::from((a as i64) < (b as i64))),
            Opcode::Addi => write_int(state, rd, ea),
            Opcode::Ori => write_int(state, rd, a | raw.imm()),
            Opcode::Lui => write_int(state, rd, raw.imm() << 16),
            Opcode::Mul => write_int(state, rd, a.wrapping_mul(b)),
            Opcode::Div => {
                let q = if b == 0 {
                    u64::MAX
                } else {
                    (a as i64).wrapping_div(b as i64) as u64
                };
                write_int(state, rd, q);
            }
            Opcode::Cmp => state.write(FLAG, u64::from((a as i64) < (b as i64))),
            Opcode::Fadd => state.fp[rd] = (fa + fb).to_bits(),
            Opcode::Fmul => state.fp[rd] = (fa * fb).to_bits(),
            Opcode::Fdiv => state.fp[rd] = (fa / fb).to_bits(),
            Opcode::Fcvt => state.fp[rd] = (a as i64 as f64).to_bits(),
            Opcode::Ld => {
                effective_addr = Some(ea);
                let value = memory.read_u64(ea)?;
                write_int(state, rd, value);
            }
            Opcode::Fld => {
                effective_addr = Some(ea);
                state.fp[rd] = memory.read_u64(ea)?;
            }
            Opcode::St => {
                effective_addr = Some(ea);
                memory.write_u64(ea, state.int[rd])?;
            }
            Opcode::Fst => {
                effective_addr = Some(ea);
                memory.write_u64(ea, state.fp[rd])?;
            }
            Opcode::Beqz => {
                if a == 0 {
                    next_pc = branch_target(pc, raw);
                }
            }
            Opcode::Bnez => {
                if a != 0 {
                    next_pc = branch_target(pc, raw);
                }
            }
            Opcode::Bf => {
                if state.read(FLAG) != 0 {
                    next_pc = branch_target(pc, raw);
                }
            }
            Opcode::J => next_pc = branch_target(pc, raw),
            Opcode::Call => {
                write_int(state, LINK_REG, fallthrough);
                next_pc = branch_target(pc, raw);
            }
            Opcode::Ret => next_pc = state.int[LINK_REG],
            Opcode::Halt => state.halted = true,
        }

        state.pc = next_pc;
        Ok(DynamicInstruction {
            pc,
            next_pc,
            effective_addr,
            inst,
        })
    }

    fn effective_address(&self, inst: &StaticInstruction, state: &ArchState) -> Option<u64> {
        inst.flags
            .memory()
            .then(|| state.int[inst.raw.rs1()].wrapping_add(inst.raw.simm() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::constants::CODE_BASE;

    fn run(source: &str, steps: usize) -> (ArchState, Memory) {
        let isa = MiniIsa::new();
        let program = assemble(source).unwrap();
        let mut memory = Memory::new();
        program.load_into(&mut memory).unwrap();
        memory.map(0x10_0000, 0x1000);
        let mut state = ArchState::new(&isa);
        state.pc = CODE_BASE;
        for _ in 0..steps {
            if state.halted {
                break;
            }
            let inst = isa.decode(state.pc, &memory).unwrap();
            let _ = isa.execute(state.pc, inst, &mut state, &mut memory).unwrap();
        }
        (state, memory)
    }

    #[test]
    fn test_arithmetic_and_zero_register() {
        let (state, _) = run("li r1, 7\nli r2, -3\nadd r3, r1, r2\nadd r0, r1, r1\nhalt", 10);
        assert_eq!(state.int[3], 4);
        assert_eq!(state.int[0], 0);
        assert!(state.halted);
    }

    #[test]
    fn test_store_then_load() {
        let (state, memory) = run(
            "lui r2, 0x10\nli r1, 99\nst r1, 8(r2)\nld r3, 8(r2)\nhalt",
            10,
        );
        assert_eq!(state.int[3], 99);
        assert_eq!(memory.read_u64(0x10_0008).unwrap(), 99);
    }

    #[test]
    fn test_call_and_return() {
        let src = "call f\nhalt\nf: li r5, 1\nret";
        let (state, _) = run(src, 10);
        assert_eq!(state.int[5], 1);
        assert_eq!(state.int[LINK_REG], CODE_BASE + 4);
        assert!(state.halted);
    }

    #[test]
    fn test_decode_classifies_memory_operands() {
        let isa = MiniIsa::new();
        let program = assemble("st r4, 0(r2)").unwrap();
        let mut memory = Memory::new();
        program.load_into(&mut memory).unwrap();
        let inst = isa.decode(CODE_BASE, &memory).unwrap();
        assert!(inst.flags.store);
        assert_eq!(inst.mem_addr_deps, vec![RegDep::int(2)]);
        assert_eq!(inst.mem_data_deps, vec![RegDep::int(4)]);
        assert!(inst.output_deps.is_empty());
    }

    #[test]
    fn test_illegal_opcode() {
        let isa = MiniIsa::new();
        let mut memory = Memory::new();
        memory.map(CODE_BASE, 4);
        memory.write_u32(CODE_BASE, 0xFFFF_FFFF).unwrap();
        assert!(matches!(
            isa.decode(CODE_BASE, &memory),
            Err(SimError::IllegalInstruction { .. })
        ));
    }
}
