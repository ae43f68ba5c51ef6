//! Encoding of the mini ISA.
//!
//! Every instruction is one little-endian 32-bit word:
//!
//! ```text
//!  31    26 25  21 20  16 15  11 10         0
//! +--------+------+------+------+------------+
//! | opcode |  rd  | rs1  | rs2  |            |
//! +--------+------+------+------+------------+
//!                        |       imm16       |
//!                        +-------------------+
//! ```
//!
//! `rs2` overlaps the top of `imm16`; register-register forms use `rs2`,
//! immediate forms use `imm16`.

/// Bit position of the opcode field.
pub const OPCODE_SHIFT: u32 = 26;
/// Bit position of the destination register field.
pub const RD_SHIFT: u32 = 21;
/// Bit position of the first source register field.
pub const RS1_SHIFT: u32 = 16;
/// Bit position of the second source register field.
pub const RS2_SHIFT: u32 = 11;
/// Mask of a register field after shifting.
pub const REG_MASK: u32 = 0x1F;
/// Mask of the immediate field.
pub const IMM_MASK: u32 = 0xFFFF;

/// Integer register written by `call` and read by `ret`.
pub const LINK_REG: usize = 31;

/// Field accessors for encoded words.
pub trait InstructionBits {
    /// Opcode field.
    fn opcode(&self) -> u32;
    /// Destination register (also the data register of stores).
    fn rd(&self) -> usize;
    /// First source register.
    fn rs1(&self) -> usize;
    /// Second source register.
    fn rs2(&self) -> usize;
    /// Immediate, zero-extended.
    fn imm(&self) -> u64;
    /// Immediate, sign-extended.
    fn simm(&self) -> i64;
}

impl InstructionBits for u32 {
    #[inline]
    fn opcode(&self) -> u32 {
        self >> OPCODE_SHIFT
    }

    #[inline]
    fn rd(&self) -> usize {
        ((self >> RD_SHIFT) & REG_MASK) as usize
    }

    #[inline]
    fn rs1(&self) -> usize {
        ((self >> RS1_SHIFT) & REG_MASK) as usize
    }

    #[inline]
    fn rs2(&self) -> usize {
        ((self >> RS2_SHIFT) & REG_MASK) as usize
    }

    #[inline]
    fn imm(&self) -> u64 {
        (self & IMM_MASK) as u64
    }

    #[inline]
    fn simm(&self) -> i64 {
        (self & IMM_MASK) as u16 as i16 as i64
    }
}

/// Operation codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// No operation.
    Nop = 0,
    /// `rd = rs1 + rs2`
    Add,
    /// `rd = rs1 - rs2`
    Sub,
    /// `rd = rs1 & rs2`
    And,
    /// `rd = rs1 | rs2`
    Or,
    /// `rd = rs1 ^ rs2`
    Xor,
    /// `rd = (rs1 < rs2)` signed
    Slt,
    /// `rd = rs1 + simm`
    Addi,
    /// `rd = rs1 | imm`
    Ori,
    /// `rd = imm << 16`
    Lui,
    /// `rd = rs1 * rs2`
    Mul,
    /// `rd = rs1 / rs2` signed, all ones on divide by zero
    Div,
    /// `flag = (rs1 < rs2)` signed
    Cmp,
    /// `fd = fs1 + fs2`
    Fadd,
    /// `fd = fs1 * fs2`
    Fmul,
    /// `fd = fs1 / fs2`
    Fdiv,
    /// `fd = rs1 as f64`
    Fcvt,
    /// `rd = mem[rs1 + simm]`
    Ld,
    /// `mem[rs1 + simm] = rd`
    St,
    /// `fd = mem[rs1 + simm]`
    Fld,
    /// `mem[rs1 + simm] = fd`
    Fst,
    /// Branch if `rs1 == 0`.
    Beqz,
    /// Branch if `rs1 != 0`.
    Bnez,
    /// Branch if the flag register is set.
    Bf,
    /// Unconditional pc-relative jump.
    J,
    /// Jump and write the return address to the link register.
    Call,
    /// Jump to the link register.
    Ret,
    /// Stop the thread.
    Halt,
}

impl Opcode {
    const ALL: [Self; 28] = [
        Self::Nop,
        Self::Add,
        Self::Sub,
        Self::And,
        Self::Or,
        Self::Xor,
        Self::Slt,
        Self::Addi,
        Self::Ori,
        Self::Lui,
        Self::Mul,
        Self::Div,
        Self::Cmp,
        Self::Fadd,
        Self::Fmul,
        Self::Fdiv,
        Self::Fcvt,
        Self::Ld,
        Self::St,
        Self::Fld,
        Self::Fst,
        Self::Beqz,
        Self::Bnez,
        Self::Bf,
        Self::J,
        Self::Call,
        Self::Ret,
        Self::Halt,
    ];

    /// Looks up an opcode field value.
    pub fn from_bits(bits: u32) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }

    /// Assembly mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Slt => "slt",
            Self::Addi => "addi",
            Self::Ori => "ori",
            Self::Lui => "lui",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Cmp => "cmp",
            Self::Fadd => "fadd",
            Self::Fmul => "fmul",
            Self::Fdiv => "fdiv",
            Self::Fcvt => "fcvt",
            Self::Ld => "ld",
            Self::St => "st",
            Self::Fld => "fld",
            Self::Fst => "fst",
            Self::Beqz => "beqz",
            Self::Bnez => "bnez",
            Self::Bf => "bf",
            Self::J => "j",
            Self::Call => "call",
            Self::Ret => "ret",
            Self::Halt => "halt",
        }
    }

    /// Parses a mnemonic.
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.mnemonic() == name)
    }
}

/// Encodes an immediate-form instruction.
pub const fn encode(op: Opcode, rd: usize, rs1: usize, imm: u32) -> u32 {
    ((op as u32) << OPCODE_SHIFT)
        | ((rd as u32 & REG_MASK) << RD_SHIFT)
        | ((rs1 as u32 & REG_MASK) << RS1_SHIFT)
        | (imm & IMM_MASK)
}

/// Encodes a register-register instruction.
pub const fn encode_r(op: Opcode, rd: usize, rs1: usize, rs2: usize) -> u32 {
    encode(op, rd, rs1, (rs2 as u32 & REG_MASK) << RS2_SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_roundtrip_through_encoding() {
        let word = encode_r(Opcode::Sub, 3, 17, 30);
        assert_eq!(Opcode::from_bits(word.opcode()), Some(Opcode::Sub));
        assert_eq!((word.rd(), word.rs1(), word.rs2()), (3, 17, 30));
    }

    #[test]
    fn test_immediate_sign_extension() {
        let word = encode(Opcode::Addi, 1, 2, (-8i32) as u32);
        assert_eq!(word.simm(), -8);
        assert_eq!(word.imm(), 0xFFF8);
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(Opcode::from_bits(63), None);
        assert_eq!(Opcode::from_mnemonic("halt"), Some(Opcode::Halt));
    }
}
