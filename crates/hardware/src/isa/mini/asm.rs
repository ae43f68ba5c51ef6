//! Assembler for the mini ISA.
//!
//! Source is line oriented. Comments start with `#` or `;`. A line may carry a
//! `label:` prefix. Operands are comma separated:
//!
//! ```text
//! loop:   ld    r3, 0(r2)       ; load
//!         addi  r2, r2, 8
//!         bnez  r3, loop
//!         halt
//! ```
//!
//! Pseudo-instructions: `li rd, imm` (`addi rd, r0, imm`) and `mov rd, rs`
//! (`addi rd, rs, 0`). The directive `.word value` emits a raw word.

use std::collections::HashMap;

use crate::common::constants::{CODE_BASE, INSTRUCTION_SIZE};
use crate::common::{SimError, SimResult};
use crate::mem::Memory;

use super::instruction::{Opcode, encode, encode_r};

/// Assembled code ready to be placed in guest memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    /// Address of the first word; also the entry point.
    pub base: u64,
    /// Encoded words in address order.
    pub words: Vec<u32>,
    /// Label addresses.
    pub labels: HashMap<String, u64>,
}

impl Program {
    /// Entry point.
    pub const fn entry(&self) -> u64 {
        self.base
    }

    /// Size of the code in bytes.
    pub fn size_bytes(&self) -> u64 {
        self.words.len() as u64 * INSTRUCTION_SIZE
    }

    /// Address of `label`, if defined.
    pub fn label(&self, label: &str) -> Option<u64> {
        self.labels.get(label).copied()
    }

    /// Maps the code region in `memory` and writes the words.
    pub fn load_into(&self, memory: &mut Memory) -> SimResult<()> {
        memory.map(self.base, self.size_bytes().max(INSTRUCTION_SIZE));
        for (i, word) in self.words.iter().enumerate() {
            memory.write_u32(self.base + i as u64 * INSTRUCTION_SIZE, *word)?;
        }
        Ok(())
    }
}

/// Assembles `source` at the default code base.
pub fn assemble(source: &str) -> SimResult<Program> {
    assemble_at(source, CODE_BASE)
}

struct Line<'a> {
    number: usize,
    mnemonic: &'a str,
    operands: Vec<&'a str>,
}

/// Assembles `source` so that its first word lands at `base`.
pub fn assemble_at(source: &str, base: u64) -> SimResult<Program> {
    let mut labels = HashMap::new();
    let mut lines = Vec::new();

    for (index, text) in source.lines().enumerate() {
        let number = index + 1;
        let mut rest = text.split(['#', ';']).next().unwrap_or("").trim();
        while let Some(colon) = rest.find(':') {
            let label = rest[..colon].trim();
            if label.is_empty() || !label.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(error(number, format!("bad label `{label}`")));
            }
            let addr = base + lines.len() as u64 * INSTRUCTION_SIZE;
            if labels.insert(label.to_string(), addr).is_some() {
                return Err(error(number, format!("duplicate label `{label}`")));
            }
            rest = rest[colon + 1..].trim();
        }
        if rest.is_empty() {
            continue;
        }
        let (mnemonic, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let operands = args
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        lines.push(Line {
            number,
            mnemonic,
            operands,
        });
    }

    let mut words = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let pc = base + i as u64 * INSTRUCTION_SIZE;
        let word = encode_line(line, pc, &labels).map_err(|message| error(line.number, message))?;
        words.push(word);
    }

    Ok(Program {
        base,
        words,
        labels,
    })
}

fn error(line: usize, message: String) -> SimError {
    SimError::Assembly { line, message }
}

fn encode_line(line: &Line<'_>, pc: u64, labels: &HashMap<String, u64>) -> Result<u32, String> {
    let ops = &line.operands;
    let expect = |n: usize| {
        if ops.len() == n {
            Ok(())
        } else {
            Err(format!("`{}` takes {n} operand(s), got {}", line.mnemonic, ops.len()))
        }
    };

    match line.mnemonic {
        ".word" => {
            expect(1)?;
            return Ok(parse_imm(ops[0])? as u32);
        }
        "li" => {
            expect(2)?;
            return Ok(encode(Opcode::Addi, reg(ops[0], 'r')?, 0, imm16(ops[1])?));
        }
        "mov" => {
            expect(2)?;
            return Ok(encode(Opcode::Addi, reg(ops[0], 'r')?, reg(ops[1], 'r')?, 0));
        }
        _ => {}
    }

    let op = Opcode::from_mnemonic(line.mnemonic)
        .ok_or_else(|| format!("unknown mnemonic `{}`", line.mnemonic))?;
    let word = match op {
        Opcode::Nop | Opcode::Ret | Opcode::Halt => {
            expect(0)?;
            encode(op, 0, 0, 0)
        }
        Opcode::Add
        | Opcode::Sub
        | Opcode::And
        | Opcode::Or
        | Opcode::Xor
        | Opcode::Slt
        | Opcode::Mul
        | Opcode::Div => {
            expect(3)?;
            encode_r(op, reg(ops[0], 'r')?, reg(ops[1], 'r')?, reg(ops[2], 'r')?)
        }
        Opcode::Fadd | Opcode::Fmul | Opcode::Fdiv => {
            expect(3)?;
            encode_r(op, reg(ops[0], 'f')?, reg(ops[1], 'f')?, reg(ops[2], 'f')?)
        }
        Opcode::Fcvt => {
            expect(2)?;
            encode(op, reg(ops[0], 'f')?, reg(ops[1], 'r')?, 0)
        }
        Opcode::Addi | Opcode::Ori => {
            expect(3)?;
            encode(op, reg(ops[0], 'r')?, reg(ops[1], 'r')?, imm16(ops[2])?)
        }
        Opcode::Lui => {
            expect(2)?;
            encode(op, reg(ops[0], 'r')?, 0, imm16(ops[1])?)
        }
        Opcode::Cmp => {
            expect(2)?;
            encode_r(op, 0, reg(ops[0], 'r')?, reg(ops[1], 'r')?)
        }
        Opcode::Ld | Opcode::St | Opcode::Fld | Opcode::Fst => {
            expect(2)?;
            let prefix = if matches!(op, Opcode::Fld | Opcode::Fst) { 'f' } else { 'r' };
            let (offset, base) = mem_operand(ops[1])?;
            encode(op, reg(ops[0], prefix)?, base, offset)
        }
        Opcode::Beqz | Opcode::Bnez => {
            expect(2)?;
            encode(op, 0, reg(ops[0], 'r')?, target(ops[1], pc, labels)?)
        }
        Opcode::Bf | Opcode::J | Opcode::Call => {
            expect(1)?;
            encode(op, 0, 0, target(ops[0], pc, labels)?)
        }
    };
    Ok(word)
}

fn reg(token: &str, prefix: char) -> Result<usize, String> {
    token
        .strip_prefix(prefix)
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n < 32)
        .ok_or_else(|| format!("expected {prefix}0..{prefix}31, got `{token}`"))
}

fn parse_imm(token: &str) -> Result<i64, String> {
    let (negative, digits) = token
        .strip_prefix('-')
        .map_or((false, token), |rest| (true, rest));
    let value = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    }
    .map_err(|_| format!("bad immediate `{token}`"))?;
    Ok(if negative { -value } else { value })
}

fn imm16(token: &str) -> Result<u32, String> {
    let value = parse_imm(token)?;
    if (-0x8000..=0xFFFF).contains(&value) {
        Ok(value as u32 & 0xFFFF)
    } else {
        Err(format!("immediate `{token}` does not fit in 16 bits"))
    }
}

fn mem_operand(token: &str) -> Result<(u32, usize), String> {
    let (offset, rest) = token
        .split_once('(')
        .ok_or_else(|| format!("expected offset(base), got `{token}`"))?;
    let base = rest
        .strip_suffix(')')
        .ok_or_else(|| format!("unclosed `(` in `{token}`"))?;
    let offset = if offset.trim().is_empty() {
        0
    } else {
        imm16(offset.trim())?
    };
    Ok((offset, reg(base.trim(), 'r')?))
}

fn target(token: &str, pc: u64, labels: &HashMap<String, u64>) -> Result<u32, String> {
    let words = match labels.get(token) {
        Some(&addr) => (addr as i64 - pc as i64) / INSTRUCTION_SIZE as i64,
        None => parse_imm(token).map_err(|_| format!("undefined label `{token}`"))?,
    };
    if (-0x8000..0x8000).contains(&words) {
        Ok(words as u32 & 0xFFFF)
    } else {
        Err(format!("branch to `{token}` is out of range"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::mini::instruction::InstructionBits;

    #[test]
    fn test_labels_resolve_relative_offsets() {
        let program = assemble("top: nop\n  j top\nend: halt").unwrap();
        assert_eq!(program.words.len(), 3);
        assert_eq!(program.label("end"), Some(CODE_BASE + 8));
        assert_eq!(program.words[1].simm(), -1);
    }

    #[test]
    fn test_forward_reference() {
        let program = assemble("beqz r1, done\nnop\ndone: halt").unwrap();
        assert_eq!(program.words[0].simm(), 2);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = assemble("nop\n\nfrob r1").unwrap_err();
        assert!(matches!(err, SimError::Assembly { line: 3, .. }));
        let err = assemble("add r1, r2").unwrap_err();
        assert!(matches!(err, SimError::Assembly { line: 1, .. }));
    }

    #[test]
    fn test_comments_and_memory_operands() {
        let program = assemble("ld r1, -16(r2) # trailing\n; whole line\nfst f3, (r4)").unwrap();
        assert_eq!(program.words.len(), 2);
        assert_eq!(program.words[0].simm(), -16);
        assert_eq!(program.words[1].rs1(), 4);
    }
}
