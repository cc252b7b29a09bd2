//! Disassembler for LC-3 images.
//!
//! Converts program words back to readable assembly.

use std::fmt;

use crate::cpu::decode::{decode, Instruction, Operand};
use crate::cpu::registers::{Condition, Reg};
use crate::cpu::trap::TrapCode;
use super::Image;

/// Disassemble a single word.
pub fn disassemble_word(word: u16) -> String {
    decode(word).to_string()
}

/// Disassemble every word of an image, one line per word.
///
/// PC-relative operands are annotated with the address they resolve to.
pub fn disassemble(image: &Image) -> String {
    let mut output = String::new();
    output.push_str(&format!("; LC-3 Disassembly, origin x{:04X}\n", image.origin));
    output.push_str("; ------------------------------\n");

    for (addr, word) in image.iter() {
        let instr = decode(word);
        match target(addr, &instr) {
            Some(target) => {
                output.push_str(&format!("x{addr:04X}: {word:04X}  {instr}  ; x{target:04X}\n"))
            }
            None => output.push_str(&format!("x{addr:04X}: {word:04X}  {instr}\n")),
        }
    }

    output
}

/// The address a PC-relative instruction at `addr` refers to.
fn target(addr: u16, instr: &Instruction) -> Option<u16> {
    let next = addr.wrapping_add(1);
    match *instr {
        Instruction::Br { nzp, offset } if nzp != 0 => Some(next.wrapping_add(offset)),
        Instruction::Ld { offset, .. }
        | Instruction::Ldi { offset, .. }
        | Instruction::Lea { offset, .. }
        | Instruction::St { offset, .. }
        | Instruction::Sti { offset, .. }
        | Instruction::Jsr { offset } => Some(next.wrapping_add(offset)),
        _ => None,
    }
}

/// Offsets are stored sign-extended; show them signed.
struct Imm(u16);

impl fmt::Display for Imm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0 as i16)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::Reg(reg) => write!(f, "{reg}"),
            Operand::Imm(imm) => write!(f, "{}", Imm(imm)),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            // Operate
            Instruction::Add { dst, src, operand } => write!(f, "ADD {dst}, {src}, {operand}"),
            Instruction::And { dst, src, operand } => write!(f, "AND {dst}, {src}, {operand}"),
            Instruction::Not { dst, src } => write!(f, "NOT {dst}, {src}"),

            // Data movement
            Instruction::Ld { dst, offset } => write!(f, "LD {dst}, {}", Imm(offset)),
            Instruction::Ldi { dst, offset } => write!(f, "LDI {dst}, {}", Imm(offset)),
            Instruction::Ldr { dst, base, offset } => write!(f, "LDR {dst}, {base}, {}", Imm(offset)),
            Instruction::Lea { dst, offset } => write!(f, "LEA {dst}, {}", Imm(offset)),
            Instruction::St { src, offset } => write!(f, "ST {src}, {}", Imm(offset)),
            Instruction::Sti { src, offset } => write!(f, "STI {src}, {}", Imm(offset)),
            Instruction::Str { src, base, offset } => write!(f, "STR {src}, {base}, {}", Imm(offset)),

            // Control
            Instruction::Br { nzp: 0, .. } => write!(f, "NOP"),
            Instruction::Br { nzp, offset } => {
                f.write_str("BR")?;
                for (bit, flag) in [(Condition::N, 'n'), (Condition::Z, 'z'), (Condition::P, 'p')] {
                    if nzp & bit != 0 {
                        write!(f, "{flag}")?;
                    }
                }
                write!(f, " {}", Imm(offset))
            }
            Instruction::Jmp { base: Reg::R7 } => write!(f, "RET"),
            Instruction::Jmp { base } => write!(f, "JMP {base}"),
            Instruction::Jsr { offset } => write!(f, "JSR {}", Imm(offset)),
            Instruction::Jsrr { base } => write!(f, "JSRR {base}"),
            Instruction::Trap { vector } => match TrapCode::from_vector(vector) {
                Some(code) => f.write_str(code.name()),
                None => write!(f, "TRAP x{vector:02X}"),
            },

            // Illegal
            Instruction::Rti => write!(f, "RTI"),
            Instruction::Res => write!(f, "RES"),
        }
    }
}
