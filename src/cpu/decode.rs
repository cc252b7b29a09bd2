//! Instruction decoder for the LC-3.
//!
//! Every instruction is one 16-bit word. The top nibble selects one of 16
//! opcodes; the low 12 bits are opcode-specific fields.

use serde::{Serialize, Deserialize};

use crate::cpu::registers::Reg;

/// The 16 LC-3 opcodes, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    Br = 0x0,
    Add = 0x1,
    Ld = 0x2,
    St = 0x3,
    Jsr = 0x4,
    And = 0x5,
    Ldr = 0x6,
    Str = 0x7,
    Rti = 0x8,
    Not = 0x9,
    Ldi = 0xA,
    Sti = 0xB,
    Jmp = 0xC,
    Res = 0xD,
    Lea = 0xE,
    Trap = 0xF,
}

impl Opcode {
    /// Indexed by the top nibble of an instruction.
    const TABLE: [Opcode; 16] = [
        Opcode::Br, Opcode::Add, Opcode::Ld, Opcode::St,
        Opcode::Jsr, Opcode::And, Opcode::Ldr, Opcode::Str,
        Opcode::Rti, Opcode::Not, Opcode::Ldi, Opcode::Sti,
        Opcode::Jmp, Opcode::Res, Opcode::Lea, Opcode::Trap,
    ];

    /// The opcode of an instruction word.
    #[inline]
    pub fn from_word(word: u16) -> Self {
        Self::TABLE[(word >> 12) as usize]
    }

    /// The opcode in the top nibble of an otherwise empty word.
    #[inline]
    const fn bits(self) -> u16 {
        (self as u16) << 12
    }
}

/// Second operand of ADD and AND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// Register mode (bit 5 clear): SR2 in bits 2:0
    Reg(Reg),
    /// Immediate mode (bit 5 set): imm5, already sign-extended
    Imm(u16),
}

/// Decoded LC-3 instruction.
///
/// PC-relative offsets and immediates are stored sign-extended to 16 bits,
/// ready for wrapping addition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    // ==================== Operate ====================

    /// DR := SR1 + operand
    Add { dst: Reg, src: Reg, operand: Operand },

    /// DR := SR1 & operand
    And { dst: Reg, src: Reg, operand: Operand },

    /// DR := !SR
    Not { dst: Reg, src: Reg },

    // ==================== Data Movement ====================

    /// DR := mem[PC + offset9]
    Ld { dst: Reg, offset: u16 },

    /// DR := mem[mem[PC + offset9]]
    Ldi { dst: Reg, offset: u16 },

    /// DR := mem[BaseR + offset6]
    Ldr { dst: Reg, base: Reg, offset: u16 },

    /// DR := PC + offset9
    Lea { dst: Reg, offset: u16 },

    /// mem[PC + offset9] := SR
    St { src: Reg, offset: u16 },

    /// mem[mem[PC + offset9]] := SR
    Sti { src: Reg, offset: u16 },

    /// mem[BaseR + offset6] := SR
    Str { src: Reg, base: Reg, offset: u16 },

    // ==================== Control ====================

    /// if (nzp & COND) != 0 then PC := PC + offset9
    Br { nzp: u16, offset: u16 },

    /// PC := BaseR (RET when BaseR is R7)
    Jmp { base: Reg },

    /// R7 := PC; PC := PC + offset11
    Jsr { offset: u16 },

    /// R7 := PC; PC := BaseR
    Jsrr { base: Reg },

    /// R7 := PC; run trap routine
    Trap { vector: u8 },

    // ==================== Illegal ====================

    /// Return from interrupt. Not supported.
    Rti,

    /// Reserved opcode.
    Res,
}

/// Sign-extend the low `bit_count` bits of `value` to 16 bits.
///
/// Bit `bit_count - 1` is the sign bit of the field. Bits above the field
/// are ignored. `bit_count` must be in `1..=16`.
#[inline]
pub fn sign_extend(value: u16, bit_count: u32) -> u16 {
    debug_assert!((1..=16).contains(&bit_count), "bad field width {bit_count}");
    if bit_count >= 16 {
        return value;
    }
    let field = value & ((1 << bit_count) - 1);
    if (field >> (bit_count - 1)) & 1 != 0 {
        field | (0xFFFF << bit_count)
    } else {
        field
    }
}

// Field extraction

#[inline]
fn reg_at(word: u16, shift: u32) -> Reg {
    Reg::from_field(word >> shift)
}

#[inline]
fn offset6(word: u16) -> u16 {
    sign_extend(word, 6)
}

#[inline]
fn offset9(word: u16) -> u16 {
    sign_extend(word, 9)
}

#[inline]
fn offset11(word: u16) -> u16 {
    sign_extend(word, 11)
}

fn operand(word: u16) -> Operand {
    if word & (1 << 5) != 0 {
        Operand::Imm(sign_extend(word, 5))
    } else {
        Operand::Reg(reg_at(word, 0))
    }
}

/// Decode an instruction word.
///
/// Decoding never fails: all 16 opcodes have a variant, and field
/// combinations are not validated here.
pub fn decode(word: u16) -> Instruction {
    match Opcode::from_word(word) {
        Opcode::Br => Instruction::Br { nzp: (word >> 9) & 0x7, offset: offset9(word) },
        Opcode::Add => Instruction::Add {
            dst: reg_at(word, 9),
            src: reg_at(word, 6),
            operand: operand(word),
        },
        Opcode::Ld => Instruction::Ld { dst: reg_at(word, 9), offset: offset9(word) },
        Opcode::St => Instruction::St { src: reg_at(word, 9), offset: offset9(word) },
        Opcode::Jsr => {
            if word & (1 << 11) != 0 {
                Instruction::Jsr { offset: offset11(word) }
            } else {
                Instruction::Jsrr { base: reg_at(word, 6) }
            }
        }
        Opcode::And => Instruction::And {
            dst: reg_at(word, 9),
            src: reg_at(word, 6),
            operand: operand(word),
        },
        Opcode::Ldr => Instruction::Ldr {
            dst: reg_at(word, 9),
            base: reg_at(word, 6),
            offset: offset6(word),
        },
        Opcode::Str => Instruction::Str {
            src: reg_at(word, 9),
            base: reg_at(word, 6),
            offset: offset6(word),
        },
        Opcode::Rti => Instruction::Rti,
        Opcode::Not => Instruction::Not { dst: reg_at(word, 9), src: reg_at(word, 6) },
        Opcode::Ldi => Instruction::Ldi { dst: reg_at(word, 9), offset: offset9(word) },
        Opcode::Sti => Instruction::Sti { src: reg_at(word, 9), offset: offset9(word) },
        Opcode::Jmp => Instruction::Jmp { base: reg_at(word, 6) },
        Opcode::Res => Instruction::Res,
        Opcode::Lea => Instruction::Lea { dst: reg_at(word, 9), offset: offset9(word) },
        Opcode::Trap => Instruction::Trap { vector: (word & 0xFF) as u8 },
    }
}

/// Encode an instruction back to a word.
///
/// Offsets and immediates are truncated to their field width.
pub fn encode(instr: &Instruction) -> u16 {
    fn r(reg: Reg, shift: u32) -> u16 {
        (reg.index() as u16) << shift
    }

    fn operate(op: Opcode, dst: Reg, src: Reg, operand: Operand) -> u16 {
        let low = match operand {
            Operand::Reg(src2) => r(src2, 0),
            Operand::Imm(imm) => (1 << 5) | (imm & 0x1F),
        };
        op.bits() | r(dst, 9) | r(src, 6) | low
    }

    match *instr {
        Instruction::Add { dst, src, operand } => operate(Opcode::Add, dst, src, operand),
        Instruction::And { dst, src, operand } => operate(Opcode::And, dst, src, operand),
        Instruction::Not { dst, src } => Opcode::Not.bits() | r(dst, 9) | r(src, 6) | 0x3F,
        Instruction::Ld { dst, offset } => Opcode::Ld.bits() | r(dst, 9) | (offset & 0x1FF),
        Instruction::Ldi { dst, offset } => Opcode::Ldi.bits() | r(dst, 9) | (offset & 0x1FF),
        Instruction::Ldr { dst, base, offset } => {
            Opcode::Ldr.bits() | r(dst, 9) | r(base, 6) | (offset & 0x3F)
        }
        Instruction::Lea { dst, offset } => Opcode::Lea.bits() | r(dst, 9) | (offset & 0x1FF),
        Instruction::St { src, offset } => Opcode::St.bits() | r(src, 9) | (offset & 0x1FF),
        Instruction::Sti { src, offset } => Opcode::Sti.bits() | r(src, 9) | (offset & 0x1FF),
        Instruction::Str { src, base, offset } => {
            Opcode::Str.bits() | r(src, 9) | r(base, 6) | (offset & 0x3F)
        }
        Instruction::Br { nzp, offset } => Opcode::Br.bits() | ((nzp & 0x7) << 9) | (offset & 0x1FF),
        Instruction::Jmp { base } => Opcode::Jmp.bits() | r(base, 6),
        Instruction::Jsr { offset } => Opcode::Jsr.bits() | (1 << 11) | (offset & 0x7FF),
        Instruction::Jsrr { base } => Opcode::Jsr.bits() | r(base, 6),
        Instruction::Trap { vector } => Opcode::Trap.bits() | vector as u16,
        Instruction::Rti => Opcode::Rti.bits(),
        Instruction::Res => Opcode::Res.bits(),
    }
}
