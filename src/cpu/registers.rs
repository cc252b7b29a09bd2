//! LC-3 register file.
//!
//! The LC-3 has 10 registers:
//! - R0..R7: 16-bit general purpose registers (R7 holds return addresses)
//! - PC: program counter
//! - COND: condition code, exactly one of N, Z, P

use std::fmt;
use serde::{Serialize, Deserialize};

/// Program counter value at machine start.
pub const PC_START: u16 = 0x3000;

/// A general purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reg {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
}

impl Reg {
    /// All general registers in index order.
    pub const ALL: [Reg; 8] = [
        Reg::R0, Reg::R1, Reg::R2, Reg::R3,
        Reg::R4, Reg::R5, Reg::R6, Reg::R7,
    ];

    /// Build a register from a 3-bit instruction field. Higher bits are ignored.
    #[inline]
    pub fn from_field(bits: u16) -> Self {
        Self::ALL[(bits & 0x7) as usize]
    }

    /// Register number 0-7.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.index())
    }
}

/// Condition code.
///
/// The sign of the last result written to a register. Holds exactly one
/// flag at all times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Result had bit 15 set (n)
    Negative,
    /// Result was zero (z)
    Zero,
    /// Result was positive (p)
    Positive,
}

impl Condition {
    pub const N: u16 = 0b100;
    pub const Z: u16 = 0b010;
    pub const P: u16 = 0b001;

    /// Classify a word by its two's-complement sign.
    pub fn of(value: u16) -> Self {
        if value == 0 {
            Condition::Zero
        } else if value & 0x8000 != 0 {
            Condition::Negative
        } else {
            Condition::Positive
        }
    }

    /// The nzp bit pattern stored in the COND register.
    pub const fn bits(self) -> u16 {
        match self {
            Condition::Negative => Self::N,
            Condition::Zero => Self::Z,
            Condition::Positive => Self::P,
        }
    }
}

/// The LC-3 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    gpr: [u16; 8],

    /// Program counter
    pub pc: u16,

    cond: Condition,
}

impl Registers {
    /// Create a register file with zeroed registers, PC at [`PC_START`] and
    /// condition Z.
    pub fn new() -> Self {
        Self {
            gpr: [0; 8],
            pc: PC_START,
            cond: Condition::Zero,
        }
    }

    #[inline]
    pub fn get(&self, reg: Reg) -> u16 {
        self.gpr[reg.index()]
    }

    #[inline]
    pub fn set(&mut self, reg: Reg, value: u16) {
        self.gpr[reg.index()] = value;
    }

    /// Set the condition code from the current value of `reg`.
    pub fn update_flags(&mut self, reg: Reg) {
        self.cond = Condition::of(self.get(reg));
    }

    /// Write `value` to `reg` and update the condition code from it.
    pub fn set_with_flags(&mut self, reg: Reg, value: u16) {
        self.set(reg, value);
        self.update_flags(reg);
    }

    pub fn cond(&self) -> Condition {
        self.cond
    }

    /// Increment the program counter by one word, wrapping.
    /// Returns the old value.
    pub fn advance_pc(&mut self) -> u16 {
        let old = self.pc;
        self.pc = self.pc.wrapping_add(1);
        old
    }

    /// PC plus a sign-extended offset.
    pub fn pc_relative(&self, offset: u16) -> u16 {
        self.pc.wrapping_add(offset)
    }

    /// All general registers in index order.
    pub fn general(&self) -> [u16; 8] {
        self.gpr
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
