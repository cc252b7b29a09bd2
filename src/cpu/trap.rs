//! Built-in trap routines.
//!
//! The LC-3 reaches its I/O routines through `TRAP x20`..`TRAP x25`. Rather
//! than running an operating system image, the VM implements them directly
//! against the [`Console`].

use log::info;
use serde::{Serialize, Deserialize};

use crate::cpu::execute::{Cpu, CpuError, CpuState};
use crate::cpu::memory::MEMORY_SIZE;
use crate::cpu::registers::Reg;
use crate::io::Console;

/// Prompt written by the IN routine.
pub const IN_PROMPT: &str = "Enter a character: ";

/// Notice written by the HALT routine.
pub const HALT_NOTICE: &str = "HALT\n";

/// The defined trap vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrapCode {
    /// Read a character, no echo
    Getc = 0x20,
    /// Write a character
    Out = 0x21,
    /// Write a one-character-per-word string
    Puts = 0x22,
    /// Prompt, read and echo a character
    In = 0x23,
    /// Write a two-characters-per-word string
    Putsp = 0x24,
    /// Stop the machine
    Halt = 0x25,
}

impl TrapCode {
    pub fn from_vector(vector: u8) -> Option<Self> {
        match vector {
            0x20 => Some(TrapCode::Getc),
            0x21 => Some(TrapCode::Out),
            0x22 => Some(TrapCode::Puts),
            0x23 => Some(TrapCode::In),
            0x24 => Some(TrapCode::Putsp),
            0x25 => Some(TrapCode::Halt),
            _ => None,
        }
    }

    /// Assembler mnemonic.
    pub fn name(self) -> &'static str {
        match self {
            TrapCode::Getc => "GETC",
            TrapCode::Out => "OUT",
            TrapCode::Puts => "PUTS",
            TrapCode::In => "IN",
            TrapCode::Putsp => "PUTSP",
            TrapCode::Halt => "HALT",
        }
    }
}

impl Cpu {
    /// Run the trap routine for `vector`. `pc` is the address of the TRAP
    /// instruction, used for error reporting.
    pub(crate) fn trap<C: Console + ?Sized>(
        &mut self,
        vector: u8,
        pc: u16,
        console: &mut C,
    ) -> Result<(), CpuError> {
        let code = TrapCode::from_vector(vector)
            .ok_or(CpuError::UnknownTrap { vector, pc })?;

        match code {
            TrapCode::Getc => {
                let ch = console.read_char()?;
                self.regs.set_with_flags(Reg::R0, ch as u16);
            }

            TrapCode::Out => {
                console.write_char(self.regs.get(Reg::R0) as u8)?;
                console.flush()?;
            }

            TrapCode::Puts => {
                for word in self.string_at(self.regs.get(Reg::R0)) {
                    console.write_char(word as u8)?;
                }
                console.flush()?;
            }

            TrapCode::In => {
                console.write_str(IN_PROMPT)?;
                console.flush()?;
                let ch = console.read_char()?;
                console.write_char(ch)?;
                console.flush()?;
                self.regs.set_with_flags(Reg::R0, ch as u16);
            }

            TrapCode::Putsp => {
                for word in self.string_at(self.regs.get(Reg::R0)) {
                    console.write_char(word as u8)?;
                    let high = (word >> 8) as u8;
                    if high != 0 {
                        console.write_char(high)?;
                    }
                }
                console.flush()?;
            }

            TrapCode::Halt => {
                console.write_str(HALT_NOTICE)?;
                console.flush()?;
                self.state = CpuState::Halted;
                info!("halted at x{pc:04X} after {} instructions", self.steps + 1);
            }
        }

        Ok(())
    }

    /// Words of a zero-terminated string starting at `start`, terminator
    /// excluded. Wraps at the top of memory and visits each address at most
    /// once.
    fn string_at(&self, start: u16) -> impl Iterator<Item = u16> + '_ {
        (0..MEMORY_SIZE)
            .map(move |i| self.mem.peek(start.wrapping_add(i as u16)))
            .take_while(|&word| word != 0)
    }
}
