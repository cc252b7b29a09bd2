//! CPU execution engine for the LC-3.
//!
//! Implements the fetch-decode-execute cycle and all instruction behaviors.

use log::{debug, warn};
use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::cpu::decode::{self, Instruction, Opcode, Operand};
use crate::cpu::memory::MemoryError;
use crate::cpu::registers::{Condition, Reg};
use crate::cpu::{Memory, Registers};
use crate::image::Image;
use crate::io::{Console, ConsoleError};

/// How many instructions `run` executes between interrupt polls.
const INTERRUPT_POLL_INTERVAL: u64 = 1024;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is running normally.
    Running,
    /// CPU has halted (executed TRAP HALT).
    Halted,
    /// CPU stopped on a fatal error.
    Faulted,
}

/// The LC-3 machine: registers, memory and run state.
#[derive(Clone)]
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far.
    pub steps: u64,
}

impl Cpu {
    /// Create a new CPU with zeroed memory and PC at x3000.
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            state: CpuState::Running,
            steps: 0,
        }
    }

    /// Reset the CPU to initial state.
    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.mem.clear();
        self.state = CpuState::Running;
        self.steps = 0;
    }

    /// Load an image into memory at its origin.
    pub fn load(&mut self, image: &Image) -> Result<(), MemoryError> {
        self.mem.load(image)?;
        debug!("loaded {} words at x{:04X}", image.words.len(), image.origin);
        Ok(())
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. Any error other than
    /// [`CpuError::NotRunning`] leaves the CPU in [`CpuState::Faulted`].
    pub fn step<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        match self.cycle(console) {
            Ok(instr) => {
                self.steps += 1;
                Ok(instr)
            }
            Err(e) => Err(self.fault(e)),
        }
    }

    /// Run until halt or error.
    ///
    /// Returns the number of instructions executed.
    pub fn run<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<u64, CpuError> {
        self.run_while(console, |_| true)
    }

    /// Run for at most `max_steps` instructions.
    pub fn run_limited<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        max_steps: u64,
    ) -> Result<u64, CpuError> {
        let limit = self.steps.saturating_add(max_steps);
        self.run_while(console, |cpu| cpu.steps < limit)
    }

    fn run_while<C: Console + ?Sized>(
        &mut self,
        console: &mut C,
        mut keep_going: impl FnMut(&Cpu) -> bool,
    ) -> Result<u64, CpuError> {
        let start_steps = self.steps;

        while self.state == CpuState::Running && keep_going(self) {
            if (self.steps - start_steps) % INTERRUPT_POLL_INTERVAL == 0 {
                if let Err(e) = console.poll_interrupt() {
                    return Err(self.fault(e.into()));
                }
            }
            self.step(console)?;
        }

        Ok(self.steps - start_steps)
    }

    /// Fetch, advance PC, decode, execute.
    fn cycle<C: Console + ?Sized>(&mut self, console: &mut C) -> Result<Instruction, CpuError> {
        let pc = self.regs.pc;
        let word = self.mem.read(pc, console)?;
        self.regs.advance_pc();

        let instr = decode::decode(word);
        self.execute(instr, pc, console)?;
        Ok(instr)
    }

    fn fault(&mut self, e: CpuError) -> CpuError {
        warn!("cpu fault after {} instructions: {e}", self.steps);
        self.state = CpuState::Faulted;
        e
    }

    /// Execute a decoded instruction. `pc` is the address it was fetched
    /// from; `self.regs.pc` already points past it.
    fn execute<C: Console + ?Sized>(
        &mut self,
        instr: Instruction,
        pc: u16,
        console: &mut C,
    ) -> Result<(), CpuError> {
        match instr {
            // ==================== Operate ====================

            Instruction::Add { dst, src, operand } => {
                let result = self.regs.get(src).wrapping_add(self.operand(operand));
                self.regs.set_with_flags(dst, result);
            }

            Instruction::And { dst, src, operand } => {
                let result = self.regs.get(src) & self.operand(operand);
                self.regs.set_with_flags(dst, result);
            }

            Instruction::Not { dst, src } => {
                let result = !self.regs.get(src);
                self.regs.set_with_flags(dst, result);
            }

            // ==================== Data Movement ====================

            Instruction::Ld { dst, offset } => {
                let addr = self.regs.pc_relative(offset);
                let value = self.mem.read(addr, console)?;
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Ldi { dst, offset } => {
                let pointer = self.mem.read(self.regs.pc_relative(offset), console)?;
                let value = self.mem.read(pointer, console)?;
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Ldr { dst, base, offset } => {
                let addr = self.regs.get(base).wrapping_add(offset);
                let value = self.mem.read(addr, console)?;
                self.regs.set_with_flags(dst, value);
            }

            Instruction::Lea { dst, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.regs.set_with_flags(dst, addr);
            }

            Instruction::St { src, offset } => {
                let addr = self.regs.pc_relative(offset);
                self.mem.write(addr, self.regs.get(src));
            }

            Instruction::Sti { src, offset } => {
                let addr = self.mem.read(self.regs.pc_relative(offset), console)?;
                self.mem.write(addr, self.regs.get(src));
            }

            Instruction::Str { src, base, offset } => {
                let addr = self.regs.get(base).wrapping_add(offset);
                self.mem.write(addr, self.regs.get(src));
            }

            // ==================== Control ====================

            Instruction::Br { nzp, offset } => {
                if nzp & self.regs.cond().bits() != 0 {
                    self.regs.pc = self.regs.pc_relative(offset);
                }
            }

            Instruction::Jmp { base } => {
                self.regs.pc = self.regs.get(base);
            }

            Instruction::Jsr { offset } => {
                self.regs.set(Reg::R7, self.regs.pc);
                self.regs.pc = self.regs.pc_relative(offset);
            }

            Instruction::Jsrr { base } => {
                // Read the target first: JSRR R7 jumps to the old R7.
                let target = self.regs.get(base);
                self.regs.set(Reg::R7, self.regs.pc);
                self.regs.pc = target;
            }

            Instruction::Trap { vector } => {
                self.regs.set(Reg::R7, self.regs.pc);
                self.trap(vector, pc, console)?;
            }

            // ==================== Illegal ====================

            Instruction::Rti => {
                return Err(CpuError::IllegalOpcode { opcode: Opcode::Rti, pc });
            }

            Instruction::Res => {
                return Err(CpuError::IllegalOpcode { opcode: Opcode::Res, pc });
            }
        }

        Ok(())
    }

    fn operand(&self, operand: Operand) -> u16 {
        match operand {
            Operand::Reg(reg) => self.regs.get(reg),
            Operand::Imm(imm) => imm,
        }
    }

    /// Snapshot of the machine for reporting.
    pub fn report(&self) -> RunReport {
        RunReport {
            state: self.state,
            steps: self.steps,
            pc: self.regs.pc,
            registers: self.regs.general(),
            cond: self.regs.cond(),
        }
    }

    /// Check if the CPU is halted.
    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    /// Check if the CPU is running.
    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("steps", &self.steps)
            .field("regs", &self.regs)
            .finish()
    }
}

/// Final machine state, printed by `--report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub state: CpuState,
    pub steps: u64,
    pub pc: u16,
    pub registers: [u16; 8],
    pub cond: Condition,
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("CPU not running: {0:?}")]
    NotRunning(CpuState),

    #[error("illegal opcode {opcode:?} at x{pc:04X}")]
    IllegalOpcode { opcode: Opcode, pc: u16 },

    #[error("unknown trap vector x{vector:02X} at x{pc:04X}")]
    UnknownTrap { vector: u8, pc: u16 },

    #[error("console error: {0}")]
    Console(#[from] ConsoleError),
}
