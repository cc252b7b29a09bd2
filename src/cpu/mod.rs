//! CPU emulation for the LC-3.
//!
//! This module implements the complete LC-3 architecture:
//! - 65536 sixteen-bit memory words with a memory-mapped keyboard
//! - 8 general registers, PC and an N/Z/P condition code
//! - 16 opcodes, of which RTI and the reserved opcode are fatal
//! - Trap routines for character I/O

pub mod memory;
pub mod registers;
pub mod decode;
pub mod execute;
pub mod trap;

pub use memory::{Memory, MemoryError};
pub use registers::{Condition, Reg, Registers, PC_START};
pub use decode::{Instruction, Opcode, Operand};
pub use execute::{Cpu, CpuError, CpuState, RunReport};
pub use trap::TrapCode;
