//! # LC-3 Virtual Machine
//!
//! A virtual machine for the LC-3, the 16-bit educational computer from
//! Patt and Patel's *Introduction to Computing Systems*.
//!
//! The machine executes object images directly. The operating system trap
//! routines for character I/O are built in, and all device access goes
//! through a [`Console`], so the same machine runs against a raw-mode
//! terminal or an in-memory buffer.

pub mod cpu;
pub mod image;
pub mod io;

// Re-export commonly used types
pub use cpu::{Cpu, CpuError, CpuState, Instruction, Memory, Registers, RunReport};
pub use image::{disassemble, Image, ImageError};
pub use io::{Console, ConsoleError, PipeConsole, StreamConsole};

#[cfg(feature = "terminal")]
pub use io::TerminalConsole;
