//! Program images and their disassembly.
//!
//! This module provides:
//! - The LC-3 object image format (origin word followed by program words)
//! - A disassembler (image → readable text)

pub mod disasm;
pub mod loader;

pub use disasm::{disassemble, disassemble_word};
pub use loader::{Image, ImageError};
