//! Character I/O capabilities consumed by the machine.
//!
//! The CPU never touches stdin/stdout directly. Everything goes through a
//! [`Console`], so the same machine can drive a raw-mode terminal, a pipe,
//! or an in-memory buffer in tests.

pub mod pipe;
pub mod stream;
#[cfg(feature = "terminal")]
pub mod terminal;

pub use pipe::PipeConsole;
pub use stream::StreamConsole;
#[cfg(feature = "terminal")]
pub use terminal::{RawModeGuard, TerminalConsole};

use thiserror::Error;

/// Keyboard input and character output for a running program.
pub trait Console {
    /// Poll whether a key is ready. May block for a bounded interval.
    fn key_available(&mut self) -> Result<bool, ConsoleError>;

    /// Read a single character without echoing it.
    fn read_char(&mut self) -> Result<u8, ConsoleError>;

    /// Write a single character.
    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError>;

    /// Flush buffered output.
    fn flush(&mut self) -> Result<(), ConsoleError>;

    /// Report an externally requested interrupt as [`ConsoleError::Interrupted`].
    ///
    /// Called periodically by the run loop. Consoles without an interrupt
    /// source keep the default.
    fn poll_interrupt(&mut self) -> Result<(), ConsoleError> {
        Ok(())
    }

    /// Write every byte of `s`.
    fn write_str(&mut self, s: &str) -> Result<(), ConsoleError> {
        for byte in s.bytes() {
            self.write_char(byte)?;
        }
        Ok(())
    }
}

/// Errors raised by a console.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsoleError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("end of input")]
    EndOfInput,

    #[error("interrupted")]
    Interrupted,
}

impl From<std::io::Error> for ConsoleError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => ConsoleError::EndOfInput,
            _ => ConsoleError::Io(e.to_string()),
        }
    }
}
