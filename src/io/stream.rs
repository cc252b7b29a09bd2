//! Console over an arbitrary reader and writer.
//!
//! Intended for input that is already in memory, such as the byte slices the
//! test suite feeds in. Pipes go through [`PipeConsole`](super::PipeConsole)
//! instead, which bounds how long a status read can wait.

use std::io::{BufRead, Write};

use super::{Console, ConsoleError};

/// A [`Console`] backed by any buffered reader and writer.
#[derive(Debug)]
pub struct StreamConsole<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Borrow the output sink.
    pub fn output(&self) -> &W {
        &self.output
    }

    /// Consume the console, returning the output sink.
    pub fn into_output(self) -> W {
        self.output
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    /// True while the reader still has data. Does not wait beyond what the
    /// reader's own `fill_buf` does.
    fn key_available(&mut self) -> Result<bool, ConsoleError> {
        Ok(!self.input.fill_buf()?.is_empty())
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        let byte = match self.input.fill_buf()?.first() {
            Some(&byte) => byte,
            None => return Err(ConsoleError::EndOfInput),
        };
        self.input.consume(1);
        Ok(byte)
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        self.output.write_all(&[byte])?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.output.flush()?;
        Ok(())
    }
}
