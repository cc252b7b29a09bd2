//! Console over a pipe or redirected file.
//!
//! A blocking reader cannot be polled with a deadline, so a helper thread
//! drains it into a channel. Keyboard status reads then wait at most the
//! poll timeout, however long the other end of the pipe stays silent.

use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::debug;

use super::{Console, ConsoleError};

type Chunk = Result<Vec<u8>, ConsoleError>;

/// A [`Console`] reading from a pipe on a background thread.
#[derive(Debug)]
pub struct PipeConsole<W> {
    input: Receiver<Chunk>,
    // Bytes received from the reader thread, not yet read by the program.
    pending: VecDeque<u8>,
    closed: bool,
    poll_timeout: Duration,
    output: W,
}

impl<W: Write> PipeConsole<W> {
    /// Start draining `input` on a new thread. `poll_timeout` bounds how
    /// long a keyboard status read waits for a byte.
    pub fn new<R>(input: R, output: W, poll_timeout: Duration) -> std::io::Result<Self>
    where
        R: Read + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("lc3-input".into())
            .spawn(move || pump(input, tx))?;

        Ok(Self {
            input: rx,
            pending: VecDeque::new(),
            closed: false,
            poll_timeout,
            output,
        })
    }

    /// Borrow the output sink.
    pub fn output(&self) -> &W {
        &self.output
    }

    fn receive(&mut self, chunk: Chunk) -> Result<(), ConsoleError> {
        self.pending.extend(chunk?);
        Ok(())
    }
}

/// Forward everything `input` produces until EOF or an error.
fn pump<R: Read>(mut input: R, tx: Sender<Chunk>) {
    let mut buf = [0u8; 256];
    loop {
        match input.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if tx.send(Ok(buf[..n].to_vec())).is_err() {
                    // Console dropped.
                    return;
                }
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.send(Err(e.into()));
                break;
            }
        }
    }
    debug!("pipe: input closed");
}

impl<W: Write> Console for PipeConsole<W> {
    fn key_available(&mut self) -> Result<bool, ConsoleError> {
        if self.pending.is_empty() && !self.closed {
            match self.input.recv_timeout(self.poll_timeout) {
                Ok(chunk) => self.receive(chunk)?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.closed = true,
            }
        }
        Ok(!self.pending.is_empty())
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(byte);
            }
            if self.closed {
                return Err(ConsoleError::EndOfInput);
            }
            match self.input.recv() {
                Ok(chunk) => self.receive(chunk)?,
                Err(_) => self.closed = true,
            }
        }
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
