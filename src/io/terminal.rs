//! Raw-mode terminal console.
//!
//! Raw mode turns off line buffering and echo so programs see every key as
//! it is pressed. It also turns off signal generation, so Ctrl-C arrives as
//! an ordinary key event and is reported as [`ConsoleError::Interrupted`].
//! The terminal is restored when the [`RawModeGuard`] is dropped.

use std::collections::VecDeque;
use std::io::{stdout, Stdout, Write};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use log::{debug, error};

use super::{Console, ConsoleError};

/// Holds the terminal in raw mode for as long as it is alive.
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    pub fn acquire() -> std::io::Result<Self> {
        terminal::enable_raw_mode()?;
        debug!("terminal: raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        match terminal::disable_raw_mode() {
            Ok(()) => debug!("terminal: raw mode restored"),
            Err(e) => error!("terminal: failed to restore mode: {e}"),
        }
    }
}

/// Console attached to the controlling terminal.
pub struct TerminalConsole {
    // Keys seen while polling for interrupts, not yet read by the program.
    pending: VecDeque<u8>,
    poll_timeout: Duration,
    out: Stdout,
    _guard: RawModeGuard,
}

impl TerminalConsole {
    /// Enter raw mode. `poll_timeout` bounds how long a keyboard status read
    /// waits for a key.
    pub fn new(poll_timeout: Duration) -> std::io::Result<Self> {
        let guard = RawModeGuard::acquire()?;
        Ok(Self {
            pending: VecDeque::new(),
            poll_timeout,
            out: stdout(),
            _guard: guard,
        })
    }

    /// Read one terminal event, buffering it if it produces a character.
    fn take_event(&mut self) -> Result<(), ConsoleError> {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Release {
                return Ok(());
            }
            if is_interrupt(&key) {
                return Err(ConsoleError::Interrupted);
            }
            if let Some(byte) = key_to_byte(&key) {
                self.pending.push_back(byte);
            }
        }
        Ok(())
    }
}

impl Console for TerminalConsole {
    fn key_available(&mut self) -> Result<bool, ConsoleError> {
        if self.pending.is_empty() && event::poll(self.poll_timeout)? {
            self.take_event()?;
        }
        Ok(!self.pending.is_empty())
    }

    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        loop {
            if let Some(byte) = self.pending.pop_front() {
                return Ok(byte);
            }
            self.take_event()?;
        }
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        // Raw mode disables output post-processing.
        if byte == b'\n' {
            self.out.write_all(b"\r\n")?;
        } else {
            self.out.write_all(&[byte])?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ConsoleError> {
        self.out.flush()?;
        Ok(())
    }

    fn poll_interrupt(&mut self) -> Result<(), ConsoleError> {
        while event::poll(Duration::ZERO)? {
            self.take_event()?;
        }
        Ok(())
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Translate a key press into the byte an LC-3 program expects.
fn key_to_byte(key: &KeyEvent) -> Option<u8> {
    match key.code {
        KeyCode::Char(c) if key.modifiers.contains(KeyModifiers::CONTROL) => {
            c.is_ascii_alphabetic()
                .then(|| c.to_ascii_lowercase() as u8 & 0x1f)
        }
        KeyCode::Char(c) if c.is_ascii() => Some(c as u8),
        KeyCode::Enter => Some(b'\n'),
        KeyCode::Backspace => Some(0x08),
        KeyCode::Tab => Some(b'\t'),
        KeyCode::Esc => Some(0x1b),
        _ => None,
    }
}
