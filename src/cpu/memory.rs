//! LC-3 address space.
//!
//! 65536 sixteen-bit words. Two addresses are memory-mapped to the keyboard:
//! reading the status register polls the console and latches the next
//! character into the data register.

use thiserror::Error;

use crate::image::Image;
use crate::io::{Console, ConsoleError};

/// The number of words in the address space.
pub const MEMORY_SIZE: usize = 1 << 16;

/// Keyboard status register. Bit 15 is set when a character is ready.
pub const KBSR: u16 = 0xFE00;

/// Keyboard data register. The low byte holds the last character.
pub const KBDR: u16 = 0xFE02;

const KBSR_READY: u16 = 1 << 15;

/// LC-3 memory: 65536 words.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a new memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read a word as the CPU sees it.
    ///
    /// Reading [`KBSR`] polls `console` first. This makes the read impure:
    /// callers must go through here to observe fresh keyboard state.
    pub fn read<C: Console + ?Sized>(&mut self, addr: u16, console: &mut C) -> Result<u16, ConsoleError> {
        if addr == KBSR {
            if console.key_available()? {
                self.cells[KBSR as usize] = KBSR_READY;
                self.cells[KBDR as usize] = console.read_char()? as u16;
            } else {
                self.cells[KBSR as usize] = 0;
            }
        }
        Ok(self.cells[addr as usize])
    }

    /// Read a word without any device side effects.
    #[inline]
    pub fn peek(&self, addr: u16) -> u16 {
        self.cells[addr as usize]
    }

    /// Write a word. Plain storage, even for the keyboard registers.
    #[inline]
    pub fn write(&mut self, addr: u16, value: u16) {
        self.cells[addr as usize] = value;
    }

    /// Copy an image into memory at its origin.
    ///
    /// Memory is untouched if the image does not fit below 0x10000.
    pub fn load(&mut self, image: &Image) -> Result<(), MemoryError> {
        let start = image.origin as usize;
        let end = start + image.words.len();
        if end > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                origin: image.origin,
                len: image.words.len(),
            });
        }

        self.cells[start..end].copy_from_slice(&image.words);
        Ok(())
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Dump `count` words starting at `start`, stopping at the top of memory.
    pub fn dump(&self, start: u16, count: usize) -> Vec<(u16, u16)> {
        let end = (start as usize + count).min(MEMORY_SIZE);
        (start as usize..end)
            .map(|i| (i as u16, self.cells[i]))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only count non-zero cells
        let non_zero = self.cells.iter().filter(|&&cell| cell != 0).count();

        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur during memory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// Image runs past the end of the address space.
    #[error("image of {len} words at origin x{origin:04X} does not fit in memory")]
    ImageTooLarge { origin: u16, len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::StreamConsole;

    #[test]
    fn test_memory_read_write() {
        let mut mem = Memory::new();
        let mut console = StreamConsole::new(&b""[..], Vec::new());

        mem.write(0x3010, 42);
        assert_eq!(mem.read(0x3010, &mut console).unwrap(), 42);
        assert_eq!(mem.peek(0x3010), 42);
        assert_eq!(mem.peek(0xFFFF), 0);
    }

    #[test]
    fn test_kbsr_with_key_ready() {
        let mut mem = Memory::new();
        let mut console = StreamConsole::new(&b"q"[..], Vec::new());

        assert_eq!(mem.read(KBSR, &mut console).unwrap(), 0x8000);
        assert_eq!(mem.peek(KBDR), b'q' as u16);
    }

    #[test]
    fn test_kbsr_without_key_clears_status() {
        let mut mem = Memory::new();
        let mut console = StreamConsole::new(&b""[..], Vec::new());

        mem.write(KBSR, 0x8000);
        mem.write(KBDR, b'z' as u16);
        assert_eq!(mem.read(KBSR, &mut console).unwrap(), 0);
        // Data register keeps the last character
        assert_eq!(mem.peek(KBDR), b'z' as u16);
    }

    #[test]
    fn test_kbdr_read_does_not_poll() {
        let mut mem = Memory::new();
        let mut console = StreamConsole::new(&b"k"[..], Vec::new());

        assert_eq!(mem.read(KBDR, &mut console).unwrap(), 0);
        assert_eq!(console.read_char().unwrap(), b'k');
    }

    #[test]
    fn test_load_image() {
        let mut mem = Memory::new();
        let image = Image::new(0x3000, vec![1, 2, 3]);

        mem.load(&image).unwrap();

        assert_eq!(mem.dump(0x3000, 4), vec![(0x3000, 1), (0x3001, 2), (0x3002, 3), (0x3003, 0)]);
    }

    #[test]
    fn test_load_image_to_top_of_memory() {
        let mut mem = Memory::new();
        mem.load(&Image::new(0xFFFE, vec![7, 8])).unwrap();
        assert_eq!(mem.peek(0xFFFF), 8);
    }

    #[test]
    fn test_load_image_too_large_leaves_memory_untouched() {
        let mut mem = Memory::new();
        let image = Image::new(0xFFFE, vec![1, 2, 3]);

        assert_eq!(
            mem.load(&image),
            Err(MemoryError::ImageTooLarge { origin: 0xFFFE, len: 3 })
        );
        assert_eq!(mem, Memory::new());
    }
}
