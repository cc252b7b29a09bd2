//! LC-3 object image format.
//!
//! An image is a sequence of big-endian 16-bit words:
//! - Word 0: origin, the address the program is loaded at
//! - Words 1..: program contents, stored consecutively from the origin

use std::path::Path;
use thiserror::Error;

/// A parsed program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// Load address.
    pub origin: u16,
    /// Program words.
    pub words: Vec<u16>,
}

impl Image {
    pub fn new(origin: u16, words: Vec<u16>) -> Self {
        Self { origin, words }
    }

    /// Parse an image from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.len() < 2 || bytes.len() % 2 != 0 {
            return Err(ImageError::Truncated { len: bytes.len() });
        }

        let mut words = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
        // Length checked above
        let origin = words.next().unwrap_or_default();

        Ok(Self {
            origin,
            words: words.collect(),
        })
    }

    /// Read and parse an image file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path.as_ref()).map_err(|e| ImageError::Open(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Serialize back to the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        std::iter::once(self.origin)
            .chain(self.words.iter().copied())
            .flat_map(u16::to_be_bytes)
            .collect()
    }

    /// Get the number of program words.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Address of each program word, paired with the word.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        self.words
            .iter()
            .enumerate()
            .map(|(i, &word)| (self.origin.wrapping_add(i as u16), word))
    }
}

/// Errors that can occur while reading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("cannot open image: {0}")]
    Open(String),

    #[error("truncated image ({len} bytes)")]
    Truncated { len: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_big_endian() {
        let image = Image::from_bytes(&[0x30, 0x00, 0xF0, 0x25, 0x12, 0x34]).unwrap();

        assert_eq!(image.origin, 0x3000);
        assert_eq!(image.words, vec![0xF025, 0x1234]);
        assert_eq!(image.len(), 2);
    }

    #[test]
    fn test_origin_only() {
        let image = Image::from_bytes(&[0x40, 0x00]).unwrap();
        assert_eq!(image.origin, 0x4000);
        assert!(image.is_empty());
    }

    #[test]
    fn test_truncated() {
        assert_eq!(Image::from_bytes(&[]), Err(ImageError::Truncated { len: 0 }));
        assert_eq!(Image::from_bytes(&[0x30]), Err(ImageError::Truncated { len: 1 }));
        assert_eq!(
            Image::from_bytes(&[0x30, 0x00, 0xF0]),
            Err(ImageError::Truncated { len: 3 })
        );
    }

    #[test]
    fn test_missing_file() {
        let err = Image::from_file("/nonexistent/definitely/missing.obj").unwrap_err();
        assert!(matches!(err, ImageError::Open(_)));
    }

    #[test]
    fn test_to_bytes_matches_input() {
        let bytes = [0x30, 0x00, 0xE0, 0x02, 0xF0, 0x22];
        assert_eq!(Image::from_bytes(&bytes).unwrap().to_bytes(), bytes);
    }

    #[test]
    fn test_iter_addresses() {
        let image = Image::new(0xFFFF, vec![1, 2]);
        assert_eq!(image.iter().collect::<Vec<_>>(), vec![(0xFFFF, 1), (0x0000, 2)]);
    }
}
