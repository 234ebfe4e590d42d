//! Entry boundary detection for entries of unknown length.
//!
//! Entries written with general purpose bit 3 set declare sizes of zero and
//! carry the real sizes in a trailing data descriptor. A forward-only reader
//! cannot seek to the central directory to learn where such an entry ends, so
//! it has to find the next record signature in the byte stream itself.
//!
//! [`BoundaryScanner`] keeps the last four bytes in a small ring together with
//! a rolling little-endian word. Each byte is released downstream only after
//! four newer bytes have been pushed, so the bytes of a matched signature are
//! never handed out as entry data.
//!
//! # Invariants
//! - `filled <= 4` and `write_index < 4`.
//! - When `filled == 4`, `rolling` equals the little-endian word of the four
//!   retained bytes in push order.
//! - `released` counts bytes handed downstream since the last reset.

use super::structures::{FrameKind, SIGNATURE_SIZE};

/// Outcome of pushing one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStep {
    /// The byte that fell out of the window, now confirmed as entry data.
    pub released: Option<u8>,
    /// A signature accepted as the end of the entry.
    pub boundary: Option<FrameKind>,
}

/// Rolling four-byte window that detects the next record signature.
#[derive(Debug, Clone)]
pub struct BoundaryScanner {
    window: [u8; SIGNATURE_SIZE],
    write_index: usize,
    filled: usize,
    rolling: u32,
    released: u64,
    data_length: u64,
}

impl BoundaryScanner {
    /// Create a scanner for an entry whose declared data length is
    /// `data_length` (zero when unknown).
    pub fn new(data_length: u64) -> Self {
        Self {
            window: [0; SIGNATURE_SIZE],
            write_index: 0,
            filled: 0,
            rolling: 0,
            released: 0,
            data_length,
        }
    }

    /// Forget everything seen so far and start a new entry.
    #[cfg(test)]
    pub(crate) fn reset(&mut self, data_length: u64) {
        *self = Self::new(data_length);
    }

    /// Number of bytes released downstream since the last reset.
    pub fn released(&self) -> u64 {
        self.released
    }

    /// The current rolling little-endian word.
    #[cfg(test)]
    pub(crate) fn rolling_value(&self) -> u32 {
        self.rolling
    }

    /// Push one byte through the window.
    pub fn push(&mut self, byte: u8) -> ScanStep {
        let released = if self.filled == SIGNATURE_SIZE {
            let oldest = self.window[self.write_index];
            self.released += 1;
            Some(oldest)
        } else {
            self.filled += 1;
            None
        };

        self.window[self.write_index] = byte;
        self.write_index = (self.write_index + 1) % SIGNATURE_SIZE;
        self.rolling = (self.rolling >> 8) | ((byte as u32) << 24);

        let boundary = if self.filled == SIGNATURE_SIZE {
            self.accept(FrameKind::from_word(self.rolling))
        } else {
            None
        };

        ScanStep { released, boundary }
    }

    /// Apply the false-positive guard to a candidate signature.
    fn accept(&self, kind: FrameKind) -> Option<FrameKind> {
        match kind {
            FrameKind::None => None,
            // Other signatures inside unsized data are coincidental byte
            // patterns; only a descriptor can close the entry.
            _ if self.data_length == 0 => (kind == FrameKind::DataDescriptor).then_some(kind),
            _ => (self.released == self.data_length).then_some(kind),
        }
    }
}
