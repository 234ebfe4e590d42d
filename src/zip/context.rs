//! Parse state for one archive stream.

use super::scanner::BoundaryScanner;
use super::structures::{LocalFileHeader, SIGNATURE_SIZE};

/// Named continuation run once a buffer fill or a skip completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStep {
    AfterSignature,
    AfterLocalHeader,
    AfterFilename,
    AfterExtraData,
    AfterReset,
}

/// How the end of the current entry's data is found.
#[derive(Debug, Clone)]
pub enum DrainKind {
    /// `remaining` counts down the declared compressed size.
    Known,
    /// The scanner watches for the next record signature.
    Unknown(BoundaryScanner),
}

/// Active parse mode. Exactly one is current at any time.
#[derive(Debug, Clone)]
pub enum ParseMode {
    FillBuffer(ParseStep),
    SkipBytes(ParseStep),
    DrainEntryData(DrainKind),
    Finished,
}

/// Mutable parse state driven by [`StreamDecoder`](super::StreamDecoder).
///
/// The context does no I/O; it only records how far the current mode has
/// progressed.
#[derive(Debug)]
pub struct Context {
    pub mode: ParseMode,
    /// Bytes left to skip or drain in the current mode.
    pub remaining: u32,
    pub work_buffer: Vec<u8>,
    pub work_offset: usize,
    pub current_header: Option<LocalFileHeader>,
    pub current_filename: String,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        let mut ctx = Self {
            mode: ParseMode::Finished,
            remaining: 0,
            work_buffer: Vec::with_capacity(SIGNATURE_SIZE),
            work_offset: 0,
            current_header: None,
            current_filename: String::new(),
        };
        ctx.reset_for_next_entry();
        ctx
    }

    /// Accumulate exactly `len` bytes, then run `step`.
    pub fn fill(&mut self, len: usize, step: ParseStep) {
        self.work_buffer.clear();
        self.work_buffer.resize(len, 0);
        self.work_offset = 0;
        self.mode = ParseMode::FillBuffer(step);
    }

    /// Discard exactly `len` bytes, then run `step`.
    pub fn skip(&mut self, len: u32, step: ParseStep) {
        self.remaining = len;
        self.mode = ParseMode::SkipBytes(step);
    }

    /// Drain `len` bytes of entry data of known size.
    pub fn drain_known(&mut self, len: u32) {
        self.remaining = len;
        self.mode = ParseMode::DrainEntryData(DrainKind::Known);
    }

    /// Drain entry data until the scanner finds the next record.
    pub fn drain_unknown(&mut self, data_length: u32) {
        self.remaining = 0;
        self.mode =
            ParseMode::DrainEntryData(DrainKind::Unknown(BoundaryScanner::new(data_length as u64)));
    }

    /// Drop the finished entry and wait for the next signature.
    pub fn reset_for_next_entry(&mut self) {
        self.current_header = None;
        self.current_filename.clear();
        self.remaining = 0;
        self.fill(SIGNATURE_SIZE, ParseStep::AfterSignature);
    }

    pub fn finish(&mut self) {
        self.mode = ParseMode::Finished;
        self.remaining = 0;
        self.work_buffer.clear();
        self.work_offset = 0;
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.mode, ParseMode::Finished)
    }

    /// Bytes still missing from the work buffer.
    pub fn fill_needed(&self) -> usize {
        self.work_buffer.len() - self.work_offset
    }

    /// Whether the current mode can complete without further input.
    pub fn ready_without_input(&self) -> bool {
        match &self.mode {
            ParseMode::FillBuffer(_) => self.fill_needed() == 0,
            ParseMode::SkipBytes(_) => self.remaining == 0,
            ParseMode::DrainEntryData(DrainKind::Known) => self.remaining == 0,
            ParseMode::DrainEntryData(DrainKind::Unknown(_)) | ParseMode::Finished => false,
        }
    }

    /// Whether a partially parsed record is pending.
    pub fn is_mid_record(&self) -> bool {
        !matches!(self.mode, ParseMode::FillBuffer(ParseStep::AfterSignature))
            || self.work_offset > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_mode_waits_for_signature() {
        let ctx = Context::new();
        assert!(matches!(ctx.mode, ParseMode::FillBuffer(ParseStep::AfterSignature)));
        assert_eq!(ctx.fill_needed(), SIGNATURE_SIZE);
        assert!(!ctx.is_mid_record());
        assert!(!ctx.ready_without_input());
    }

    #[test]
    fn test_zero_length_modes_are_ready() {
        let mut ctx = Context::new();
        ctx.fill(0, ParseStep::AfterFilename);
        assert!(ctx.ready_without_input());

        ctx.skip(0, ParseStep::AfterExtraData);
        assert!(ctx.ready_without_input());

        ctx.drain_known(0);
        assert!(ctx.ready_without_input());

        ctx.drain_unknown(0);
        assert!(!ctx.ready_without_input());
    }

    #[test]
    fn test_finish_is_terminal() {
        let mut ctx = Context::new();
        ctx.finish();
        assert!(ctx.is_finished());
        assert!(!ctx.ready_without_input());
    }
}
