//! Per-entry decompression.
//!
//! STORED data is passed straight through. DEFLATE data is pushed into a raw
//! `flate2` inflate state that writes into a fixed output window; the window
//! is handed to the caller whenever it fills up or the deflate stream ends.

use flate2::{Decompress, FlushDecompress, Status};
use tracing::trace;

use super::error::{Result, UnzipError};
use super::structures::CompressionMethod;

/// Default size of the inflate output window.
pub const OUTPUT_WINDOW: usize = 64 * 1024;

/// Raw inflate state plus its output window.
struct Inflater {
    state: Decompress,
    window: Vec<u8>,
    filled: usize,
    ended: bool,
}

impl Inflater {
    fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(UnzipError::InvalidCompressor(
                "output window must not be empty".to_string(),
            ));
        }
        Ok(Self {
            // ZIP entries carry raw deflate without a zlib header
            state: Decompress::new(false),
            window: vec![0u8; window_size],
            filled: 0,
            ended: false,
        })
    }

    fn flush<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::io::Result<()>,
    {
        if self.filled > 0 {
            emit(&self.window[..self.filled])?;
            self.filled = 0;
        }
        Ok(())
    }

    /// Run one inflate call, returning (consumed, produced).
    fn step(&mut self, input: &[u8], flush: FlushDecompress) -> Result<(usize, usize)> {
        let before_in = self.state.total_in();
        let before_out = self.state.total_out();

        let status = self
            .state
            .decompress(input, &mut self.window[self.filled..], flush)
            .map_err(|e| UnzipError::CompressorError(e.to_string()))?;

        let consumed = (self.state.total_in() - before_in) as usize;
        let produced = (self.state.total_out() - before_out) as usize;
        self.filled += produced;
        if status == Status::StreamEnd {
            self.ended = true;
        }
        Ok((consumed, produced))
    }

    fn push<F>(&mut self, mut input: &[u8], emit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::io::Result<()>,
    {
        while !input.is_empty() {
            if self.ended {
                trace!(trailing = input.len(), "ignoring bytes after end of deflate stream");
                return Ok(());
            }

            let (consumed, produced) = self.step(input, FlushDecompress::None)?;
            input = &input[consumed..];

            if self.filled == self.window.len() || self.ended {
                self.flush(emit)?;
            }
            if consumed == 0 && produced == 0 && !self.ended {
                return Err(UnzipError::CompressorError(
                    "inflate made no progress".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn finish<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::io::Result<()>,
    {
        while !self.ended {
            let (_, produced) = self.step(&[], FlushDecompress::Finish)?;
            if self.filled == self.window.len() {
                self.flush(emit)?;
            }
            if produced == 0 {
                break;
            }
        }
        self.flush(emit)?;

        if !self.ended {
            return Err(UnzipError::CompressorError(
                "deflate stream ended prematurely".to_string(),
            ));
        }
        Ok(())
    }
}

/// Decompression path for a single entry.
///
/// The inflate state is created on the first DEFLATE bytes and dropped in
/// [`EntryDecoder::finish`]; a new `EntryDecoder` is built for every entry.
pub struct EntryDecoder {
    method: CompressionMethod,
    window_size: usize,
    inflater: Option<Inflater>,
}

impl EntryDecoder {
    /// Prepare a decoder for `method`.
    ///
    /// Fails with [`UnzipError::UnknownEncryption`] for anything other than
    /// STORED or DEFLATE.
    pub fn new(method: CompressionMethod, window_size: usize) -> Result<Self> {
        if let CompressionMethod::Unknown(value) = method {
            return Err(UnzipError::UnknownEncryption(value));
        }
        Ok(Self {
            method,
            window_size,
            inflater: None,
        })
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// Whether an inflate state is currently allocated.
    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.inflater.is_some()
    }

    /// Decode `input` and hand every ready output chunk to `emit`.
    pub fn push<F>(&mut self, input: &[u8], emit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::io::Result<()>,
    {
        if input.is_empty() {
            return Ok(());
        }
        match self.method {
            CompressionMethod::Stored => {
                emit(input)?;
                Ok(())
            }
            CompressionMethod::Deflate => {
                if self.inflater.is_none() {
                    self.inflater = Some(Inflater::new(self.window_size)?);
                }
                match self.inflater.as_mut() {
                    Some(inflater) => inflater.push(input, emit),
                    None => Err(UnzipError::InvalidState),
                }
            }
            CompressionMethod::Unknown(value) => Err(UnzipError::UnknownEncryption(value)),
        }
    }

    /// Flush pending output and release the inflate state.
    pub fn finish<F>(&mut self, emit: &mut F) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::io::Result<()>,
    {
        match self.inflater.take() {
            Some(mut inflater) => inflater.finish(emit),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn discard(_: &[u8]) -> std::io::Result<()> {
        Ok(())
    }

    fn run(decoder: &mut EntryDecoder, input: &[u8], split: usize) -> (Vec<u8>, usize) {
        let mut out = Vec::new();
        let mut calls = 0;
        let mut emit = |chunk: &[u8]| {
            out.extend_from_slice(chunk);
            calls += 1;
            Ok::<(), std::io::Error>(())
        };
        for piece in input.chunks(split) {
            decoder.push(piece, &mut emit).unwrap();
        }
        decoder.finish(&mut emit).unwrap();
        (out, calls)
    }

    #[test]
    fn test_stored_passthrough() {
        let mut decoder = EntryDecoder::new(CompressionMethod::Stored, OUTPUT_WINDOW).unwrap();
        let (out, _) = run(&mut decoder, b"hello world", 3);
        assert_eq!(out, b"hello world");
        assert!(!decoder.is_active());
    }

    #[test]
    fn test_deflate_any_split() {
        let original: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        let compressed = deflate(&original);

        for split in [1, 7, 4096, compressed.len()] {
            let mut decoder =
                EntryDecoder::new(CompressionMethod::Deflate, OUTPUT_WINDOW).unwrap();
            let (out, _) = run(&mut decoder, &compressed, split);
            assert_eq!(out, original, "split {split}");
        }
    }

    #[test]
    fn test_small_window_flushes_when_full() {
        let original = vec![b'z'; 10_000];
        let compressed = deflate(&original);

        let mut decoder = EntryDecoder::new(CompressionMethod::Deflate, 1024).unwrap();
        let (out, calls) = run(&mut decoder, &compressed, compressed.len());
        assert_eq!(out, original);
        assert!(calls >= 10);
    }

    #[test]
    fn test_inflater_created_lazily() {
        let compressed = deflate(b"lazy");
        let mut decoder = EntryDecoder::new(CompressionMethod::Deflate, OUTPUT_WINDOW).unwrap();
        assert!(!decoder.is_active());
        decoder.push(&compressed[..1], &mut discard).unwrap();
        assert!(decoder.is_active());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let err = EntryDecoder::new(CompressionMethod::Unknown(99), OUTPUT_WINDOW)
            .err()
            .unwrap();
        assert!(matches!(err, UnzipError::UnknownEncryption(99)));
    }

    #[test]
    fn test_zero_window_is_invalid_compressor() {
        let mut decoder = EntryDecoder::new(CompressionMethod::Deflate, 0).unwrap();
        let err = decoder.push(b"\x01", &mut discard).unwrap_err();
        assert!(matches!(err, UnzipError::InvalidCompressor(_)));
    }

    #[test]
    fn test_corrupt_stream() {
        let mut decoder = EntryDecoder::new(CompressionMethod::Deflate, OUTPUT_WINDOW).unwrap();
        // Block type 3 is reserved.
        let err = decoder.push(&[0xFF, 0xFF, 0xFF, 0xFF], &mut discard).unwrap_err();
        assert!(matches!(err, UnzipError::CompressorError(_)));
    }

    #[test]
    fn test_truncated_stream() {
        let compressed = deflate(&vec![7u8; 4096]);
        let mut decoder = EntryDecoder::new(CompressionMethod::Deflate, OUTPUT_WINDOW).unwrap();
        decoder
            .push(&compressed[..compressed.len() / 2], &mut discard)
            .unwrap();
        let err = decoder.finish(&mut discard).unwrap_err();
        assert!(matches!(err, UnzipError::CompressorError(_)));
    }
}
