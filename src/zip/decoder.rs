//! Forward-only archive decoder.
//!
//! [`StreamDecoder`] consumes raw archive bytes in chunks of any size and
//! reports entries to an [`EntrySink`]. It never seeks and never reads the
//! central directory; the first record that is not a local file header or a
//! data descriptor ends the archive.
//!
//! ## Processing model
//!
//! Each [`feed`](StreamDecoder::feed) call processes its chunk to
//! exhaustion. Every parse mode handler takes as many bytes as it needs from
//! the front of the chunk and hands control back to the driver loop, so the
//! decoder behaves the same for one-byte chunks and for the whole archive at
//! once.

use tracing::{debug, trace, warn};

use super::context::{Context, DrainKind, ParseMode, ParseStep};
use super::error::{Result, UnzipError};
use super::inflate::{EntryDecoder, OUTPUT_WINDOW};
use super::sink::EntrySink;
use super::structures::{DATA_DESCRIPTOR_SIZE, FrameKind, LOCAL_HEADER_SIZE, LocalFileHeader};

/// Decoder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Size of the inflate output window; decoded data reaches the sink in
    /// chunks of at most this many bytes.
    pub output_window: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            output_window: OUTPUT_WINDOW,
        }
    }
}

/// Streaming ZIP decoder driving an [`EntrySink`].
///
/// ## Example
///
/// ```
/// use streamunzip::zip::{EventLog, StreamDecoder};
///
/// let mut decoder = StreamDecoder::new(EventLog::new());
/// decoder.feed(b"PK\x01\x02").unwrap();
/// assert!(decoder.is_finished());
/// assert!(decoder.sink().finished());
/// ```
pub struct StreamDecoder<S: EntrySink> {
    sink: S,
    ctx: Context,
    /// Decompression path of the entry being drained.
    entry: Option<EntryDecoder>,
    /// Archive bytes forwarded for the current entry.
    entry_consumed: u64,
    /// Archive bytes consumed since the start of the stream.
    position: u64,
    /// Scratch for bytes released by the boundary scanner.
    released: Vec<u8>,
    options: DecoderOptions,
}

impl<S: EntrySink> StreamDecoder<S> {
    pub fn new(sink: S) -> Self {
        Self::with_options(sink, DecoderOptions::default())
    }

    pub fn with_options(sink: S, options: DecoderOptions) -> Self {
        Self {
            sink,
            ctx: Context::new(),
            entry: None,
            entry_consumed: 0,
            position: 0,
            released: Vec::new(),
            options: DecoderOptions {
                output_window: options.output_window.max(1),
            },
        }
    }

    /// Process one chunk of archive bytes.
    ///
    /// Input arriving after the decoder has finished is ignored. On error the
    /// sink has already been told through `error_did_occur` and `did_finish`.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if self.ctx.is_finished() {
            if !chunk.is_empty() {
                trace!(len = chunk.len(), "ignoring input after end of archive");
            }
            return Ok(());
        }

        trace!(len = chunk.len(), position = self.position, "feeding chunk");
        match self.process(chunk) {
            Ok(()) => Ok(()),
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Signal that no more input will arrive.
    ///
    /// An archive that has not reached a terminating record by now is
    /// truncated and reported as [`UnzipError::InvalidArchive`].
    pub fn finish(&mut self) -> Result<()> {
        if self.ctx.is_finished() {
            return Ok(());
        }
        let reason = if self.ctx.is_mid_record() {
            "input ended inside a record"
        } else {
            "input ended before the central directory"
        };
        Err(self.fail(UnzipError::InvalidArchive(reason)))
    }

    pub fn is_finished(&self) -> bool {
        self.ctx.is_finished()
    }

    /// Archive bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn process(&mut self, mut input: &[u8]) -> Result<()> {
        loop {
            if self.ctx.is_finished() {
                return Ok(());
            }
            if input.is_empty() && !self.ctx.ready_without_input() {
                return Ok(());
            }
            let consumed = self.dispatch(input)?;
            input = &input[consumed..];
            self.position += consumed as u64;
        }
    }

    /// Run the handler of the current mode, returning the bytes it consumed.
    fn dispatch(&mut self, input: &[u8]) -> Result<usize> {
        match self.ctx.mode {
            ParseMode::FillBuffer(step) => self.fill_buffer(input, step),
            ParseMode::SkipBytes(step) => self.skip_bytes(input, step),
            ParseMode::DrainEntryData(DrainKind::Known) => self.drain_known(input),
            ParseMode::DrainEntryData(DrainKind::Unknown(_)) => self.drain_unknown(input),
            ParseMode::Finished => Err(UnzipError::InvalidState),
        }
    }

    fn fill_buffer(&mut self, input: &[u8], step: ParseStep) -> Result<usize> {
        let take = self.ctx.fill_needed().min(input.len());
        let start = self.ctx.work_offset;
        self.ctx.work_buffer[start..start + take].copy_from_slice(&input[..take]);
        self.ctx.work_offset += take;

        if self.ctx.fill_needed() == 0 {
            self.run_step(step)?;
        }
        Ok(take)
    }

    fn skip_bytes(&mut self, input: &[u8], step: ParseStep) -> Result<usize> {
        let take = (self.ctx.remaining as usize).min(input.len());
        self.ctx.remaining -= take as u32;

        if self.ctx.remaining == 0 {
            self.run_step(step)?;
        }
        Ok(take)
    }

    fn run_step(&mut self, step: ParseStep) -> Result<()> {
        match step {
            ParseStep::AfterSignature => {
                let kind = FrameKind::from_bytes(&self.ctx.work_buffer);
                self.enter_frame(kind);
            }
            ParseStep::AfterLocalHeader => {
                let header = LocalFileHeader::from_bytes(&self.ctx.work_buffer)?;
                let name_len = header.file_name_length as usize;
                self.ctx.current_header = Some(header);
                self.ctx.fill(name_len, ParseStep::AfterFilename);
            }
            ParseStep::AfterFilename => {
                let extra_len = match &self.ctx.current_header {
                    Some(header) => header.extra_field_length,
                    None => return Err(UnzipError::InvalidArchive("file name without header")),
                };
                self.ctx.current_filename =
                    String::from_utf8_lossy(&self.ctx.work_buffer).into_owned();
                self.ctx.skip(extra_len as u32, ParseStep::AfterExtraData);
            }
            ParseStep::AfterExtraData => self.begin_entry()?,
            ParseStep::AfterReset => self.ctx.reset_for_next_entry(),
        }
        Ok(())
    }

    /// Switch to the parse mode for a record whose signature was just read.
    fn enter_frame(&mut self, kind: FrameKind) {
        match kind {
            FrameKind::LocalFile => self.ctx.fill(LOCAL_HEADER_SIZE, ParseStep::AfterLocalHeader),
            FrameKind::DataDescriptor => {
                trace!(position = self.position, "skipping data descriptor");
                self.ctx.skip(DATA_DESCRIPTOR_SIZE as u32, ParseStep::AfterReset);
            }
            FrameKind::ArchiveExtraData | FrameKind::CentralDirectory | FrameKind::None => {
                debug!(?kind, position = self.position, "end of archive entries");
                self.ctx.finish();
                self.sink.did_finish();
            }
        }
    }

    fn begin_entry(&mut self) -> Result<()> {
        let Some(header) = self.ctx.current_header.as_ref() else {
            return Err(UnzipError::InvalidArchive("entry without local file header"));
        };
        let path = &self.ctx.current_filename;

        if header.is_folder_marker() {
            debug!(%path, "folder");
            self.sink.create_folder(path)?;
            self.ctx.reset_for_next_entry();
            return Ok(());
        }

        let entry = EntryDecoder::new(header.compression_method, self.options.output_window)?;
        let known = header.has_known_size();
        let compressed_size = header.compressed_size;
        debug!(
            %path,
            method = header.compression_method.as_u16(),
            compressed_size,
            streamed = !known,
            "begin file"
        );
        self.sink.begin_file(header, path)?;

        self.entry = Some(entry);
        self.entry_consumed = 0;
        if known {
            self.ctx.drain_known(compressed_size);
        } else {
            self.ctx.drain_unknown(compressed_size);
        }
        Ok(())
    }

    fn drain_known(&mut self, input: &[u8]) -> Result<usize> {
        let take = (self.ctx.remaining as usize).min(input.len());
        self.ctx.remaining -= take as u32;
        self.forward(&input[..take])?;

        if self.ctx.remaining == 0 {
            self.end_entry()?;
            self.ctx.reset_for_next_entry();
        }
        Ok(take)
    }

    fn drain_unknown(&mut self, input: &[u8]) -> Result<usize> {
        let ParseMode::DrainEntryData(DrainKind::Unknown(scanner)) = &mut self.ctx.mode else {
            return Err(UnzipError::InvalidState);
        };

        let mut used = 0;
        let mut boundary = None;
        self.released.clear();
        for &byte in input {
            used += 1;
            let step = scanner.push(byte);
            self.released.extend(step.released);
            if let Some(kind) = step.boundary {
                trace!(?kind, data_length = scanner.released(), "entry boundary found");
                boundary = Some(kind);
                break;
            }
        }

        let released = std::mem::take(&mut self.released);
        let forwarded = self.forward(&released);
        self.released = released;
        forwarded?;

        if let Some(kind) = boundary {
            self.end_entry()?;
            self.ctx.reset_for_next_entry();
            // The signature bytes are already consumed; continue with its body.
            self.enter_frame(kind);
        }
        Ok(used)
    }

    /// Route entry data through the decompression path to the sink.
    fn forward(&mut self, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        self.entry_consumed += data.len() as u64;
        let consumed = self.entry_consumed;
        let sink = &mut self.sink;
        let entry = self.entry.as_mut().ok_or(UnzipError::InvalidState)?;
        entry.push(data, &mut |out: &[u8]| sink.write_data(out, consumed))
    }

    fn end_entry(&mut self) -> Result<()> {
        let mut method = None;
        if let Some(mut entry) = self.entry.take() {
            method = Some(entry.method().as_u16());
            let consumed = self.entry_consumed;
            let sink = &mut self.sink;
            entry.finish(&mut |out: &[u8]| sink.write_data(out, consumed))?;
        }
        debug!(
            path = %self.ctx.current_filename,
            ?method,
            consumed = self.entry_consumed,
            "end file"
        );
        self.sink.end_file()?;
        Ok(())
    }

    /// Tear down the current entry and report `err` as terminal.
    fn fail(&mut self, err: UnzipError) -> UnzipError {
        warn!(error = %err, position = self.position, "archive stream aborted");
        self.entry = None;
        self.released.clear();
        self.ctx.finish();
        self.sink.error_did_occur(&err);
        self.sink.did_finish();
        err
    }
}
