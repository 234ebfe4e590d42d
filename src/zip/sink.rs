use std::io;

use super::error::{ErrorKind, UnzipError};
use super::structures::LocalFileHeader;

/// Receiver of decoded archive events.
///
/// Callbacks run synchronously on the thread that feeds the decoder, in
/// archive order. Every `begin_file` is followed by exactly one `end_file`
/// before the next `begin_file` or `create_folder`. `did_finish` is always
/// the last call.
///
/// A sink that blocks stalls the decoder; there is no internal buffering.
pub trait EntrySink {
    /// A zero-size entry without flags, treated as a directory.
    fn create_folder(&mut self, path: &str) -> io::Result<()>;

    /// Data for `path` is about to be written.
    fn begin_file(&mut self, header: &LocalFileHeader, path: &str) -> io::Result<()>;

    /// Decoded bytes for the current file.
    ///
    /// `consumed` is the number of archive bytes read for this entry so far.
    fn write_data(&mut self, data: &[u8], consumed: u64) -> io::Result<()>;

    /// The current file is complete.
    fn end_file(&mut self) -> io::Result<()>;

    /// No further calls follow.
    fn did_finish(&mut self);

    /// An unrecoverable error stopped the stream.
    fn error_did_occur(&mut self, error: &UnzipError);
}

/// Recorded sink event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    CreateFolder(String),
    BeginFile(String),
    WriteData(Vec<u8>),
    EndFile,
    DidFinish,
    Error(ErrorKind),
}

/// Sink that records every event in order.
///
/// Consecutive `write_data` calls are kept as separate events; use
/// [`EventLog::files`] for the reassembled contents.
#[derive(Debug, Default)]
pub struct EventLog {
    pub events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Completed files as `(name, contents)` pairs.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = Vec::new();
        let mut current: Option<(String, Vec<u8>)> = None;
        for event in &self.events {
            match event {
                Event::BeginFile(name) => current = Some((name.clone(), Vec::new())),
                Event::WriteData(data) => {
                    if let Some((_, contents)) = current.as_mut() {
                        contents.extend_from_slice(data);
                    }
                }
                Event::EndFile => files.extend(current.take()),
                _ => {}
            }
        }
        files
    }

    /// Events with adjacent `WriteData` merged, so logs taken with different
    /// input chunkings compare equal.
    pub fn coalesced(&self) -> Vec<Event> {
        let mut out: Vec<Event> = Vec::with_capacity(self.events.len());
        for event in &self.events {
            if let (Some(Event::WriteData(prev)), Event::WriteData(data)) = (out.last_mut(), event)
            {
                prev.extend_from_slice(data);
                continue;
            }
            out.push(event.clone());
        }
        out
    }

    pub fn errors(&self) -> Vec<ErrorKind> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Error(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub fn finished(&self) -> bool {
        self.events.last() == Some(&Event::DidFinish)
    }
}

impl EntrySink for EventLog {
    fn create_folder(&mut self, path: &str) -> io::Result<()> {
        self.events.push(Event::CreateFolder(path.to_string()));
        Ok(())
    }

    fn begin_file(&mut self, _header: &LocalFileHeader, path: &str) -> io::Result<()> {
        self.events.push(Event::BeginFile(path.to_string()));
        Ok(())
    }

    fn write_data(&mut self, data: &[u8], _consumed: u64) -> io::Result<()> {
        self.events.push(Event::WriteData(data.to_vec()));
        Ok(())
    }

    fn end_file(&mut self) -> io::Result<()> {
        self.events.push(Event::EndFile);
        Ok(())
    }

    fn did_finish(&mut self) {
        self.events.push(Event::DidFinish);
    }

    fn error_did_occur(&mut self, error: &UnzipError) {
        self.events.push(Event::Error(error.kind()));
    }
}
