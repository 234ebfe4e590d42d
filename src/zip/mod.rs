//! Streaming ZIP decoding.
//!
//! This module extracts ZIP archives strictly front to back, so archives can
//! be unpacked while they are still being downloaded or piped in.
//!
//! ## Architecture
//!
//! - [`structures`]: signatures and Local File Header decoding
//! - [`scanner`]: boundary detection for entries of unknown length
//! - [`inflate`]: per-entry STORED/DEFLATE decoding
//! - `context`: parse modes and per-stream parse state
//! - [`decoder`]: the state machine driver, [`StreamDecoder`]
//! - [`sink`]: the [`EntrySink`] callback contract
//! - `extractor`: chunk pump plus filesystem and listing sinks
//!
//! ## ZIP Format Overview
//!
//! Every entry starts with a Local File Header, followed by the file name,
//! an extra field and the entry data. Entries written with general purpose
//! bit 3 set declare zero sizes up front and append a data descriptor after
//! their data instead. The central directory at the end of the archive is
//! never read: the first central directory (or archive extra data) record
//! ends decoding.
//!
//! ## Limitations
//!
//! - STORED and DEFLATE only
//! - No encryption support
//! - No multi-disk archive support
//! - No ZIP64 sizes

mod context;
pub mod decoder;
mod error;
mod extractor;
pub mod inflate;
pub mod scanner;
pub mod sink;
pub mod structures;

pub use decoder::{DecoderOptions, StreamDecoder};
pub use error::{ErrorKind, Result, UnzipError};
pub use extractor::{
    DirectorySink, EntryFilter, ListedEntry, ListingSink, OverwritePolicy, StreamExtractor,
};
pub use sink::{EntrySink, Event, EventLog};
pub use structures::{CompressionMethod, FrameKind, LocalFileHeader};
