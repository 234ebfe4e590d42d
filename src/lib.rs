//! # streamunzip
//!
//! Forward-only ZIP extraction for archives that are still arriving.
//!
//! This library decodes ZIP archives strictly front to back, one chunk at a
//! time, without seeking and without reading the central directory. It is
//! meant for archives coming from a download or a pipe: entries are
//! extracted while the rest of the archive is still in flight.
//!
//! ## Features
//!
//! - Chunk-size independent decoding, from single bytes to whole archives
//! - STORED (uncompressed) and DEFLATE compression methods
//! - Entries with trailing data descriptors (general purpose bit 3), whose
//!   end is found by scanning for the next record signature
//! - Local files, standard input, and resumable HTTP downloads as sources
//! - Selective extraction with glob pattern matching
//!
//! ## Example
//!
//! ```no_run
//! use streamunzip::io::HttpStreamSource;
//! use streamunzip::zip::{ListingSink, StreamExtractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Stream a remote ZIP file
//!     let mut source = HttpStreamSource::new("https://example.com/archive.zip".to_string(), 10).await?;
//!
//!     // List all files in the archive as they go by
//!     let listing = StreamExtractor::new().run(&mut source, ListingSink::new()).await?;
//!     for entry in listing.entries() {
//!         println!("{}", entry.file_name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Lower-level callers can drive [`zip::StreamDecoder`] directly with their
//! own [`zip::EntrySink`].

pub mod cli;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use io::{ChunkSource, HttpStreamSource, LocalFileSource, MemorySource, StdinSource};
pub use zip::{EntrySink, StreamDecoder, StreamExtractor, UnzipError};
