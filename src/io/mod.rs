mod http;
mod local;

pub use http::HttpStreamSource;
pub use local::{LocalFileSource, MemorySource, ReaderSource, StdinSource};

use anyhow::Result;
use async_trait::async_trait;

/// Default number of bytes requested per read.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Trait for forward-only sources of archive bytes
#[async_trait]
pub trait ChunkSource: Send {
    /// Return the next chunk of data, or `None` once the source is exhausted
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>>;

    /// Total bytes delivered so far
    fn bytes_read(&self) -> u64;
}
