use super::ChunkSource;
use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Chunked reader over any async byte stream
pub struct ReaderSource<R> {
    reader: R,
    chunk_size: usize,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin + Send> ReaderSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            bytes_read: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> ChunkSource for ReaderSource<R> {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let n = self.reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        self.bytes_read += n as u64;
        Ok(Some(buf))
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

/// Local archive file read front to back
pub type LocalFileSource = ReaderSource<tokio::fs::File>;

impl ReaderSource<tokio::fs::File> {
    pub async fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(file, chunk_size))
    }
}

/// Archive piped in on standard input
pub type StdinSource = ReaderSource<tokio::io::Stdin>;

impl ReaderSource<tokio::io::Stdin> {
    pub fn stdin(chunk_size: usize) -> Self {
        Self::new(tokio::io::stdin(), chunk_size)
    }
}

/// In-memory archive split into fixed-size chunks
pub struct MemorySource {
    data: Vec<u8>,
    chunk_size: usize,
    offset: usize,
}

impl MemorySource {
    pub fn new(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            chunk_size: chunk_size.max(1),
            offset: 0,
        }
    }
}

#[async_trait]
impl ChunkSource for MemorySource {
    async fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }

    fn bytes_read(&self) -> u64 {
        self.offset as u64
    }
}
