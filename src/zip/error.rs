use std::io;

use thiserror::Error;

/// Fatal conditions raised while decoding an archive stream.
///
/// Every variant is terminal for the whole stream: once one is reported the
/// decoder enters its finished state and ignores further input.
#[derive(Debug, Error)]
pub enum UnzipError {
    /// The entry uses a compression method other than STORED or DEFLATE.
    #[error("unsupported compression method: {0}")]
    UnknownEncryption(u16),

    /// The byte stream does not form a valid archive.
    #[error("invalid archive: {0}")]
    InvalidArchive(&'static str),

    /// The state machine was dispatched without an active parse mode.
    #[error("decoder dispatched without an active parse mode")]
    InvalidState,

    /// The inflate primitive could not be set up for an entry.
    #[error("failed to initialise decompressor: {0}")]
    InvalidCompressor(String),

    /// The inflate primitive rejected the entry data.
    #[error("decompression failed: {0}")]
    CompressorError(String),

    /// The output sink failed to accept an event.
    #[error("sink error")]
    Sink(#[from] io::Error),
}

/// Fieldless view of [`UnzipError`], convenient for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnknownEncryption,
    InvalidArchive,
    InvalidState,
    InvalidCompressor,
    CompressorError,
    Sink,
}

impl UnzipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UnzipError::UnknownEncryption(_) => ErrorKind::UnknownEncryption,
            UnzipError::InvalidArchive(_) => ErrorKind::InvalidArchive,
            UnzipError::InvalidState => ErrorKind::InvalidState,
            UnzipError::InvalidCompressor(_) => ErrorKind::InvalidCompressor,
            UnzipError::CompressorError(_) => ErrorKind::CompressorError,
            UnzipError::Sink(_) => ErrorKind::Sink,
        }
    }
}

/// Result type for stream decoding.
pub type Result<T> = std::result::Result<T, UnzipError>;
