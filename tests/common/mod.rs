#![allow(dead_code)]

use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;

use streamunzip::zip::{DecoderOptions, EntrySink, EventLog, StreamDecoder};

pub const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Deterministic text-like payload that compresses but not trivially.
pub fn sample_text(len: usize, seed: u64) -> Vec<u8> {
    const WORDS: [&str; 8] = ["zip ", "stream ", "header ", "data ", "entry\n", "flate ", "crc ", "PK "];
    let mut state = seed;
    let mut out = Vec::with_capacity(len + 8);
    while out.len() < len {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        out.extend_from_slice(WORDS[(state >> 61) as usize].as_bytes());
    }
    out.truncate(len);
    out
}

/// Hand-assembled archive, written front to back like a streaming writer.
#[derive(Default)]
pub struct ArchiveBuilder {
    bytes: Vec<u8>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a local file header, name and extra field.
    pub fn header(
        mut self,
        name: &str,
        flags: u16,
        method: u16,
        compressed_size: u32,
        uncompressed_size: u32,
        extra: &[u8],
    ) -> Self {
        self.bytes.extend_from_slice(b"PK\x03\x04");
        self.bytes.extend_from_slice(&20u16.to_le_bytes());
        self.bytes.extend_from_slice(&flags.to_le_bytes());
        self.bytes.extend_from_slice(&method.to_le_bytes());
        self.bytes.extend_from_slice(&0u16.to_le_bytes());
        self.bytes.extend_from_slice(&0x5821u16.to_le_bytes());
        self.bytes.extend_from_slice(&0u32.to_le_bytes());
        self.bytes.extend_from_slice(&compressed_size.to_le_bytes());
        self.bytes.extend_from_slice(&uncompressed_size.to_le_bytes());
        self.bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
        self.bytes.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        self.bytes.extend_from_slice(name.as_bytes());
        self.bytes.extend_from_slice(extra);
        self
    }

    pub fn raw(mut self, data: &[u8]) -> Self {
        self.bytes.extend_from_slice(data);
        self
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        let len = data.len() as u32;
        self.header(name, 0, 0, len, len, &[]).raw(data)
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        let compressed = deflate(data);
        self.header(name, 0, 8, compressed.len() as u32, data.len() as u32, &[])
            .raw(&compressed)
    }

    /// Entry with bit 3 set, zero sizes, and a trailing data descriptor.
    pub fn streamed(self, name: &str, method: u16, data: &[u8]) -> Self {
        let payload = if method == 8 { deflate(data) } else { data.to_vec() };
        self.header(name, FLAG_DATA_DESCRIPTOR, method, 0, 0, &[])
            .raw(&payload)
            .descriptor(payload.len() as u32, data.len() as u32)
    }

    pub fn descriptor(self, compressed_size: u32, uncompressed_size: u32) -> Self {
        let mut record = b"PK\x07\x08".to_vec();
        record.extend_from_slice(&0u32.to_le_bytes());
        record.extend_from_slice(&compressed_size.to_le_bytes());
        record.extend_from_slice(&uncompressed_size.to_le_bytes());
        self.raw(&record)
    }

    pub fn folder(self, name: &str) -> Self {
        self.header(name, 0, 0, 0, 0, &[])
    }

    /// Close with a central directory record header plus some filler.
    pub fn finish(self) -> Vec<u8> {
        self.raw(b"PK\x01\x02").raw(&[0xAB; 42]).bytes
    }

    /// Bytes written so far, without a central directory.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Feed `archive` split at the given chunk sizes (cycled), then finish.
pub fn decode_with<S: EntrySink>(
    sink: S,
    archive: &[u8],
    sizes: &[usize],
    options: DecoderOptions,
) -> S {
    let mut decoder = StreamDecoder::with_options(sink, options);
    let mut offset = 0;
    let mut i = 0;
    while offset < archive.len() {
        let size = sizes[i % sizes.len()].max(1);
        let end = (offset + size).min(archive.len());
        let _ = decoder.feed(&archive[offset..end]);
        offset = end;
        i += 1;
    }
    let _ = decoder.finish();
    decoder.into_sink()
}

pub fn decode(archive: &[u8], sizes: &[usize]) -> EventLog {
    decode_with(EventLog::new(), archive, sizes, DecoderOptions::default())
}

/// Chunk size patterns covering single bytes, odd splits and whole input.
pub fn chunkings(len: usize) -> Vec<Vec<usize>> {
    let mut state = 0x9E3779B97F4A7C15u64;
    let random: Vec<usize> = (0..64)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 97) as usize + 1
        })
        .collect();
    vec![vec![1], vec![2], vec![3, 5, 7], vec![4096], vec![len.max(1)], random]
}
