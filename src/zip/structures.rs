use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use super::error::{Result, UnzipError};

/// Local File Header signature (`PK\x03\x04`).
pub const LOCAL_FILE_SIGNATURE: u32 = 0x04034b50;
/// Data Descriptor signature (`PK\x07\x08`).
pub const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;
/// Archive Extra Data signature (`PK\x06\x08`).
pub const ARCHIVE_EXTRA_DATA_SIGNATURE: u32 = 0x08064b50;
/// Central Directory File Header signature (`PK\x01\x02`).
pub const CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x02014b50;

/// Low 16 bits shared by every PK signature.
const PK_MARKER: u32 = 0x4B50;

/// Size of a signature in bytes.
pub const SIGNATURE_SIZE: usize = 4;
/// Fixed part of the Local File Header that follows its signature.
pub const LOCAL_HEADER_SIZE: usize = 26;
/// Data Descriptor body that follows its signature (crc32 + two sizes).
pub const DATA_DESCRIPTOR_SIZE: usize = 12;

/// General purpose flag bit 3: sizes and CRC live in a trailing data descriptor.
pub const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;

/// Record type identified by a 4-byte signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    None,
    LocalFile,
    DataDescriptor,
    ArchiveExtraData,
    CentralDirectory,
}

impl FrameKind {
    /// Classify a little-endian signature word.
    pub fn from_word(word: u32) -> Self {
        if word & PK_MARKER != PK_MARKER {
            return FrameKind::None;
        }
        match word {
            LOCAL_FILE_SIGNATURE => FrameKind::LocalFile,
            DATA_DESCRIPTOR_SIGNATURE => FrameKind::DataDescriptor,
            ARCHIVE_EXTRA_DATA_SIGNATURE => FrameKind::ArchiveExtraData,
            CENTRAL_DIRECTORY_SIGNATURE => FrameKind::CentralDirectory,
            _ => FrameKind::None,
        }
    }

    /// Classify the first four bytes of `data`.
    ///
    /// Returns [`FrameKind::None`] when fewer than four bytes are given.
    pub fn from_bytes(data: &[u8]) -> Self {
        match data.first_chunk::<SIGNATURE_SIZE>() {
            Some(sig) => Self::from_word(u32::from_le_bytes(*sig)),
            None => FrameKind::None,
        }
    }
}

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// Fixed part of a Local File Header, decoded from the 26 bytes that
/// follow the `PK\x03\x04` signature.
///
/// No semantic validation happens here; inconsistent sizes only show up
/// later as stream errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub last_mod_time: u16,
    pub last_mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub file_name_length: u16,
    pub extra_field_length: u16,
}

impl LocalFileHeader {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < LOCAL_HEADER_SIZE {
            return Err(UnzipError::InvalidArchive("short local file header"));
        }

        let mut cursor = Cursor::new(&data[..LOCAL_HEADER_SIZE]);
        let truncated =
            |_: std::io::Error| UnzipError::InvalidArchive("short local file header");

        Ok(Self {
            version_needed: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            flags: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            compression_method: CompressionMethod::from_u16(
                cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            ),
            last_mod_time: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            last_mod_date: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            crc32: cursor.read_u32::<LittleEndian>().map_err(truncated)?,
            compressed_size: cursor.read_u32::<LittleEndian>().map_err(truncated)?,
            uncompressed_size: cursor.read_u32::<LittleEndian>().map_err(truncated)?,
            file_name_length: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
            extra_field_length: cursor.read_u16::<LittleEndian>().map_err(truncated)?,
        })
    }

    /// Bit 3 is set: sizes are carried by a trailing data descriptor.
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Zero sizes and no flags mark a directory entry.
    pub fn is_folder_marker(&self) -> bool {
        self.compressed_size == 0 && self.uncompressed_size == 0 && self.flags == 0
    }

    /// Whether the entry data length is known before reading it.
    pub fn has_known_size(&self) -> bool {
        !self.has_data_descriptor() || self.compressed_size > 0
    }

    /// Parse modification date to (year, month, day)
    pub fn mod_date(&self) -> (u16, u8, u8) {
        let day = (self.last_mod_date & 0x1F) as u8;
        let month = ((self.last_mod_date >> 5) & 0x0F) as u8;
        let year = ((self.last_mod_date >> 9) & 0x7F) + 1980;
        (year, month, day)
    }

    /// Parse modification time to (hour, minute, second)
    pub fn mod_time(&self) -> (u8, u8, u8) {
        let second = ((self.last_mod_time & 0x1F) * 2) as u8;
        let minute = ((self.last_mod_time >> 5) & 0x3F) as u8;
        let hour = ((self.last_mod_time >> 11) & 0x1F) as u8;
        (hour, minute, second)
    }
}
