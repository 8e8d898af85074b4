//! SqPack index header structures and parsing

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Magic at the start of every SqPack file
pub const SQPACK_MAGIC: &[u8; 6] = b"SqPack";

/// Size of the version header
pub const VERSION_HEADER_SIZE: u64 = 0x400;

/// Size of the file-info header that follows it
pub const FILE_INFO_HEADER_SIZE: u64 = 0x400;

/// Record layout selected by the file-info header
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    /// 64-bit folder/file hashes, 16-byte records
    Wide = 0,
    /// 32-bit full-path hashes, 8-byte records
    Narrow = 2,
}

impl IndexType {
    /// Create from the raw header value
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(IndexType::Wide),
            2 => Some(IndexType::Narrow),
            _ => None,
        }
    }

    /// Size of one hash table record
    pub fn record_size(&self) -> u32 {
        match self {
            IndexType::Wide => 16,
            IndexType::Narrow => 8,
        }
    }
}

/// Version header (first 1024 bytes)
#[derive(Debug, Clone, Default)]
pub struct VersionHeader {
    /// Platform the archive was built for (0 = win32)
    pub platform_id: u8,
    /// Declared header size
    pub size: u32,
    /// Header version
    pub version: u32,
    /// SqPack file type (2 = index)
    pub file_type: u32,
    /// Build date
    pub date: u32,
    /// Build time
    pub time: u32,
}

impl VersionHeader {
    /// Read the version header, rejecting anything without the SqPack magic
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let mut magic = [0u8; 6];
        reader.read_exact(&mut magic)?;
        if &magic != SQPACK_MAGIC {
            return Err(Error::NotAnArchive(format!(
                "expected magic {:02X?}, got {:02X?}",
                SQPACK_MAGIC, magic
            )));
        }

        reader.seek(SeekFrom::Start(8))?;
        let platform_id = reader.read_u8()?;
        reader.seek(SeekFrom::Start(12))?;
        let size = reader.read_u32::<LittleEndian>()?;
        let version = reader.read_u32::<LittleEndian>()?;
        let file_type = reader.read_u32::<LittleEndian>()?;
        let date = reader.read_u32::<LittleEndian>()?;
        let time = reader.read_u32::<LittleEndian>()?;

        reader.seek(SeekFrom::Start(VERSION_HEADER_SIZE))?;

        Ok(Self {
            platform_id,
            size,
            version,
            file_type,
            date,
            time,
        })
    }
}

/// Location of one table inside the index blob
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Segment {
    /// Absolute offset in the blob
    pub offset: u32,
    /// Size in bytes
    pub size: u32,
}

impl Segment {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            offset: reader.read_u32::<LittleEndian>()?,
            size: reader.read_u32::<LittleEndian>()?,
        })
    }

    /// End offset, checked against overflow
    pub fn end(&self) -> Option<u64> {
        (self.offset as u64).checked_add(self.size as u64)
    }
}

/// File-info header (second 1024 bytes)
#[derive(Debug, Clone)]
pub struct FileInfoHeader {
    /// Declared header size
    pub size: u32,
    /// Header version
    pub version: u32,
    /// Hash table
    pub index_data: Segment,
    /// Number of data shards the index refers to
    pub data_file_count: u32,
    /// Collision (synonym) table
    pub collisions: Segment,
    /// Empty block table
    pub empty_blocks: Segment,
    /// Folder table
    pub directory: Segment,
    /// Raw index type value
    pub index_type: u32,
}

impl FileInfoHeader {
    /// Offset of each field relative to the start of this header
    const INDEX_DATA: u64 = 0x08;
    const DATA_FILE_COUNT: u64 = 0x50;
    const EMPTY_BLOCKS: u64 = 0x9C;
    const DIRECTORY: u64 = 0xE4;
    const INDEX_TYPE: u64 = 0x12C;

    /// Read the file-info header; the reader must be positioned at its start
    pub fn read<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let base = reader.stream_position()?;

        let size = reader.read_u32::<LittleEndian>()?;
        let version = reader.read_u32::<LittleEndian>()?;

        reader.seek(SeekFrom::Start(base + Self::INDEX_DATA))?;
        let index_data = Segment::read(reader)?;

        reader.seek(SeekFrom::Start(base + Self::DATA_FILE_COUNT))?;
        let data_file_count = reader.read_u32::<LittleEndian>()?;
        let collisions = Segment::read(reader)?;

        reader.seek(SeekFrom::Start(base + Self::EMPTY_BLOCKS))?;
        let empty_blocks = Segment::read(reader)?;

        reader.seek(SeekFrom::Start(base + Self::DIRECTORY))?;
        let directory = Segment::read(reader)?;

        reader.seek(SeekFrom::Start(base + Self::INDEX_TYPE))?;
        let index_type = reader.read_u32::<LittleEndian>()?;

        reader.seek(SeekFrom::Start(base + FILE_INFO_HEADER_SIZE))?;

        log::trace!(
            "Index file info: type={index_type}, hashes={:?}, collisions={:?}, dat files={data_file_count}",
            index_data,
            collisions
        );

        Ok(Self {
            size,
            version,
            index_data,
            data_file_count,
            collisions,
            empty_blocks,
            directory,
            index_type,
        })
    }

    /// Parsed index type, if known
    pub fn index_type(&self) -> Option<IndexType> {
        IndexType::from_raw(self.index_type)
    }
}
