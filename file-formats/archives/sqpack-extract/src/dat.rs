//! Packed file entries inside data shards
//!
//! An index lookup yields the offset of an entry inside a `.datN` shard. The
//! entry starts with a small header and a block table; every block carries
//! its own header and a stored or deflated payload. Only the standard entry
//! type, used for sheet files and everything else that is not a model or a
//! texture, is decoded here.

use crate::compression::{STORED_BLOCK_MARKER, inflate};
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

/// Size of the fixed part of an entry header
pub const ENTRY_HEADER_SIZE: u32 = 24;

/// Size of one block descriptor in a standard entry
pub const BLOCK_DESCRIPTOR_SIZE: u32 = 8;

/// Size of the header in front of every block payload
pub const BLOCK_HEADER_SIZE: u32 = 16;

/// Entry types found in data shards
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryType {
    /// Placeholder without payload
    Empty = 1,
    /// Plain file split into blocks
    Standard = 2,
    /// Model with per-LOD block groups
    Model = 3,
    /// Texture with mip-level block groups
    Texture = 4,
}

impl EntryType {
    /// Create from the raw header value
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(EntryType::Empty),
            2 => Some(EntryType::Standard),
            3 => Some(EntryType::Model),
            4 => Some(EntryType::Texture),
            _ => None,
        }
    }
}

/// Fixed entry header
#[derive(Debug, Clone)]
pub struct EntryHeader {
    /// Size of header plus block table; block offsets are relative to its end
    pub header_size: u32,
    /// Raw entry type
    pub entry_type: u32,
    /// Size of the decoded file
    pub raw_file_size: u32,
    /// Number of blocks
    pub block_count: u32,
}

impl EntryHeader {
    /// Read the fixed header
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let header_size = reader.read_u32::<LittleEndian>()?;
        let entry_type = reader.read_u32::<LittleEndian>()?;
        let raw_file_size = reader.read_u32::<LittleEndian>()?;
        let _unknown = [
            reader.read_u32::<LittleEndian>()?,
            reader.read_u32::<LittleEndian>()?,
        ];
        let block_count = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            header_size,
            entry_type,
            raw_file_size,
            block_count,
        })
    }
}

/// Block table entry of a standard entry
#[derive(Debug, Clone, Copy)]
pub struct BlockDescriptor {
    /// Offset of the block header, relative to the end of the entry header
    pub offset: u32,
    /// Compressed size including the block header
    pub compressed_size: u16,
    /// Decompressed size of the block
    pub decompressed_size: u16,
}

impl BlockDescriptor {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        Ok(Self {
            offset: reader.read_u32::<LittleEndian>()?,
            compressed_size: reader.read_u16::<LittleEndian>()?,
            decompressed_size: reader.read_u16::<LittleEndian>()?,
        })
    }
}

/// Decode the standard entry that starts at `offset`
pub fn read_entry<R: Read + Seek>(reader: &mut R, offset: u64) -> Result<Vec<u8>> {
    reader.seek(SeekFrom::Start(offset))?;
    let header = EntryHeader::read(reader)?;

    match EntryType::from_raw(header.entry_type) {
        Some(EntryType::Standard) => {}
        _ => return Err(Error::UnsupportedEntryType(header.entry_type)),
    }

    let table_end = (header.block_count as u64)
        .checked_mul(BLOCK_DESCRIPTOR_SIZE as u64)
        .and_then(|size| size.checked_add(ENTRY_HEADER_SIZE as u64));
    if table_end.is_none_or(|end| end > header.header_size as u64) {
        return Err(Error::invalid_format(format!(
            "entry at 0x{offset:X} declares {} blocks in a {}-byte header",
            header.block_count, header.header_size
        )));
    }

    let mut blocks = Vec::with_capacity(header.block_count as usize);
    for _ in 0..header.block_count {
        blocks.push(BlockDescriptor::read(reader)?);
    }

    let data_start = offset + header.header_size as u64;
    let mut output = Vec::with_capacity(header.raw_file_size as usize);
    for block in &blocks {
        read_block(reader, data_start + block.offset as u64, &mut output)?;
    }

    if output.len() != header.raw_file_size as usize {
        return Err(Error::InvalidFileSize {
            expected: header.raw_file_size as u64,
            actual: output.len() as u64,
        });
    }

    Ok(output)
}

fn read_block<R: Read + Seek>(reader: &mut R, position: u64, output: &mut Vec<u8>) -> Result<()> {
    reader.seek(SeekFrom::Start(position))?;
    let header_size = reader.read_u32::<LittleEndian>()?;
    let _unknown = reader.read_u32::<LittleEndian>()?;
    let compressed_size = reader.read_u32::<LittleEndian>()?;
    let decompressed_size = reader.read_u32::<LittleEndian>()?;

    reader.seek(SeekFrom::Start(position + header_size as u64))?;

    if compressed_size == STORED_BLOCK_MARKER {
        let start = output.len();
        output.resize(start + decompressed_size as usize, 0);
        reader.read_exact(&mut output[start..])?;
    } else {
        let mut compressed = vec![0u8; compressed_size as usize];
        reader.read_exact(&mut compressed)?;
        output.extend_from_slice(&inflate(&compressed, decompressed_size as usize)?);
    }

    Ok(())
}
