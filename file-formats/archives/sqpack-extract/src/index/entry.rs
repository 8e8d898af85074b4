//! Index records: hash table entries and collision entries

use crate::Result;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Read;

/// Width of the path field in a collision record
pub const COLLISION_PATH_SIZE: usize = 240;

/// Size of one collision record in either format
pub const COLLISION_RECORD_SIZE: u32 = 256;

/// Physical location of a file: data shard number and byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Data shard (`.datN`) the entry lives in
    pub data_file_id: u8,
    /// Byte offset of the entry within that shard
    pub offset: u64,
}

/// Packed data word shared by hash and collision records
///
/// Bit 0 flags a collision, bits 1..4 hold the data shard id and the
/// remaining bits, masked to a multiple of 16 and scaled by 8, the offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataWord(pub u32);

impl DataWord {
    /// Pack a location, optionally flagged as a collision
    ///
    /// `offset` must be a multiple of 128 and below 32 GiB.
    pub fn pack(location: Location, collision: bool) -> Self {
        let offset_bits = ((location.offset / 8) as u32) & !0xF;
        let shard_bits = ((location.data_file_id as u32) & 0b111) << 1;
        Self(offset_bits | shard_bits | collision as u32)
    }

    /// Whether the path must be re-checked against the collision table
    pub fn is_collision(&self) -> bool {
        self.0 & 0b1 == 0b1
    }

    /// Data shard id
    pub fn data_file_id(&self) -> u8 {
        ((self.0 & 0b1110) >> 1) as u8
    }

    /// Byte offset within the data shard
    pub fn offset(&self) -> u64 {
        (self.0 & !0xF) as u64 * 0x08
    }

    /// Decoded location
    pub fn location(&self) -> Location {
        Location {
            data_file_id: self.data_file_id(),
            offset: self.offset(),
        }
    }
}

/// Hash key of a record, 64-bit for the wide format and 32-bit for narrow
pub trait PathHash: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    /// All-ones value that marks unused slots and the end of the collision table
    const SENTINEL: Self;

    /// Hash a logical path the way this record width expects
    fn of_path(path: &str) -> Self;

    /// Read a hash record (`hash`, `data`) in this width
    fn read_record<R: Read>(reader: &mut R) -> Result<(Self, DataWord)>;

    /// Read the leading part of a collision record up to the path field
    fn read_collision_prefix<R: Read>(reader: &mut R) -> Result<(Self, DataWord, u32)>;
}

impl PathHash for u64 {
    const SENTINEL: Self = u64::MAX;

    fn of_path(path: &str) -> Self {
        crate::hash::path_hash_wide(path)
    }

    fn read_record<R: Read>(reader: &mut R) -> Result<(Self, DataWord)> {
        let hash = reader.read_u64::<LittleEndian>()?;
        let data = DataWord(reader.read_u32::<LittleEndian>()?);
        let _padding = reader.read_u32::<LittleEndian>()?;
        Ok((hash, data))
    }

    fn read_collision_prefix<R: Read>(reader: &mut R) -> Result<(Self, DataWord, u32)> {
        let hash = reader.read_u64::<LittleEndian>()?;
        let data = DataWord(reader.read_u32::<LittleEndian>()?);
        let index = reader.read_u32::<LittleEndian>()?;
        Ok((hash, data, index))
    }
}

impl PathHash for u32 {
    const SENTINEL: Self = u32::MAX;

    fn of_path(path: &str) -> Self {
        crate::hash::path_hash_narrow(path)
    }

    fn read_record<R: Read>(reader: &mut R) -> Result<(Self, DataWord)> {
        let hash = reader.read_u32::<LittleEndian>()?;
        let data = DataWord(reader.read_u32::<LittleEndian>()?);
        Ok((hash, data))
    }

    fn read_collision_prefix<R: Read>(reader: &mut R) -> Result<(Self, DataWord, u32)> {
        let hash = reader.read_u32::<LittleEndian>()?;
        let _unknown = reader.read_u32::<LittleEndian>()?;
        let data = DataWord(reader.read_u32::<LittleEndian>()?);
        let index = reader.read_u32::<LittleEndian>()?;
        Ok((hash, data, index))
    }
}

/// One collision record: paths sharing a hash are told apart by literal path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionEntry<H> {
    /// Path hash shared with at least one other path
    pub hash: H,
    /// Location word for this particular path
    pub data: DataWord,
    /// Position of the record in the collision table
    pub index: u32,
    /// Literal logical path
    pub path: String,
}

impl<H: PathHash> CollisionEntry<H> {
    /// Read a 256-byte collision record
    pub fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let (hash, data, index) = H::read_collision_prefix(reader)?;

        let mut raw_path = [0u8; COLLISION_PATH_SIZE];
        reader.read_exact(&mut raw_path)?;
        let end = raw_path.iter().position(|&b| b == 0).unwrap_or(raw_path.len());
        let path = String::from_utf8_lossy(&raw_path[..end]).into_owned();

        Ok(Self {
            hash,
            data,
            index,
            path,
        })
    }
}
