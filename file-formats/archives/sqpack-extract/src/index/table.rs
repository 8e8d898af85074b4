//! Parsed index: path → (data shard, offset)

use super::entry::{COLLISION_RECORD_SIZE, CollisionEntry, DataWord, Location, PathHash};
use super::header::{FileInfoHeader, IndexType, Segment, VersionHeader};
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::{Cursor, Seek, SeekFrom};

/// Hash and collision tables for one record width
#[derive(Debug, Clone)]
pub struct IndexTables<H> {
    hashes: HashMap<H, DataWord>,
    collisions: Vec<CollisionEntry<H>>,
}

impl<H> Default for IndexTables<H> {
    fn default() -> Self {
        Self {
            hashes: HashMap::new(),
            collisions: Vec::new(),
        }
    }
}

impl<H: PathHash> IndexTables<H> {
    fn read(data: &[u8], info: &FileInfoHeader, record_size: u32) -> Result<Self> {
        check_segment(data, "hash table", &info.index_data)?;
        check_segment(data, "collision table", &info.collisions)?;

        let mut reader = Cursor::new(data);
        let mut tables = Self::default();

        reader.seek(SeekFrom::Start(info.index_data.offset as u64))?;
        for _ in 0..info.index_data.size / record_size {
            let (hash, word) = H::read_record(&mut reader)?;
            if hash == H::SENTINEL {
                continue;
            }
            tables.hashes.insert(hash, word);
        }

        reader.seek(SeekFrom::Start(info.collisions.offset as u64))?;
        for _ in 0..info.collisions.size / COLLISION_RECORD_SIZE {
            let entry = CollisionEntry::<H>::read(&mut reader)?;
            if entry.hash == H::SENTINEL {
                break;
            }
            tables.collisions.push(entry);
        }

        Ok(tables)
    }

    fn find_collision(&self, hash: H, path: &str) -> Option<Location> {
        self.collisions
            .iter()
            .find(|entry| entry.hash == hash && entry.path == path)
            .map(|entry| entry.data.location())
    }

    /// Hash records keyed by path hash
    pub fn hashes(&self) -> &HashMap<H, DataWord> {
        &self.hashes
    }

    /// Collision records in table order
    pub fn collisions(&self) -> &[CollisionEntry<H>] {
        &self.collisions
    }
}

/// Record layout of a parsed index, selected once from the header
#[derive(Debug, Clone)]
pub enum IndexFormat {
    /// Index that could not be parsed; every lookup misses
    Empty,
    /// 64-bit folder/file hashes
    Wide(IndexTables<u64>),
    /// 32-bit full-path hashes
    Narrow(IndexTables<u32>),
}

/// One category's index
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    format: IndexFormat,
    data_file_count: u32,
}

impl ArchiveIndex {
    /// An index with no records
    pub fn empty() -> Self {
        Self {
            format: IndexFormat::Empty,
            data_file_count: 0,
        }
    }

    /// Parse an index blob
    ///
    /// Fails with [`Error::NotAnArchive`] when the magic does not match and
    /// with [`Error::InvalidFormat`] for unknown record types or tables that
    /// run past the end of the blob. Callers that tolerate partial archives
    /// use [`ArchiveIndex::parse_or_empty`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = Cursor::new(data);
        VersionHeader::read(&mut reader)?;
        let info = FileInfoHeader::read(&mut reader)?;

        let index_type = info.index_type().ok_or_else(|| {
            Error::invalid_format(format!("unknown index type {}", info.index_type))
        })?;

        let format = match index_type {
            IndexType::Wide => {
                IndexFormat::Wide(IndexTables::read(data, &info, index_type.record_size())?)
            }
            IndexType::Narrow => {
                IndexFormat::Narrow(IndexTables::read(data, &info, index_type.record_size())?)
            }
        };

        Ok(Self {
            format,
            data_file_count: info.data_file_count,
        })
    }

    /// Parse an index blob, falling back to an empty index on any error
    ///
    /// The error is returned alongside so the caller can log it with context.
    pub fn parse_or_empty(data: &[u8]) -> (Self, Option<Error>) {
        match Self::parse(data) {
            Ok(index) => (index, None),
            Err(e) => (Self::empty(), Some(e)),
        }
    }

    /// Resolve a logical path to its data shard and offset
    pub fn lookup(&self, path: &str) -> Option<Location> {
        match &self.format {
            IndexFormat::Empty => None,
            IndexFormat::Wide(tables) => {
                let hash = u64::of_path(path);
                match tables.hashes.get(&hash) {
                    Some(word) if !word.is_collision() => Some(word.location()),
                    // Wide indexes also list some entries only in the collision table
                    _ => tables.find_collision(hash, path),
                }
            }
            IndexFormat::Narrow(tables) => {
                let hash = u32::of_path(path);
                let word = tables.hashes.get(&hash)?;
                if word.is_collision() {
                    tables.find_collision(hash, path)
                } else {
                    Some(word.location())
                }
            }
        }
    }

    /// Record layout
    pub fn format(&self) -> &IndexFormat {
        &self.format
    }

    /// Number of data shards declared by the header
    pub fn data_file_count(&self) -> u32 {
        self.data_file_count
    }

    /// Number of hash records
    pub fn len(&self) -> usize {
        match &self.format {
            IndexFormat::Empty => 0,
            IndexFormat::Wide(tables) => tables.hashes.len(),
            IndexFormat::Narrow(tables) => tables.hashes.len(),
        }
    }

    /// Whether the index has no hash records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of collision records
    pub fn collision_count(&self) -> usize {
        match &self.format {
            IndexFormat::Empty => 0,
            IndexFormat::Wide(tables) => tables.collisions.len(),
            IndexFormat::Narrow(tables) => tables.collisions.len(),
        }
    }
}

fn check_segment(data: &[u8], name: &str, segment: &Segment) -> Result<()> {
    match segment.end() {
        Some(end) if end <= data.len() as u64 => Ok(()),
        _ => Err(Error::invalid_format(format!(
            "{name} at 0x{:X}+0x{:X} exceeds index size 0x{:X}",
            segment.offset,
            segment.size,
            data.len()
        ))),
    }
}
