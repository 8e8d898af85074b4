//! Synthetic index blobs

use crate::hash::{path_hash_narrow, path_hash_wide};
use crate::index::{
    COLLISION_PATH_SIZE, COLLISION_RECORD_SIZE, DataWord, FILE_INFO_HEADER_SIZE, IndexType,
    Location, SQPACK_MAGIC, VERSION_HEADER_SIZE,
};

/// Builds an index blob with a hash table followed by a collision table
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    index_type: IndexType,
    records: Vec<(u64, DataWord)>,
    collisions: Vec<(u64, DataWord, String)>,
    data_file_count: u32,
}

impl IndexBuilder {
    /// Builder for the 32-bit full-path format
    pub fn narrow() -> Self {
        Self::new(IndexType::Narrow)
    }

    /// Builder for the 64-bit folder/file format
    pub fn wide() -> Self {
        Self::new(IndexType::Wide)
    }

    fn new(index_type: IndexType) -> Self {
        Self {
            index_type,
            records: Vec::new(),
            collisions: Vec::new(),
            data_file_count: 1,
        }
    }

    /// Hash of `path` in this builder's width
    pub fn hash_of(&self, path: &str) -> u64 {
        match self.index_type {
            IndexType::Wide => path_hash_wide(path),
            IndexType::Narrow => path_hash_narrow(path) as u64,
        }
    }

    /// Add a direct hash table record
    pub fn entry(mut self, path: &str, location: Location) -> Self {
        self.note_data_file(location);
        let hash = self.hash_of(path);
        self.records.push((hash, DataWord::pack(location, false)));
        self
    }

    /// Add unused all-ones slots to the hash table
    pub fn sentinel_records(mut self, count: usize) -> Self {
        for _ in 0..count {
            self.records.push((u64::MAX, DataWord(0)));
        }
        self
    }

    /// Add two paths that share a hash
    ///
    /// The hash table gets one flagged record and the collision table one
    /// record per path. Panics if the paths do not actually collide.
    pub fn colliding(
        mut self,
        first: &str,
        first_at: Location,
        second: &str,
        second_at: Location,
    ) -> Self {
        let hash = self.hash_of(first);
        assert_eq!(hash, self.hash_of(second), "{first} and {second} do not collide");

        self.note_data_file(first_at);
        self.note_data_file(second_at);
        self.records.push((hash, DataWord::pack(first_at, true)));
        self.collisions
            .push((hash, DataWord::pack(first_at, true), first.to_string()));
        self.collisions
            .push((hash, DataWord::pack(second_at, true), second.to_string()));
        self
    }

    /// Add a collision record without any hash table record
    pub fn collision_only(mut self, path: &str, location: Location) -> Self {
        self.note_data_file(location);
        let hash = self.hash_of(path);
        self.collisions
            .push((hash, DataWord::pack(location, true), path.to_string()));
        self
    }

    /// End the collision table with an all-ones record
    pub fn collision_terminator(mut self) -> Self {
        self.collisions.push((u64::MAX, DataWord(0), String::new()));
        self
    }

    fn note_data_file(&mut self, location: Location) {
        self.data_file_count = self.data_file_count.max(location.data_file_id as u32 + 1);
    }

    /// Serialize the index
    pub fn build(&self) -> Vec<u8> {
        let tables_start = (VERSION_HEADER_SIZE + FILE_INFO_HEADER_SIZE) as u32;
        let hash_size = self.records.len() as u32 * self.index_type.record_size();
        let collision_offset = tables_start + hash_size;
        let collision_size = self.collisions.len() as u32 * COLLISION_RECORD_SIZE;

        let mut out = vec![0u8; tables_start as usize];

        // Version header
        out[..6].copy_from_slice(SQPACK_MAGIC);
        put_u32(&mut out, 12, VERSION_HEADER_SIZE as u32);
        put_u32(&mut out, 16, 1);
        put_u32(&mut out, 20, 2);

        // File-info header
        let info = VERSION_HEADER_SIZE as usize;
        put_u32(&mut out, info, FILE_INFO_HEADER_SIZE as u32);
        put_u32(&mut out, info + 0x04, 1);
        put_u32(&mut out, info + 0x08, tables_start);
        put_u32(&mut out, info + 0x0C, hash_size);
        put_u32(&mut out, info + 0x50, self.data_file_count);
        put_u32(&mut out, info + 0x54, collision_offset);
        put_u32(&mut out, info + 0x58, collision_size);
        put_u32(&mut out, info + 0x9C, collision_offset + collision_size);
        put_u32(&mut out, info + 0xE4, collision_offset + collision_size);
        put_u32(&mut out, info + 0x12C, self.index_type as u32);

        for (hash, word) in &self.records {
            match self.index_type {
                IndexType::Wide => {
                    out.extend_from_slice(&hash.to_le_bytes());
                    out.extend_from_slice(&word.0.to_le_bytes());
                    out.extend_from_slice(&0u32.to_le_bytes());
                }
                IndexType::Narrow => {
                    out.extend_from_slice(&(*hash as u32).to_le_bytes());
                    out.extend_from_slice(&word.0.to_le_bytes());
                }
            }
        }

        for (i, (hash, word, path)) in self.collisions.iter().enumerate() {
            match self.index_type {
                IndexType::Wide => {
                    out.extend_from_slice(&hash.to_le_bytes());
                    out.extend_from_slice(&word.0.to_le_bytes());
                    out.extend_from_slice(&(i as u32).to_le_bytes());
                }
                IndexType::Narrow => {
                    out.extend_from_slice(&(*hash as u32).to_le_bytes());
                    out.extend_from_slice(&0u32.to_le_bytes());
                    out.extend_from_slice(&word.0.to_le_bytes());
                    out.extend_from_slice(&(i as u32).to_le_bytes());
                }
            }
            let mut field = [0u8; COLLISION_PATH_SIZE];
            let len = path.len().min(COLLISION_PATH_SIZE - 1);
            field[..len].copy_from_slice(&path.as_bytes()[..len]);
            out.extend_from_slice(&field);
        }

        out
    }
}

fn put_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
