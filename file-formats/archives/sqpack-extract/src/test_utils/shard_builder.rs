//! Whole data shards with matching indexes, and patches that ship them

use super::entry_builder::{ALIGNMENT, encode_entry};
use super::index_builder::IndexBuilder;
use crate::chunk::MemoryPatch;
use crate::compression::{CompressedBlock, deflate};
use crate::index::Location;
use crate::shard::ShardTarget;

/// Bytes reserved for the shard header before the first entry
pub const SHARD_HEADER_SIZE: usize = 0x800;

/// Size of the blocks file-update patches are cut into
pub const UPDATE_BLOCK_SIZE: usize = 0x4000;

/// Lays out files in one data shard of a category
#[derive(Debug, Clone)]
pub struct ShardBuilder {
    category: u32,
    data_file_id: u8,
    wide: bool,
    compress: bool,
    files: Vec<(String, Vec<u8>)>,
}

impl ShardBuilder {
    /// Builder for data shard 0 of `category`, narrow index, compressed entries
    pub fn new(category: u32) -> Self {
        Self {
            category,
            data_file_id: 0,
            wide: false,
            compress: true,
            files: Vec::new(),
        }
    }

    /// Place the files in another data shard
    pub fn data_file_id(mut self, id: u8) -> Self {
        self.data_file_id = id;
        self
    }

    /// Use the wide index format
    pub fn wide(mut self) -> Self {
        self.wide = true;
        self
    }

    /// Store entries without compression
    pub fn stored(mut self) -> Self {
        self.compress = false;
        self
    }

    /// Add a file
    pub fn file(mut self, path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.files.push((path.to_string(), data.into()));
        self
    }

    /// Add several files
    pub fn files<I, P, D>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = (P, D)>,
        P: Into<String>,
        D: Into<Vec<u8>>,
    {
        self.files
            .extend(files.into_iter().map(|(p, d)| (p.into(), d.into())));
        self
    }

    /// Lay out the shard and its index
    pub fn build(&self) -> BuiltShard {
        let mut dat = vec![0u8; SHARD_HEADER_SIZE];
        let mut index = if self.wide {
            IndexBuilder::wide()
        } else {
            IndexBuilder::narrow()
        };
        let mut files = Vec::with_capacity(self.files.len());

        for (path, data) in &self.files {
            let location = Location {
                data_file_id: self.data_file_id,
                offset: dat.len() as u64,
            };
            let entry = encode_entry(data, self.compress);
            dat.extend_from_slice(&entry);
            dat.resize(dat.len().div_ceil(ALIGNMENT) * ALIGNMENT, 0);

            index = index.entry(path, location);
            files.push(BuiltFile {
                path: path.clone(),
                location,
                data: data.clone(),
                entry,
            });
        }

        BuiltShard {
            category: self.category,
            data_file_id: self.data_file_id,
            index: index.build(),
            dat,
            files,
        }
    }
}

/// One file placed in a built shard
#[derive(Debug, Clone)]
pub struct BuiltFile {
    /// Logical path
    pub path: String,
    /// Where the index points
    pub location: Location,
    /// Decoded contents
    pub data: Vec<u8>,
    /// Packed entry as written to the shard
    pub entry: Vec<u8>,
}

/// A data shard, its index and the files in it
#[derive(Debug, Clone)]
pub struct BuiltShard {
    /// Category
    pub category: u32,
    /// Data shard number
    pub data_file_id: u8,
    /// Index blob
    pub index: Vec<u8>,
    /// Data shard bytes
    pub dat: Vec<u8>,
    /// Placed files, in insertion order
    pub files: Vec<BuiltFile>,
}

impl BuiltShard {
    /// Patch target of the index
    pub fn index_target(&self) -> String {
        ShardTarget::index(self.category).path()
    }

    /// Patch target of the data shard
    pub fn dat_target(&self) -> String {
        ShardTarget::data(self.category, self.data_file_id).path()
    }

    /// Placed file by path
    pub fn file(&self, path: &str) -> Option<&BuiltFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Patch writing the index and one add-data chunk per entry
    pub fn add_data_patch(&self, name: &str) -> MemoryPatch {
        let mut patch = self.index_patch(name);
        for file in &self.files {
            patch = patch.add_data(&self.dat_target(), file.location.offset, file.entry.clone());
        }
        patch
    }

    /// Patch rewriting the index and the whole data shard via file updates
    pub fn file_update_patch(&self, name: &str) -> MemoryPatch {
        MemoryPatch::named(name)
            .expect("valid patch name")
            .file_update(
                &self.index_target(),
                0,
                vec![CompressedBlock::Stored(self.index.clone())],
            )
            .file_update(&self.dat_target(), 0, deflate_blocks(&self.dat))
    }

    /// Patch writing only the index
    pub fn index_patch(&self, name: &str) -> MemoryPatch {
        MemoryPatch::named(name)
            .expect("valid patch name")
            .add_data(&self.index_target(), 0, self.index.clone())
    }
}

fn deflate_blocks(data: &[u8]) -> Vec<CompressedBlock> {
    data.chunks(UPDATE_BLOCK_SIZE)
        .map(|chunk| CompressedBlock::Deflate {
            data: deflate(chunk).expect("deflate into memory"),
            decompressed_size: chunk.len(),
        })
        .collect()
}
