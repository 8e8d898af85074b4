//! Decoded patch chunks and the sources that yield them
//!
//! Reading the patch container itself is left to the caller; the extractor
//! only sees the two chunk kinds that carry archive bytes.

use crate::Result;
use crate::compression::CompressedBlock;
use crate::version::PatchName;
use std::collections::VecDeque;

/// One unit of an incremental update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchChunk {
    /// Literal bytes written into a shard at an absolute offset
    AddData {
        /// Shard path relative to the game directory
        target: String,
        /// Byte offset in the shard
        offset: u64,
        /// Bytes to write
        data: Vec<u8>,
    },
    /// A file rewritten from a list of compressed blocks
    FileUpdate {
        /// File path relative to the game directory
        target: String,
        /// Byte offset the first block is written at
        offset: u64,
        /// Blocks, decompressed and written back to back
        blocks: Vec<CompressedBlock>,
    },
}

impl PatchChunk {
    /// Target path of the chunk
    pub fn target(&self) -> &str {
        match self {
            PatchChunk::AddData { target, .. } | PatchChunk::FileUpdate { target, .. } => target,
        }
    }

    /// Offset the chunk writes at
    pub fn offset(&self) -> u64 {
        match self {
            PatchChunk::AddData { offset, .. } | PatchChunk::FileUpdate { offset, .. } => *offset,
        }
    }
}

/// A patch file that yields decoded chunks in file order
pub trait ChunkSource {
    /// Name of the patch, which carries its version
    fn name(&self) -> &PatchName;

    /// Next chunk, or `None` once the patch is exhausted
    fn next_chunk(&mut self) -> Result<Option<PatchChunk>>;
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn name(&self) -> &PatchName {
        (**self).name()
    }

    fn next_chunk(&mut self) -> Result<Option<PatchChunk>> {
        (**self).next_chunk()
    }
}

/// Patch whose chunks are already in memory
#[derive(Debug, Clone)]
pub struct MemoryPatch {
    name: PatchName,
    chunks: VecDeque<PatchChunk>,
}

impl MemoryPatch {
    /// Create an empty patch
    pub fn new(name: PatchName) -> Self {
        Self {
            name,
            chunks: VecDeque::new(),
        }
    }

    /// Create a patch from a file name such as `D2023.03.28.0000.0001.patch`
    pub fn named(file_name: &str) -> Result<Self> {
        Ok(Self::new(PatchName::parse(file_name)?))
    }

    /// Append a chunk
    pub fn push(&mut self, chunk: PatchChunk) -> &mut Self {
        self.chunks.push_back(chunk);
        self
    }

    /// Append a chunk, builder style
    pub fn with_chunk(mut self, chunk: PatchChunk) -> Self {
        self.chunks.push_back(chunk);
        self
    }

    /// Append an add-data chunk, builder style
    pub fn add_data(self, target: &str, offset: u64, data: Vec<u8>) -> Self {
        self.with_chunk(PatchChunk::AddData {
            target: target.to_string(),
            offset,
            data,
        })
    }

    /// Append a file-update chunk, builder style
    pub fn file_update(self, target: &str, offset: u64, blocks: Vec<CompressedBlock>) -> Self {
        self.with_chunk(PatchChunk::FileUpdate {
            target: target.to_string(),
            offset,
            blocks,
        })
    }

    /// Chunks not yet consumed
    pub fn remaining(&self) -> usize {
        self.chunks.len()
    }
}

impl ChunkSource for MemoryPatch {
    fn name(&self) -> &PatchName {
        &self.name
    }

    fn next_chunk(&mut self) -> Result<Option<PatchChunk>> {
        Ok(self.chunks.pop_front())
    }
}
