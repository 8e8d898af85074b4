//! Routing of patch chunks into per-shard sparse stores
//!
//! Add-data chunks and file-update chunks are kept apart: an add-data store
//! holds entries written piecewise at their own offsets, while a
//! file-update store holds a shard that was rewritten wholesale. The
//! resolver treats the two differently.

use crate::Result;
use crate::chunk::{ChunkSource, PatchChunk};
use crate::shard::ShardTarget;
use crate::sparse::SparseByteStore;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};

/// Counters for one routing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteStats {
    /// Add-data chunks applied
    pub add_data: usize,
    /// File-update chunks applied
    pub file_updates: usize,
    /// Chunks whose target is not tracked
    pub ignored: usize,
    /// Decompressed bytes written
    pub bytes: u64,
}

/// Applies patch chunks, in order, to sparse stores keyed by shard
#[derive(Debug, Default)]
pub struct PatchChunkRouter {
    scratch_dir: Option<PathBuf>,
    add_data: HashMap<ShardTarget, SparseByteStore>,
    file_updates: HashMap<ShardTarget, SparseByteStore>,
    stats: RouteStats,
}

impl PatchChunkRouter {
    /// Router whose stores live in the system temp directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Router whose stores live in `dir`
    pub fn with_scratch_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            scratch_dir: Some(dir.into()),
            ..Self::default()
        }
    }

    /// Apply one chunk
    ///
    /// Untracked targets (movies, secondary indexes, non-archive files) are
    /// skipped, as are targets whose shard id cannot be parsed.
    pub fn route(&mut self, chunk: PatchChunk) -> Result<()> {
        let target = match ShardTarget::parse(chunk.target()) {
            Ok(Some(target)) => target,
            Ok(None) => {
                log::trace!("Ignoring chunk for {}", chunk.target());
                self.stats.ignored += 1;
                return Ok(());
            }
            Err(e) => {
                log::warn!("Ignoring chunk: {e}");
                self.stats.ignored += 1;
                return Ok(());
            }
        };

        let scratch = self.scratch_dir.as_deref();
        match chunk {
            PatchChunk::AddData { offset, data, .. } => {
                let store = store_for(&mut self.add_data, scratch, target)?;
                store.write(offset, &data)?;
                // A rewritten index keeps taking later writes in chunk order
                if target.is_index() {
                    if let Some(rewritten) = self.file_updates.get_mut(&target) {
                        rewritten.write(offset, &data)?;
                    }
                }
                self.stats.add_data += 1;
                self.stats.bytes += data.len() as u64;
            }
            PatchChunk::FileUpdate { offset, blocks, .. } => {
                // Earlier add-data writes to an index survive outside the rewrite
                let seed = if target.is_index() && !self.file_updates.contains_key(&target) {
                    self.add_data
                        .get(&target)
                        .map(SparseByteStore::contents)
                        .transpose()?
                } else {
                    None
                };
                let store = store_for(&mut self.file_updates, scratch, target)?;
                if let Some(seed) = seed {
                    store.write(0, &seed)?;
                }
                let mut position = offset;
                for block in &blocks {
                    let data = block.decompress()?;
                    store.write(position, &data)?;
                    position += data.len() as u64;
                }
                self.stats.file_updates += 1;
                self.stats.bytes += position - offset;
            }
        }

        Ok(())
    }

    /// Drain a patch, applying every chunk in order
    ///
    /// Returns the number of chunks read.
    pub fn route_source<S: ChunkSource + ?Sized>(&mut self, source: &mut S) -> Result<usize> {
        let mut count = 0;
        while let Some(chunk) = source.next_chunk()? {
            self.route(chunk)?;
            count += 1;
        }
        log::debug!("Routed {count} chunks from {}", source.name());
        Ok(count)
    }

    /// Store fed by add-data chunks for `target`
    pub fn add_data_store(&self, target: &ShardTarget) -> Option<&SparseByteStore> {
        self.add_data.get(target)
    }

    /// Store fed by file-update chunks for `target`
    pub fn file_update_store(&self, target: &ShardTarget) -> Option<&SparseByteStore> {
        self.file_updates.get(target)
    }

    /// Every index target written by this run, ascending
    pub fn index_targets(&self) -> Vec<ShardTarget> {
        let mut targets: Vec<ShardTarget> = self
            .add_data
            .keys()
            .chain(self.file_updates.keys())
            .filter(|t| t.is_index())
            .copied()
            .collect();
        targets.sort();
        targets.dedup();
        targets
    }

    /// Accumulated bytes of an index
    ///
    /// Once an index is rewritten by a file update, its store also carries
    /// the add-data writes to that index in chunk order, so it is the one
    /// read here.
    pub fn index_bytes(&self, target: &ShardTarget) -> Result<Option<Vec<u8>>> {
        match self
            .file_updates
            .get(target)
            .or_else(|| self.add_data.get(target))
        {
            Some(store) => store.contents().map(Some),
            None => Ok(None),
        }
    }

    /// Counters so far
    pub fn stats(&self) -> RouteStats {
        self.stats
    }

    /// Whether no chunk has been applied
    pub fn is_empty(&self) -> bool {
        self.add_data.is_empty() && self.file_updates.is_empty()
    }

    /// Delete every backing file, reporting the first error
    pub fn close(self) -> Result<()> {
        let mut result = Ok(());
        for store in self.add_data.into_values().chain(self.file_updates.into_values()) {
            if let Err(e) = store.close() {
                log::warn!("Failed to remove sparse store: {e}");
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }
}

fn store_for<'a>(
    stores: &'a mut HashMap<ShardTarget, SparseByteStore>,
    scratch: Option<&Path>,
    target: ShardTarget,
) -> Result<&'a mut SparseByteStore> {
    match stores.entry(target) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(entry) => {
            log::debug!("New sparse store for {target}");
            let store = match scratch {
                Some(dir) => SparseByteStore::new_in(dir)?,
                None => SparseByteStore::new()?,
            };
            Ok(entry.insert(store))
        }
    }
}
