//! State scoped to a single extraction run

use crate::Result;
use crate::category::category_for_path;
use crate::index::{ArchiveIndex, Location};
use crate::router::PatchChunkRouter;
use crate::version::VersionId;
use std::collections::HashMap;
use std::path::PathBuf;

/// Sparse stores and parsed indexes of one batch
///
/// Nothing here outlives the run. Dropping the context deletes every
/// sparse store's backing file.
#[derive(Debug)]
pub struct RunContext {
    version: VersionId,
    router: PatchChunkRouter,
    indexes: HashMap<u32, ArchiveIndex>,
}

impl RunContext {
    /// Context for a run producing `version`
    pub fn new(version: VersionId, scratch_dir: Option<PathBuf>) -> Self {
        let router = match scratch_dir {
            Some(dir) => PatchChunkRouter::with_scratch_dir(dir),
            None => PatchChunkRouter::new(),
        };
        Self {
            version,
            router,
            indexes: HashMap::new(),
        }
    }

    /// Version being produced
    pub fn version(&self) -> &VersionId {
        &self.version
    }

    /// Chunk router and its stores
    pub fn router(&self) -> &PatchChunkRouter {
        &self.router
    }

    /// Mutable chunk router, for the routing phase
    pub fn router_mut(&mut self) -> &mut PatchChunkRouter {
        &mut self.router
    }

    /// Parse and cache the index of `category`
    ///
    /// An index that fails to parse is cached as empty so every lookup in
    /// that category misses; the failure is logged.
    pub fn load_index(&mut self, category: u32, data: &[u8]) -> &ArchiveIndex {
        let (index, error) = ArchiveIndex::parse_or_empty(data);
        match error {
            Some(e) => log::warn!(
                "Index {category:06x} for {} is unusable, treating it as empty: {e}",
                self.version
            ),
            None => log::debug!(
                "Index {category:06x}: {} records, {} collisions",
                index.len(),
                index.collision_count()
            ),
        }
        self.indexes.insert(category, index);
        &self.indexes[&category]
    }

    /// Cache an empty index for `category`
    pub fn load_empty_index(&mut self, category: u32) {
        self.indexes.insert(category, ArchiveIndex::empty());
    }

    /// Whether `category` has a cached index
    pub fn has_index(&self, category: u32) -> bool {
        self.indexes.contains_key(&category)
    }

    /// Cached index of `category`
    pub fn index(&self, category: u32) -> Option<&ArchiveIndex> {
        self.indexes.get(&category)
    }

    /// Category and location of a logical path in the cached indexes
    pub fn lookup(&self, path: &str) -> (u32, Option<Location>) {
        let category = category_for_path(path);
        let location = self.index(category).and_then(|index| index.lookup(path));
        (category, location)
    }

    /// Delete every sparse store's backing file
    pub fn close(self) -> Result<()> {
        self.router.close()
    }
}
