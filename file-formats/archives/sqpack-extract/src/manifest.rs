//! Version manifests and the chain of previously processed versions
//!
//! A manifest records, for one game version, which blob backs each category
//! index and which blob backs each extracted logical path. Manifests are
//! written once, as `<dir>/<version>.json`, and never modified afterwards.
//! Older manifests form the lookup chain used to carry unchanged files
//! forward into newer versions.

use crate::store::ContentHash;
use crate::version::VersionId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Extension of manifest files
pub const MANIFEST_EXTENSION: &str = "json";

/// Where one logical path's bytes came from and where they are stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Blob holding the decoded file
    pub hash: ContentHash,
    /// Data shard the file lives in
    pub data_file_id: u8,
    /// Offset of the file's entry within that shard
    pub offset: u64,
}

/// Per-version record of index and file blobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionManifest {
    /// Version this manifest describes
    pub version: VersionId,
    /// Category id → index blob
    pub indexes: BTreeMap<u32, ContentHash>,
    /// Logical path → file record
    pub files: BTreeMap<String, FileRecord>,
}

impl VersionManifest {
    /// Create an empty manifest for `version`
    pub fn new(version: VersionId) -> Self {
        Self {
            version,
            indexes: BTreeMap::new(),
            files: BTreeMap::new(),
        }
    }

    /// Record the index blob of a category, keeping any earlier record
    pub fn record_index(&mut self, category: u32, hash: ContentHash) -> bool {
        if self.indexes.contains_key(&category) {
            log::warn!(
                "Index {category:06x} recorded twice for {}, keeping the first",
                self.version
            );
            return false;
        }
        self.indexes.insert(category, hash);
        true
    }

    /// Record a resolved logical path, keeping any earlier record
    pub fn record_file(&mut self, path: &str, record: FileRecord) -> bool {
        if self.files.contains_key(path) {
            log::warn!("{path} recorded twice for {}, keeping the first", self.version);
            return false;
        }
        self.files.insert(path.to_string(), record);
        true
    }

    /// Whether an index is recorded for every category in `categories`
    pub fn covers(&self, categories: &[u32]) -> bool {
        categories.iter().all(|c| self.indexes.contains_key(c))
    }

    /// Copy index records this manifest lacks from `previous`
    ///
    /// Returns the categories that were filled in.
    pub fn fill_missing_indexes(&mut self, previous: &VersionManifest) -> Vec<u32> {
        let missing: Vec<u32> = previous
            .indexes
            .keys()
            .filter(|c| !self.indexes.contains_key(c))
            .copied()
            .collect();
        for category in &missing {
            self.indexes
                .insert(*category, previous.indexes[category].clone());
        }
        missing
    }

    /// Path of the manifest file for `version` inside `dir`
    pub fn path_in(dir: &Path, version: &VersionId) -> PathBuf {
        dir.join(format!("{version}.{MANIFEST_EXTENSION}"))
    }

    /// Read a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|e| {
            log::warn!("Failed to parse manifest {}: {e}", path.display());
            Error::Json(e)
        })
    }

    /// Write the manifest into `dir` atomically
    ///
    /// The JSON is written to a temporary file in `dir` and renamed into place,
    /// so readers never observe a partial manifest.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let target = Self::path_in(dir, &self.version);
        let mut temp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, self)?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&target).map_err(|e| e.error)?;
        Ok(target)
    }
}

/// All persisted manifests, ordered by version
#[derive(Debug, Clone, Default)]
pub struct ManifestChain {
    manifests: Vec<VersionManifest>,
}

impl ManifestChain {
    /// Build a chain from manifests in any order
    pub fn from_manifests(mut manifests: Vec<VersionManifest>) -> Self {
        manifests.sort_by(|a, b| a.version.cmp(&b.version));
        Self { manifests }
    }

    /// Load every manifest in `dir`
    ///
    /// Unreadable manifests are left out of the chain with a warning.
    pub fn load_all(dir: &Path) -> Result<Self> {
        let mut manifests = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION)
            {
                continue;
            }
            match VersionManifest::load(&path) {
                Ok(manifest) => manifests.push(manifest),
                Err(e) => log::warn!("Skipping manifest {}: {e}", path.display()),
            }
        }
        log::debug!("Loaded {} manifests from {}", manifests.len(), dir.display());
        Ok(Self::from_manifests(manifests))
    }

    /// Whether a manifest for `version` exists in `dir`
    pub fn exists(dir: &Path, version: &VersionId) -> bool {
        VersionManifest::path_in(dir, version).is_file()
    }

    /// Manifests in ascending version order
    pub fn manifests(&self) -> &[VersionManifest] {
        &self.manifests
    }

    /// Number of manifests
    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    /// Whether the chain is empty
    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }

    /// Newest manifest of all
    pub fn latest(&self) -> Option<&VersionManifest> {
        self.manifests.last()
    }

    /// Newest manifest strictly older than `version`
    pub fn latest_before(&self, version: &VersionId) -> Option<&VersionManifest> {
        self.manifests.iter().rev().find(|m| m.version < *version)
    }

    /// Most recent record of `path` among manifests older than `version`
    ///
    /// Walks from newest to oldest and stops at the first hit.
    pub fn find_file_before(
        &self,
        version: &VersionId,
        path: &str,
    ) -> Option<(&VersionManifest, &FileRecord)> {
        self.manifests
            .iter()
            .rev()
            .filter(|m| m.version < *version)
            .find_map(|m| m.files.get(path).map(|record| (m, record)))
    }
}
