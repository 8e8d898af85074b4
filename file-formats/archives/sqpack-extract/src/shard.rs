//! Patch target paths and the shards they name
//!
//! Patch chunks address their targets by path relative to the game
//! directory, e.g. `sqpack/ex1/020100.win32.dat0`. The file stem is the
//! category id in hex; the extension tells data shards from indexes.

use crate::{Error, Result};
use std::fmt;

/// What a shard file holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShardKind {
    /// Data shard `.datN`
    Data(u8),
    /// Primary index `.index`
    Index,
}

/// A category's data shard or index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShardTarget {
    /// Category id the shard belongs to
    pub category: u32,
    /// Data or index
    pub kind: ShardKind,
}

impl ShardTarget {
    /// Data shard `id` of a category
    pub fn data(category: u32, id: u8) -> Self {
        Self {
            category,
            kind: ShardKind::Data(id),
        }
    }

    /// Index of a category
    pub fn index(category: u32) -> Self {
        Self {
            category,
            kind: ShardKind::Index,
        }
    }

    /// Whether this is an index
    pub fn is_index(&self) -> bool {
        self.kind == ShardKind::Index
    }

    /// Data shard number, if this is a data shard
    pub fn data_file_id(&self) -> Option<u8> {
        match self.kind {
            ShardKind::Data(id) => Some(id),
            ShardKind::Index => None,
        }
    }

    /// Parse a patch target path
    ///
    /// Returns `Ok(None)` for targets the extractor does not track: movies,
    /// secondary `.index2` indexes and anything that is neither a data shard
    /// nor an index. A shard-looking path whose id cannot be read is an
    /// [`Error::InvalidShardPath`].
    pub fn parse(path: &str) -> Result<Option<Self>> {
        let relative = path.trim_start_matches(['/', '\\']);
        if relative.starts_with("movie") {
            return Ok(None);
        }

        let file_name = relative.rsplit(['/', '\\']).next().unwrap_or(relative);
        let Some((stem, extension)) = file_name.split_once(".win32.") else {
            return Ok(None);
        };

        let kind = if extension == "index" {
            ShardKind::Index
        } else if extension.starts_with("index") {
            // index2 and friends
            return Ok(None);
        } else if let Some(id) = extension.strip_prefix("dat") {
            let id = id
                .parse::<u8>()
                .map_err(|_| Error::InvalidShardPath(path.to_string()))?;
            ShardKind::Data(id)
        } else {
            return Ok(None);
        };

        if stem.len() != 6 {
            return Err(Error::InvalidShardPath(path.to_string()));
        }
        let category =
            u32::from_str_radix(stem, 16).map_err(|_| Error::InvalidShardPath(path.to_string()))?;

        Ok(Some(Self { category, kind }))
    }

    /// Game directory the shard lives in: `ffxiv` or `exN`
    pub fn expansion_dir(&self) -> String {
        match crate::category::expansion_of(self.category) {
            0 => "ffxiv".to_string(),
            n => format!("ex{n}"),
        }
    }

    /// Canonical target path, the inverse of [`parse`](Self::parse)
    pub fn path(&self) -> String {
        let extension = match self.kind {
            ShardKind::Data(id) => format!("dat{id}"),
            ShardKind::Index => "index".to_string(),
        };
        format!(
            "sqpack/{}/{:06x}.win32.{extension}",
            self.expansion_dir(),
            self.category
        )
    }
}

impl fmt::Display for ShardTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
