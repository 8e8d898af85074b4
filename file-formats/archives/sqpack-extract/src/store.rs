//! Content-addressed blob store
//!
//! Blobs are keyed by the SHA-256 of their bytes and stored as
//! `<root>/<first two hex chars>/<full hash>` without any envelope. Writes are
//! create-if-absent: the blob is written to a temporary file in the shard
//! directory and persisted without clobbering, so concurrent or repeated
//! writes of the same content are harmless.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Upper-case hex SHA-256 of a blob
///
/// Deserialization goes through [`ContentHash::from_hex`], so a manifest
/// carrying a malformed digest fails to load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentHash(String);

impl ContentHash {
    /// Hash the given bytes
    pub fn of(data: &[u8]) -> Self {
        Self(hex::encode_upper(Sha256::digest(data)))
    }

    /// Wrap an existing hex digest
    pub fn from_hex<S: Into<String>>(hex: S) -> Result<Self> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::invalid_format(format!("not a SHA-256 digest: {hex}")));
        }
        Ok(Self(hex.to_ascii_uppercase()))
    }

    /// Hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory name: the first two hex characters
    pub fn prefix(&self) -> &str {
        self.0.get(..2).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for ContentHash {
    type Error = Error;

    fn try_from(hex: String) -> Result<Self> {
        Self::from_hex(hex)
    }
}

impl From<ContentHash> for String {
    fn from(hash: ContentHash) -> Self {
        hash.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a [`ContentStore::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The blob was new and has been written
    Written,
    /// A blob with this hash already existed; nothing was written
    AlreadyPresent,
}

/// Content-addressed blob store rooted at a directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a blob with this hash is stored at
    pub fn blob_path(&self, hash: &ContentHash) -> PathBuf {
        self.root.join(hash.prefix()).join(hash.as_str())
    }

    /// Whether a blob with this hash exists
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.blob_path(hash).is_file()
    }

    /// Store bytes under their content hash
    pub fn put(&self, data: &[u8]) -> Result<(ContentHash, PutOutcome)> {
        let hash = ContentHash::of(data);
        let target = self.blob_path(&hash);
        if target.is_file() {
            return Ok((hash, PutOutcome::AlreadyPresent));
        }

        let shard_dir = self.root.join(hash.prefix());
        fs::create_dir_all(&shard_dir)?;

        let mut temp = NamedTempFile::new_in(&shard_dir)?;
        temp.write_all(data)?;
        temp.as_file().sync_all()?;

        match temp.persist_noclobber(&target) {
            Ok(_) => {
                log::trace!("Stored blob {hash} ({} bytes)", data.len());
                Ok((hash, PutOutcome::Written))
            }
            // Another writer got there first with identical content
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                Ok((hash, PutOutcome::AlreadyPresent))
            }
            Err(e) => Err(e.error.into()),
        }
    }

    /// Read a blob by hash
    pub fn get(&self, hash: &ContentHash) -> Result<Vec<u8>> {
        match fs::read(self.blob_path(hash)) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(Error::BlobNotFound(hash.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}
