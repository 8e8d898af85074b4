//! Disk-backed accumulator for sparse, out-of-order writes
//!
//! Patches rewrite shards in many small pieces that arrive in arbitrary order.
//! [`SparseByteStore`] writes each piece into a private scratch file at its
//! absolute offset and remembers where pieces *started*, so a piece can later
//! be read back by its start offset alone.
//!
//! The extent table only records the length of the *first* write seen at a
//! given start offset. A later write to the same offset replaces the bytes on
//! disk but keeps the original length; see
//! `test_rewrite_same_offset_keeps_first_length`.

use crate::Result;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Sparse byte accumulator backed by a temporary file
///
/// The backing file is deleted when the store is dropped or closed.
#[derive(Debug)]
pub struct SparseByteStore {
    backing: NamedTempFile,
    extents: BTreeMap<u64, u64>,
    bytes_written: u64,
}

impl SparseByteStore {
    /// Create a store backed by a file in the system temp directory
    pub fn new() -> Result<Self> {
        Ok(Self::with_backing(NamedTempFile::new()?))
    }

    /// Create a store backed by a file in `dir`
    pub fn new_in<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Ok(Self::with_backing(NamedTempFile::new_in(dir)?))
    }

    fn with_backing(backing: NamedTempFile) -> Self {
        log::trace!("New sparse store at {}", backing.path().display());
        Self {
            backing,
            extents: BTreeMap::new(),
            bytes_written: 0,
        }
    }

    /// Write `bytes` at absolute position `offset`
    ///
    /// Records an extent only if no write has started at `offset` before.
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        let file = self.backing.as_file_mut();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(bytes)?;
        file.flush()?;

        self.extents.entry(offset).or_insert(bytes.len() as u64);
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    /// Read back the extent that starts exactly at `offset`
    pub fn read_at(&self, offset: u64) -> Result<Option<Vec<u8>>> {
        let Some(&length) = self.extents.get(&offset) else {
            return Ok(None);
        };
        self.read_range(offset, length).map(Some)
    }

    /// Read `length` bytes of the backing file starting at `offset`
    ///
    /// Unlike [`read_at`](Self::read_at) this ignores the extent table.
    pub fn read_range(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut reader = self.reader()?;
        reader.seek(SeekFrom::Start(offset))?;
        let mut data = vec![0u8; length as usize];
        reader.read_exact(&mut data)?;
        Ok(data)
    }

    /// Whole backing file, gaps included as zero bytes
    pub fn contents(&self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.reader()?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Independent read handle on the backing file
    pub fn reader(&self) -> Result<File> {
        Ok(self.backing.reopen()?)
    }

    /// Recorded extent start offsets, ascending
    pub fn extents(&self) -> impl Iterator<Item = u64> + '_ {
        self.extents.keys().copied()
    }

    /// Recorded length of the extent starting at `offset`
    pub fn extent_len(&self, offset: u64) -> Option<u64> {
        self.extents.get(&offset).copied()
    }

    /// Number of recorded extents
    pub fn len(&self) -> usize {
        self.extents.len()
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.extents.is_empty()
    }

    /// Total bytes passed to [`write`](Self::write), overlaps counted twice
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        self.backing.path()
    }

    /// Delete the backing file, reporting any error
    pub fn close(self) -> Result<()> {
        self.backing.close()?;
        Ok(())
    }
}
