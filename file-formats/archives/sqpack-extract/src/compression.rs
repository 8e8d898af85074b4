//! Block compression used by patch chunks and data shard entries
//!
//! Both patch file-update chunks and data shard entries split their payload
//! into blocks that are either stored verbatim or compressed with raw deflate
//! (no zlib header). On disk a compressed size of [`STORED_BLOCK_MARKER`]
//! means the block is stored.

use crate::{Error, Result};
use flate2::Compression;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use std::borrow::Cow;
use std::io::{Read, Write};

/// Compressed-size value that marks a stored block
pub const STORED_BLOCK_MARKER: u32 = 32000;

/// One block of a patch file-update payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressedBlock {
    /// Bytes stored as-is
    Stored(Vec<u8>),
    /// Raw deflate stream with its declared decompressed size
    Deflate {
        /// Compressed bytes
        data: Vec<u8>,
        /// Size after decompression
        decompressed_size: usize,
    },
}

impl CompressedBlock {
    /// Decompressed contents of the block
    pub fn decompress(&self) -> Result<Cow<'_, [u8]>> {
        match self {
            CompressedBlock::Stored(data) => Ok(Cow::Borrowed(data)),
            CompressedBlock::Deflate {
                data,
                decompressed_size,
            } => inflate(data, *decompressed_size).map(Cow::Owned),
        }
    }

    /// Size after decompression
    pub fn decompressed_size(&self) -> usize {
        match self {
            CompressedBlock::Stored(data) => data.len(),
            CompressedBlock::Deflate {
                decompressed_size, ..
            } => *decompressed_size,
        }
    }
}

/// Decompress a raw deflate stream
///
/// The output must match `expected_size` exactly; a short or long stream
/// means the block was cut or mislabelled.
pub fn inflate(data: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let mut decoder = DeflateDecoder::new(data);
    let mut decompressed = Vec::with_capacity(expected_size);

    if let Err(e) = decoder.read_to_end(&mut decompressed) {
        log::debug!("Deflate decompression failed: {e}");
        log::trace!(
            "First 16 bytes of data: {:02X?}",
            &data[..16.min(data.len())]
        );
        return Err(Error::compression(format!("deflate: {e}")));
    }

    if decompressed.len() != expected_size {
        return Err(Error::InvalidFileSize {
            expected: expected_size as u64,
            actual: decompressed.len() as u64,
        });
    }

    Ok(decompressed)
}

/// Compress bytes with raw deflate
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| Error::compression(format!("deflate: {e}")))?;
    encoder
        .finish()
        .map_err(|e| Error::compression(format!("deflate: {e}")))
}
