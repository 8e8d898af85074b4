//! # sqpack_extract - Sheet extraction from SqPack patches
//!
//! Rebuilds the sheet files of a SqPack game archive from incremental
//! patches and stores them in a content-addressed blob store, one manifest
//! per game version.
//!
//! ## Features
//!
//! - Index parsing for both record widths, with collision table fallback
//! - Sparse, out-of-order reassembly of patched shards
//! - Three-tier resolution: add-data writes, rewritten shards, earlier versions
//! - SHA-256 blob deduplication and atomic manifest commits
//!
//! ## Examples
//!
//! ```no_run
//! use sqpack_extract::{ExtractionPipeline, MemoryPatch};
//!
//! # fn main() -> Result<(), sqpack_extract::Error> {
//! let pipeline = ExtractionPipeline::new("manifests", "blobs")?;
//!
//! // Chunks come from a patch container reader
//! let patch = MemoryPatch::named("D2023.03.28.0000.0001.patch")?;
//! for outcome in pipeline.process_all(vec![patch])? {
//!     println!("{outcome:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod category;
pub mod chunk;
pub mod compression;
pub mod context;
pub mod dat;
pub mod error;
pub mod excel;
pub mod hash;
pub mod index;
pub mod manifest;
pub mod pipeline;
pub mod router;
pub mod shard;
pub mod sparse;
pub mod store;
pub mod version;

#[cfg(any(test, feature = "test-utils", doc))]
pub mod test_utils;

// Re-export commonly used types
pub use category::{KNOWN_CATEGORIES, category_for_path};
pub use chunk::{ChunkSource, MemoryPatch, PatchChunk};
pub use compression::CompressedBlock;
pub use context::RunContext;
pub use error::{Error, Result};
pub use excel::{Language, SheetHeader, SheetList};
pub use hash::{path_hash_narrow, path_hash_wide};
pub use index::{ArchiveIndex, IndexFormat, Location};
pub use manifest::{FileRecord, ManifestChain, VersionManifest};
pub use pipeline::{BatchOutcome, BatchSummary, ExtractOptions, ExtractionPipeline, Tier};
pub use router::{PatchChunkRouter, RouteStats};
pub use shard::{ShardKind, ShardTarget};
pub use sparse::SparseByteStore;
pub use store::{ContentHash, ContentStore, PutOutcome};
pub use version::{PatchKind, PatchName, VersionId, group_by_day};
