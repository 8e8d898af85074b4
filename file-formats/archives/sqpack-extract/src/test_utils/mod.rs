//! Test utilities for SqPack extraction
//!
//! Builders for the binary inputs the extractor consumes, so tests can work
//! without game data.
//!
//! # Index blobs
//!
//! [`IndexBuilder`] writes index blobs in either record width, including
//! sentinel slots and collision tables.
//!
//! # Data entries and sheet files
//!
//! [`encode_entry`] packs bytes the way data shards store them, and
//! [`encode_exl`] / [`encode_exh`] produce the sheet list and sheet headers.
//!
//! # Whole shards
//!
//! [`ShardBuilder`] lays out a data shard with a matching index and turns it
//! into patches that ship the shard as add-data or file-update chunks.
pub mod entry_builder;
pub mod index_builder;
pub mod shard_builder;

pub use entry_builder::{encode_entry, encode_exh, encode_exl, sheet_files};
pub use index_builder::IndexBuilder;
pub use shard_builder::{BuiltFile, BuiltShard, ShardBuilder};
