//! SqPack index files
//!
//! An index maps logical paths of one category to a data shard and a byte
//! offset inside it. The blob starts with a 1024-byte version header and a
//! 1024-byte file-info header; the latter locates the hash table and the
//! collision table.
//!
//! Two record layouts exist. The wide layout keys records by a 64-bit
//! folder/file hash pair, the narrow layout by a 32-bit hash of the full path.
//! When two paths share a hash the hash record is flagged and the literal
//! path has to be matched against the collision table instead.

mod entry;
mod header;
mod table;

pub use entry::{
    COLLISION_PATH_SIZE, COLLISION_RECORD_SIZE, CollisionEntry, DataWord, Location, PathHash,
};
pub use header::{
    FILE_INFO_HEADER_SIZE, FileInfoHeader, IndexType, SQPACK_MAGIC, Segment, VERSION_HEADER_SIZE,
    VersionHeader,
};
pub use table::{ArchiveIndex, IndexFormat, IndexTables};
