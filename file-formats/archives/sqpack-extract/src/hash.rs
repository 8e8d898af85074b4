//! Path hashing for SqPack indexes
//!
//! Index files key their records by a CRC-32 of the lower-cased path. The
//! checksum is the IEEE polynomial with the usual initial value but *without*
//! the final inversion (often called JAMCRC).

/// JAMCRC of the given bytes
pub fn jamcrc(data: &[u8]) -> u32 {
    !crc32fast::hash(data)
}

/// Hash used by the wide (type 0) index format
///
/// The folder part (everything before the last `/`) goes in the upper 32
/// bits, the file name in the lower 32 bits.
pub fn path_hash_wide(path: &str) -> u64 {
    let lower = path.to_ascii_lowercase();
    let (folder, file) = match lower.rfind('/') {
        Some(pos) => (&lower[..pos], &lower[pos + 1..]),
        None => ("", lower.as_str()),
    };

    let folder_hash = jamcrc(folder.as_bytes()) as u64;
    let file_hash = jamcrc(file.as_bytes()) as u64;
    (folder_hash << 32) | file_hash
}

/// Hash used by the narrow (type 2) index format: the whole path at once
pub fn path_hash_narrow(path: &str) -> u32 {
    jamcrc(path.to_ascii_lowercase().as_bytes())
}
