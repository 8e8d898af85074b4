//! Data shard entries and sheet files

use crate::compression::{STORED_BLOCK_MARKER, deflate};
use crate::dat::{BLOCK_DESCRIPTOR_SIZE, BLOCK_HEADER_SIZE, ENTRY_HEADER_SIZE, EntryType};
use crate::excel::{ROOT_LIST_PATH, SHEET_HEADER_MAGIC, header_path};

/// Largest decompressed block the game writes
pub const MAX_BLOCK_SIZE: usize = 16_000;

/// Entries and blocks are aligned to this
pub const ALIGNMENT: usize = 128;

fn align(size: usize) -> usize {
    size.div_ceil(ALIGNMENT) * ALIGNMENT
}

/// Pack `data` as a standard entry, deflating blocks when `compress` is set
pub fn encode_entry(data: &[u8], compress: bool) -> Vec<u8> {
    let mut descriptors = Vec::new();
    let mut blocks = Vec::new();

    for chunk in data.chunks(MAX_BLOCK_SIZE) {
        let (marker, payload) = if compress {
            let payload = deflate(chunk).expect("deflate into memory");
            (payload.len() as u32, payload)
        } else {
            (STORED_BLOCK_MARKER, chunk.to_vec())
        };

        let start = blocks.len();
        blocks.extend_from_slice(&BLOCK_HEADER_SIZE.to_le_bytes());
        blocks.extend_from_slice(&0u32.to_le_bytes());
        blocks.extend_from_slice(&marker.to_le_bytes());
        blocks.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
        blocks.extend_from_slice(&payload);
        blocks.resize(align(blocks.len()), 0);

        descriptors.push((start as u32, (blocks.len() - start) as u16, chunk.len() as u16));
    }

    let header_size =
        align(ENTRY_HEADER_SIZE as usize + descriptors.len() * BLOCK_DESCRIPTOR_SIZE as usize);

    let mut out = Vec::with_capacity(header_size + blocks.len());
    out.extend_from_slice(&(header_size as u32).to_le_bytes());
    out.extend_from_slice(&(EntryType::Standard as u32).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&[0u8; 8]);
    out.extend_from_slice(&(descriptors.len() as u32).to_le_bytes());
    for (offset, compressed, decompressed) in descriptors {
        out.extend_from_slice(&offset.to_le_bytes());
        out.extend_from_slice(&compressed.to_le_bytes());
        out.extend_from_slice(&decompressed.to_le_bytes());
    }
    out.resize(header_size, 0);
    out.extend_from_slice(&blocks);
    out
}

/// Sheet list text for `(name, id)` pairs
pub fn encode_exl(sheets: &[(&str, i32)]) -> Vec<u8> {
    let mut text = String::from("EXLT,2\r\n");
    for (name, id) in sheets {
        text.push_str(&format!("{name},{id}\r\n"));
    }
    text.into_bytes()
}

/// Sheet header with one column, the given `(start_id, row_count)` pages and
/// raw language ids
pub fn encode_exh(pages: &[(u32, u32)], languages: &[u8]) -> Vec<u8> {
    let row_count: u32 = pages.iter().map(|(_, rows)| rows).sum();

    let mut out = Vec::new();
    out.extend_from_slice(SHEET_HEADER_MAGIC);
    out.extend_from_slice(&3u16.to_be_bytes());
    out.extend_from_slice(&4u16.to_be_bytes());
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&(pages.len() as u16).to_be_bytes());
    out.extend_from_slice(&(languages.len() as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.push(0);
    out.push(1);
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&row_count.to_be_bytes());
    out.extend_from_slice(&[0u8; 8]);

    // One 32-bit integer column at offset 0
    out.extend_from_slice(&0x07u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());

    for (start_id, rows) in pages {
        out.extend_from_slice(&start_id.to_be_bytes());
        out.extend_from_slice(&rows.to_be_bytes());
    }
    for language in languages {
        out.push(*language);
        out.push(0);
    }
    out
}

/// Every file a set of sheets needs: root list, headers and data pages
///
/// Each sheet is `(name, pages, raw language ids)`. Data page contents are
/// the page path followed by `rows`, so every page is distinct.
pub fn sheet_files(sheets: &[(&str, &[(u32, u32)], &[u8])]) -> Vec<(String, Vec<u8>)> {
    let names: Vec<(&str, i32)> = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _, _))| (*name, i as i32))
        .collect();

    let mut files = vec![(ROOT_LIST_PATH.to_string(), encode_exl(&names))];
    for (name, pages, languages) in sheets {
        let header = encode_exh(pages, languages);
        let page_paths = crate::excel::SheetHeader::parse(&header)
            .expect("generated header parses")
            .data_page_paths(name);
        files.push((header_path(name), header));
        for path in page_paths {
            let contents = format!("{path} rows").into_bytes();
            files.push((path, contents));
        }
    }
    files
}
