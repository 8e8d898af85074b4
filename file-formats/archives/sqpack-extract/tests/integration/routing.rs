//! Patch chunks routed into sparse stores, read back through the index

use pretty_assertions::assert_eq;
use sqpack_extract::category::EXD;
use sqpack_extract::dat::read_entry;
use sqpack_extract::test_utils::ShardBuilder;
use sqpack_extract::{ArchiveIndex, ChunkSource, PatchChunkRouter, ShardTarget};
use std::io::Cursor;

fn shard() -> ShardBuilder {
    ShardBuilder::new(EXD)
        .file("exd/root.exl", b"EXLT,2\r\nItem,0\r\n".to_vec())
        .file("exd/Item.exh", vec![0x42; 300])
        .file("exd/Item_0_en.exd", (0..40_000u32).map(|i| i as u8).collect::<Vec<_>>())
}

#[test]
fn test_add_data_entries_decode_from_extents() {
    let built = shard().build();
    let mut patch = built.add_data_patch("D2023.05.01.0000.0000");
    let mut router = PatchChunkRouter::new();
    router.route_source(&mut patch).unwrap();

    let index_bytes = router.index_bytes(&ShardTarget::index(EXD)).unwrap().unwrap();
    assert_eq!(index_bytes, built.index);
    let index = ArchiveIndex::parse(&index_bytes).unwrap();

    let store = router.add_data_store(&ShardTarget::data(EXD, 0)).unwrap();
    for file in &built.files {
        let location = index.lookup(&file.path).unwrap();
        assert_eq!(location, file.location);
        let extent = store.read_at(location.offset).unwrap().unwrap();
        assert_eq!(read_entry(&mut Cursor::new(extent), 0).unwrap(), file.data);
    }
}

#[test]
fn test_file_update_shard_decodes_at_offsets() {
    let built = shard().data_file_id(1).stored().build();
    let mut patch = built.file_update_patch("D2023.05.01.0000.0000");
    assert_eq!(patch.name().version.to_string(), "2023.05.01.0000.0000");

    let mut router = PatchChunkRouter::new();
    router.route_source(&mut patch).unwrap();
    assert_eq!(router.stats().file_updates, 2);

    let index = ArchiveIndex::parse(&router.index_bytes(&ShardTarget::index(EXD)).unwrap().unwrap())
        .unwrap();
    let store = router.file_update_store(&ShardTarget::data(EXD, 1)).unwrap();
    assert_eq!(store.contents().unwrap(), built.dat);

    for file in &built.files {
        let location = index.lookup(&file.path).unwrap();
        assert_eq!(location.data_file_id, 1);
        let mut reader = store.reader().unwrap();
        assert_eq!(read_entry(&mut reader, location.offset).unwrap(), file.data);
    }

    // No add-data store exists for a shard that was only rewritten
    assert!(router.add_data_store(&ShardTarget::data(EXD, 1)).is_none());
}

#[test]
fn test_wide_index_through_router() {
    let built = shard().wide().build();
    let mut router = PatchChunkRouter::new();
    router
        .route_source(&mut built.index_patch("D2023.05.01.0000.0000"))
        .unwrap();

    let index = ArchiveIndex::parse(&router.index_bytes(&ShardTarget::index(EXD)).unwrap().unwrap())
        .unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(
        index.lookup("exd/Item.exh"),
        Some(built.file("exd/Item.exh").unwrap().location)
    );
}
