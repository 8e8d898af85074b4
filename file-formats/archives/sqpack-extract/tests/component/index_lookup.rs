//! Index parsing and lookup through the public API

use pretty_assertions::assert_eq;
use sqpack_extract::test_utils::IndexBuilder;
use sqpack_extract::{ArchiveIndex, IndexFormat, Location, path_hash_narrow, path_hash_wide};

const FIRST: &str = "exd/c008ddf9.exd";
const SECOND: &str = "exd/c2008894.exd";

fn loc(data_file_id: u8, offset: u64) -> Location {
    Location {
        data_file_id,
        offset,
    }
}

fn paths(count: usize) -> Vec<(String, Location)> {
    (0..count)
        .map(|i| {
            (
                format!("exd/sheet{i}.exh"),
                loc((i % 3) as u8, 0x80 * (i as u64 + 1)),
            )
        })
        .collect()
}

fn check_all_resolve(builder: IndexBuilder) {
    let entries = paths(200);
    let builder = entries
        .iter()
        .fold(builder, |b, (path, location)| b.entry(path, *location));
    let index = ArchiveIndex::parse(&builder.build()).unwrap();

    assert_eq!(index.len(), entries.len());
    assert_eq!(index.data_file_count(), 3);
    for (path, location) in &entries {
        assert_eq!(index.lookup(path), Some(*location), "{path}");
    }
    assert_eq!(index.lookup("exd/sheet200.exh"), None);
    assert_eq!(index.lookup("exd/root.exl"), None);
}

#[test]
fn test_narrow_index_resolves_every_record() {
    check_all_resolve(IndexBuilder::narrow());
}

#[test]
fn test_wide_index_resolves_every_record() {
    check_all_resolve(IndexBuilder::wide());
}

#[test]
fn test_engineered_pair_collides_in_both_widths() {
    assert_eq!(path_hash_narrow(FIRST), path_hash_narrow(SECOND));
    assert_eq!(path_hash_wide(FIRST), path_hash_wide(SECOND));
}

#[test]
fn test_narrow_collision_fallback() {
    let data = IndexBuilder::narrow()
        .entry("exd/root.exl", loc(0, 0x80))
        .colliding(FIRST, loc(0, 0x1000), SECOND, loc(1, 0x2000))
        .collision_terminator()
        .build();
    let index = ArchiveIndex::parse(&data).unwrap();

    assert_eq!(index.collision_count(), 2);
    assert_eq!(index.lookup(FIRST), Some(loc(0, 0x1000)));
    assert_eq!(index.lookup(SECOND), Some(loc(1, 0x2000)));
    assert_eq!(index.lookup("exd/root.exl"), Some(loc(0, 0x80)));
}

#[test]
fn test_wide_collision_fallback() {
    let data = IndexBuilder::wide()
        .colliding(FIRST, loc(2, 0x4000), SECOND, loc(2, 0x8000))
        .build();
    let index = ArchiveIndex::parse(&data).unwrap();

    assert!(matches!(index.format(), IndexFormat::Wide(_)));
    assert_eq!(index.lookup(FIRST), Some(loc(2, 0x4000)));
    assert_eq!(index.lookup(SECOND), Some(loc(2, 0x8000)));
}

#[test]
fn test_collision_requires_exact_path() {
    let data = IndexBuilder::narrow()
        .colliding(FIRST, loc(0, 0x1000), SECOND, loc(0, 0x2000))
        .build();
    let index = ArchiveIndex::parse(&data).unwrap();

    // Same hash after lower-casing, but the literal path differs
    assert_eq!(index.lookup("EXD/C008DDF9.EXD"), None);
}

#[test]
fn test_collision_only_entries() {
    // Wide lookups scan the collision table even without a hash record
    let wide = ArchiveIndex::parse(
        &IndexBuilder::wide()
            .collision_only("exd/quest.exh", loc(0, 0x180))
            .build(),
    )
    .unwrap();
    assert_eq!(wide.lookup("exd/quest.exh"), Some(loc(0, 0x180)));

    // Narrow lookups stop at a missing hash record
    let narrow = ArchiveIndex::parse(
        &IndexBuilder::narrow()
            .collision_only("exd/quest.exh", loc(0, 0x180))
            .build(),
    )
    .unwrap();
    assert_eq!(narrow.lookup("exd/quest.exh"), None);
}

#[test]
fn test_damaged_indexes_degrade_to_empty() {
    let good = IndexBuilder::narrow()
        .entry("exd/root.exl", loc(0, 0x80))
        .build();

    let mut bad_magic = good.clone();
    bad_magic[..6].copy_from_slice(b"PkSqaS");
    let truncated = good[..0x500].to_vec();

    for data in [bad_magic, truncated, Vec::new()] {
        let (index, error) = ArchiveIndex::parse_or_empty(&data);
        assert!(error.is_some());
        assert!(index.is_empty());
        assert_eq!(index.lookup("exd/root.exl"), None);
    }
}
