//! Content-addressed storage across paths and runs

use crate::common::Workspace;
use pretty_assertions::assert_eq;
use sqpack_extract::category::EXD;
use sqpack_extract::test_utils::{ShardBuilder, encode_exh, encode_exl};
use sqpack_extract::{BatchOutcome, ContentHash, ContentStore, PutOutcome, VersionManifest};

#[test]
fn test_identical_pages_share_one_blob() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);

    let same = b"identical page".to_vec();
    let built = ShardBuilder::new(EXD)
        .file("exd/root.exl", encode_exl(&[("Map", 0)]))
        .file("exd/Map.exh", encode_exh(&[(0, 10), (10, 10)], &[0]))
        .file("exd/Map_0.exd", same.clone())
        .file("exd/Map_10.exd", same.clone())
        .build();

    let outcome = pipeline
        .process_batch(vec![built.add_data_patch("D2023.06.01.0000.0000")])
        .unwrap();
    let BatchOutcome::Committed(summary) = outcome else {
        panic!("expected a commit, got {outcome:?}");
    };

    let manifest = VersionManifest::load(&summary.manifest_path).unwrap();
    let first = &manifest.files["exd/Map_0.exd"];
    let second = &manifest.files["exd/Map_10.exd"];
    assert_eq!(first.hash, ContentHash::of(&same));
    assert_eq!(first.hash, second.hash);
    assert_ne!(first.offset, second.offset);

    // index, root list, header and a single page blob
    assert_eq!(summary.blobs_written, 4);
    assert_eq!(ws.blob_count(), 4);
}

#[test]
fn test_store_put_is_create_if_absent() {
    let ws = Workspace::new();
    let store = ContentStore::open(ws.blobs()).unwrap();

    let (hash, outcome) = store.put(b"blob").unwrap();
    assert_eq!(outcome, PutOutcome::Written);
    let path = store.blob_path(&hash);
    let before = std::fs::metadata(&path).unwrap().modified().unwrap();

    let (again, outcome) = store.put(b"blob").unwrap();
    assert_eq!(again, hash);
    assert_eq!(outcome, PutOutcome::AlreadyPresent);
    assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), before);
    assert_eq!(ws.blob_count(), 1);
}

#[test]
fn test_concurrent_puts_of_same_content() {
    use rayon::prelude::*;

    let ws = Workspace::new();
    let store = ContentStore::open(ws.blobs()).unwrap();
    let data = vec![7u8; 4096];

    let outcomes: Vec<PutOutcome> = (0..16)
        .into_par_iter()
        .map(|_| store.put(&data).unwrap().1)
        .collect();

    assert!(outcomes.contains(&PutOutcome::Written) || store.contains(&ContentHash::of(&data)));
    assert_eq!(ws.blob_count(), 1);
    assert_eq!(store.get(&ContentHash::of(&data)).unwrap(), data);
}
