//! Files carried forward from earlier manifests

use crate::common::{Workspace, sheet_set};
use pretty_assertions::assert_eq;
use sqpack_extract::category::EXD;
use sqpack_extract::test_utils::ShardBuilder;
use sqpack_extract::{
    BatchOutcome, BatchSummary, ContentHash, Error, ExtractionPipeline, MemoryPatch,
    VersionManifest,
};

fn commit(pipeline: &ExtractionPipeline, patch: MemoryPatch) -> (BatchSummary, VersionManifest) {
    match pipeline.process_batch(vec![patch]).unwrap() {
        BatchOutcome::Committed(summary) => {
            let manifest = VersionManifest::load(&summary.manifest_path).unwrap();
            (summary, manifest)
        }
        other => panic!("expected a commit, got {other:?}"),
    }
}

#[test]
fn test_untouched_shard_carries_hashes_forward() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], true);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item", "Action"])).build();

    let (_, v1) = commit(&pipeline, built.add_data_patch("D2023.07.01.0000.0000"));
    assert_eq!(v1.files.len(), 11);
    let blobs_after_v1 = ws.blob_count();

    // Same index again, no shard bytes at all
    let (summary, v2) = commit(&pipeline, built.index_patch("D2023.07.02.0000.0000"));
    assert_eq!(summary.from_history, 11);
    assert_eq!(summary.from_add_data + summary.from_file_update, 0);
    assert_eq!(summary.blobs_written, 0);
    assert_eq!(ws.blob_count(), blobs_after_v1);

    for (path, record) in &v1.files {
        assert_eq!(v2.files[path].hash, record.hash, "{path}");
    }
    assert_eq!(v2.indexes, v1.indexes);
}

#[test]
fn test_missing_index_filled_from_previous_manifest() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();
    let (_, v1) = commit(&pipeline, built.add_data_patch("D2023.07.01.0000.0000"));

    // Rewrite one page in place, shipping no index
    let page = built.file("exd/Item_100_en.exd").unwrap();
    let patched = ShardBuilder::new(EXD)
        .file("exd/Item_100_en.exd", b"new rows".to_vec())
        .build();
    let patch = MemoryPatch::named("D2023.07.02.0000.0000").unwrap().add_data(
        &built.dat_target(),
        page.location.offset,
        patched.files[0].entry.clone(),
    );

    let (summary, v2) = commit(&pipeline, patch);
    assert_eq!(summary.index_blobs, 0);
    assert_eq!(summary.carried_indexes, 1);
    assert_eq!(v2.indexes, v1.indexes);
    assert_eq!(summary.from_add_data, 1);
    assert_eq!(summary.from_history, v1.files.len() - 1);

    assert_eq!(
        v2.files["exd/Item_100_en.exd"].hash,
        ContentHash::of(b"new rows")
    );
    assert_eq!(v2.files["exd/Item_0_ja.exd"].hash, v1.files["exd/Item_0_ja.exd"].hash);
}

#[test]
fn test_history_walk_skips_to_older_manifest() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);

    let full = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();
    commit(&pipeline, full.add_data_patch("D2023.07.01.0000.0000"));

    // v2 loses one page from its index, so its manifest lacks it
    let without_page = ShardBuilder::new(EXD)
        .files(
            sheet_set(&["Item"])
                .into_iter()
                .filter(|(path, _)| path != "exd/Item_0_en.exd"),
        )
        .build();
    let (_, v2) = commit(&pipeline, without_page.add_data_patch("D2023.07.02.0000.0000"));
    assert!(!v2.files.contains_key("exd/Item_0_en.exd"));

    // v3 lists it again but ships no bytes: found in v1, two manifests back
    let (summary, v3) = commit(&pipeline, full.index_patch("D2023.07.03.0000.0000"));
    assert_eq!(summary.skipped, 0);
    assert_eq!(
        v3.files["exd/Item_0_en.exd"].hash,
        ContentHash::of(b"exd/Item_0_en.exd rows")
    );
}

#[test]
fn test_undecodable_extent_falls_back_to_history() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();
    let (_, v1) = commit(&pipeline, built.add_data_patch("D2023.07.01.0000.0000"));

    let page = built.file("exd/Item_0_ja.exd").unwrap();
    let patch = MemoryPatch::named("D2023.07.02.0000.0000").unwrap().add_data(
        &built.dat_target(),
        page.location.offset,
        vec![0xFF; 64],
    );

    let (summary, v2) = commit(&pipeline, patch);
    assert_eq!(summary.from_add_data, 0);
    assert_eq!(summary.from_history, v1.files.len());
    assert_eq!(v2.files["exd/Item_0_ja.exd"], v1.files["exd/Item_0_ja.exd"]);
}

#[test]
fn test_corrupt_manifest_does_not_block_later_batches() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    std::fs::write(ws.manifests().join("2020.01.01.0000.0000.json"), "{ truncated").unwrap();

    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();
    let (summary, manifest) = commit(&pipeline, built.add_data_patch("D2023.07.01.0000.0000"));
    assert_eq!(summary.from_add_data, built.files.len());
    assert_eq!(summary.carried_indexes, 0);
    assert_eq!(manifest.files.len(), built.files.len());
}

#[test]
fn test_malformed_hash_in_history_is_not_followed() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();
    let (summary, v1) = commit(&pipeline, built.add_data_patch("D2023.07.01.0000.0000"));

    let text = std::fs::read_to_string(&summary.manifest_path).unwrap();
    let root_hash = v1.files["exd/root.exl"].hash.as_str();
    std::fs::write(&summary.manifest_path, text.replace(root_hash, "A")).unwrap();

    // The damaged manifest is dropped from the chain, so nothing backs the
    // sheet list any more
    let err = pipeline
        .process_batch(vec![built.index_patch("D2023.07.02.0000.0000")])
        .unwrap_err();
    assert!(matches!(err, Error::MissingRootManifest { .. }), "{err}");
    assert_eq!(ws.manifest_count(), 1);
}
