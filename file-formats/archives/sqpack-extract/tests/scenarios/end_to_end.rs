//! Single batches from patch chunks to manifest on disk

use crate::common::{Workspace, sheet_set};
use pretty_assertions::assert_eq;
use sqpack_extract::category::EXD;
use sqpack_extract::test_utils::{ShardBuilder, encode_exh, encode_exl};
use sqpack_extract::{
    BatchOutcome, ContentHash, Error, FileRecord, MemoryPatch, VersionId, VersionManifest,
};

fn committed(outcome: BatchOutcome) -> sqpack_extract::BatchSummary {
    match outcome {
        BatchOutcome::Committed(summary) => summary,
        other => panic!("expected a commit, got {other:?}"),
    }
}

#[test]
fn test_minimal_sheet_extraction() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);

    let root = encode_exl(&[("Quest", 0)]);
    let header = encode_exh(&[(0, 20)], &[0]);
    let page = b"quest rows".to_vec();
    let built = ShardBuilder::new(EXD)
        .file("exd/root.exl", root.clone())
        .file("exd/Quest.exh", header.clone())
        .file("exd/Quest_0.exd", page.clone())
        .build();

    let summary = committed(
        pipeline
            .process_batch(vec![built.add_data_patch("D2023.03.28.0000.0001")])
            .unwrap(),
    );

    assert_eq!(summary.version, VersionId::parse("2023.03.28.0000.0001").unwrap());
    assert_eq!(
        summary.manifest_path,
        ws.manifests().join("2023.03.28.0000.0001.json")
    );
    assert_eq!(summary.index_blobs, 1);
    assert_eq!(summary.from_add_data, 3);
    assert_eq!(summary.skipped, 0);

    let manifest = VersionManifest::load(&summary.manifest_path).unwrap();
    assert_eq!(manifest.indexes[&EXD], ContentHash::of(&built.index));
    for (path, data) in [
        ("exd/root.exl", &root),
        ("exd/Quest.exh", &header),
        ("exd/Quest_0.exd", &page),
    ] {
        let placed = built.file(path).unwrap();
        assert_eq!(
            manifest.files[path],
            FileRecord {
                hash: ContentHash::of(data),
                data_file_id: 0,
                offset: placed.location.offset,
            }
        );
        assert_eq!(&pipeline.store().get(&manifest.files[path].hash).unwrap(), data);
    }
}

#[test]
fn test_rewritten_shard_extraction() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], true);
    let built = ShardBuilder::new(EXD)
        .data_file_id(1)
        .files(sheet_set(&["Item", "Mount"]))
        .build();

    let summary = committed(
        pipeline
            .process_batch(vec![built.file_update_patch("D2023.04.11.0000.0000")])
            .unwrap(),
    );
    assert_eq!(summary.from_file_update, built.files.len());
    assert_eq!(summary.from_add_data, 0);

    let manifest = VersionManifest::load(&summary.manifest_path).unwrap();
    for file in &built.files {
        let record = &manifest.files[&file.path];
        assert_eq!(record.data_file_id, 1);
        assert_eq!(record.hash, ContentHash::of(&file.data));
    }
}

#[test]
fn test_rerun_is_a_no_op() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();

    committed(
        pipeline
            .process_batch(vec![built.add_data_patch("D2023.05.02.0000.0000")])
            .unwrap(),
    );
    let blobs = ws.blob_count();
    let manifest_path = ws.manifests().join("2023.05.02.0000.0000.json");
    let before = std::fs::read(&manifest_path).unwrap();

    let outcome = pipeline
        .process_batch(vec![built.add_data_patch("D2023.05.02.0000.0000")])
        .unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::AlreadyProcessed(VersionId::parse("2023.05.02.0000.0000").unwrap())
    );
    assert_eq!(ws.blob_count(), blobs);
    assert_eq!(ws.manifest_count(), 1);
    assert_eq!(std::fs::read(&manifest_path).unwrap(), before);
}

#[test]
fn test_history_batch_leaves_no_trace() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();

    let outcome = pipeline
        .process_batch(vec![
            built.add_data_patch("D2023.05.03.0000.0000"),
            MemoryPatch::named("H2023.05.03.0000.0001").unwrap(),
        ])
        .unwrap();
    assert_eq!(
        outcome,
        BatchOutcome::SkippedHistory(VersionId::parse("2023.05.03.0000.0001").unwrap())
    );
    assert_eq!(ws.manifest_count(), 0);
    assert_eq!(ws.blob_count(), 0);
}

#[test]
fn test_missing_root_list_fails_without_manifest() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], false);
    let built = ShardBuilder::new(EXD)
        .file("exd/Item.exh", encode_exh(&[(0, 1)], &[0]))
        .file("exd/Item_0.exd", b"rows".to_vec())
        .build();

    let err = pipeline
        .process_batch(vec![built.add_data_patch("D2023.05.04.0000.0000")])
        .unwrap_err();
    assert!(matches!(err, Error::MissingRootManifest { .. }), "{err}");
    assert_eq!(ws.manifest_count(), 0);
    assert_eq!(ws.scratch_count(), 0);
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let built = ShardBuilder::new(EXD)
        .files(sheet_set(&["Item", "Action", "Mount", "Status"]))
        .build();

    let run = |parallel: bool| {
        let ws = Workspace::new();
        let pipeline = ws.pipeline_for(&[EXD], parallel);
        let summary = committed(
            pipeline
                .process_batch(vec![built.add_data_patch("D2023.06.10.0000.0000")])
                .unwrap(),
        );
        (
            summary.resolved(),
            std::fs::read_to_string(summary.manifest_path).unwrap(),
        )
    };

    let sequential = run(false);
    let parallel = run(true);
    assert_eq!(sequential.0, 1 + 4 * 5);
    assert_eq!(parallel, sequential);
}

#[test]
fn test_scratch_files_are_removed() {
    let ws = Workspace::new();
    let pipeline = ws.pipeline_for(&[EXD], true);
    let built = ShardBuilder::new(EXD).files(sheet_set(&["Item"])).build();

    committed(
        pipeline
            .process_batch(vec![
                built.add_data_patch("D2023.06.11.0000.0000"),
                built.file_update_patch("D2023.06.11.0000.0001"),
            ])
            .unwrap(),
    );
    assert_eq!(ws.scratch_count(), 0);
}
