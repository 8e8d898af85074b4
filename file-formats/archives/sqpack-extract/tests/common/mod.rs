//! Common test utilities and fixtures

#![allow(dead_code)]

use sqpack_extract::{ExtractOptions, ExtractionPipeline, KNOWN_CATEGORIES};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Route log output through the test harness
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Manifest and blob directories under one temporary root
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        init_logging();
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn manifests(&self) -> PathBuf {
        self.dir.path().join("manifests")
    }

    pub fn blobs(&self) -> PathBuf {
        self.dir.path().join("blobs")
    }

    pub fn scratch(&self) -> PathBuf {
        let dir = self.dir.path().join("scratch");
        fs::create_dir_all(&dir).expect("Failed to create scratch dir");
        dir
    }

    /// Pipeline that only expects the categories in `categories` to ship indexes
    pub fn pipeline_for(&self, categories: &[u32], parallel: bool) -> ExtractionPipeline {
        ExtractionPipeline::with_options(
            self.manifests(),
            self.blobs(),
            ExtractOptions::new()
                .parallel(parallel)
                .known_categories(categories.iter().copied())
                .scratch_dir(self.scratch()),
        )
        .expect("Failed to create pipeline")
    }

    /// Pipeline with the default category set
    pub fn pipeline(&self) -> ExtractionPipeline {
        self.pipeline_for(&KNOWN_CATEGORIES, true)
    }

    /// Number of blob files in the store
    pub fn blob_count(&self) -> usize {
        count_files(&self.blobs())
    }

    /// Number of manifest files written
    pub fn manifest_count(&self) -> usize {
        count_files(&self.manifests())
    }

    /// Number of files left in the scratch directory
    pub fn scratch_count(&self) -> usize {
        count_files(&self.scratch())
    }
}

/// Recursively count regular files under `dir`
pub fn count_files(dir: &Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .map(|p| if p.is_dir() { count_files(&p) } else { 1 })
        .sum()
}

/// Root list, headers and pages for sheets with two pages in Japanese and English
pub fn sheet_set(names: &[&str]) -> Vec<(String, Vec<u8>)> {
    let specs: Vec<(&str, &[(u32, u32)], &[u8])> = names
        .iter()
        .map(|name| (*name, &[(0u32, 100u32), (100, 50)][..], &[1u8, 2][..]))
        .collect();
    sqpack_extract::test_utils::sheet_files(&specs)
}
