//! Batch extraction: patches in, manifest and blobs out
//!
//! A batch is every patch released on one day. Its chunks are routed into
//! sparse stores, the indexes it ships are stored as blobs, and every sheet
//! file the sheet list names is resolved in three tiers:
//!
//! 1. an add-data write starting exactly at the file's entry offset,
//! 2. a file-update rewrite of the file's data shard,
//! 3. the newest older manifest that recorded the path.
//!
//! Resolved files go to the [`ContentStore`] and a new [`VersionManifest`]
//! is committed atomically once everything else succeeded.

use crate::category::{KNOWN_CATEGORIES, category_for_path};
use crate::chunk::ChunkSource;
use crate::context::RunContext;
use crate::dat::read_entry;
use crate::excel::{ROOT_LIST_PATH, SheetHeader, SheetList, header_path};
use crate::index::Location;
use crate::manifest::{FileRecord, ManifestChain, VersionManifest};
use crate::router::RouteStats;
use crate::shard::ShardTarget;
use crate::store::{ContentHash, ContentStore, PutOutcome};
use crate::version::{VersionId, group_by_day};
use crate::{Error, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Options for an [`ExtractionPipeline`]
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Resolve logical paths on the rayon thread pool
    pub parallel: bool,
    /// Categories a manifest must carry an index for before older indexes
    /// are no longer needed
    pub known_categories: Vec<u32>,
    /// Directory for sparse store backing files; the system temp dir if unset
    pub scratch_dir: Option<PathBuf>,
}

impl ExtractOptions {
    /// Create new default options
    ///
    /// Returns an `ExtractOptions` instance with default settings:
    /// - `parallel = true`
    /// - `known_categories` = every base category except ui-script
    /// - `scratch_dir = None` (system temp dir)
    pub fn new() -> Self {
        Self {
            parallel: true,
            known_categories: KNOWN_CATEGORIES.to_vec(),
            scratch_dir: None,
        }
    }

    /// Set whether logical paths are resolved in parallel
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the categories a complete manifest covers
    pub fn known_categories<I: IntoIterator<Item = u32>>(mut self, categories: I) -> Self {
        self.known_categories = categories.into_iter().collect();
        self
    }

    /// Set the directory sparse stores are created in
    pub fn scratch_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a resolved file's bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// An add-data write at the entry offset
    AddData,
    /// A file-update rewrite of the data shard
    FileUpdate,
    /// A blob recorded by an older manifest
    History,
}

/// Counters of a committed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    /// Version the manifest was written for
    pub version: VersionId,
    /// Where the manifest was written
    pub manifest_path: PathBuf,
    /// Patches in the batch
    pub patches: usize,
    /// Chunk routing counters
    pub routing: RouteStats,
    /// Index blobs shipped by this batch
    pub index_blobs: usize,
    /// Index records copied from the previous manifest
    pub carried_indexes: usize,
    /// Files resolved from add-data writes
    pub from_add_data: usize,
    /// Files resolved from file-update rewrites
    pub from_file_update: usize,
    /// Files carried forward from older manifests
    pub from_history: usize,
    /// Logical paths no tier could resolve
    pub skipped: usize,
    /// Blobs that did not exist in the store before
    pub blobs_written: usize,
}

impl BatchSummary {
    fn new(version: VersionId, patches: usize) -> Self {
        Self {
            version,
            manifest_path: PathBuf::new(),
            patches,
            routing: RouteStats::default(),
            index_blobs: 0,
            carried_indexes: 0,
            from_add_data: 0,
            from_file_update: 0,
            from_history: 0,
            skipped: 0,
            blobs_written: 0,
        }
    }

    /// Files recorded in the manifest, sheet list included
    pub fn resolved(&self) -> usize {
        self.from_add_data + self.from_file_update + self.from_history
    }

    fn count(&mut self, file: &CommittedFile) {
        match file.tier {
            Tier::AddData => self.from_add_data += 1,
            Tier::FileUpdate => self.from_file_update += 1,
            Tier::History => self.from_history += 1,
        }
        if file.outcome == Some(PutOutcome::Written) {
            self.blobs_written += 1;
        }
    }
}

/// Result of [`ExtractionPipeline::process_batch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// A new manifest was written
    Committed(BatchSummary),
    /// A manifest for this version already existed; nothing was done
    AlreadyProcessed(VersionId),
    /// The batch contains a history patch and was not applied
    SkippedHistory(VersionId),
    /// The batch had no patches
    Empty,
}

/// Bytes of a resolved file, fresh from this batch or already stored
enum Payload {
    Fresh(Vec<u8>),
    Stored(ContentHash),
}

struct Resolved {
    location: Location,
    tier: Tier,
    payload: Payload,
}

struct CommittedFile {
    path: String,
    record: FileRecord,
    tier: Tier,
    /// `None` when the blob was reused without a write attempt
    outcome: Option<PutOutcome>,
    /// Decoded bytes, kept only when the caller needs to parse them
    data: Option<Vec<u8>>,
}

/// Turns same-day patch batches into manifests and blobs
#[derive(Debug)]
pub struct ExtractionPipeline {
    manifest_dir: PathBuf,
    store: ContentStore,
    options: ExtractOptions,
}

impl ExtractionPipeline {
    /// Pipeline writing manifests to `manifest_dir` and blobs to `blob_dir`
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(manifest_dir: P, blob_dir: Q) -> Result<Self> {
        Self::with_options(manifest_dir, blob_dir, ExtractOptions::default())
    }

    /// Pipeline with explicit options
    pub fn with_options<P: AsRef<Path>, Q: AsRef<Path>>(
        manifest_dir: P,
        blob_dir: Q,
        options: ExtractOptions,
    ) -> Result<Self> {
        let manifest_dir = manifest_dir.as_ref().to_path_buf();
        fs::create_dir_all(&manifest_dir)?;
        Ok(Self {
            manifest_dir,
            store: ContentStore::open(blob_dir)?,
            options,
        })
    }

    /// Directory manifests are written to
    pub fn manifest_dir(&self) -> &Path {
        &self.manifest_dir
    }

    /// Blob store
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Options in effect
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Process every patch, one calendar day at a time
    ///
    /// Patches are ordered by version first. Each day is committed before
    /// the next starts, so later days can carry files forward from it. The
    /// first failing batch stops the run.
    pub fn process_all<S: ChunkSource>(&self, mut patches: Vec<S>) -> Result<Vec<BatchOutcome>> {
        patches.sort_by(|a, b| a.name().version.cmp(&b.name().version));
        group_by_day(patches, |p| p.name().version)
            .into_iter()
            .map(|batch| self.process_batch(batch))
            .collect()
    }

    /// Process one batch of same-day patches, in the given order
    pub fn process_batch<S: ChunkSource>(&self, mut patches: Vec<S>) -> Result<BatchOutcome> {
        let Some(version) = patches.iter().map(|p| p.name().version).max() else {
            return Ok(BatchOutcome::Empty);
        };

        if let Some(history) = patches.iter().find(|p| p.name().is_history()) {
            log::info!("Skipping batch {version}: {} is a history patch", history.name());
            return Ok(BatchOutcome::SkippedHistory(version));
        }

        if ManifestChain::exists(&self.manifest_dir, &version) {
            log::info!("Manifest for {version} already exists, nothing to do");
            return Ok(BatchOutcome::AlreadyProcessed(version));
        }

        log::info!("Processing {} patches as {version}", patches.len());
        let mut summary = BatchSummary::new(version, patches.len());
        let mut ctx = RunContext::new(version, self.options.scratch_dir.clone());

        for patch in &mut patches {
            ctx.router_mut().route_source(patch)?;
        }
        summary.routing = ctx.router().stats();
        log::info!(
            "Routed {} add-data and {} file-update chunks ({} ignored)",
            summary.routing.add_data,
            summary.routing.file_updates,
            summary.routing.ignored
        );

        let mut manifest = VersionManifest::new(version);
        self.store_indexes(&mut ctx, &mut manifest, &mut summary)?;

        let chain = ManifestChain::load_all(&self.manifest_dir)?;
        if !manifest.covers(&self.options.known_categories) {
            match chain.latest_before(&version) {
                Some(previous) => {
                    let filled = manifest.fill_missing_indexes(previous);
                    summary.carried_indexes = filled.len();
                    log::info!(
                        "Filled in {} missing indexes from {}",
                        filled.len(),
                        previous.version
                    );
                }
                None => log::warn!("No manifest before {version} to fill missing indexes from"),
            }
        }

        // Sheet list: without it there is nothing to enumerate
        self.ensure_indexes(&mut ctx, &manifest, [ROOT_LIST_PATH]);
        let root = match self.resolve_and_store(&ctx, &chain, ROOT_LIST_PATH, true) {
            Ok(root) => root,
            Err(Error::UnresolvedLogicalPath { .. }) => {
                log::warn!("Failing batch {version}: {ROOT_LIST_PATH} not found");
                return Err(Error::MissingRootManifest {
                    path: ROOT_LIST_PATH.to_string(),
                    version: version.to_string(),
                });
            }
            Err(e) => return Err(e),
        };
        let sheets = match root.data.as_deref().map(SheetList::parse) {
            Some(Ok(sheets)) => sheets,
            Some(Err(e)) => {
                log::warn!("Failing batch {version}: {ROOT_LIST_PATH} is unreadable: {e}");
                return Err(Error::MissingRootManifest {
                    path: ROOT_LIST_PATH.to_string(),
                    version: version.to_string(),
                });
            }
            None => {
                SheetList::parse(&self.store.get(&root.record.hash)?).map_err(|e| {
                    log::warn!("Failing batch {version}: {ROOT_LIST_PATH} is unreadable: {e}");
                    Error::MissingRootManifest {
                        path: ROOT_LIST_PATH.to_string(),
                        version: version.to_string(),
                    }
                })?
            }
        };
        log::info!("{ROOT_LIST_PATH} lists {} sheets", sheets.len());
        self.record(&mut manifest, &mut summary, root);

        // Sheet headers
        let header_paths: Vec<String> = sheets.names().map(header_path).collect();
        self.ensure_indexes(&mut ctx, &manifest, header_paths.iter().map(String::as_str));
        let headers = self.resolve_all(&ctx, &chain, &header_paths, true, &mut summary)?;

        let mut page_paths = Vec::new();
        for (sheet, header) in sheets.names().zip(headers) {
            let Some(header) = header else {
                continue;
            };
            let parsed = match header.data.as_deref() {
                Some(data) => SheetHeader::parse(data),
                None => self
                    .store
                    .get(&header.record.hash)
                    .and_then(|data| SheetHeader::parse(&data)),
            };
            match parsed {
                Ok(parsed) => {
                    page_paths.extend(parsed.data_page_paths(sheet));
                    self.record(&mut manifest, &mut summary, header);
                }
                Err(e) => {
                    log::warn!("Skipping {} for {version}: {e}", header.path);
                    summary.skipped += 1;
                }
            }
        }

        // Data pages
        self.ensure_indexes(&mut ctx, &manifest, page_paths.iter().map(String::as_str));
        let pages = self.resolve_all(&ctx, &chain, &page_paths, false, &mut summary)?;
        for page in pages.into_iter().flatten() {
            self.record(&mut manifest, &mut summary, page);
        }

        summary.manifest_path = manifest.save(&self.manifest_dir)?;
        log::info!(
            "Wrote manifest {} ({} files, {} new blobs, {} skipped)",
            summary.manifest_path.display(),
            manifest.files.len(),
            summary.blobs_written,
            summary.skipped
        );

        if let Err(e) = ctx.close() {
            log::warn!("Failed to clean up sparse stores for {version}: {e}");
        }

        Ok(BatchOutcome::Committed(summary))
    }

    /// Store every index this batch shipped and cache it parsed
    fn store_indexes(
        &self,
        ctx: &mut RunContext,
        manifest: &mut VersionManifest,
        summary: &mut BatchSummary,
    ) -> Result<()> {
        for target in ctx.router().index_targets() {
            let Some(data) = ctx.router().index_bytes(&target)? else {
                continue;
            };
            let (hash, outcome) = self.store.put(&data)?;
            if outcome == PutOutcome::Written {
                summary.blobs_written += 1;
            }
            log::debug!("Index {target} stored as {hash}");
            manifest.record_index(target.category, hash);
            ctx.load_index(target.category, &data);
            summary.index_blobs += 1;
        }
        log::info!("Processed {} index files", summary.index_blobs);
        Ok(())
    }

    /// Make sure the index of every category in `paths` is cached
    fn ensure_indexes<'a, I>(&self, ctx: &mut RunContext, manifest: &VersionManifest, paths: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let categories: BTreeSet<u32> = paths.into_iter().map(category_for_path).collect();
        for category in categories {
            if ctx.has_index(category) {
                continue;
            }
            let Some(hash) = manifest.indexes.get(&category) else {
                log::warn!(
                    "No index for category {category:06x} in {}",
                    manifest.version
                );
                ctx.load_empty_index(category);
                continue;
            };
            match self.store.get(hash) {
                Ok(data) => {
                    ctx.load_index(category, &data);
                }
                Err(e) => {
                    log::warn!("Index {category:06x} for {}: {e}", manifest.version);
                    ctx.load_empty_index(category);
                }
            }
        }
    }

    /// Resolve and store a list of paths, in order
    ///
    /// Paths no tier can resolve come back as `None` and are counted as
    /// skipped. Any other error aborts the batch.
    fn resolve_all(
        &self,
        ctx: &RunContext,
        chain: &ManifestChain,
        paths: &[String],
        keep_data: bool,
        summary: &mut BatchSummary,
    ) -> Result<Vec<Option<CommittedFile>>> {
        let resolve = |path: &String| match self.resolve_and_store(ctx, chain, path, keep_data) {
            Ok(file) => Ok(Some(file)),
            Err(e @ Error::UnresolvedLogicalPath { .. }) => {
                log::warn!("Skipping for {}: {e}", ctx.version());
                Ok(None)
            }
            Err(e) => Err(e),
        };

        let files: Vec<Option<CommittedFile>> = if self.options.parallel {
            use rayon::prelude::*;
            paths.par_iter().map(resolve).collect::<Result<_>>()?
        } else {
            paths.iter().map(resolve).collect::<Result<_>>()?
        };

        summary.skipped += files.iter().filter(|f| f.is_none()).count();
        Ok(files)
    }

    fn resolve_and_store(
        &self,
        ctx: &RunContext,
        chain: &ManifestChain,
        path: &str,
        keep_data: bool,
    ) -> Result<CommittedFile> {
        let resolved = self.resolve(ctx, chain, path)?;
        let (hash, outcome, data) = match resolved.payload {
            Payload::Fresh(data) => {
                let (hash, outcome) = self.store.put(&data)?;
                (hash, Some(outcome), keep_data.then_some(data))
            }
            Payload::Stored(hash) => (hash, None, None),
        };

        Ok(CommittedFile {
            path: path.to_string(),
            record: FileRecord {
                hash,
                data_file_id: resolved.location.data_file_id,
                offset: resolved.location.offset,
            },
            tier: resolved.tier,
            outcome,
            data,
        })
    }

    /// Find a logical path's bytes, trying each tier in turn
    fn resolve(&self, ctx: &RunContext, chain: &ManifestChain, path: &str) -> Result<Resolved> {
        let (category, location) = ctx.lookup(path);
        let unresolved = || Error::UnresolvedLogicalPath {
            path: path.to_string(),
            category,
        };
        let location = location.ok_or_else(unresolved)?;
        let shard = ShardTarget::data(category, location.data_file_id);

        if let Some(store) = ctx.router().add_data_store(&shard) {
            let decoded = store.read_at(location.offset).and_then(|extent| {
                extent
                    .map(|bytes| read_entry(&mut Cursor::new(bytes), 0))
                    .transpose()
            });
            match decoded {
                Ok(Some(data)) => {
                    return Ok(Resolved {
                        location,
                        tier: Tier::AddData,
                        payload: Payload::Fresh(data),
                    });
                }
                Ok(None) => {}
                Err(e) => log::warn!(
                    "{path}: add-data entry at 0x{:X} unusable in {}: {e}",
                    location.offset,
                    ctx.version()
                ),
            }
        }

        if let Some(store) = ctx.router().file_update_store(&shard) {
            let decoded = store
                .reader()
                .and_then(|mut reader| read_entry(&mut reader, location.offset));
            match decoded {
                Ok(data) => {
                    return Ok(Resolved {
                        location,
                        tier: Tier::FileUpdate,
                        payload: Payload::Fresh(data),
                    });
                }
                Err(e) => log::warn!(
                    "{path}: rewritten {shard} unusable at 0x{:X} in {}: {e}",
                    location.offset,
                    ctx.version()
                ),
            }
        }

        if let Some((manifest, record)) = chain.find_file_before(ctx.version(), path) {
            if self.store.contains(&record.hash) {
                log::trace!("{path}: carried forward from {}", manifest.version);
                return Ok(Resolved {
                    location,
                    tier: Tier::History,
                    payload: Payload::Stored(record.hash.clone()),
                });
            }
            log::warn!(
                "{path}: blob {} recorded by {} is missing from the store",
                record.hash,
                manifest.version
            );
        }

        Err(unresolved())
    }

    fn record(
        &self,
        manifest: &mut VersionManifest,
        summary: &mut BatchSummary,
        file: CommittedFile,
    ) {
        if manifest.record_file(&file.path, file.record.clone()) {
            summary.count(&file);
        }
    }
}
