//! Pipeline orchestration.
//!
//! Ties the components together into the single run sequence:
//! parse -> resolve -> transform -> optimize -> store -> publish.
//!
//! Runs are gated by the [`ChangeMonitor`](crate::monitor::ChangeMonitor)
//! and executed to completion inside one timer loop, so runs never overlap.
//! The cache sits behind a mutex because the presentation layer can trigger
//! reads and clears from other threads.

use crate::cache::DiskCache;
use crate::clipboard::Clipboard;
use crate::config::Config;
use crate::error::PipelineError;
use crate::library::AssetLibrary;
use crate::monitor::ChangeMonitor;
use crate::optimizer::JpegOptimizer;
use crate::types::{ChangeCount, RunOutcome};
use crate::{parser, publisher, transform};
use chrono::Local;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// The extraction/republish pipeline.
pub struct Pipeline {
    config: Config,
    clipboard: Arc<dyn Clipboard>,
    library: Arc<dyn AssetLibrary>,
    /// Absent when the optimizer executable could not be located; every
    /// save fails closed in that case
    optimizer: Option<JpegOptimizer>,
    cache: Mutex<DiskCache>,
    monitor: ChangeMonitor,
}

/// Snapshot of pipeline state for status display.
#[derive(Debug, Clone)]
pub struct PipelineStatus {
    pub cached_files: usize,
    pub optimizer_available: bool,
    pub last_change_count: Option<ChangeCount>,
}

impl Pipeline {
    pub fn new(
        config: Config,
        clipboard: Arc<dyn Clipboard>,
        library: Arc<dyn AssetLibrary>,
        optimizer: Option<JpegOptimizer>,
    ) -> Self {
        let cache = DiskCache::new(config.cache_dir());
        Self {
            config,
            clipboard,
            library,
            optimizer,
            cache: Mutex::new(cache),
            monitor: ChangeMonitor::new(),
        }
    }

    fn cache(&self) -> MutexGuard<'_, DiskCache> {
        match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// One monitor tick: run the pipeline only when the clipboard's change
    /// counter moved. The very first tick always runs, picking up whatever
    /// was on the clipboard before the daemon started.
    pub async fn tick(&mut self) {
        let current = match self.clipboard.change_count() {
            Ok(count) => count,
            Err(e) => {
                warn!("Failed to read clipboard change count: {}", e);
                return;
            }
        };

        if !self.monitor.observe(current) {
            return;
        }
        debug!("Clipboard changed (count {})", current);

        match self.run_once().await {
            Ok(outcome) => debug!("Pipeline run finished: {:?}", outcome),
            Err(e) => warn!("Pipeline run failed: {}", e),
        }
    }

    /// Execute one complete pipeline run.
    ///
    /// Per-image failures are contained: a transform, optimize, or store
    /// failure skips that image and the run continues. Only clipboard and
    /// library transport errors surface as `Err`.
    pub async fn run_once(&self) -> Result<RunOutcome, PipelineError> {
        let references = self.clipboard.file_references()?;
        let ids = parser::extract_asset_ids(&references);
        if ids.is_empty() {
            return Ok(RunOutcome::NoReferences);
        }
        debug!(
            "Parsed {} asset reference(s) from {} clipboard item(s)",
            ids.len(),
            references.len()
        );

        if !self.library.request_authorization().await {
            debug!("Photo library authorization denied, aborting run");
            return Ok(RunOutcome::AuthorizationDenied);
        }

        let assets = self.library.resolve(&ids).await?;
        if assets.is_empty() {
            return Ok(RunOutcome::NoAssets);
        }

        if self.optimizer.is_none() {
            warn!("Optimizer unavailable, no images will be saved this run");
        }

        let now = Local::now();
        let mut saved = 0usize;

        for (index, asset) in assets.iter().enumerate() {
            let optimizer = match &self.optimizer {
                Some(optimizer) => optimizer,
                None => continue,
            };

            let resized = transform::resize_to_width(&asset.image, self.config.image.max_width);
            let encoded = match transform::encode_jpeg(&resized, self.config.image.jpeg_quality) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to encode asset {}: {}", asset.id, e);
                    continue;
                }
            };
            let optimized = match optimizer.optimize(&encoded).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Failed to optimize asset {}: {}", asset.id, e);
                    continue;
                }
            };

            let timestamp = asset
                .created_at
                .map(|t| t.with_timezone(&Local))
                .unwrap_or(now);
            match self.cache().store(&optimized, timestamp, index + 1) {
                Ok(path) => {
                    info!("Saved {}", path.display());
                    saved += 1;
                }
                Err(e) => warn!("Failed to store asset {}: {}", asset.id, e),
            }
        }

        info!("Saved {}/{} photo(s) to cache", saved, assets.len());

        // Republish the whole recent set, exactly as a manual copy would;
        // publish is a no-op when the cache is empty.
        let recent = self.cache().list_recent(self.config.cache.recent_limit);
        publisher::publish(self.clipboard.as_ref(), &recent)?;

        Ok(RunOutcome::Completed {
            resolved: assets.len(),
            saved,
        })
    }

    // Presentation-layer inputs: the UI consumes a recent-file list and a
    // count, and triggers clears and manual copies.

    /// The most recent cached files, newest first
    pub fn recent_files(&self) -> Vec<PathBuf> {
        self.cache().list_recent(self.config.cache.recent_limit)
    }

    /// Total number of cached files
    pub fn cached_count(&self) -> usize {
        self.cache().count()
    }

    /// Delete every cached file, returning how many were removed
    pub fn clear_cache(&self) -> Result<usize, PipelineError> {
        let deleted = self.cache().clear()?;
        info!("Cleared cache: {} file(s) deleted", deleted);
        Ok(deleted)
    }

    /// Copy the current recent set to the clipboard
    pub fn copy_to_clipboard(&self) -> Result<(), PipelineError> {
        let recent = self.recent_files();
        publisher::publish(self.clipboard.as_ref(), &recent)
    }

    /// Get pipeline status
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            cached_files: self.cached_count(),
            optimizer_available: self.optimizer.is_some(),
            last_change_count: self.monitor.last_seen(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use crate::types::{AssetId, ResolvedAsset};
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const UUID_A: &str = "AAAAAAAA-1111-2222-3333-444444444444";
    const UUID_B: &str = "BBBBBBBB-5555-6666-7777-888888888888";

    struct FakeLibrary {
        authorized: bool,
        known: Vec<AssetId>,
        resolve_calls: AtomicUsize,
    }

    impl FakeLibrary {
        fn new(authorized: bool, known: &[&str]) -> Self {
            Self {
                authorized,
                known: known.iter().map(|s| s.to_string()).collect(),
                resolve_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AssetLibrary for FakeLibrary {
        async fn request_authorization(&self) -> bool {
            self.authorized
        }

        async fn resolve(&self, ids: &[AssetId]) -> Result<Vec<ResolvedAsset>, PipelineError> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ids
                .iter()
                .filter(|id| self.known.contains(id))
                .map(|id| ResolvedAsset {
                    id: id.clone(),
                    image: DynamicImage::ImageRgb8(RgbImage::from_pixel(
                        8,
                        8,
                        Rgb([120, 40, 200]),
                    )),
                    created_at: None,
                    pixel_width: 8,
                    pixel_height: 8,
                })
                .collect())
        }
    }

    fn config_with_cache(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.cache.directory = Some(dir.to_path_buf());
        config
    }

    fn clipboard_with_refs(names: &[&str]) -> Arc<MemoryClipboard> {
        let clipboard = Arc::new(MemoryClipboard::new());
        clipboard.set_file_references(
            names
                .iter()
                .map(|n| PathBuf::from(format!("/tmp/{}", n)))
                .collect(),
        );
        clipboard
    }

    #[cfg(unix)]
    fn fake_optimizer(dir: &std::path::Path, script_body: &str) -> JpegOptimizer {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-jpegoptim");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", script_body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        JpegOptimizer::with_path(path, 70)
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_saves_resolved_assets_and_republishes() {
        let cache_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();

        let clipboard = clipboard_with_refs(&[
            &format!("IMG_{}.jpeg", UUID_A),
            "notes.txt",
            &format!("{}.HEIC", UUID_B),
        ]);
        let library = Arc::new(FakeLibrary::new(true, &[UUID_A, UUID_B]));
        let pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard.clone(),
            library,
            Some(fake_optimizer(bin_dir.path(), "cat")),
        );

        let outcome = pipeline.run_once().await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                resolved: 2,
                saved: 2
            }
        );

        let recent = pipeline.recent_files();
        assert_eq!(recent.len(), 2);
        assert_eq!(pipeline.cached_count(), 2);
        // The clipboard now holds exactly the recent set
        assert_eq!(clipboard.file_references().unwrap(), recent);
    }

    #[tokio::test]
    async fn run_without_references_leaves_clipboard_alone() {
        let cache_dir = tempfile::tempdir().unwrap();
        let clipboard = clipboard_with_refs(&["a.jpg", "b.png"]);
        let before = clipboard.file_references().unwrap();
        let library = Arc::new(FakeLibrary::new(true, &[UUID_A]));

        let pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard.clone(),
            library,
            None,
        );

        let outcome = pipeline.run_once().await.unwrap();
        assert_eq!(outcome, RunOutcome::NoReferences);
        assert_eq!(pipeline.cached_count(), 0);
        assert_eq!(clipboard.file_references().unwrap(), before);
    }

    #[tokio::test]
    async fn authorization_denied_aborts_silently() {
        let cache_dir = tempfile::tempdir().unwrap();
        let clipboard = clipboard_with_refs(&[&format!("{}.jpeg", UUID_A)]);
        let library = Arc::new(FakeLibrary::new(false, &[UUID_A]));

        let pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard,
            library.clone(),
            None,
        );

        let outcome = pipeline.run_once().await.unwrap();
        assert_eq!(outcome, RunOutcome::AuthorizationDenied);
        assert_eq!(library.resolve_calls.load(Ordering::SeqCst), 0);
        assert_eq!(pipeline.cached_count(), 0);
    }

    #[tokio::test]
    async fn unmatched_identifiers_end_the_run_quietly() {
        let cache_dir = tempfile::tempdir().unwrap();
        let clipboard = clipboard_with_refs(&[&format!("{}.jpeg", UUID_A)]);
        // Library knows nothing on the clipboard
        let library = Arc::new(FakeLibrary::new(true, &[UUID_B]));

        let pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard,
            library,
            None,
        );

        assert_eq!(pipeline.run_once().await.unwrap(), RunOutcome::NoAssets);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn optimize_failure_skips_that_image_only() {
        let cache_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let clipboard = clipboard_with_refs(&[
            &format!("{}.jpeg", UUID_A),
            &format!("{}.jpeg", UUID_B),
        ]);
        let library = Arc::new(FakeLibrary::new(true, &[UUID_A, UUID_B]));

        // Fails its first invocation only, so one image in the batch is
        // rejected while the other passes through
        let flaky = "if [ ! -f \"$0.ran\" ]; then\n\
                     touch \"$0.ran\"\n\
                     cat > /dev/null\n\
                     exit 1\n\
                     fi\n\
                     cat";
        let pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard.clone(),
            library,
            Some(fake_optimizer(bin_dir.path(), flaky)),
        );

        let outcome = pipeline.run_once().await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                resolved: 2,
                saved: 1
            }
        );

        let recent = pipeline.recent_files();
        assert_eq!(recent.len(), 1);
        assert_eq!(pipeline.cached_count(), 1);
        assert_eq!(clipboard.file_references().unwrap(), recent);
    }

    #[tokio::test]
    async fn missing_optimizer_saves_nothing_but_completes() {
        let cache_dir = tempfile::tempdir().unwrap();
        let clipboard = clipboard_with_refs(&[&format!("{}.jpeg", UUID_A)]);
        let before = clipboard.file_references().unwrap();
        let library = Arc::new(FakeLibrary::new(true, &[UUID_A]));

        let pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard.clone(),
            library,
            None,
        );

        let outcome = pipeline.run_once().await.unwrap();
        assert_eq!(
            outcome,
            RunOutcome::Completed {
                resolved: 1,
                saved: 0
            }
        );
        assert_eq!(pipeline.cached_count(), 0);
        // Empty cache means empty publish, which is a no-op
        assert_eq!(clipboard.file_references().unwrap(), before);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tick_runs_once_per_counter_transition() {
        let cache_dir = tempfile::tempdir().unwrap();
        let bin_dir = tempfile::tempdir().unwrap();
        let clipboard = clipboard_with_refs(&[&format!("{}.jpeg", UUID_A)]);
        let library = Arc::new(FakeLibrary::new(true, &[UUID_A]));

        let mut pipeline = Pipeline::new(
            config_with_cache(cache_dir.path()),
            clipboard.clone(),
            library.clone(),
            Some(fake_optimizer(bin_dir.path(), "cat")),
        );

        // First tick runs unconditionally
        pipeline.tick().await;
        assert_eq!(library.resolve_calls.load(Ordering::SeqCst), 1);

        // Republishing bumped the counter, so the next tick runs again and
        // then settles: republished paths carry no fresh identifiers beyond
        // what the cache already holds
        pipeline.tick().await;
        let after_settle = library.resolve_calls.load(Ordering::SeqCst);
        pipeline.tick().await;
        pipeline.tick().await;
        assert_eq!(library.resolve_calls.load(Ordering::SeqCst), after_settle);

        // An external copy bumps the counter and triggers exactly one run
        clipboard.set_file_references(vec![PathBuf::from(format!("/tmp/{}.jpeg", UUID_B))]);
        pipeline.tick().await;
        pipeline.tick().await;
        assert_eq!(
            library.resolve_calls.load(Ordering::SeqCst),
            after_settle + 1
        );
    }
}
