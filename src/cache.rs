//! Bounded recency cache of optimized JPEGs on disk.
//!
//! A single flat directory is the cache's entire persisted state: each entry
//! is a timestamp-named `.jpg` file, and recency is re-derived on every query
//! from filesystem modification times. There is no manifest and no in-memory
//! index, so consistency is exactly as good as the filesystem's own mtime
//! semantics.

use crate::error::PipelineError;
use chrono::{DateTime, Local};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Manager for the cache directory.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write optimized JPEG bytes under a timestamp-derived name.
    ///
    /// The timestamp is formatted to second precision; `index` disambiguates
    /// entries that share a timestamp within one run. Creates the cache
    /// directory if absent.
    pub fn store(
        &self,
        bytes: &[u8],
        timestamp: DateTime<Local>,
        index: usize,
    ) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.dir)?;

        let filename = format!("{}_{}.jpg", timestamp.format(TIMESTAMP_FORMAT), index);
        let path = self.dir.join(filename);
        fs::write(&path, bytes)?;

        debug!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    /// The most recent cached files, newest first, at most `limit`.
    ///
    /// Scans the directory non-recursively, keeps `.jpg` files, and orders
    /// by modification time descending. Ties on mtime fall back to the
    /// numeric index suffix descending, so same-second entries rank by
    /// their index even past single digits, then to filename descending
    /// for foreign files without a suffix. Pure with respect to filesystem
    /// state: repeated calls with no intervening writes return the same
    /// sequence.
    pub fn list_recent(&self, limit: usize) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_jpg = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("jpg"));
            if !is_jpg {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                _ => continue,
            };
            let modified = match metadata.modified() {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            files.push((path, modified));
        }

        files.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| index_suffix(&b.0).cmp(&index_suffix(&a.0)))
                .then_with(|| b.0.cmp(&a.0))
        });
        files.truncate(limit);
        files.into_iter().map(|(path, _)| path).collect()
    }

    /// Total number of cached entries
    pub fn count(&self) -> usize {
        self.list_recent(usize::MAX).len()
    }

    /// Delete every entry in the cache directory, returning how many were
    /// removed.
    ///
    /// Not transactional: a failure partway leaves earlier deletes in place.
    /// A missing directory counts as already empty.
    pub fn clear(&self) -> Result<usize, PipelineError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut deleted = 0;
        for entry in entries.flatten() {
            fs::remove_file(entry.path())?;
            deleted += 1;
        }
        Ok(deleted)
    }
}

/// The numeric `_<index>` suffix of a cache filename, if it has one
fn index_suffix(path: &Path) -> Option<u64> {
    let stem = path.file_stem()?.to_str()?;
    let (_, suffix) = stem.rsplit_once('_')?;
    suffix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn cache_in_tempdir() -> (tempfile::TempDir, DiskCache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().to_path_buf());
        (dir, cache)
    }

    fn sample_timestamp() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 10, 30, 45).unwrap()
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(time).unwrap();
    }

    #[test]
    fn store_names_files_from_timestamp_and_index() {
        let (_dir, cache) = cache_in_tempdir();
        let path = cache.store(b"jpeg", sample_timestamp(), 1).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "2024-03-15_10-30-45_1.jpg"
        );
        assert_eq!(fs::read(&path).unwrap(), b"jpeg");
    }

    #[test]
    fn store_then_list_recent_returns_the_entry() {
        let (_dir, cache) = cache_in_tempdir();
        let path = cache.store(b"jpeg", sample_timestamp(), 1).unwrap();

        assert_eq!(cache.list_recent(1), vec![path]);
    }

    #[test]
    fn list_recent_orders_by_mtime_descending() {
        let (_dir, cache) = cache_in_tempdir();
        let old = cache.store(b"a", sample_timestamp(), 1).unwrap();
        let mid = cache.store(b"b", sample_timestamp(), 2).unwrap();
        let new = cache.store(b"c", sample_timestamp(), 3).unwrap();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        set_mtime(&old, base);
        set_mtime(&mid, base + Duration::from_secs(60));
        set_mtime(&new, base + Duration::from_secs(120));

        assert_eq!(cache.list_recent(10), vec![new, mid, old]);
    }

    #[test]
    fn list_recent_breaks_mtime_ties_by_index() {
        let (_dir, cache) = cache_in_tempdir();
        let paths: Vec<PathBuf> = (1..=11)
            .map(|i| cache.store(b"x", sample_timestamp(), i).unwrap())
            .collect();

        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        for path in &paths {
            set_mtime(path, base);
        }

        // Same mtime: the higher index ranks as more recent, compared
        // numerically, so _10 and _11 outrank _9
        let expected: Vec<PathBuf> = paths.into_iter().rev().collect();
        assert_eq!(cache.list_recent(20), expected);
    }

    #[test]
    fn index_suffix_parses_cache_names_only() {
        assert_eq!(
            index_suffix(Path::new("/c/2024-03-15_10-30-45_12.jpg")),
            Some(12)
        );
        assert_eq!(index_suffix(Path::new("/c/notes.jpg")), None);
    }

    #[test]
    fn list_recent_honors_limit() {
        let (_dir, cache) = cache_in_tempdir();
        for i in 1..=5 {
            cache.store(b"x", sample_timestamp(), i).unwrap();
        }
        assert_eq!(cache.list_recent(3).len(), 3);
        assert_eq!(cache.list_recent(0).len(), 0);
    }

    #[test]
    fn list_recent_is_stable_across_calls() {
        let (_dir, cache) = cache_in_tempdir();
        for i in 1..=4 {
            cache.store(b"x", sample_timestamp(), i).unwrap();
        }
        assert_eq!(cache.list_recent(10), cache.list_recent(10));
    }

    #[test]
    fn list_recent_ignores_non_jpg_entries() {
        let (_dir, cache) = cache_in_tempdir();
        let kept = cache.store(b"x", sample_timestamp(), 1).unwrap();
        fs::write(cache.dir().join("notes.txt"), b"not an image").unwrap();
        fs::write(cache.dir().join("image.png"), b"wrong format").unwrap();

        assert_eq!(cache.list_recent(10), vec![kept]);
    }

    #[test]
    fn clear_deletes_everything_and_reports_count() {
        let (_dir, cache) = cache_in_tempdir();
        for i in 1..=3 {
            cache.store(b"x", sample_timestamp(), i).unwrap();
        }

        assert_eq!(cache.clear().unwrap(), 3);
        assert!(cache.list_recent(10).is_empty());
        assert_eq!(cache.count(), 0);
    }

    #[test]
    fn clear_on_missing_directory_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::new(dir.path().join("never-created"));
        assert_eq!(cache.clear().unwrap(), 0);
    }
}
