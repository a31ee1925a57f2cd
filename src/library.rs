//! Asset library client.
//!
//! Resolves photo identifiers against the system photo library. The library
//! itself lives behind platform frameworks, so the client shells out to a
//! small `photokit-helper` binary that handles authorization and asset
//! fetching, writes full-resolution images to a staging directory, and
//! reports per-asset metadata as JSON on stdout.

use crate::error::PipelineError;
use crate::types::{AssetId, ResolvedAsset};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, warn};

/// Access to the external photo library service.
#[async_trait]
pub trait AssetLibrary: Send + Sync {
    /// Request read access to the library. `false` aborts the run silently;
    /// the next detected clipboard change retries.
    async fn request_authorization(&self) -> bool;

    /// Batch-resolve identifiers to full-resolution images with metadata.
    ///
    /// Unmatched identifiers are silently dropped, so the result may be
    /// shorter than the input, and result order is not guaranteed to match
    /// input order.
    async fn resolve(&self, ids: &[AssetId]) -> Result<Vec<ResolvedAsset>, PipelineError>;
}

/// Per-asset record the helper prints on stdout.
#[derive(Debug, serde::Deserialize)]
struct HelperRecord {
    uuid: String,
    path: PathBuf,
    created_at: Option<DateTime<Utc>>,
    pixel_width: u32,
    pixel_height: u32,
}

/// Client for the `photokit-helper` fetch binary.
pub struct PhotoKitClient {
    /// Path to the helper binary
    binary_path: PathBuf,
}

impl PhotoKitClient {
    /// Create a client with the default helper binary path
    pub fn new() -> Self {
        Self {
            binary_path: Self::default_binary_path(),
        }
    }

    /// Create with a custom helper binary path
    pub fn with_path(path: PathBuf) -> Self {
        Self { binary_path: path }
    }

    /// Get the default helper binary path
    fn default_binary_path() -> PathBuf {
        // Get the directory of the current executable
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));

        let candidates = [
            // Same directory as the running binary
            exe_dir.join("photokit-helper"),
            // System paths
            PathBuf::from("/usr/local/bin/photokit-helper"),
            PathBuf::from("/opt/homebrew/bin/photokit-helper"),
        ];

        for path in candidates {
            if path.exists() {
                return path;
            }
        }

        // Default fallback - will fail gracefully
        PathBuf::from("photokit-helper")
    }

    /// Check if the helper binary is available
    pub fn is_available(&self) -> bool {
        let exists = self.binary_path.exists();
        if !exists {
            debug!(
                "photokit-helper binary not found at: {}",
                self.binary_path.display()
            );
        }
        exists
    }

    /// Directory the helper stages fetched images into
    fn staging_dir() -> PathBuf {
        std::env::temp_dir().join(format!("phototray-staging-{}", std::process::id()))
    }
}

impl Default for PhotoKitClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetLibrary for PhotoKitClient {
    async fn request_authorization(&self) -> bool {
        if !self.is_available() {
            return false;
        }

        let output = Command::new(&self.binary_path)
            .arg("--request-access")
            .arg("--json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => serde_json::from_slice::<serde_json::Value>(&out.stdout)
                .ok()
                .and_then(|v| v["authorized"].as_bool())
                .unwrap_or(false),
            Ok(out) => {
                let stderr = String::from_utf8_lossy(&out.stderr);
                warn!("photokit-helper authorization check failed: {}", stderr.trim());
                false
            }
            Err(e) => {
                warn!("Failed to run photokit-helper: {}", e);
                false
            }
        }
    }

    async fn resolve(&self, ids: &[AssetId]) -> Result<Vec<ResolvedAsset>, PipelineError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if !self.is_available() {
            return Err(PipelineError::Library(
                "photokit-helper binary not found".to_string(),
            ));
        }

        let staging = Self::staging_dir();
        std::fs::create_dir_all(&staging)?;

        let mut cmd = Command::new(&self.binary_path);
        cmd.arg("--fetch");
        for id in ids {
            cmd.arg(id);
        }
        let output = cmd
            .arg("--output-dir")
            .arg(&staging)
            .arg("--json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::Library(stderr.trim().to_string()));
        }

        let records: Vec<HelperRecord> = serde_json::from_slice(&output.stdout)
            .map_err(|e| PipelineError::Library(format!("failed to parse helper output: {}", e)))?;

        let mut assets = Vec::with_capacity(records.len());
        for record in records {
            match image::open(&record.path) {
                Ok(img) => assets.push(ResolvedAsset {
                    id: record.uuid,
                    image: img,
                    created_at: record.created_at,
                    pixel_width: record.pixel_width,
                    pixel_height: record.pixel_height,
                }),
                Err(e) => warn!("Failed to decode fetched asset {}: {}", record.uuid, e),
            }
            // Staged copies are transient; the cache owns the durable files
            let _ = std::fs::remove_file(&record.path);
        }
        let _ = std::fs::remove_dir(&staging);

        debug!("Resolved {}/{} asset(s)", assets.len(), ids.len());
        Ok(assets)
    }
}
