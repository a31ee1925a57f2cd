//! External JPEG optimizer invocation.
//!
//! Encoded JPEG bytes are piped through an external optimizer (jpegoptim)
//! that strips embedded metadata and caps quality at a hard ceiling. The
//! save path fails closed: when the optimizer is missing or fails, nothing
//! is written, rather than caching an unoptimized image.

use crate::config::OptimizerConfig;
use crate::error::PipelineError;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Handle to a located optimizer executable.
pub struct JpegOptimizer {
    /// Resolved path to the executable
    binary_path: PathBuf,
    /// Hard quality ceiling passed to the tool, independent of the
    /// pre-encode quality
    quality_ceiling: u8,
}

impl JpegOptimizer {
    /// Locate the optimizer on the process search path.
    ///
    /// Returns `None` when the executable is missing; callers decide whether
    /// that is fatal (it is, for the daemon).
    pub fn locate(binary_name: &str, quality_ceiling: u8) -> Option<Self> {
        let path = find_in_path(binary_name)?;
        debug!("Found {} at {}", binary_name, path.display());
        Some(Self {
            binary_path: path,
            quality_ceiling,
        })
    }

    /// Use an explicit executable path, bypassing the search
    pub fn with_path(binary_path: PathBuf, quality_ceiling: u8) -> Self {
        Self {
            binary_path,
            quality_ceiling,
        }
    }

    /// Build from configuration: an explicit path wins when it exists,
    /// otherwise the configured name is searched on PATH.
    pub fn from_config(config: &OptimizerConfig) -> Option<Self> {
        if let Some(path) = &config.binary_path {
            if path.is_file() {
                return Some(Self::with_path(path.clone(), config.quality_ceiling));
            }
            warn!(
                "Configured optimizer path {} does not exist, falling back to PATH lookup",
                path.display()
            );
        }
        Self::locate(&config.binary_name, config.quality_ceiling)
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Pipe JPEG bytes through the optimizer.
    ///
    /// Invokes the tool with `--stdin --stdout --strip-all -m<ceiling>`,
    /// feeds the input stream, closes it, and drains stdout until exit. A
    /// nonzero exit status or empty output is a failure for this image.
    pub async fn optimize(&self, jpeg: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let mut child = Command::new(&self.binary_path)
            .arg("--stdin")
            .arg("--stdout")
            .arg("--strip-all")
            .arg(format!("-m{}", self.quality_ceiling))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PipelineError::OptimizerFailed("failed to open stdin".to_string()))?;

        // Feed input from a separate task so a full stdout pipe cannot
        // deadlock the child; dropping stdin closes the pipe.
        let input = jpeg.to_vec();
        let writer = tokio::spawn(async move {
            if let Err(e) = stdin.write_all(&input).await {
                warn!("Failed to write to optimizer stdin: {}", e);
            }
        });

        // wait_with_output drains stdout/stderr and reaps the child on every
        // path, so no pipes or zombies leak.
        let output = child.wait_with_output().await?;
        let _ = writer.await;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::OptimizerFailed(stderr.trim().to_string()));
        }
        if output.stdout.is_empty() {
            return Err(PipelineError::OptimizerFailed("empty output".to_string()));
        }

        debug!(
            "Optimized {} -> {} bytes",
            jpeg.len(),
            output.stdout.len()
        );
        Ok(output.stdout)
    }
}

/// Search the process PATH for an executable with the given name
pub fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = env::var_os("PATH")?;
    find_in_dirs(name, env::split_paths(&path_var))
}

fn find_in_dirs(name: &str, dirs: impl Iterator<Item = PathBuf>) -> Option<PathBuf> {
    dirs.map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
