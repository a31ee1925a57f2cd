//! Phototray - clipboard photo pipeline
//!
//! Watches the system clipboard for references to photos copied out of the
//! photo library, resolves them to full-resolution images with metadata,
//! resizes and recompresses each one through an external optimizer, stores
//! the results in a bounded recency cache on disk, and republishes the cached
//! files as plain file references that any application can paste.
//!
//! # Architecture
//!
//! A single timer-driven loop funnels every run through the same sequence:
//! parse -> resolve -> transform -> optimize -> store -> publish. Failures
//! are contained to the image or run that produced them, so the loop itself
//! never dies; authorization denial and a missing optimizer are the only
//! conditions that escalate beyond a single image.

pub mod cache;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod library;
pub mod monitor;
pub mod optimizer;
pub mod parser;
pub mod pipeline;
pub mod publisher;
pub mod transform;
pub mod types;

// Re-export commonly used types
pub use cache::DiskCache;
pub use clipboard::{Clipboard, MemoryClipboard, SystemClipboard};
pub use config::Config;
pub use error::PipelineError;
pub use library::{AssetLibrary, PhotoKitClient};
pub use monitor::ChangeMonitor;
pub use optimizer::JpegOptimizer;
pub use pipeline::{Pipeline, PipelineStatus};
pub use types::{AssetId, ChangeCount, ResolvedAsset, RunOutcome};
