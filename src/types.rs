//! Core types used throughout the pipeline.

use chrono::{DateTime, Utc};
use image::DynamicImage;

/// The pasteboard's change counter value at a point in time.
///
/// Compared only against previously seen values, never interpreted.
pub type ChangeCount = i64;

/// A photo-library identifier extracted from a clipboard file reference.
///
/// Ephemeral; lives only within one pipeline run.
pub type AssetId = String;

/// A photo resolved from the library: full-resolution pixel data plus the
/// metadata the library reports for it.
#[derive(Clone)]
pub struct ResolvedAsset {
    /// The identifier this asset was resolved from
    pub id: AssetId,
    /// Decoded full-resolution image
    pub image: DynamicImage,
    /// Capture timestamp, if the library knows it
    pub created_at: Option<DateTime<Utc>>,
    /// Pixel width as reported by the library
    pub pixel_width: u32,
    /// Pixel height as reported by the library
    pub pixel_height: u32,
}

/// How a single pipeline run ended.
///
/// Every variant except `Completed` is a normal, silent terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// No clipboard reference contained a parseable identifier
    NoReferences,
    /// The library refused read access; retried on the next clipboard change
    AuthorizationDenied,
    /// Identifiers parsed but none matched a library asset
    NoAssets,
    /// The run processed resolved assets and republished the cache
    Completed {
        /// Assets the library returned
        resolved: usize,
        /// Images that made it through optimize + store
        saved: usize,
    },
}
