//! Extraction of photo-library identifiers from clipboard file references.
//!
//! The photo library puts temp file URLs on the pasteboard whose filenames
//! embed the asset's UUID. Parsing scans each reference's last path component
//! for the canonical 8-4-4-4-12 pattern.

use crate::types::AssetId;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    // Canonical UUID: 8-4-4-4-12 hexadecimal groups, case-insensitive
    static ref UUID: Regex = Regex::new(
        r"(?i)[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}"
    )
    .unwrap();
}

/// Extract asset identifiers from a list of clipboard file references.
///
/// Takes the first UUID match in each reference's filename, preserving input
/// order. References without a match are skipped; an empty result is a normal
/// terminal state for the run, not an error.
pub fn extract_asset_ids<P: AsRef<Path>>(references: &[P]) -> Vec<AssetId> {
    references
        .iter()
        .filter_map(|reference| {
            let filename = reference.as_ref().file_name()?.to_str()?;
            UUID.find(filename).map(|m| m.as_str().to_string())
        })
        .collect()
}
