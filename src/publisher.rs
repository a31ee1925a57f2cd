//! Clipboard republishing of cached files.

use crate::clipboard::Clipboard;
use crate::error::PipelineError;
use std::path::PathBuf;
use tracing::{debug, info};

/// Overwrite the clipboard with file references to the given paths.
///
/// An empty list is a no-op rather than a clear, so a run that produced
/// nothing never blanks out whatever the clipboard already held.
pub fn publish(clipboard: &dyn Clipboard, paths: &[PathBuf]) -> Result<(), PipelineError> {
    if paths.is_empty() {
        debug!("Nothing to publish, leaving clipboard untouched");
        return Ok(());
    }

    clipboard.clear()?;
    clipboard.write_file_references(paths)?;
    info!("Published {} file reference(s) to the clipboard", paths.len());
    Ok(())
}
