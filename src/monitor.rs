//! Clipboard change detection.
//!
//! The monitor gates pipeline invocation on the pasteboard's change counter:
//! at most one run per observed counter transition, plus one unconditional
//! run for the very first observation so content already on the clipboard at
//! startup is picked up.

use crate::types::ChangeCount;

/// Tracks the last seen clipboard change counter.
///
/// Comparisons are monotonic-agnostic: any difference triggers a run, so a
/// counter that resets or wraps still behaves correctly.
#[derive(Debug, Default)]
pub struct ChangeMonitor {
    last_seen: Option<ChangeCount>,
}

impl ChangeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current counter value, returning `true` when the pipeline
    /// should run.
    pub fn observe(&mut self, current: ChangeCount) -> bool {
        let changed = self.last_seen != Some(current);
        if changed {
            self.last_seen = Some(current);
        }
        changed
    }

    /// The last recorded counter value, if any
    pub fn last_seen(&self) -> Option<ChangeCount> {
        self.last_seen
    }
}
