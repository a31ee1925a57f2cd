//! System clipboard access.
//!
//! The pipeline reads the pasteboard's change counter and file-reference
//! list, and overwrites the pasteboard with file references when
//! republishing. Everything goes through the [`Clipboard`] trait so the
//! pipeline can run against the real pasteboard or an in-memory one.

use crate::error::PipelineError;
use crate::types::ChangeCount;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Clipboard abstraction used by the pipeline.
///
/// Only the four operations the pipeline needs: the change counter for
/// change detection, the file-reference list for parsing, and clear + write
/// for republishing.
pub trait Clipboard: Send + Sync {
    /// Current value of the clipboard's change counter
    fn change_count(&self) -> Result<ChangeCount, PipelineError>;

    /// File references (paths) currently on the clipboard, in clipboard order
    fn file_references(&self) -> Result<Vec<PathBuf>, PipelineError>;

    /// Unconditionally discard the clipboard's current contents
    fn clear(&self) -> Result<(), PipelineError>;

    /// Write the given paths to the clipboard as file references
    fn write_file_references(&self, paths: &[PathBuf]) -> Result<(), PipelineError>;
}

#[cfg(target_os = "macos")]
mod pasteboard {
    use cocoa::base::{id, nil};
    use cocoa::foundation::{NSArray, NSAutoreleasePool, NSString};
    use objc::{class, msg_send, sel, sel_impl};
    use std::ffi::CStr;
    use std::path::PathBuf;

    const FILENAMES_TYPE: &str = "NSFilenamesPboardType";

    fn general() -> id {
        unsafe { msg_send![class!(NSPasteboard), generalPasteboard] }
    }

    pub fn change_count() -> i64 {
        unsafe { msg_send![general(), changeCount] }
    }

    pub fn file_references() -> Vec<PathBuf> {
        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let ty = NSString::alloc(nil).init_str(FILENAMES_TYPE);
            let plist: id = msg_send![general(), propertyListForType: ty];

            let mut paths = Vec::new();
            if plist != nil {
                let count: usize = msg_send![plist, count];
                for i in 0..count {
                    let item: id = msg_send![plist, objectAtIndex: i];
                    let c_str: *const std::os::raw::c_char = msg_send![item, UTF8String];
                    if !c_str.is_null() {
                        if let Ok(s) = CStr::from_ptr(c_str).to_str() {
                            paths.push(PathBuf::from(s));
                        }
                    }
                }
            }

            pool.drain();
            paths
        }
    }

    pub fn clear() {
        unsafe {
            let _: i64 = msg_send![general(), clearContents];
        }
    }

    pub fn write_file_references(paths: &[PathBuf]) {
        unsafe {
            let pool = NSAutoreleasePool::new(nil);
            let ty = NSString::alloc(nil).init_str(FILENAMES_TYPE);

            let items: Vec<id> = paths
                .iter()
                .map(|p| NSString::alloc(nil).init_str(&p.to_string_lossy()))
                .collect();
            let filenames = NSArray::arrayWithObjects(nil, &items);
            let types = NSArray::arrayWithObject(nil, ty);

            let pb = general();
            let _: i64 = msg_send![pb, declareTypes: types owner: nil];
            let _: bool = msg_send![pb, setPropertyList: filenames forType: ty];

            pool.drain();
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod pasteboard {
    use std::path::PathBuf;

    pub fn change_count() -> i64 {
        0
    }

    pub fn file_references() -> Vec<PathBuf> {
        Vec::new()
    }

    pub fn clear() {}

    pub fn write_file_references(_paths: &[PathBuf]) {}
}

/// The general system pasteboard.
///
/// On platforms without a pasteboard backend this reports a constant change
/// counter and empty contents, so the daemon idles harmlessly.
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Clipboard for SystemClipboard {
    fn change_count(&self) -> Result<ChangeCount, PipelineError> {
        Ok(pasteboard::change_count())
    }

    fn file_references(&self) -> Result<Vec<PathBuf>, PipelineError> {
        Ok(pasteboard::file_references())
    }

    fn clear(&self) -> Result<(), PipelineError> {
        pasteboard::clear();
        Ok(())
    }

    fn write_file_references(&self, paths: &[PathBuf]) -> Result<(), PipelineError> {
        pasteboard::write_file_references(paths);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    change_count: ChangeCount,
    files: Vec<PathBuf>,
}

/// In-memory clipboard for tests and headless runs.
///
/// Every mutation bumps the change counter, mirroring how the pasteboard's
/// counter behaves.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    state: Mutex<MemoryState>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate another application copying file references
    pub fn set_file_references(&self, paths: Vec<PathBuf>) {
        let mut state = self.lock();
        state.files = paths;
        state.change_count += 1;
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Clipboard for MemoryClipboard {
    fn change_count(&self) -> Result<ChangeCount, PipelineError> {
        Ok(self.lock().change_count)
    }

    fn file_references(&self) -> Result<Vec<PathBuf>, PipelineError> {
        Ok(self.lock().files.clone())
    }

    fn clear(&self) -> Result<(), PipelineError> {
        let mut state = self.lock();
        state.files.clear();
        state.change_count += 1;
        Ok(())
    }

    fn write_file_references(&self, paths: &[PathBuf]) -> Result<(), PipelineError> {
        let mut state = self.lock();
        state.files = paths.to_vec();
        state.change_count += 1;
        Ok(())
    }
}
