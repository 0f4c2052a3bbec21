//! Progress notifications for the schedulers

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Observer handed to the schedulers.
///
/// Calls arrive concurrently from worker threads. Notifications are advisory and
/// never influence scheduling or results.
pub trait ProgressObserver: Send + Sync {
    /// A batch of more than one file has been scheduled
    fn files_started(&self, _total: usize) {}

    /// A worker picked up one file unit
    fn file_started(&self, _input: &Path) {}

    /// One file unit finished, successfully or not
    fn file_finished(&self, _input: &Path) {}

    /// Sheet processing for `package` is about to dispatch `total` units
    fn sheets_started(&self, _package: &Path, _total: usize) {}

    /// A worker picked up one sheet unit of `package`
    fn sheet_started(&self, _package: &Path, _part: &Path) {}

    /// One sheet unit of `package` finished, successfully or not
    fn sheet_finished(&self, _package: &Path, _part: &Path) {}

    /// All sheet units of `package` finished
    fn sheets_finished(&self, _package: &Path) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {}

/// Observer that only counts notifications
#[derive(Debug, Default)]
pub struct ProgressCounter {
    pub files_total: AtomicUsize,
    pub files_done: AtomicUsize,
    pub sheets_total: AtomicUsize,
    pub sheets_done: AtomicUsize,
}

impl ProgressCounter {
    pub fn files_done(&self) -> usize {
        self.files_done.load(Ordering::SeqCst)
    }

    pub fn sheets_done(&self) -> usize {
        self.sheets_done.load(Ordering::SeqCst)
    }
}

impl ProgressObserver for ProgressCounter {
    fn files_started(&self, total: usize) {
        self.files_total.fetch_add(total, Ordering::SeqCst);
    }

    fn file_finished(&self, _input: &Path) {
        self.files_done.fetch_add(1, Ordering::SeqCst);
    }

    fn sheets_started(&self, _package: &Path, total: usize) {
        self.sheets_total.fetch_add(total, Ordering::SeqCst);
    }

    fn sheet_finished(&self, _package: &Path, _part: &Path) {
        self.sheets_done.fetch_add(1, Ordering::SeqCst);
    }
}
