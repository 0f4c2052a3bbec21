//! Scoped temporary directories for extracted packages

use crate::error::{Result, UnprotectError};
use std::path::Path;

const WORKSPACE_PREFIX: &str = "sheetunlock-";

/// Run `f` inside a fresh temporary directory and delete it afterwards.
///
/// The directory is removed on every exit path: success, error, and unwinding
/// panics (the `TempDir` guard is dropped during unwinding). A cleanup failure
/// is logged but never replaces the result of `f`.
pub fn with_workspace<T, F>(parent: Option<&Path>, f: F) -> Result<T>
where
    F: FnOnce(&Path) -> Result<T>,
{
    let mut builder = tempfile::Builder::new();
    builder.prefix(WORKSPACE_PREFIX);
    let dir = match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    }
    .map_err(|e| UnprotectError::io(parent.unwrap_or_else(|| Path::new("<tmp>")), e))?;

    let result = f(dir.path());

    let location = dir.path().to_path_buf();
    match dir.close() {
        Ok(()) => log::debug!("Deleted temporary directory {}", location.display()),
        Err(e) => log::warn!(
            "Failed to delete temporary directory {}: {}",
            location.display(),
            e
        ),
    }

    result
}
