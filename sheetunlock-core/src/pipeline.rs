//! Per-file pipeline: extract, strip, repack

use crate::archive;
use crate::error::{Result, UnprotectError};
use crate::pool::WorkerPool;
use crate::progress::ProgressObserver;
use crate::report::FileReport;
use crate::sheets;
use crate::workspace::with_workspace;
use std::path::Path;

/// Run one package through the whole pipeline, writing the result to `output`.
///
/// `output` must differ from `input`; the source package is never modified.
pub fn unprotect_package(
    input: &Path,
    output: &Path,
    temp_root: Option<&Path>,
    sheet_pool: &WorkerPool,
    progress: &dyn ProgressObserver,
) -> Result<FileReport> {
    log::debug!("Processing file: {}", input.display());
    if !input.is_file() {
        return Err(UnprotectError::NotFound {
            path: input.to_path_buf(),
        });
    }
    if same_file(input, output) {
        return Err(UnprotectError::Unexpected(format!(
            "refusing to overwrite input {}",
            input.display()
        )));
    }

    let sheets = with_workspace(temp_root, |workspace| {
        archive::extract(input, workspace)?;
        let sheets = sheets::process_sheets(workspace, input, sheet_pool, progress)?;
        archive::pack(workspace, output)?;
        Ok(sheets)
    })?;

    log::debug!("File unprotected saved as: {}", output.display());
    Ok(FileReport {
        output: output.to_path_buf(),
        sheets,
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
