//! Sheet-level fan-out over one extracted package

use crate::error::{Result, UnprotectError};
use crate::pool::WorkerPool;
use crate::progress::ProgressObserver;
use crate::report::SheetResult;
use crate::strip;
use std::fs;
use std::path::{Path, PathBuf};

/// Location of worksheet parts inside a package
pub const WORKSHEETS_DIR: &str = "xl/worksheets";

/// List the `.xml` files directly inside `worksheets_dir`, sorted by name
pub fn discover_sheets(worksheets_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(worksheets_dir).map_err(|e| UnprotectError::io(worksheets_dir, e))?;
    let mut names = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| UnprotectError::io(worksheets_dir, e))?;
        let is_file = entry
            .file_type()
            .map_err(|e| UnprotectError::io(&entry.path(), e))?
            .is_file();
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_file && name.ends_with(".xml") {
            names.push(name);
        }
    }

    names.sort();
    Ok(names)
}

/// Strip every worksheet of the package extracted in `workspace`.
///
/// Produces exactly one [`SheetResult`] per discovered part. A failing part is
/// logged and recorded; it never stops the other parts. Only a missing or
/// unreadable worksheets directory fails the whole call.
pub fn process_sheets(
    workspace: &Path,
    package: &Path,
    pool: &WorkerPool,
    progress: &dyn ProgressObserver,
) -> Result<Vec<SheetResult>> {
    let worksheets_dir = workspace.join(WORKSHEETS_DIR);
    if !worksheets_dir.is_dir() {
        return Err(UnprotectError::NotFound {
            path: PathBuf::from(WORKSHEETS_DIR),
        });
    }

    let names = discover_sheets(&worksheets_dir)?;
    log::debug!("Found {} sheet parts in {}", names.len(), package.display());
    progress.sheets_started(package, names.len());

    let outcomes = pool.run_all(names, |name| {
        let part = Path::new(WORKSHEETS_DIR).join(name);
        progress.sheet_started(package, &part);
        let outcome = strip::strip(&worksheets_dir.join(name));
        progress.sheet_finished(package, &part);
        outcome
    });

    let results = outcomes
        .into_iter()
        .map(|(name, outcome)| {
            let part = Path::new(WORKSHEETS_DIR).join(&name);
            let outcome = match outcome {
                Ok(result) => result,
                Err(payload) => {
                    // The panicking unit never reached its own progress call
                    progress.sheet_finished(package, &part);
                    Err(UnprotectError::from_panic(payload, &part))
                }
            };
            if let Err(e) = &outcome {
                log::error!(
                    "Error processing sheet {} in {} [{}]: {}",
                    part.display(),
                    package.display(),
                    e.kind(),
                    e
                );
            }
            SheetResult { part, outcome }
        })
        .collect();

    progress.sheets_finished(package);
    Ok(results)
}
