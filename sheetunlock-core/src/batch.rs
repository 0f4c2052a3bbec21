//! Input expansion for the file-level scheduler

use crate::config::UnprotectConfig;
use crate::error::UnprotectError;
use crate::report::FileResult;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Units of work plus the inputs rejected while expanding them
#[derive(Debug, Default)]
pub struct Expansion {
    pub units: Vec<PathBuf>,
    pub rejected: Vec<FileResult>,
}

/// Expand input paths into spreadsheet files.
///
/// A spreadsheet file is one unit, a directory contributes every spreadsheet
/// file below it, and anything else is rejected without contributing a unit.
pub fn expand_inputs<P: AsRef<Path>>(inputs: &[P], config: &UnprotectConfig) -> Expansion {
    let mut expansion = Expansion::default();
    let mut seen = HashSet::new();

    for input in inputs {
        let input = input.as_ref();
        if !input.exists() {
            expansion.reject(input, UnprotectError::NotFound {
                path: input.to_path_buf(),
            });
        } else if input.is_file() && config.is_spreadsheet(input) {
            expansion.push(input.to_path_buf(), &mut seen);
        } else if input.is_dir() {
            for entry in WalkDir::new(input).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && config.is_spreadsheet(entry.path()) => {
                        expansion.push(entry.into_path(), &mut seen);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let path = e.path().unwrap_or(input).to_path_buf();
                        let error = match e.into_io_error() {
                            Some(io) => UnprotectError::io(&path, io),
                            None => UnprotectError::Unexpected(format!(
                                "filesystem loop at {}",
                                path.display()
                            )),
                        };
                        expansion.reject(&path, error);
                    }
                }
            }
        } else {
            expansion.reject(input, UnprotectError::InvalidInput {
                path: input.to_path_buf(),
            });
        }
    }

    expansion
}

impl Expansion {
    /// Keep the first spelling of each file; later aliases of it are dropped
    fn push(&mut self, path: PathBuf, seen: &mut HashSet<PathBuf>) {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            self.units.push(path);
        }
    }

    fn reject(&mut self, path: &Path, error: UnprotectError) {
        log::error!("Invalid input path {} [{}]: {}", path.display(), error.kind(), error);
        self.rejected.push(FileResult {
            input: path.to_path_buf(),
            outcome: Err(error),
        });
    }
}
