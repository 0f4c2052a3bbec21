//! Per-sheet, per-file and per-batch results

use crate::error::UnprotectError;
use crate::strip::StripOutcome;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Outcome of one sheet unit
#[derive(Debug)]
pub struct SheetResult {
    /// Part path relative to the package root (e.g. `xl/worksheets/sheet1.xml`)
    pub part: PathBuf,
    pub outcome: Result<StripOutcome, UnprotectError>,
}

impl SheetResult {
    /// Whether a protection element was removed from this sheet
    pub fn removed(&self) -> bool {
        matches!(self.outcome, Ok(StripOutcome { removed: true }))
    }

    /// File name of the part, e.g. `sheet1.xml`
    pub fn name(&self) -> String {
        self.part
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Successful run of the pipeline over one package
#[derive(Debug)]
pub struct FileReport {
    pub output: PathBuf,
    pub sheets: Vec<SheetResult>,
}

impl FileReport {
    pub fn removed_count(&self) -> usize {
        self.sheets.iter().filter(|s| s.removed()).count()
    }

    pub fn failed_sheets(&self) -> impl Iterator<Item = &SheetResult> {
        self.sheets.iter().filter(|s| s.outcome.is_err())
    }

    /// Look up a sheet by file name
    pub fn sheet(&self, name: &str) -> Option<&SheetResult> {
        self.sheets
            .iter()
            .find(|s| s.part.file_name() == Some(OsStr::new(name)))
    }
}

/// Outcome of one file unit (or one rejected input path)
#[derive(Debug)]
pub struct FileResult {
    pub input: PathBuf,
    pub outcome: Result<FileReport, UnprotectError>,
}

impl FileResult {
    pub fn output(&self) -> Option<&Path> {
        self.outcome.as_ref().ok().map(|r| r.output.as_path())
    }
}

/// Aggregate of every file result in a run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub files: Vec<FileResult>,
}

impl BatchReport {
    /// Output paths of every package written
    pub fn outputs(&self) -> Vec<&Path> {
        self.files.iter().filter_map(FileResult::output).collect()
    }

    /// Inputs that failed, with their error
    pub fn failures(&self) -> Vec<(&Path, &UnprotectError)> {
        self.files
            .iter()
            .filter_map(|f| f.outcome.as_ref().err().map(|e| (f.input.as_path(), e)))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Order results by input path for stable display
    pub fn sort(&mut self) {
        self.files.sort_by(|a, b| a.input.cmp(&b.input));
        for file in &mut self.files {
            if let Ok(report) = &mut file.outcome {
                report.sheets.sort_by(|a, b| a.part.cmp(&b.part));
            }
        }
    }
}
