//! sheetunlock-core: remove sheet protection from Excel workbooks
//!
//! A workbook is extracted into a private temporary workspace, the
//! `<sheetProtection>` element is stripped from every worksheet part in
//! parallel, and the workspace is repacked as `<stem>_unprotected.<ext>`.
//! Many workbooks can be processed at once; every file and every sheet yields
//! exactly one result, and a failure in one never stops the others.

pub mod archive;
pub mod batch;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod report;
pub mod sheets;
pub mod strip;
pub mod workspace;

use std::path::Path;

pub use config::UnprotectConfig;
pub use error::{ErrorKind, Result, UnprotectError};
pub use pool::{FileWorkers, WorkerPool};
pub use progress::{NoProgress, ProgressCounter, ProgressObserver};
pub use report::{BatchReport, FileReport, FileResult, SheetResult};
pub use strip::StripOutcome;

/// Main unlock interface
pub struct Unprotector {
    config: UnprotectConfig,
    file_workers: FileWorkers,
    sheet_pool: WorkerPool,
}

impl Unprotector {
    /// Create an unprotector with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(UnprotectConfig::default())
    }

    /// Create an unprotector with custom configuration
    pub fn with_config(config: UnprotectConfig) -> Result<Self> {
        config.validate()?;
        let file_workers = FileWorkers::new("unlock-file", config.file_workers);
        let sheet_pool = WorkerPool::new("unlock-sheet", config.sheet_workers)?;
        Ok(Self {
            config,
            file_workers,
            sheet_pool,
        })
    }

    pub fn config(&self) -> &UnprotectConfig {
        &self.config
    }

    /// Unlock a single workbook, writing it next to the input
    pub fn unprotect_file<P: AsRef<Path>>(
        &self,
        input: P,
        progress: &dyn ProgressObserver,
    ) -> Result<FileReport> {
        let input = input.as_ref();
        let output = self.config.output_path(input);
        self.unprotect_file_to(input, &output, progress)
    }

    /// Unlock a single workbook into an explicit output path
    pub fn unprotect_file_to(
        &self,
        input: &Path,
        output: &Path,
        progress: &dyn ProgressObserver,
    ) -> Result<FileReport> {
        pipeline::unprotect_package(
            input,
            output,
            self.config.temp_dir.as_deref(),
            &self.sheet_pool,
            progress,
        )
    }

    /// Expand `inputs` (files or directories) and unlock every workbook found.
    ///
    /// Rejected inputs appear in the report as failures alongside the per-file
    /// outcomes; nothing aborts the batch.
    pub fn process_inputs<P: AsRef<Path>>(
        &self,
        inputs: &[P],
        progress: &dyn ProgressObserver,
    ) -> BatchReport {
        let expansion = batch::expand_inputs(inputs, &self.config);
        let mut files = expansion.rejected;

        let total = expansion.units.len();
        if total > 1 {
            progress.files_started(total);
        }

        let outcomes = self.file_workers.run_all(expansion.units, |input| {
            progress.file_started(input);
            let outcome = self.unprotect_file(input, progress);
            progress.file_finished(input);
            outcome
        });

        for (input, outcome) in outcomes {
            let outcome = match outcome {
                Ok(result) => result,
                Err(payload) => {
                    progress.file_finished(&input);
                    Err(UnprotectError::from_panic(payload, &input))
                }
            };
            if let Err(e) = &outcome {
                log::error!(
                    "Error processing file {} [{}]: {}",
                    input.display(),
                    e.kind(),
                    e
                );
            }
            files.push(FileResult { input, outcome });
        }

        BatchReport { files }
    }
}
