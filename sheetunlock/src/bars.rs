//! Terminal progress bars for the schedulers

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use sheetunlock_core::{ProgressObserver, UnprotectConfig};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const BAR_TEMPLATE: &str = "{msg} {wide_bar:.cyan/blue} {pos}/{len} [{elapsed_precise}]";

pub struct BarProgress {
    multi: MultiProgress,
    config: UnprotectConfig,
    total: Mutex<Option<ProgressBar>>,
    sheets: Mutex<HashMap<PathBuf, ProgressBar>>,
}

impl BarProgress {
    pub fn new(multi: MultiProgress, config: UnprotectConfig) -> Self {
        Self {
            multi,
            config,
            total: Mutex::new(None),
            sheets: Mutex::new(HashMap::new()),
        }
    }

    fn bar(&self, len: usize, message: String) -> ProgressBar {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        let bar = ProgressBar::new(len as u64).with_style(style);
        bar.set_message(message);
        bar
    }
}

impl ProgressObserver for BarProgress {
    fn files_started(&self, total: usize) {
        let bar = self.multi.insert(
            0,
            self.bar(total, format!("==>Total process: {} files", total)),
        );
        if let Ok(mut slot) = self.total.lock() {
            *slot = Some(bar);
        }
    }

    fn file_finished(&self, _input: &Path) {
        if let Ok(slot) = self.total.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.inc(1);
            }
        }
    }

    fn sheets_started(&self, package: &Path, total: usize) {
        let output = self.config.output_path(package);
        let name = output
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bar = self.multi.add(self.bar(total, format!("Processing {}", name)));
        if let Ok(mut sheets) = self.sheets.lock() {
            sheets.insert(package.to_path_buf(), bar);
        }
    }

    fn sheet_finished(&self, package: &Path, _part: &Path) {
        if let Ok(sheets) = self.sheets.lock() {
            if let Some(bar) = sheets.get(package) {
                bar.inc(1);
            }
        }
    }

    fn sheets_finished(&self, package: &Path) {
        let bar = self
            .sheets
            .lock()
            .ok()
            .and_then(|mut sheets| sheets.remove(package));
        if let Some(bar) = bar {
            bar.finish();
        }
    }
}

impl Drop for BarProgress {
    fn drop(&mut self) {
        if let Ok(slot) = self.total.lock() {
            if let Some(bar) = slot.as_ref() {
                bar.finish();
            }
        }
    }
}
