//! Log backend writing to a log file and to stderr

use anyhow::{Context, Result};
use indicatif::MultiProgress;
use log::{LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

struct DualLogger {
    level: LevelFilter,
    file: Option<Mutex<File>>,
    // Console lines are printed through the bars so they are not overdrawn
    console: MultiProgress,
}

impl Log for DualLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!(
            "{} - {} - {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f"),
            record.level(),
            record.args()
        );

        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = writeln!(file, "{}", line);
            }
        }
        self.console.suspend(|| eprintln!("{}", line));
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            if let Ok(mut file) = file.lock() {
                let _ = file.flush();
            }
        }
    }
}

/// Install the global logger
pub fn init(level: LevelFilter, log_file: Option<&Path>, console: MultiProgress) -> Result<()> {
    let file = match log_file {
        Some(path) => Some(Mutex::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?,
        )),
        None => None,
    };

    log::set_boxed_logger(Box::new(DualLogger {
        level,
        file,
        console,
    }))
    .context("Logger already initialized")?;
    log::set_max_level(level);
    Ok(())
}
