use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{MultiProgress, ProgressDrawTarget};
use log::LevelFilter;
use sheetunlock_core::{UnprotectConfig, Unprotector};
use std::path::PathBuf;

mod bars;
mod formatter;
mod logger;

#[derive(Parser)]
#[command(name = "sheetunlock")]
#[command(about = "Unlock protected sheets in Excel files", long_about = None)]
#[command(version)]
#[command(after_help = "Examples:\n  \
    sheetunlock path/to/your/excel/file.xlsx\n  \
    sheetunlock path/to/your/excel/folder\n  \
    sheetunlock path/to/your/excel/file.xlsx path/to/your/excel/folder")]
struct Cli {
    /// Excel files or directories; directories are searched recursively
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Maximum number of files processed at once
    #[arg(long, value_name = "N")]
    file_workers: Option<usize>,

    /// Maximum number of sheets processed at once within a file
    #[arg(long, value_name = "N")]
    sheet_workers: Option<usize>,

    /// Marker appended to the file name of each output
    #[arg(long, value_name = "SUFFIX")]
    suffix: Option<String>,

    /// Log file (appended to)
    #[arg(long, value_name = "FILE", default_value = "unlock_excel.log")]
    log_file: PathBuf,

    /// Do not write a log file
    #[arg(long)]
    no_log_file: bool,

    /// Log debug details
    #[arg(short, long)]
    verbose: bool,

    /// Hide progress bars
    #[arg(short, long)]
    quiet: bool,

    /// Print the path of every file written
    #[arg(long)]
    print_outputs: bool,

    /// Print a summary of unlocked sheets and failed inputs
    #[arg(long)]
    summary: bool,
}

fn load_config(cli: &Cli) -> Result<UnprotectConfig> {
    let mut config = if let Some(config_path) = &cli.config {
        UnprotectConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("sheetunlock.toml");
        if default_config_path.exists() {
            UnprotectConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            UnprotectConfig::default()
        }
    };

    if cli.file_workers.is_some() {
        config.file_workers = cli.file_workers;
    }
    if cli.sheet_workers.is_some() {
        config.sheet_workers = cli.sheet_workers;
    }
    if let Some(suffix) = &cli.suffix {
        config.suffix = suffix.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Nothing to do without inputs
    if cli.paths.is_empty() {
        return Ok(());
    }

    let config = load_config(&cli)?;

    let multi = if cli.quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    logger::init(level, log_file, multi.clone())?;

    let unprotector = Unprotector::with_config(config.clone()).context("Invalid configuration")?;
    let progress = bars::BarProgress::new(multi, config);

    let mut report = unprotector.process_inputs(cli.paths.as_slice(), &progress);
    drop(progress);
    report.sort();

    log::info!(
        "Unlocked {} file(s), {} failed",
        report.outputs().len(),
        report.failures().len()
    );

    if cli.print_outputs {
        formatter::print_outputs(&report);
    }
    if cli.summary {
        formatter::print_summary(&report);
    }

    // Per-file failures are logged, not reported through the exit status
    Ok(())
}
