//! Output formatters for batch results

use colored::*;
use sheetunlock_core::BatchReport;

/// Print one output path per line
pub fn print_outputs(report: &BatchReport) {
    for output in report.outputs() {
        println!("{}", output.display());
    }
}

/// Print a human-readable summary with colors
pub fn print_summary(report: &BatchReport) {
    let outputs = report.outputs();
    let failures = report.failures();

    for file in &report.files {
        let Ok(result) = &file.outcome else {
            continue;
        };
        println!(
            "{} {} -> {}",
            "✓".green().bold(),
            file.input.display(),
            result.output.display().to_string().cyan()
        );
        for sheet in &result.sheets {
            match &sheet.outcome {
                Ok(outcome) if outcome.removed => {
                    println!("    {} {}", "unlocked".green(), sheet.name());
                }
                Ok(_) => println!("    {} {}", "unchanged".bright_black(), sheet.name()),
                Err(e) => println!("    {} {}: {}", "ERROR".red().bold(), sheet.name(), e),
            }
        }
    }

    for (input, error) in &failures {
        println!(
            "{} {} [{}] {}",
            "✗".red().bold(),
            input.display(),
            error.kind().to_string().yellow(),
            error
        );
    }

    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Written:".green().bold(), outputs.len());
    if !failures.is_empty() {
        println!("  {} {}", "Failed:".red().bold(), failures.len());
    }
}
