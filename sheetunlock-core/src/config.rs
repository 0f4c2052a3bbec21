//! Configuration for the unlock pipeline

use crate::error::{Result, UnprotectError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_SUFFIX: &str = "_unprotected";
pub const DEFAULT_SHEET_WORKERS: usize = 10;

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnprotectConfig {
    /// Maximum number of files processed at once (`None` lets the runtime choose)
    pub file_workers: Option<usize>,
    /// Maximum number of sheet parts processed at once
    pub sheet_workers: Option<usize>,
    /// Marker inserted between the file stem and its extension
    pub suffix: String,
    /// Recognized spreadsheet extensions, without the leading dot
    pub extensions: Vec<String>,
    /// Parent directory for temporary workspaces
    pub temp_dir: Option<PathBuf>,
}

impl Default for UnprotectConfig {
    fn default() -> Self {
        Self {
            file_workers: None,
            sheet_workers: Some(DEFAULT_SHEET_WORKERS),
            suffix: DEFAULT_SUFFIX.to_string(),
            extensions: vec!["xls".to_string(), "xlsx".to_string(), "xlsm".to_string()],
            temp_dir: None,
        }
    }
}

impl UnprotectConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| UnprotectError::io(path, e))?;
        toml::from_str(&content).map_err(|e| UnprotectError::Config(e.to_string()))
    }

    /// Validate worker budgets, suffix and extension list
    pub fn validate(&self) -> Result<()> {
        if self.file_workers == Some(0) {
            return Err(UnprotectError::Config("file_workers must be at least 1".into()));
        }
        if self.sheet_workers == Some(0) {
            return Err(UnprotectError::Config("sheet_workers must be at least 1".into()));
        }
        if self.suffix.is_empty() {
            return Err(UnprotectError::Config("suffix must not be empty".into()));
        }
        if self.suffix.contains(['/', '\\']) {
            return Err(UnprotectError::Config(format!(
                "suffix '{}' must not contain a path separator",
                self.suffix
            )));
        }
        if self.extensions.is_empty() {
            return Err(UnprotectError::Config("extensions must not be empty".into()));
        }
        if let Some(ext) = self
            .extensions
            .iter()
            .find(|ext| ext.is_empty() || ext.starts_with('.'))
        {
            return Err(UnprotectError::Config(format!(
                "extension '{}' must be non-empty and given without a leading dot",
                ext
            )));
        }
        Ok(())
    }

    /// Check whether a path carries one of the recognized extensions
    pub fn is_spreadsheet(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Derive `<stem><suffix>.<ext>` next to the input file
    pub fn output_path(&self, input: &Path) -> PathBuf {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match input.extension() {
            Some(ext) => format!("{}{}.{}", stem, self.suffix, ext.to_string_lossy()),
            None => format!("{}{}", stem, self.suffix),
        };
        input.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = UnprotectConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sheet_workers, Some(DEFAULT_SHEET_WORKERS));
        assert_eq!(config.file_workers, None);
    }

    #[test]
    fn test_output_path_for_each_extension() {
        let config = UnprotectConfig::default();
        assert_eq!(
            config.output_path(Path::new("data/book.xlsx")),
            PathBuf::from("data/book_unprotected.xlsx")
        );
        assert_eq!(
            config.output_path(Path::new("data/book.xlsm")),
            PathBuf::from("data/book_unprotected.xlsm")
        );
        assert_eq!(
            config.output_path(Path::new("book.xls")),
            PathBuf::from("book_unprotected.xls")
        );
        // Only the final extension is treated as the extension
        assert_eq!(
            config.output_path(Path::new("report.xls.xlsx")),
            PathBuf::from("report.xls_unprotected.xlsx")
        );
    }

    #[test]
    fn test_is_spreadsheet_is_case_insensitive() {
        let config = UnprotectConfig::default();
        assert!(config.is_spreadsheet(Path::new("a.xlsx")));
        assert!(config.is_spreadsheet(Path::new("a.XLSM")));
        assert!(config.is_spreadsheet(Path::new("a.xls")));
        assert!(!config.is_spreadsheet(Path::new("a.ods")));
        assert!(!config.is_spreadsheet(Path::new("xlsx")));
    }

    #[test]
    fn test_parse_toml() {
        let config: UnprotectConfig = toml::from_str(
            r#"
            file_workers = 2
            sheet_workers = 4
            suffix = "_open"
            "#,
        )
        .unwrap();
        assert_eq!(config.file_workers, Some(2));
        assert_eq!(config.sheet_workers, Some(4));
        assert_eq!(config.suffix, "_open");
        // Unspecified fields keep their defaults
        assert_eq!(config.extensions.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = UnprotectConfig {
            sheet_workers: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = UnprotectConfig {
            suffix: "a/b".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = UnprotectConfig {
            extensions: vec![".xlsx".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
