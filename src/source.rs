//! Input format detection from file extensions.

use std::fmt;
use std::path::Path;

use crate::error::{ExplorerError, Result};

/// File formats the loader can decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values, first row is the header
    Csv,
    /// Excel workbook (.xls, .xlsx)
    Excel,
    /// Parquet columnar format
    Parquet,
}

impl FileFormat {
    /// Detect file format from path extension. Fails with `UnsupportedFormat`
    /// when the extension is missing or unknown; never touches the filesystem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        Self::from_extension(ext)
    }

    /// Parse format from extension string (e.g. "parquet", "CSV").
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xls" | "xlsx" => Ok(Self::Excel),
            "parquet" => Ok(Self::Parquet),
            _ => Err(ExplorerError::UnsupportedFormat(format!(".{}", ext))),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FileFormat::Csv => "csv",
            FileFormat::Excel => "excel",
            FileFormat::Parquet => "parquet",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_known_extensions_case_insensitively() {
        assert_eq!(
            FileFormat::from_path(&PathBuf::from("data/Sales.CSV")).unwrap(),
            FileFormat::Csv
        );
        assert_eq!(
            FileFormat::from_path(&PathBuf::from("book.xls")).unwrap(),
            FileFormat::Excel
        );
        assert_eq!(
            FileFormat::from_path(&PathBuf::from("book.XLSX")).unwrap(),
            FileFormat::Excel
        );
        assert_eq!(
            FileFormat::from_path(&PathBuf::from("/tmp/part-0.parquet")).unwrap(),
            FileFormat::Parquet
        );
    }

    #[test]
    fn unknown_extension_names_the_extension() {
        let err = FileFormat::from_path(&PathBuf::from("data.json")).unwrap_err();
        assert!(matches!(err, ExplorerError::UnsupportedFormat(ref e) if e == ".json"));
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let err = FileFormat::from_path(&PathBuf::from("README")).unwrap_err();
        assert!(matches!(err, ExplorerError::UnsupportedFormat(_)));
    }
}
