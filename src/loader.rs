//! File decoding: extension dispatch, per-format readers and column projection.

use polars::io::csv::read::NullValues;
use polars::prelude::*;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{ExplorerError, Result};
use crate::excel::read_excel;
use crate::source::FileFormat;
use crate::transform::select_columns;
use crate::OpenOptions;

/// Which decoder produced a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodePath {
    Primary,
    /// Spreadsheet re-read after the primary path could not honor the options.
    Fallback,
}

impl fmt::Display for DecodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodePath::Primary => write!(f, "primary"),
            DecodePath::Fallback => write!(f, "fallback"),
        }
    }
}

/// What a successful load read, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub path: PathBuf,
    pub format: FileFormat,
    pub decode_path: DecodePath,
    pub rows: usize,
    pub columns: usize,
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Loaded {} ({}, {} path): {} rows x {} columns",
            self.path.display(),
            self.format,
            self.decode_path,
            self.rows,
            self.columns
        )
    }
}

/// Decode `path` into a DataFrame. The format is decided by extension before
/// the file is opened.
pub fn load(path: impl AsRef<Path>, options: &OpenOptions) -> Result<(DataFrame, LoadReport)> {
    let path = path.as_ref();
    let format = FileFormat::from_path(path)?;

    let (df, decode_path) = match format {
        FileFormat::Csv => (read_csv(path, options)?, DecodePath::Primary),
        FileFormat::Parquet => (read_parquet(path)?, DecodePath::Primary),
        FileFormat::Excel => read_excel(path, &options.sheet, options.skip_rows)?,
    };

    let df = match &options.columns {
        Some(columns) => select_columns(&df, columns)?,
        None => df,
    };

    let report = LoadReport {
        path: path.to_path_buf(),
        format,
        decode_path,
        rows: df.height(),
        columns: df.width(),
    };
    info!(
        path = %report.path.display(),
        format = %report.format,
        decode_path = %report.decode_path,
        rows = report.rows,
        columns = report.columns,
        "Loaded dataset"
    );
    Ok((df, report))
}

fn read_csv(path: &Path, options: &OpenOptions) -> Result<DataFrame> {
    let null_values = build_null_values(options.null_values.as_deref().unwrap_or_default());

    let mut read_options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(options.infer_schema_length)
        .with_ignore_errors(options.ignore_errors);
    if let Some(nv) = null_values {
        read_options = read_options.map_parse_options(|opts| opts.with_null_values(Some(nv.clone())));
    }

    let df = read_options
        .try_into_reader_with_file_path(Some(path.into()))
        .and_then(|reader| reader.finish())
        .map_err(|e| ExplorerError::decode(path, e))?;
    trim_column_names(df)
}

/// Polars null tokens shared by every column.
fn build_null_values(tokens: &[String]) -> Option<NullValues> {
    let vals: Vec<PlSmallStr> = tokens
        .iter()
        .map(|s| PlSmallStr::from(s.as_str()))
        .collect();
    match vals.len() {
        0 => None,
        1 => Some(NullValues::AllColumnsSingle(vals[0].clone())),
        _ => Some(NullValues::AllColumns(vals)),
    }
}

fn trim_column_names(mut df: DataFrame) -> Result<DataFrame> {
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    for name in names {
        let trimmed = name.trim();
        if trimmed != name {
            df.rename(&name, trimmed.into())?;
        }
    }
    Ok(df)
}

fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| ExplorerError::decode(path, e))?;
    ParquetReader::new(file)
        .finish()
        .map_err(|e| ExplorerError::decode(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_csv_trims_names() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.csv", " region ,year,sales\nE,2023,10\nW,2023,5\n");
        let (df, report) = load(&path, &OpenOptions::new()).unwrap();

        assert_eq!(df.shape(), (2, 3));
        assert!(df.column("region").is_ok());
        assert_eq!(report.format, FileFormat::Csv);
        assert_eq!(report.decode_path, DecodePath::Primary);
        assert_eq!((report.rows, report.columns), (2, 3));
    }

    #[test]
    fn test_load_csv_null_tokens() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.csv", "k,v\na,1\nb,NA\nc,-\n");
        let options = OpenOptions::new().with_null_values(vec!["NA".into(), "-".into()]);
        let (df, _) = load(&path, &options).unwrap();
        let v = df.column("v").unwrap();
        assert_eq!(v.dtype(), &DataType::Int64);
        assert_eq!(v.null_count(), 2);
    }

    #[test]
    fn test_load_projects_columns_in_given_order() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "data.CSV", "a,b,c\n1,2,3\n");
        let options = OpenOptions::new().with_columns(&["c", "a"]);
        let (df, report) = load(&path, &options).unwrap();
        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["c", "a"]);
        assert_eq!(report.columns, 2);

        let err = load(&path, &OpenOptions::new().with_columns(&["a", "zz"])).unwrap_err();
        assert!(matches!(err, ExplorerError::ColumnNotFound(ref c) if c == "zz"));
    }

    #[test]
    fn test_load_parquet() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.parquet");
        let mut df = df!("a" => [1i64, 2, 3], "b" => ["x", "y", "z"]).unwrap();
        ParquetWriter::new(File::create(&path).unwrap())
            .finish(&mut df)
            .unwrap();

        let (loaded, report) = load(&path, &OpenOptions::new()).unwrap();
        assert!(loaded.equals(&df));
        assert_eq!(report.format, FileFormat::Parquet);
    }

    #[test]
    fn test_unsupported_extension_checked_before_io() {
        let err = load("/definitely/not/here.json", &OpenOptions::new()).unwrap_err();
        assert!(matches!(err, ExplorerError::UnsupportedFormat(ref e) if e == ".json"));
    }

    #[test]
    fn test_missing_file_is_decode_failure() {
        let dir = TempDir::new().unwrap();
        let err = load(dir.path().join("absent.parquet"), &OpenOptions::new()).unwrap_err();
        assert!(matches!(err, ExplorerError::DecodeFailure { .. }));
    }

    #[test]
    fn test_build_null_values() {
        assert!(build_null_values(&[]).is_none());
        assert!(matches!(
            build_null_values(&["NA".to_string()]),
            Some(NullValues::AllColumnsSingle(_))
        ));
    }
}
