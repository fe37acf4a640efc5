//! Fluent loading, inspection, pivoting and pivot formatting of tabular files.
//!
//! ```no_run
//! use pivotchain::{DataExplorerChain, FormatOptions, OpenOptions, PivotSpec};
//!
//! # fn main() -> pivotchain::Result<()> {
//! let mut chain = DataExplorerChain::new();
//! chain
//!     .load("sales.xlsx", &OpenOptions::new().with_sheet("Q1").with_skip_rows(2))?
//!     .select_columns(&["region", "year", "sales"])?
//!     .pivot(&PivotSpec::new(&["region"], "year", "sales"))?
//!     .pivot_format(&FormatOptions::default())?;
//! println!("{}", chain.get()?);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod chain;
pub mod config;
pub mod error;
pub mod error_display;
mod excel;
pub mod filter;
pub mod format;
pub mod loader;
pub mod pivot;
pub mod schema;
pub mod source;
pub mod transform;

pub use aggregate::{AggregateFn, AggregateRegistry};
pub use chain::{ChainState, DataExplorerChain};
pub use config::{ConfigManager, ExplorerConfig};
pub use error::{ExplorerError, Result};
pub use filter::{FilterOperator, FilterStatement, LogicalOperator};
pub use format::{FormatOptions, FormatStyle, FormattedPivot, GRAND_TOTAL};
pub use loader::{DecodePath, LoadReport};
pub use pivot::{PivotSpec, PivotTable};
pub use pivotchain_utils::{calendar, listing, store};
pub use schema::{DatasetSchema, Exploration};
pub use source::FileFormat;

pub const APP_NAME: &str = "pivotchain";

/// Rows shown by `explore()` when no configuration overrides it.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Spreadsheet sheet selection: 0-based position or sheet name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl SheetSelector {
    /// "2" selects by index, anything else by name.
    pub fn parse(s: &str) -> Self {
        match s.trim().parse::<usize>() {
            Ok(idx) => SheetSelector::Index(idx),
            Err(_) => SheetSelector::Name(s.to_string()),
        }
    }
}

impl From<usize> for SheetSelector {
    fn from(idx: usize) -> Self {
        SheetSelector::Index(idx)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetSelector::Index(idx) => write!(f, "#{}", idx),
            SheetSelector::Name(name) => write!(f, "{:?}", name),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OpenOptions {
    /// Keep only these columns, in this order, after decoding.
    pub columns: Option<Vec<String>>,
    /// Excel sheet (ignored for other formats).
    pub sheet: SheetSelector,
    /// Excel: leading rows to discard before the header row is read.
    pub skip_rows: usize,
    /// Number of rows to use when inferring CSV schema. None = Polars default (100).
    pub infer_schema_length: Option<usize>,
    /// CSV values read as null. None = Polars default.
    pub null_values: Option<Vec<String>>,
    /// When true, CSV reader ignores parse errors and continues with the next batch.
    pub ignore_errors: bool,
}

impl OpenOptions {
    pub fn new() -> Self {
        Self {
            columns: None,
            sheet: SheetSelector::default(),
            skip_rows: 0,
            infer_schema_length: Some(1000),
            null_values: None,
            ignore_errors: false,
        }
    }
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenOptions {
    pub fn with_columns<S: AsRef<str>>(mut self, columns: &[S]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.as_ref().to_string()).collect());
        self
    }

    pub fn with_sheet(mut self, sheet: impl Into<SheetSelector>) -> Self {
        self.sheet = sheet.into();
        self
    }

    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = Some(rows);
        self
    }

    pub fn with_null_values(mut self, values: Vec<String>) -> Self {
        self.null_values = Some(values);
        self
    }

    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }

    /// Create OpenOptions from the loading section of a config; unset fields keep their defaults.
    pub fn from_config(config: &config::LoadingConfig) -> Self {
        let mut opts = OpenOptions::new();
        if let Some(sheet) = config.sheet.as_deref() {
            opts.sheet = SheetSelector::parse(sheet);
        }
        if let Some(skip_rows) = config.skip_rows {
            opts.skip_rows = skip_rows;
        }
        if let Some(n) = config.infer_schema_length {
            opts.infer_schema_length = Some(n);
        }
        opts.null_values = config.null_values.clone();
        opts.ignore_errors = config.ignore_errors.unwrap_or(false);
        opts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_selector_parses_index_or_name() {
        assert_eq!(SheetSelector::parse("2"), SheetSelector::Index(2));
        assert_eq!(
            SheetSelector::parse("Sales 2024"),
            SheetSelector::Name("Sales 2024".to_string())
        );
    }

    #[test]
    fn open_options_from_config_keeps_defaults_for_unset_fields() {
        let loading = config::LoadingConfig {
            sheet: Some("Summary".to_string()),
            skip_rows: Some(3),
            ..Default::default()
        };
        let opts = OpenOptions::from_config(&loading);
        assert_eq!(opts.sheet, SheetSelector::Name("Summary".to_string()));
        assert_eq!(opts.skip_rows, 3);
        assert_eq!(opts.infer_schema_length, Some(1000));
        assert!(!opts.ignore_errors);
        assert!(opts.columns.is_none());
    }
}
