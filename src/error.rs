//! Error taxonomy for the explorer pipeline.

use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

use crate::error_display::{user_message_from_io, user_message_from_polars};

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[derive(Error, Debug)]
pub enum ExplorerError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("Column not found: {0}")]
    ColumnNotFound(String),
    #[error("No dataset loaded; call load() first")]
    NotLoaded,
    #[error("No pivot table; call pivot() before pivot_format()")]
    NoPivotTable,
    #[error("Pivot inputs not found in dataset: {}", .0.join(", "))]
    MissingPivotInputs(Vec<String>),
    #[error("Failed to decode {}: {message}", path.display())]
    DecodeFailure { path: PathBuf, message: String },
    #[error("Unknown aggregate function: {0}")]
    UnknownAggregate(String),
    #[error("Column {column} has type {dtype}, which {operation} does not accept")]
    InvalidColumnType {
        column: String,
        dtype: String,
        operation: String,
    },
    #[error("Duplicate column in pivot result: {0}")]
    DuplicateColumn(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl ExplorerError {
    pub(crate) fn decode(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ExplorerError::DecodeFailure {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Map a polars error raised while evaluating a user expression, lifting
    /// missing-column failures into `ColumnNotFound`.
    pub(crate) fn from_expr(err: PolarsError) -> Self {
        match err {
            PolarsError::ColumnNotFound(msg) => ExplorerError::ColumnNotFound(msg.to_string()),
            other => ExplorerError::Polars(other),
        }
    }

    /// Short, actionable message for display to an end user.
    pub fn user_message(&self) -> String {
        match self {
            ExplorerError::Polars(err) => user_message_from_polars(err),
            ExplorerError::Io(err) => user_message_from_io(err, None),
            ExplorerError::ColumnNotFound(name) => format!(
                "Column not found: {}. Check spelling and that the column exists.",
                name
            ),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_pivot_inputs_lists_every_name() {
        let err = ExplorerError::MissingPivotInputs(vec!["region".into(), "sales".into()]);
        assert_eq!(
            err.to_string(),
            "Pivot inputs not found in dataset: region, sales"
        );
    }

    #[test]
    fn expression_column_errors_become_column_not_found() {
        let err = ExplorerError::from_expr(PolarsError::ColumnNotFound("qty".into()));
        assert!(matches!(err, ExplorerError::ColumnNotFound(ref c) if c == "qty"));
    }

    #[test]
    fn user_message_uses_polars_mapping() {
        let err = ExplorerError::Polars(PolarsError::NoData("empty file".into()));
        assert_eq!(err.user_message(), "No data: empty file");
    }
}
