//! Pivot engine: long → wide reshape with aggregation.
//!
//! Rows are grouped by the index tuple and the pivot column value; each group's
//! value cells are reduced with the chosen aggregate. Output rows follow the
//! first appearance of each index tuple in the source, output columns the first
//! appearance of each pivot column value. Combinations never observed stay null.

use polars::lazy::frame::pivot::pivot_stable;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::aggregate::{AggregateFn, AggregateRegistry};
use crate::error::{ExplorerError, Result};

fn default_aggregation() -> String {
    "sum".to_string()
}

/// Spec for pivot operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PivotSpec {
    pub index: Vec<String>,
    pub column: String,
    pub value: String,
    #[serde(default = "default_aggregation")]
    pub aggregation: String,
}

impl PivotSpec {
    pub fn new<S: AsRef<str>>(index: &[S], column: &str, value: &str) -> Self {
        Self {
            index: index.iter().map(|s| s.as_ref().to_string()).collect(),
            column: column.to_string(),
            value: value.to_string(),
            aggregation: default_aggregation(),
        }
    }

    pub fn with_aggregation(mut self, name: &str) -> Self {
        self.aggregation = name.to_string();
        self
    }
}

/// Result of a pivot: index columns followed by one value column per distinct
/// pivot column value.
#[derive(Debug, Clone)]
pub struct PivotTable {
    frame: DataFrame,
    index: Vec<String>,
    value_columns: Vec<String>,
    totals: bool,
}

impl PivotTable {
    pub(crate) fn from_parts(frame: DataFrame, index: Vec<String>, value_columns: Vec<String>) -> Self {
        Self {
            frame,
            index,
            value_columns,
            totals: false,
        }
    }

    pub(crate) fn with_totals(mut self, totals: bool) -> Self {
        self.totals = totals;
        self
    }

    /// Whether the last row and last value column are synthesized grand totals.
    pub fn has_grand_total(&self) -> bool {
        self.totals
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    pub fn index_columns(&self) -> &[String] {
        &self.index
    }

    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// The column holding row labels (the first index field).
    pub fn label_column(&self) -> &str {
        &self.index[0]
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Cell at the row whose label reads `row_label` and the value column `column`.
    pub fn value(&self, row_label: &str, column: &str) -> Option<AnyValue<'_>> {
        let labels = self.frame.column(self.label_column()).ok()?;
        let values = self.frame.column(column).ok()?;
        (0..self.frame.height())
            .find(|&i| {
                labels
                    .get(i)
                    .map(|v| cell_label(&v) == row_label)
                    .unwrap_or(false)
            })
            .and_then(|i| values.get(i).ok())
    }
}

/// Display text of a cell, used for pivot column names and row lookups.
fn cell_label(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string(),
    }
}

/// Distinct values of the pivot column as output column names, first-encountered order.
fn column_labels(column: &Column) -> Result<Vec<String>> {
    let distinct = column
        .as_materialized_series()
        .unique_stable()?
        .cast(&DataType::String)?;
    Ok(distinct
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("null").to_string())
        .collect())
}

/// Widen the value column so the aggregate sees Int64 or Float64.
///
/// Booleans and narrow integers become Int64; UInt64 and Float32 become
/// Float64 so large unsigned values are never nulled by the cast.
fn prepare_values(df: &DataFrame, value: &str, aggregate: &dyn AggregateFn) -> Result<DataFrame> {
    let column = df.column(value)?;
    let target = match column.dtype() {
        DataType::Boolean
        | DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32 => Some(DataType::Int64),
        DataType::UInt64 | DataType::Float32 => Some(DataType::Float64),
        DataType::Int64 | DataType::Float64 => None,
        _ if !aggregate.requires_numeric() => None,
        other => {
            return Err(ExplorerError::InvalidColumnType {
                column: value.to_string(),
                dtype: other.to_string(),
                operation: format!("aggregate '{}'", aggregate.name()),
            })
        }
    };

    let mut out = df.clone();
    if let Some(dtype) = target {
        out.with_column(column.cast(&dtype)?)?;
    }
    Ok(out)
}

/// Grouping on Date/Datetime index columns goes through their integer representation.
/// Returns the frame and the (column, original dtype) pairs to restore after the pivot.
fn cast_temporal_index(
    mut df: DataFrame,
    index: &[String],
) -> Result<(DataFrame, Vec<(String, DataType)>)> {
    let mut restore = Vec::new();
    for name in index {
        let dtype = df.column(name)?.dtype().clone();
        let physical = match dtype {
            DataType::Date => DataType::Int32,
            DataType::Datetime(_, _) => DataType::Int64,
            _ => continue,
        };
        let casted = df.column(name)?.cast(&physical)?;
        df.with_column(casted)?;
        restore.push((name.clone(), dtype));
    }
    Ok((df, restore))
}

fn restore_temporal_index(pivoted: &mut DataFrame, restore: &[(String, DataType)]) -> Result<()> {
    for (name, dtype) in restore {
        let restored = pivoted.column(name)?.cast(dtype)?;
        pivoted.with_column(restored)?;
    }
    Ok(())
}

/// Pivot `df` according to `spec`, resolving the aggregate from `registry`.
pub fn pivot(df: &DataFrame, spec: &PivotSpec, registry: &AggregateRegistry) -> Result<PivotTable> {
    if spec.index.is_empty() {
        return Err(ExplorerError::MissingPivotInputs(vec![
            "<at least one index column>".to_string(),
        ]));
    }

    let present: HashSet<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let mut reported: HashSet<&str> = HashSet::new();
    let missing: Vec<String> = spec
        .index
        .iter()
        .chain([&spec.column, &spec.value])
        .filter(|name| !present.contains(name.as_str()))
        .filter(|name| reported.insert(name.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ExplorerError::MissingPivotInputs(missing));
    }

    let aggregate = registry.get(&spec.aggregation)?;
    let source = prepare_values(df, &spec.value, aggregate.as_ref())?;

    let labels = column_labels(df.column(&spec.column)?)?;
    let mut seen: HashSet<&str> = spec.index.iter().map(|s| s.as_str()).collect();
    for label in &labels {
        if !seen.insert(label.as_str()) {
            return Err(ExplorerError::DuplicateColumn(label.clone()));
        }
    }

    if source.height() == 0 {
        let frame = source.select(spec.index.iter().cloned())?;
        return Ok(PivotTable::from_parts(frame, spec.index.clone(), Vec::new()));
    }

    let (source, restore) = cast_temporal_index(source, &spec.index)?;
    let mut frame = pivot_stable(
        &source,
        [spec.column.as_str()],
        Some(spec.index.iter().map(String::as_str)),
        Some([spec.value.as_str()]),
        false,
        Some(aggregate.expr()),
        None,
    )?;
    restore_temporal_index(&mut frame, &restore)?;

    let value_columns: Vec<String> = frame
        .get_column_names()
        .iter()
        .skip(spec.index.len())
        .map(|s| s.to_string())
        .collect();

    debug!(
        rows = frame.height(),
        value_columns = value_columns.len(),
        aggregate = aggregate.name(),
        "Pivoted dataset"
    );

    Ok(PivotTable::from_parts(frame, spec.index.clone(), value_columns))
}
