//! Row and column narrowing, plus derived columns.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::{ExplorerError, Result};
use crate::excel::parse_naive_datetime_str;
use crate::filter::{filter_expr, FilterStatement};
use pivotchain_utils::calendar::week_of_month;

/// Project `df` onto `columns`, in the given order. Every name is checked
/// before anything is projected.
pub fn select_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<DataFrame> {
    let schema = df.schema();
    if let Some(missing) = columns
        .iter()
        .map(|c| c.as_ref())
        .find(|c| !schema.contains(c))
    {
        return Err(ExplorerError::ColumnNotFound(missing.to_string()));
    }
    Ok(df.select(columns.iter().map(|c| c.as_ref().to_string()))?)
}

/// Keep the rows for which `predicate` is true. Row order and columns are kept.
pub fn filter_rows(df: &DataFrame, predicate: Expr) -> Result<DataFrame> {
    df.clone()
        .lazy()
        .filter(predicate)
        .collect()
        .map_err(ExplorerError::from_expr)
}

/// Apply declarative filter statements; an empty list keeps every row.
pub fn filter_statements(df: &DataFrame, statements: &[FilterStatement]) -> Result<DataFrame> {
    match filter_expr(statements, df.schema())? {
        Some(predicate) => filter_rows(df, predicate),
        None => Ok(df.clone()),
    }
}

/// Append an Int32 column `alias` holding the week of the month of each
/// date in `date_column`. Date, Datetime and ISO date strings are accepted.
pub fn with_week_of_month(df: &DataFrame, date_column: &str, alias: &str) -> Result<DataFrame> {
    let column = df
        .column(date_column)
        .map_err(|_| ExplorerError::ColumnNotFound(date_column.to_string()))?;

    let dates: Vec<Option<NaiveDate>> = match column.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let epoch = NaiveDate::default();
            let days = column.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .map(|d| d.and_then(|d| epoch.checked_add_signed(chrono::Duration::days(d as i64))))
                .collect()
        }
        DataType::String => column
            .str()?
            .into_iter()
            .map(|s| s.and_then(parse_naive_datetime_str).map(|dt: NaiveDateTime| dt.date()))
            .collect(),
        other => {
            return Err(ExplorerError::InvalidColumnType {
                column: date_column.to_string(),
                dtype: other.to_string(),
                operation: "week of month".to_string(),
            })
        }
    };

    let weeks: Vec<Option<i32>> = dates
        .into_iter()
        .map(|d| d.map(|d| week_of_month(d) as i32))
        .collect();
    let mut out = df.clone();
    out.with_column(Series::new(alias.into(), weeks))?;
    Ok(out)
}
