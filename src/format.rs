//! Pivot presentation: null fill, grand totals and currency text.

use polars::prelude::*;
use tracing::debug;

use crate::config::FormatConfig;
use crate::error::{ExplorerError, Result};
use crate::pivot::PivotTable;

/// Name of the synthesized total column and label of the synthesized total row.
pub const GRAND_TOTAL: &str = "Grand Total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatStyle {
    /// Numbers become text with thousands separators and fixed decimals.
    #[default]
    Currency,
    /// Numbers stay numeric.
    Plain,
}

impl FormatStyle {
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("currency") {
            FormatStyle::Currency
        } else {
            FormatStyle::Plain
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatOptions {
    pub style: FormatStyle,
    pub decimals: usize,
    pub grand_total: bool,
    /// Replacement for null value cells; `None` leaves nulls in place.
    /// A whole number keeps integer columns integral.
    pub null_fill: Option<f64>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            style: FormatStyle::Currency,
            decimals: 0,
            grand_total: true,
            null_fill: Some(0.0),
        }
    }
}

impl FormatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: FormatStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_decimals(mut self, decimals: usize) -> Self {
        self.decimals = decimals;
        self
    }

    pub fn with_grand_total(mut self, grand_total: bool) -> Self {
        self.grand_total = grand_total;
        self
    }

    pub fn with_null_fill(mut self, fill: Option<f64>) -> Self {
        self.null_fill = fill;
        self
    }

    pub fn from_config(config: &FormatConfig) -> Self {
        Self {
            style: FormatStyle::parse(&config.style),
            decimals: config.decimals,
            grand_total: config.grand_total,
            null_fill: config.null_fill,
        }
    }
}

/// A formatted pivot: the numeric table with totals, plus the frame meant for display.
///
/// Under [`FormatStyle::Currency`] the display frame's value columns are text;
/// the numeric table keeps its Int64/Float64 columns for further work.
#[derive(Debug, Clone)]
pub struct FormattedPivot {
    numeric: PivotTable,
    display: DataFrame,
    options: FormatOptions,
}

impl FormattedPivot {
    pub fn numeric(&self) -> &PivotTable {
        &self.numeric
    }

    pub fn display(&self) -> &DataFrame {
        &self.display
    }

    pub fn options(&self) -> &FormatOptions {
        &self.options
    }

    pub fn into_display(self) -> DataFrame {
        self.display
    }

    pub fn into_numeric(self) -> PivotTable {
        self.numeric
    }
}

/// Apply null fill, grand totals and number styling to `table`, in that order.
///
/// A table that already carries grand totals has them recomputed rather than
/// appended a second time.
pub fn format_pivot(table: &PivotTable, options: &FormatOptions) -> Result<FormattedPivot> {
    let (frame, mut value_names) = strip_totals(table)?;

    for name in &value_names {
        let dtype = frame.column(name)?.dtype();
        if !dtype.is_primitive_numeric() {
            return Err(ExplorerError::InvalidColumnType {
                column: name.clone(),
                dtype: dtype.to_string(),
                operation: "pivot formatting".to_string(),
            });
        }
    }
    if options.grand_total
        && table
            .index_columns()
            .iter()
            .chain(value_names.iter())
            .any(|name| name == GRAND_TOTAL)
    {
        return Err(ExplorerError::DuplicateColumn(GRAND_TOTAL.to_string()));
    }

    let mut frame = match options.null_fill {
        Some(fill) => fill_nulls(frame, &value_names, fill)?,
        None => frame,
    };

    if options.grand_total {
        frame = append_total_column(frame, &value_names)?;
        value_names.push(GRAND_TOTAL.to_string());
        frame = append_total_row(frame, table.index_columns(), &value_names)?;
    }

    let display = match options.style {
        FormatStyle::Plain => frame.clone(),
        FormatStyle::Currency => {
            let mut display = frame.clone();
            for name in &value_names {
                let text = currency_column(display.column(name)?, options.decimals)?;
                display.with_column(text)?;
            }
            display
        }
    };

    debug!(
        rows = frame.height(),
        grand_total = options.grand_total,
        style = ?options.style,
        "Formatted pivot table"
    );

    let numeric = PivotTable::from_parts(frame, table.index_columns().to_vec(), value_names)
        .with_totals(options.grand_total);

    Ok(FormattedPivot {
        numeric,
        display,
        options: options.clone(),
    })
}

/// The frame without a previous grand-total row and column.
fn strip_totals(table: &PivotTable) -> Result<(DataFrame, Vec<String>)> {
    let mut names = table.value_columns().to_vec();
    if !table.has_grand_total() {
        return Ok((table.frame().clone(), names));
    }
    names.retain(|n| n != GRAND_TOTAL);
    let frame = table.frame();
    let body = frame
        .slice(0, frame.height().saturating_sub(1))
        .drop(GRAND_TOTAL)?;
    Ok((body, names))
}

/// Fill nulls in the value columns that have any. A whole-number fill is an
/// integer literal so Int64 columns stay Int64; a fractional fill widens them.
fn fill_nulls(frame: DataFrame, value_names: &[String], fill: f64) -> Result<DataFrame> {
    let fill = if fill.is_finite() && fill.fract() == 0.0 && fill.abs() < i64::MAX as f64 {
        lit(fill as i64)
    } else {
        lit(fill)
    };
    let mut exprs = Vec::new();
    for name in value_names {
        if frame.column(name)?.null_count() > 0 {
            exprs.push(col(name.as_str()).fill_null(fill.clone()));
        }
    }
    if exprs.is_empty() {
        return Ok(frame);
    }
    Ok(frame.lazy().with_columns(exprs).collect()?)
}

/// Row-wise sum of the value columns, nulls skipped.
fn append_total_column(frame: DataFrame, value_names: &[String]) -> Result<DataFrame> {
    let total = if value_names.is_empty() {
        lit(0i64).cast(DataType::Int64)
    } else {
        let values: Vec<Expr> = value_names.iter().map(|n| col(n.as_str())).collect();
        sum_horizontal(values, true)?
    };
    Ok(frame.lazy().with_column(total.alias(GRAND_TOTAL)).collect()?)
}

/// Column sums stacked under the body. The label column becomes text so it can
/// hold the `Grand Total` label; other index columns get null.
fn append_total_row(
    mut frame: DataFrame,
    index: &[String],
    value_names: &[String],
) -> Result<DataFrame> {
    let label = frame.column(&index[0])?.cast(&DataType::String)?;
    frame.with_column(label)?;

    let mut exprs = vec![lit(GRAND_TOTAL).alias(index[0].as_str())];
    for name in &index[1..] {
        let dtype = frame.column(name)?.dtype().clone();
        exprs.push(lit(NULL).cast(dtype).alias(name.as_str()));
    }
    for name in value_names {
        let dtype = frame.column(name)?.dtype().clone();
        exprs.push(col(name.as_str()).sum().cast(dtype));
    }

    let totals = frame.clone().lazy().select(exprs).collect()?;
    Ok(frame.vstack(&totals)?)
}

fn currency_column(column: &Column, decimals: usize) -> Result<Column> {
    let text: Vec<Option<String>> = if column.dtype().is_integer() {
        let ints = column.cast(&DataType::Int64)?;
        let ints = ints.i64()?;
        ints.into_iter()
            .map(|v| v.map(|v| format_int_currency(v, decimals)))
            .collect()
    } else {
        let floats = column.cast(&DataType::Float64)?;
        let floats = floats.f64()?;
        floats
            .into_iter()
            .map(|v| v.map(|v| format_currency(v, decimals)))
            .collect()
    };
    Ok(Column::new(column.name().clone(), text))
}

/// Fixed-point text with comma thousands separators, e.g. `1,234.50`.
/// A value that rounds to zero never prints as `-0`.
pub fn format_currency(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let raw = format!("{:.*}", decimals, value.abs());
    let negative = value < 0.0 && raw.chars().any(|c| c.is_ascii_digit() && c != '0');
    group_thousands(&raw, negative)
}

fn format_int_currency(value: i64, decimals: usize) -> String {
    let digits = value.unsigned_abs().to_string();
    let raw = if decimals == 0 {
        digits
    } else {
        format!("{}.{}", digits, "0".repeat(decimals))
    };
    group_thousands(&raw, value < 0)
}

fn group_thousands(raw: &str, negative: bool) -> String {
    let (whole, frac) = match raw.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (raw, None),
    };

    let mut grouped = String::with_capacity(raw.len() + whole.len() / 3 + 1);
    if negative {
        grouped.push('-');
    }
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if let Some(frac) = frac {
        grouped.push('.');
        grouped.push_str(frac);
    }
    grouped
}
