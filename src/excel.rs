//! Spreadsheet decoding (xls/xlsx) through calamine.
//!
//! Two paths exist. The primary path addresses the sheet in absolute worksheet
//! coordinates, so `skip_rows` names the header row directly. It cannot honor
//! that when the sheet's used range begins below the requested row (the reader
//! has already trimmed the leading blank rows); it then reports
//! [`Attempt::IncompatibleOptions`] and the fallback path re-reads the sheet,
//! skipping `skip_rows` rows relative to the used range.

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

use crate::error::{ExplorerError, Result};
use crate::loader::DecodePath;
use crate::SheetSelector;

/// Why a decode path gave up. Never leaves this module.
#[derive(Debug)]
enum Attempt {
    IncompatibleOptions(String),
    Failed(String),
}

impl std::fmt::Display for Attempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attempt::IncompatibleOptions(msg) => write!(f, "incompatible options: {}", msg),
            Attempt::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

impl From<PolarsError> for Attempt {
    fn from(err: PolarsError) -> Self {
        Attempt::Failed(err.to_string())
    }
}

/// Inferred type for a spreadsheet column (preserves numbers, bools, dates; avoids stringifying).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ExcelColType {
    Int64,
    Float64,
    Boolean,
    Utf8,
    Date,
    Datetime,
}

/// Decode one sheet of a workbook, trying the primary path first.
pub(crate) fn read_excel(
    path: &Path,
    sheet: &SheetSelector,
    skip_rows: usize,
) -> Result<(DataFrame, DecodePath)> {
    let primary = match open_sheet(path, sheet) {
        Ok(range) => read_absolute(&range, skip_rows),
        Err(err) => Err(err),
    };
    let primary_err = match primary {
        Ok(df) => return Ok((df, DecodePath::Primary)),
        Err(err) => err,
    };

    warn!(
        path = %path.display(),
        sheet = %sheet,
        skip_rows,
        reason = %primary_err,
        "Primary spreadsheet decode failed, using fallback"
    );

    match open_sheet(path, sheet).and_then(|range| read_relative(&range, skip_rows)) {
        Ok(df) => Ok((df, DecodePath::Fallback)),
        Err(fallback_err) => Err(ExplorerError::decode(
            path,
            format!("primary: {}; fallback: {}", primary_err, fallback_err),
        )),
    }
}

fn open_sheet(path: &Path, sheet: &SheetSelector) -> std::result::Result<Range<Data>, Attempt> {
    let mut workbook = open_workbook_auto(path).map_err(|e| Attempt::Failed(e.to_string()))?;
    if workbook.sheet_names().is_empty() {
        return Err(Attempt::Failed("workbook has no worksheets".to_string()));
    }
    match sheet {
        SheetSelector::Index(idx) => workbook
            .worksheet_range_at(*idx)
            .ok_or_else(|| Attempt::Failed(format!("no sheet at index {}", idx)))?
            .map_err(|e| Attempt::Failed(e.to_string())),
        SheetSelector::Name(name) => workbook
            .worksheet_range(name)
            .map_err(|e| Attempt::Failed(e.to_string())),
    }
}

/// Primary path: header is worksheet row `skip_rows`.
fn read_absolute(range: &Range<Data>, skip_rows: usize) -> std::result::Result<DataFrame, Attempt> {
    let (Some(start), Some(end)) = (range.start(), range.end()) else {
        return Ok(DataFrame::empty());
    };
    let header_row = skip_rows as u32;
    if start.0 > header_row {
        return Err(Attempt::IncompatibleOptions(format!(
            "used range starts at row {}, header requested at row {}",
            start.0, header_row
        )));
    }
    if header_row > end.0 {
        return Err(Attempt::IncompatibleOptions(format!(
            "header row {} is past the last row {}",
            header_row, end.0
        )));
    }

    let rows: Vec<Vec<Data>> = (header_row..=end.0)
        .map(|r| {
            (start.1..=end.1)
                .map(|c| range.get_value((r, c)).cloned().unwrap_or(Data::Empty))
                .collect()
        })
        .collect();
    rows_to_frame(&rows)
}

/// Fallback path: `skip_rows` still counts from the top of the sheet, but blank
/// rows above the used range are already gone, so only the remainder is skipped.
fn read_relative(range: &Range<Data>, skip_rows: usize) -> std::result::Result<DataFrame, Attempt> {
    let Some(start) = range.start() else {
        return Ok(DataFrame::empty());
    };
    let skip = skip_rows.saturating_sub(start.0 as usize);
    let rows: Vec<Vec<Data>> = range.rows().skip(skip).map(|r| r.to_vec()).collect();
    rows_to_frame(&rows)
}

fn rows_to_frame(rows: &[Vec<Data>]) -> std::result::Result<DataFrame, Attempt> {
    if rows.is_empty() {
        return Ok(DataFrame::empty());
    }
    let headers = header_names(&rows[0]);
    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, name) in headers.iter().enumerate() {
        let cells: Vec<Option<&Data>> = rows[1..].iter().map(|row| row.get(col_idx)).collect();
        let inferred = infer_column_type(&cells);
        columns.push(column_to_series(name, &cells, inferred)?.into());
    }
    Ok(DataFrame::new(columns)?)
}

/// Header cell text; blanks become `column_<n>` and repeats get a `_duplicated_<k>` suffix.
fn header_names(row: &[Data]) -> Vec<String> {
    let mut seen = HashSet::new();
    row.iter()
        .enumerate()
        .map(|(idx, cell)| {
            let text = calamine::DataType::as_string(cell).unwrap_or_else(|| cell.to_string());
            let base = if text.trim().is_empty() {
                format!("column_{}", idx + 1)
            } else {
                text.trim().to_string()
            };
            let mut name = base.clone();
            let mut k = 0;
            while !seen.insert(name.clone()) {
                name = format!("{}_duplicated_{}", base, k);
                k += 1;
            }
            name
        })
        .collect()
}

/// Prefers Int64 for whole-number floats; infers Date/Datetime for date cells or
/// for text columns whose every value parses as an ISO date/datetime.
fn infer_column_type(cells: &[Option<&Data>]) -> ExcelColType {
    use calamine::DataType as CalamineTrait;
    let mut has_string = false;
    let mut has_float = false;
    let mut has_int = false;
    let mut has_bool = false;
    let mut has_datetime = false;
    for cell in cells.iter().flatten() {
        if CalamineTrait::is_string(*cell) {
            has_string = true;
            break;
        }
        if CalamineTrait::is_datetime(*cell) || CalamineTrait::is_datetime_iso(*cell) {
            has_datetime = true;
        } else if CalamineTrait::is_float(*cell) {
            has_float = true;
        }
        if CalamineTrait::is_int(*cell) {
            has_int = true;
        }
        if CalamineTrait::is_bool(*cell) {
            has_bool = true;
        }
    }

    if has_string {
        let mut parsed = cells
            .iter()
            .flatten()
            .filter(|c| !CalamineTrait::is_empty(**c))
            .map(|c| cell_to_naive_datetime(c))
            .peekable();
        let any = parsed.peek().is_some();
        if any && parsed.all(|dt| dt.is_some()) {
            temporal_type(cells)
        } else {
            ExcelColType::Utf8
        }
    } else if has_datetime && !has_float && !has_int {
        temporal_type(cells)
    } else if has_int || has_float || has_datetime {
        let all_whole = cells.iter().flatten().all(|cell| {
            CalamineTrait::as_f64(*cell).is_none_or(|f| f.is_finite() && f.fract() == 0.0)
        });
        if all_whole {
            ExcelColType::Int64
        } else {
            ExcelColType::Float64
        }
    } else if has_bool {
        ExcelColType::Boolean
    } else {
        ExcelColType::Utf8
    }
}

fn temporal_type(cells: &[Option<&Data>]) -> ExcelColType {
    let midnight = NaiveTime::MIN;
    let all_midnight = cells
        .iter()
        .flatten()
        .filter_map(|c| cell_to_naive_datetime(c))
        .all(|dt| dt.time() == midnight);
    if all_midnight {
        ExcelColType::Date
    } else {
        ExcelColType::Datetime
    }
}

/// Converts a cell to NaiveDateTime (serial date, DateTimeIso, or parseable string).
fn cell_to_naive_datetime(cell: &Data) -> Option<NaiveDateTime> {
    use calamine::DataType;
    if let Some(dt) = cell.as_datetime() {
        return Some(dt);
    }
    let s = cell.get_datetime_iso().or_else(|| cell.get_string())?;
    parse_naive_datetime_str(s)
}

/// Parses an ISO-style date/datetime string.
pub(crate) fn parse_naive_datetime_str(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn column_to_series(
    name: &str,
    cells: &[Option<&Data>],
    col_type: ExcelColType,
) -> PolarsResult<Series> {
    use calamine::DataType as CalamineTrait;
    let series = match col_type {
        ExcelColType::Int64 => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_f64(cell).map(|f| f as i64)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Float64 => {
            let v: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::as_f64(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Boolean => {
            let v: Vec<Option<bool>> = cells
                .iter()
                .map(|c| c.and_then(|cell| CalamineTrait::get_bool(cell)))
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Utf8 => {
            let v: Vec<Option<String>> = cells
                .iter()
                .map(|c| {
                    c.filter(|cell| !CalamineTrait::is_empty(*cell))
                        .and_then(|cell| match cell {
                            Data::Bool(b) => Some(b.to_string()),
                            other => CalamineTrait::as_string(other),
                        })
                })
                .collect();
            Series::new(name.into(), v)
        }
        ExcelColType::Date => {
            let v: Vec<Option<i32>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| cell_to_naive_datetime(cell))
                        .map(|dt| (dt.date() - NaiveDate::default()).num_days() as i32)
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Date)?
        }
        ExcelColType::Datetime => {
            let v: Vec<Option<i64>> = cells
                .iter()
                .map(|c| {
                    c.and_then(|cell| cell_to_naive_datetime(cell))
                        .map(|dt| dt.and_utc().timestamp_micros())
                })
                .collect();
            Series::new(name.into(), v).cast(&DataType::Datetime(TimeUnit::Microseconds, None))?
        }
    };
    Ok(series)
}
