//! Small embedded relational store over SQLite.
//!
//! Tables are created from `(column, type)` pairs, rows are inserted as
//! `(column, value)` pairs, and deletes and selects filter with an
//! equality conjunction (`a = ? AND b = ?`). Values always travel as bound
//! parameters; table and column names are checked to be plain identifiers
//! and quoted.

use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use thiserror::Error;

pub use rusqlite::types::Value;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),
    #[error("invalid type {sql_type:?} for column {column}")]
    InvalidType { column: String, sql_type: String },
    #[error("{0} needs at least one column")]
    NoColumns(&'static str),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// One selected row: column names paired with their values, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl StoredRow {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

#[derive(Debug)]
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            conn: Connection::open(path)?,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// `CREATE TABLE IF NOT EXISTS` with the given `(column, type)` pairs.
    pub fn create_table(&self, table: &str, columns: &[(&str, &str)]) -> Result<()> {
        if columns.is_empty() {
            return Err(StoreError::NoColumns("create_table"));
        }
        let mut defs = Vec::with_capacity(columns.len());
        for (name, sql_type) in columns {
            if !is_type_name(sql_type) {
                return Err(StoreError::InvalidType {
                    column: name.to_string(),
                    sql_type: sql_type.to_string(),
                });
            }
            defs.push(format!("{} {}", quote(name)?, sql_type.trim()));
        }
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote(table)?,
            defs.join(", ")
        );
        self.conn.execute(&sql, [])?;
        Ok(())
    }

    /// Insert one row. Returns the number of rows written.
    pub fn insert(&self, table: &str, row: &[(&str, Value)]) -> Result<usize> {
        if row.is_empty() {
            return Err(StoreError::NoColumns("insert"));
        }
        let names = row
            .iter()
            .map(|(name, _)| quote(name))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; row.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table)?,
            names.join(", "),
            placeholders
        );
        let written = self
            .conn
            .execute(&sql, params_from_iter(row.iter().map(|(_, v)| v)))?;
        Ok(written)
    }

    /// Delete the rows matching every `(column, value)` pair. Empty criteria
    /// are refused rather than clearing the table. Returns the rows removed.
    pub fn delete(&self, table: &str, criteria: &[(&str, Value)]) -> Result<usize> {
        if criteria.is_empty() {
            return Err(StoreError::NoColumns("delete"));
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote(table)?,
            where_clause(criteria)?
        );
        let removed = self
            .conn
            .execute(&sql, params_from_iter(criteria.iter().map(|(_, v)| v)))?;
        Ok(removed)
    }

    /// All columns of the rows matching every `(column, value)` pair (all rows
    /// when `criteria` is empty), ascending by `order_by` when given.
    pub fn select(
        &self,
        table: &str,
        criteria: &[(&str, Value)],
        order_by: Option<&str>,
    ) -> Result<Vec<StoredRow>> {
        let mut sql = format!("SELECT * FROM {}", quote(table)?);
        if !criteria.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause(criteria)?);
        }
        if let Some(column) = order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(&quote(column)?);
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();
        let rows = stmt
            .query_map(params_from_iter(criteria.iter().map(|(_, v)| v)), |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .map(|values| {
                values.map(|values| StoredRow {
                    columns: columns.clone(),
                    values,
                })
            })
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn where_clause(criteria: &[(&str, Value)]) -> Result<String> {
    let terms = criteria
        .iter()
        .map(|(name, _)| quote(name).map(|q| format!("{} = ?", q)))
        .collect::<Result<Vec<_>>>()?;
    Ok(terms.join(" AND "))
}

/// Double-quoted identifier; only ASCII letters, digits and `_`, not starting with a digit.
fn quote(name: &str) -> Result<String> {
    let valid = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(format!("\"{}\"", name))
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Type names like `TEXT`, `INTEGER NOT NULL` or `VARCHAR(20)`.
fn is_type_name(sql_type: &str) -> bool {
    !sql_type.trim().is_empty()
        && sql_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ' || c == '(' || c == ')')
}
