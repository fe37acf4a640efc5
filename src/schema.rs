//! Read-only dataset inspection: column types and a row preview.

use polars::prelude::*;
use std::fmt;
use std::io::Write;

/// Column names and types, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSchema {
    columns: Vec<(String, DataType)>,
}

impl DatasetSchema {
    pub fn from_frame(df: &DataFrame) -> Self {
        Self {
            columns: df
                .get_columns()
                .iter()
                .map(|c| (c.name().to_string(), c.dtype().clone()))
                .collect(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn dtype(&self, name: &str) -> Option<&DataType> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, dtype)| dtype)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataType)> {
        self.columns.iter().map(|(n, d)| (n.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for DatasetSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, dtype) in &self.columns {
            writeln!(f, "• {} → {}", name, dtype)?;
        }
        Ok(())
    }
}

/// Schema plus the first rows of a dataset.
#[derive(Debug, Clone)]
pub struct Exploration {
    pub schema: DatasetSchema,
    pub preview: DataFrame,
    /// Row count of the whole dataset.
    pub rows: usize,
}

impl fmt::Display for Exploration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Columns ({}, {} rows):", self.schema.len(), self.rows)?;
        write!(f, "{}", self.schema)?;
        writeln!(f)?;
        writeln!(f, "First {} rows:", self.preview.height())?;
        write!(f, "{}", self.preview)
    }
}

pub fn inspect(df: &DataFrame, rows: usize) -> Exploration {
    Exploration {
        schema: DatasetSchema::from_frame(df),
        preview: df.head(Some(rows)),
        rows: df.height(),
    }
}

/// Write the column summary and head preview of `df` to `out`.
pub fn write_exploration<W: Write>(df: &DataFrame, rows: usize, out: &mut W) -> std::io::Result<()> {
    writeln!(out, "{}", inspect(df, rows))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "region" => ["E", "E", "W", "N", "S", "E", "W"],
            "sales" => [1i64, 2, 3, 4, 5, 6, 7]
        )
        .unwrap()
    }

    #[test]
    fn test_schema_follows_column_order() {
        let schema = DatasetSchema::from_frame(&sample());
        assert_eq!(schema.names(), vec!["region", "sales"]);
        assert_eq!(schema.dtype("sales"), Some(&DataType::Int64));
        assert_eq!(schema.dtype("missing"), None);
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_inspect_previews_head_without_mutation() {
        let df = sample();
        let exploration = inspect(&df, 5);
        assert_eq!(exploration.preview.height(), 5);
        assert_eq!(exploration.rows, 7);
        assert_eq!(df.height(), 7);
    }

    #[test]
    fn test_write_exploration() {
        let mut out = Vec::new();
        write_exploration(&sample(), 3, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("• region → str"));
        assert!(text.contains("• sales → i64"));
        assert!(text.contains("First 3 rows"));
    }
}
