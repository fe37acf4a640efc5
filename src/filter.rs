//! Declarative row filters compiled to a polars expression.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ExplorerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub enum FilterOperator {
    Eq,
    NotEq,
    Gt,
    Lt,
    GtEq,
    LtEq,
    Contains,
    NotContains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::NotEq => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::GtEq => ">=",
            FilterOperator::LtEq => "<=",
            FilterOperator::Contains => "contains",
            FilterOperator::NotContains => "!contains",
        }
    }

    pub fn iterator() -> impl Iterator<Item = FilterOperator> {
        [
            FilterOperator::Eq,
            FilterOperator::NotEq,
            FilterOperator::Gt,
            FilterOperator::Lt,
            FilterOperator::GtEq,
            FilterOperator::LtEq,
            FilterOperator::Contains,
            FilterOperator::NotContains,
        ]
        .iter()
        .copied()
    }
}

impl FromStr for FilterOperator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let s = if s == "==" { "=" } else { s };
        FilterOperator::iterator()
            .find(|op| op.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown filter operator: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Copy, Default, Serialize, Deserialize)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// One comparison. `logical_op` joins it to the statements before it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStatement {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
    #[serde(default)]
    pub logical_op: LogicalOperator,
}

impl FilterStatement {
    pub fn new(column: &str, operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: value.into(),
            logical_op: LogicalOperator::And,
        }
    }

    pub fn or(mut self) -> Self {
        self.logical_op = LogicalOperator::Or;
        self
    }
}

/// Literal for `value`, typed after the column's dtype when it parses.
fn typed_literal(value: &str, dtype: &DataType) -> Expr {
    match dtype {
        DataType::Float32 | DataType::Float64 => value
            .parse::<f64>()
            .map(lit)
            .unwrap_or_else(|_| lit(value)),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => value
            .parse::<i64>()
            .map(lit)
            .unwrap_or_else(|_| lit(value)),
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => value
            .parse::<u64>()
            .map(lit)
            .unwrap_or_else(|_| lit(value)),
        DataType::Boolean => value
            .parse::<bool>()
            .map(lit)
            .unwrap_or_else(|_| lit(value)),
        _ => lit(value),
    }
}

/// Combine `statements` left to right into one predicate over `schema`.
/// `None` when there is nothing to filter on.
pub fn filter_expr(statements: &[FilterStatement], schema: &Schema) -> Result<Option<Expr>> {
    let mut final_expr: Option<Expr> = None;

    for filter in statements {
        let dtype = schema
            .get(filter.column.as_str())
            .ok_or_else(|| ExplorerError::ColumnNotFound(filter.column.clone()))?;
        let col_expr = col(filter.column.as_str());
        let val_lit = typed_literal(&filter.value, dtype);

        let op_expr = match filter.operator {
            FilterOperator::Eq => col_expr.eq(val_lit),
            FilterOperator::NotEq => col_expr.neq(val_lit),
            FilterOperator::Gt => col_expr.gt(val_lit),
            FilterOperator::Lt => col_expr.lt(val_lit),
            FilterOperator::GtEq => col_expr.gt_eq(val_lit),
            FilterOperator::LtEq => col_expr.lt_eq(val_lit),
            FilterOperator::Contains | FilterOperator::NotContains => {
                if dtype != &DataType::String {
                    return Err(ExplorerError::InvalidColumnType {
                        column: filter.column.clone(),
                        dtype: dtype.to_string(),
                        operation: format!("filter '{}'", filter.operator.as_str()),
                    });
                }
                let contains = col_expr.str().contains_literal(lit(filter.value.clone()));
                if filter.operator == FilterOperator::Contains {
                    contains
                } else {
                    contains.not()
                }
            }
        };

        final_expr = Some(match final_expr {
            Some(current) => match filter.logical_op {
                LogicalOperator::And => current.and(op_expr),
                LogicalOperator::Or => current.or(op_expr),
            },
            None => op_expr,
        });
    }

    Ok(final_expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new("region".into(), DataType::String),
            Field::new("year".into(), DataType::Int64),
            Field::new("sales".into(), DataType::Float64),
            Field::new("active".into(), DataType::Boolean),
        ])
    }

    #[test]
    fn test_operator_from_str() {
        assert_eq!("=".parse::<FilterOperator>().unwrap(), FilterOperator::Eq);
        assert_eq!("==".parse::<FilterOperator>().unwrap(), FilterOperator::Eq);
        assert_eq!(">=".parse::<FilterOperator>().unwrap(), FilterOperator::GtEq);
        assert_eq!(
            "Contains".parse::<FilterOperator>().unwrap(),
            FilterOperator::Contains
        );
        assert!("~".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_empty_statements_build_nothing() {
        assert!(filter_expr(&[], &schema()).unwrap().is_none());
    }

    #[test]
    fn test_unknown_column() {
        let statements = [FilterStatement::new("country", FilterOperator::Eq, "US")];
        let err = filter_expr(&statements, &schema()).unwrap_err();
        assert!(matches!(err, ExplorerError::ColumnNotFound(ref c) if c == "country"));
    }

    #[test]
    fn test_contains_requires_text() {
        let statements = [FilterStatement::new("year", FilterOperator::Contains, "20")];
        let err = filter_expr(&statements, &schema()).unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidColumnType { .. }));
    }

    #[test]
    fn test_statements_combine() {
        let statements = [
            FilterStatement::new("year", FilterOperator::GtEq, "2023"),
            FilterStatement::new("region", FilterOperator::Contains, "E").or(),
        ];
        assert!(filter_expr(&statements, &schema()).unwrap().is_some());
    }
}
