//! Aggregate functions used to reduce pivot groups, and the named registry
//! the pivot engine resolves them from.

use polars::prelude::*;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{ExplorerError, Result};

/// A reduction over the value cells of one pivot group.
///
/// The expression is written against [`element()`], which stands for the
/// group's values in source order. Null cells are skipped by every built-in
/// except `count`.
pub trait AggregateFn: Send + Sync {
    /// Registry name, lower case.
    fn name(&self) -> &str;

    /// Whether the value column must be numeric (or boolean).
    fn requires_numeric(&self) -> bool {
        true
    }

    fn expr(&self) -> Expr;
}

pub struct Sum;
pub struct Count;
pub struct Mean;
pub struct Min;
pub struct Max;
pub struct First;
pub struct Last;

impl AggregateFn for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn expr(&self) -> Expr {
        element().sum()
    }
}

impl AggregateFn for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn requires_numeric(&self) -> bool {
        false
    }

    fn expr(&self) -> Expr {
        element().len().cast(DataType::Int64)
    }
}

impl AggregateFn for Mean {
    fn name(&self) -> &str {
        "mean"
    }

    fn expr(&self) -> Expr {
        element().mean()
    }
}

impl AggregateFn for Min {
    fn name(&self) -> &str {
        "min"
    }

    fn expr(&self) -> Expr {
        element().min()
    }
}

impl AggregateFn for Max {
    fn name(&self) -> &str {
        "max"
    }

    fn expr(&self) -> Expr {
        element().max()
    }
}

impl AggregateFn for First {
    fn name(&self) -> &str {
        "first"
    }

    fn expr(&self) -> Expr {
        element().drop_nulls().first()
    }
}

impl AggregateFn for Last {
    fn name(&self) -> &str {
        "last"
    }

    fn expr(&self) -> Expr {
        element().drop_nulls().last()
    }
}

/// Named aggregate functions. Starts with sum, count, mean, min, max, first and last.
#[derive(Clone)]
pub struct AggregateRegistry {
    functions: HashMap<String, Arc<dyn AggregateFn>>,
}

impl Default for AggregateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateRegistry {
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(Sum));
        registry.register(Arc::new(Count));
        registry.register(Arc::new(Mean));
        registry.register(Arc::new(Min));
        registry.register(Arc::new(Max));
        registry.register(Arc::new(First));
        registry.register(Arc::new(Last));
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Add `function` under its lower-cased name, replacing any previous entry.
    pub fn register(&mut self, function: Arc<dyn AggregateFn>) -> &mut Self {
        self.functions
            .insert(function.name().to_lowercase(), function);
        self
    }

    /// Look up by name, case-insensitively. "avg" is accepted for "mean".
    pub fn get(&self, name: &str) -> Result<Arc<dyn AggregateFn>> {
        let key = match name.trim().to_lowercase().as_str() {
            "avg" => "mean".to_string(),
            other => other.to_string(),
        };
        self.functions
            .get(&key)
            .cloned()
            .ok_or_else(|| ExplorerError::UnknownAggregate(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for AggregateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered() {
        let registry = AggregateRegistry::new();
        assert_eq!(
            registry.names(),
            vec!["count", "first", "last", "max", "mean", "min", "sum"]
        );
        assert_eq!(registry.get("SUM").unwrap().name(), "sum");
        assert_eq!(registry.get("avg").unwrap().name(), "mean");
        assert!(!registry.get("count").unwrap().requires_numeric());
        assert!(registry.get("max").unwrap().requires_numeric());
    }

    #[test]
    fn unknown_name_is_an_error() {
        let registry = AggregateRegistry::new();
        let err = registry.get("median").err().unwrap();
        assert!(matches!(err, ExplorerError::UnknownAggregate(ref n) if n == "median"));
    }

    struct Range;

    impl AggregateFn for Range {
        fn name(&self) -> &str {
            "Range"
        }

        fn expr(&self) -> Expr {
            element().max() - element().min()
        }
    }

    #[test]
    fn custom_functions_replace_by_lowercase_name() {
        let mut registry = AggregateRegistry::new();
        registry.register(Arc::new(Range));
        assert_eq!(registry.get("RANGE").unwrap().name(), "Range");
        assert_eq!(registry.names().len(), 8);

        registry.register(Arc::new(Range));
        assert_eq!(registry.names().len(), 8);
    }
}
