//! The fluent pipeline: one owned table slot moved through load → pivot → format.

use polars::prelude::*;
use std::io::Write;
use std::mem;
use std::path::Path;
use tracing::debug;

use crate::aggregate::{AggregateFn, AggregateRegistry};
use crate::config::ExplorerConfig;
use crate::error::{ExplorerError, Result};
use crate::filter::FilterStatement;
use crate::format::{format_pivot, FormatOptions, FormattedPivot};
use crate::loader::{self, LoadReport};
use crate::pivot::{self, PivotSpec, PivotTable};
use crate::schema::{self, Exploration};
use crate::transform;
use crate::{OpenOptions, APP_NAME};
use std::sync::Arc;

/// What the chain currently holds.
#[derive(Debug, Clone, Default)]
pub enum ChainState {
    #[default]
    Empty,
    Loaded(DataFrame),
    Pivoted(PivotTable),
    Formatted(FormattedPivot),
}

impl ChainState {
    pub fn name(&self) -> &'static str {
        match self {
            ChainState::Empty => "empty",
            ChainState::Loaded(_) => "loaded",
            ChainState::Pivoted(_) => "pivoted",
            ChainState::Formatted(_) => "formatted",
        }
    }

    /// The frame a caller sees: the dataset, the pivot, or the display frame.
    fn frame(&self) -> Option<&DataFrame> {
        match self {
            ChainState::Empty => None,
            ChainState::Loaded(df) => Some(df),
            ChainState::Pivoted(table) => Some(table.frame()),
            ChainState::Formatted(formatted) => Some(formatted.display()),
        }
    }
}

/// Fluent explorer over a single dataset.
///
/// Every operation replaces the held table only when it succeeds, so after an
/// error the previous table is still available through [`get`](Self::get).
#[derive(Debug, Default)]
pub struct DataExplorerChain {
    state: ChainState,
    registry: AggregateRegistry,
    config: ExplorerConfig,
    last_load: Option<LoadReport>,
}

impl DataExplorerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExplorerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Chain configured from the user's `config.toml`, defaults where unset.
    pub fn from_user_config() -> color_eyre::Result<Self> {
        Ok(Self::with_config(ExplorerConfig::load(APP_NAME)?))
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn registry(&self) -> &AggregateRegistry {
        &self.registry
    }

    /// Make an aggregate available to [`pivot`](Self::pivot) by its name.
    pub fn register_aggregate(&mut self, aggregate: Arc<dyn AggregateFn>) -> &mut Self {
        self.registry.register(aggregate);
        self
    }

    pub fn state(&self) -> &ChainState {
        &self.state
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    pub fn last_load(&self) -> Option<&LoadReport> {
        self.last_load.as_ref()
    }

    fn current(&self) -> Result<&DataFrame> {
        self.state.frame().ok_or(ExplorerError::NotLoaded)
    }

    fn transition(&mut self, next: ChainState) -> &mut Self {
        debug!(from = self.state.name(), to = next.name(), "Chain transition");
        self.state = next;
        self
    }

    pub fn load(&mut self, path: impl AsRef<Path>, options: &OpenOptions) -> Result<&mut Self> {
        let (df, report) = loader::load(path, options)?;
        self.last_load = Some(report);
        Ok(self.transition(ChainState::Loaded(df)))
    }

    /// Load with the options from the chain's configuration.
    pub fn load_configured(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        let options = OpenOptions::from_config(&self.config.loading);
        self.load(path, &options)
    }

    /// Write column types and the first `preview.rows` rows to `out`.
    pub fn explore<W: Write>(&mut self, out: &mut W) -> Result<&mut Self> {
        let df = self.current()?;
        schema::write_exploration(df, self.config.preview.rows, out)?;
        Ok(self)
    }

    pub fn inspect(&self) -> Result<Exploration> {
        Ok(schema::inspect(self.current()?, self.config.preview.rows))
    }

    pub fn select_columns<S: AsRef<str>>(&mut self, columns: &[S]) -> Result<&mut Self> {
        let df = transform::select_columns(self.current()?, columns)?;
        Ok(self.transition(ChainState::Loaded(df)))
    }

    pub fn filter(&mut self, predicate: Expr) -> Result<&mut Self> {
        let df = transform::filter_rows(self.current()?, predicate)?;
        Ok(self.transition(ChainState::Loaded(df)))
    }

    pub fn filter_statements(&mut self, statements: &[FilterStatement]) -> Result<&mut Self> {
        let df = transform::filter_statements(self.current()?, statements)?;
        Ok(self.transition(ChainState::Loaded(df)))
    }

    pub fn with_week_of_month(&mut self, date_column: &str, alias: &str) -> Result<&mut Self> {
        let df = transform::with_week_of_month(self.current()?, date_column, alias)?;
        Ok(self.transition(ChainState::Loaded(df)))
    }

    pub fn pivot(&mut self, spec: &PivotSpec) -> Result<&mut Self> {
        let table = pivot::pivot(self.current()?, spec, &self.registry)?;
        Ok(self.transition(ChainState::Pivoted(table)))
    }

    pub fn pivot_by<S: AsRef<str>>(
        &mut self,
        index: &[S],
        column: &str,
        value: &str,
        aggregation: &str,
    ) -> Result<&mut Self> {
        let spec = PivotSpec::new(index, column, value).with_aggregation(aggregation);
        self.pivot(&spec)
    }

    /// Fill nulls, add grand totals and style numbers. Needs a pivot.
    pub fn pivot_format(&mut self, options: &FormatOptions) -> Result<&mut Self> {
        let formatted = match &self.state {
            ChainState::Empty => return Err(ExplorerError::NotLoaded),
            ChainState::Loaded(_) => return Err(ExplorerError::NoPivotTable),
            ChainState::Pivoted(table) => format_pivot(table, options)?,
            ChainState::Formatted(previous) => format_pivot(previous.numeric(), options)?,
        };
        Ok(self.transition(ChainState::Formatted(formatted)))
    }

    /// Format with the options from the chain's configuration.
    pub fn pivot_format_configured(&mut self) -> Result<&mut Self> {
        let options = FormatOptions::from_config(&self.config.format);
        self.pivot_format(&options)
    }

    /// The current table. For a formatted pivot this is the display frame.
    pub fn get(&self) -> Result<&DataFrame> {
        self.current()
    }

    /// The numeric pivot behind the current state, totals included once formatted.
    pub fn numeric_pivot(&self) -> Result<&PivotTable> {
        match &self.state {
            ChainState::Pivoted(table) => Ok(table),
            ChainState::Formatted(formatted) => Ok(formatted.numeric()),
            ChainState::Loaded(_) => Err(ExplorerError::NoPivotTable),
            ChainState::Empty => Err(ExplorerError::NotLoaded),
        }
    }

    /// Take the current table out, leaving the chain empty.
    pub fn into_frame(&mut self) -> Result<DataFrame> {
        let state = mem::take(&mut self.state);
        let frame = match state {
            ChainState::Empty => return Err(ExplorerError::NotLoaded),
            ChainState::Loaded(df) => df,
            ChainState::Pivoted(table) => table.into_frame(),
            ChainState::Formatted(formatted) => formatted.into_display(),
        };
        Ok(frame)
    }
}
