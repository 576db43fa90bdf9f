//! Scoring functions.
//!
//! A scorer computes a normalized quality score in `[0, 1]` for one object,
//! optionally consulting other resolved objects (a master table, or a
//! comparison table). Scorers are stateless apart from their typed
//! parameters and are resolved by identifier through a [`ScorerRegistry`].
//!
//! | Identifier | Scorer |
//! |---|---|
//! | `column_count` | [`ColumnCount`] |
//! | `column_names` | [`ColumnNames`] |
//! | `row_count` | [`RowCount`] |
//! | `no_blanks` | [`NoBlanks`] |
//! | `unique_column` | [`UniqueColumn`] |
//! | `column_valid_values` | [`ColumnValidValues`] |
//! | `every_master_value_used` | [`EveryMasterValueUsed`] |
//! | `column_format` | [`ColumnFormat`] |
//! | `int`, `float`, `number` | [`ColumnType`] |
//! | `date` | [`DateColumn`] |
//! | `comparison` | [`Comparison`] |
//! | `one` | [`One`] |

use crate::core::ObjectCache;
use crate::prelude::*;
use crate::table::{CellValue, Table};
use async_trait::async_trait;
use std::fmt::Debug;

mod columns;
mod comparison;
mod completeness;
mod constant;
mod datatype;
mod format;
mod registry;
mod size;
mod uniqueness;
mod values;

pub use columns::{ColumnCount, ColumnNames};
pub use comparison::{Aggregation, Comparator, Comparison, ComparisonParams, GroupBy, Tolerance};
pub use completeness::NoBlanks;
pub use constant::One;
pub use datatype::{ColumnType, DateColumn, TypeExpectation};
pub use format::{ColumnFormat, ColumnFormatParams};
pub use registry::{ScorerFactory, ScorerRegistry};
pub use size::{RowCount, RowDelta, RowExpectation};
pub use uniqueness::UniqueColumn;
pub use values::{ColumnValidValues, EveryMasterValueUsed, MasterColumn};

/// Read access to the resolved objects of a run, centred on one subject.
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    cache: &'a ObjectCache,
    object_key: &'a str,
}

impl<'a> ScoringContext<'a> {
    pub fn new(cache: &'a ObjectCache, object_key: &'a str) -> Self {
        Self { cache, object_key }
    }

    /// Key of the object being scored.
    pub fn object_key(&self) -> &'a str {
        self.object_key
    }

    /// Table of the object being scored.
    pub fn table(&self) -> Result<&'a Table> {
        self.cache.table(self.object_key)
    }

    /// Table of another resolved object.
    pub fn table_of(&self, object_key: &str) -> Result<&'a Table> {
        self.cache.table(object_key)
    }

    /// Cells of a column of the subject object.
    pub fn cells(&self, column: &str) -> Result<Vec<CellValue>> {
        self.cells_of(self.object_key, column)
    }

    /// Cells of a column of any resolved object.
    pub fn cells_of(&self, object_key: &str, column: &str) -> Result<Vec<CellValue>> {
        self.table_of(object_key)?
            .cells(column)?
            .ok_or_else(|| DaqualError::column_not_found(object_key, column))
    }
}

/// A scoring function bound to its parameters.
///
/// # Examples
///
/// ```rust,ignore
/// use daqual::scoring::{Scorer, ScoringContext};
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct NonEmpty;
///
/// #[async_trait]
/// impl Scorer for NonEmpty {
///     async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
///         Ok(if ctx.table()?.num_rows() > 0 { 1.0 } else { 0.0 })
///     }
///
///     fn name(&self) -> &str {
///         "non_empty"
///     }
/// }
/// ```
#[async_trait]
pub trait Scorer: Debug + Send + Sync {
    /// Computes the score of the context's subject object.
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64>;

    /// Identifier of the scoring function.
    fn name(&self) -> &str;

    /// Other objects this scorer reads; they are resolved with the subject.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// The scorer's parameters, for diagnostics.
    fn parameters(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Scores `actual / expected`, penalizing overage symmetrically.
///
/// Ratios up to 1 score the ratio itself, ratios in `(1, 2]` score
/// `2 - ratio`, and anything above 2 scores 0.
pub(crate) fn overage_score(actual: usize, expected: usize, what: &str) -> Result<f64> {
    if expected == 0 {
        return Err(DaqualError::division(format!("expected {what} is zero")));
    }
    let ratio = actual as f64 / expected as f64;
    Ok(if ratio <= 1.0 {
        ratio
    } else if ratio <= 2.0 {
        2.0 - ratio
    } else {
        0.0
    })
}

/// Converts a predicate outcome into a binary score.
pub(crate) fn binary(passed: bool) -> f64 {
    if passed {
        1.0
    } else {
        0.0
    }
}
