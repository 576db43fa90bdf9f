//! Schema-shape scorers: column count and column names.

use super::{binary, overage_score, Scorer, ScoringContext};
use crate::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Scores the number of columns against an expectation.
///
/// Too few columns score the fraction present; excess columns are
/// penalized symmetrically, and twice the expected count or more scores 0.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{ColumnCount, Scorer};
///
/// let scorer = ColumnCount::new(8);
/// assert_eq!(scorer.name(), "column_count");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnCount {
    #[serde(alias = "expected_n")]
    expected_columns: usize,
}

impl ColumnCount {
    pub fn new(expected_columns: usize) -> Self {
        Self { expected_columns }
    }
}

#[async_trait]
impl Scorer for ColumnCount {
    #[instrument(skip(self, ctx), fields(object = %ctx.object_key(), expected = self.expected_columns))]
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let actual = ctx.table()?.num_columns();
        if actual > self.expected_columns {
            warn!(
                object.key = %ctx.object_key(),
                actual,
                expected = self.expected_columns,
                "Object has more columns than expected"
            );
        }
        overage_score(actual, self.expected_columns, "column count")
    }

    fn name(&self) -> &str {
        "column_count"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Scores 1 when the column names equal the expected list, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnNames {
    columns: Vec<String>,
}

impl ColumnNames {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Scorer for ColumnNames {
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let actual = ctx.table()?.column_names();
        if actual != self.columns {
            warn!(
                object.key = %ctx.object_key(),
                actual = ?actual,
                expected = ?self.columns,
                "Column names differ from expectation"
            );
        }
        Ok(binary(actual == self.columns))
    }

    fn name(&self) -> &str {
        "column_names"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
