//! Row-aligned comparison of a column against another object.
//!
//! The subject column and the comparison column are compared position by
//! position, optionally after both tables are pre-aggregated by a set of
//! grouping columns. Grouped values are ordered by their group keys, so
//! two tables with the same groups line up row for row.

use super::{Scorer, ScoringContext};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use crate::table::Table;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument, warn};

const EPSILON: f64 = 1e-9;
const VALUE_ALIAS: &str = "__daqual_value";

/// Relational operator applied between the subject bound and the
/// comparison value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqual,
    #[serde(rename = "=", alias = "==")]
    Equal,
    #[serde(rename = "<=")]
    LessThanOrEqual,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "between")]
    Between,
}

impl Comparator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparator::GreaterThan => ">",
            Comparator::GreaterThanOrEqual => ">=",
            Comparator::Equal => "=",
            Comparator::LessThanOrEqual => "<=",
            Comparator::LessThan => "<",
            Comparator::NotEqual => "!=",
            Comparator::Between => "between",
        }
    }

    /// Tests a subject value, widened by `tolerance`, against `target`.
    ///
    /// `between` holds when `target` lies inside the bounds; every other
    /// operator tests the upper bound.
    pub fn holds(&self, value: f64, tolerance: Option<Tolerance>, target: f64) -> bool {
        let (lower, upper) = match tolerance {
            Some(t) => t.bounds(value),
            None => (value, value),
        };
        let equal = approx_eq(upper, target);
        match self {
            Comparator::Between => {
                let (lo, hi) = (lower.min(upper), lower.max(upper));
                (lo <= target || approx_eq(lo, target)) && (target <= hi || approx_eq(hi, target))
            }
            Comparator::GreaterThan => upper > target && !equal,
            Comparator::GreaterThanOrEqual => upper > target || equal,
            Comparator::Equal => equal,
            Comparator::LessThanOrEqual => upper < target || equal,
            Comparator::LessThan => upper < target && !equal,
            Comparator::NotEqual => !equal,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON * a.abs().max(b.abs()).max(1.0)
}

/// Widening applied to the subject value before comparing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// `value ± delta`
    Delta(f64),
    /// `value × (1 ± factor)`
    Factor(f64),
}

impl Tolerance {
    /// Returns `(lower, upper)` bounds around `value`.
    pub fn bounds(&self, value: f64) -> (f64, f64) {
        match *self {
            Tolerance::Delta(d) => (value - d, value + d),
            Tolerance::Factor(f) => (value * (1.0 - f), value * (1.0 + f)),
        }
    }
}

/// Aggregate applied to each group before comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    #[default]
    Sum,
    #[serde(alias = "avg", alias = "average")]
    Mean,
}

impl Aggregation {
    fn sql_function(&self) -> &'static str {
        match self {
            Aggregation::Sum => "SUM",
            Aggregation::Mean => "AVG",
        }
    }
}

/// Grouping applied to both tables before comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupBy {
    pub columns: Vec<String>,
    #[serde(default)]
    pub aggregation: Aggregation,
}

impl GroupBy {
    pub fn new<I, S>(columns: I, aggregation: Aggregation) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            aggregation,
        }
    }

    /// Aggregates `column` of `table` per group, ordered by group keys.
    async fn aggregate(
        &self,
        table: &Table,
        object_key: &str,
        column: &str,
    ) -> Result<Vec<Option<f64>>> {
        if self.columns.is_empty() {
            return Err(DaqualError::Format(
                "groupby requires at least one column".to_string(),
            ));
        }
        for name in self.columns.iter().map(String::as_str).chain([column]) {
            if !table.has_column(name) {
                return Err(DaqualError::column_not_found(object_key, name));
            }
        }
        let keys = self
            .columns
            .iter()
            .map(|c| SqlSecurity::escape_identifier(c))
            .collect::<Result<Vec<_>>>()?
            .join(", ");
        let sql = format!(
            "SELECT {keys}, {}(CAST({} AS DOUBLE)) AS {} FROM source GROUP BY {keys} ORDER BY {keys}",
            self.aggregation.sql_function(),
            SqlSecurity::escape_identifier(column)?,
            SqlSecurity::escape_identifier(VALUE_ALIAS)?,
        );
        debug!(object.key = %object_key, sql = %sql, "Aggregating comparison input");

        let ctx = SessionContext::new();
        ctx.register_batch("source", table.batch().clone())?;
        let batches = ctx.sql(&sql).await?.collect().await?;

        let mut values = Vec::new();
        for batch in batches {
            let cells = Table::try_new(batch)?
                .cells(VALUE_ALIAS)?
                .ok_or_else(|| DaqualError::Internal("aggregate lost its value column".into()))?;
            values.extend(cells.iter().map(|c| c.as_f64()));
        }
        Ok(values)
    }
}

/// Named parameters of [`Comparison`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComparisonParams {
    pub column: String,
    pub comparison: String,
    pub comparator: Comparator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupby: Option<GroupBy>,
    /// Column of the comparison object; defaults to `column`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison_column: Option<String>,
}

/// Fraction of comparison rows matched by the subject column.
///
/// The score denominator is the comparison table's row count (after
/// grouping). The shorter side is padded with missing values, which never
/// match, so rows missing from the subject lower the score.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{Aggregation, Comparator, Comparison, GroupBy, Scorer};
///
/// // Today's totals per account within 20% of yesterday's
/// let scorer = Comparison::new("value", "daqual/transactions-20190301.csv", Comparator::Between)
///     .with_factor(0.2)
///     .group_by(GroupBy::new(["account", "credit/debit"], Aggregation::Sum));
///
/// assert_eq!(scorer.dependencies(), vec!["daqual/transactions-20190301.csv".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    column: String,
    comparison: String,
    comparison_column: Option<String>,
    comparator: Comparator,
    tolerance: Option<Tolerance>,
    groupby: Option<GroupBy>,
}

impl Comparison {
    pub fn new(
        column: impl Into<String>,
        comparison: impl Into<String>,
        comparator: Comparator,
    ) -> Self {
        Self {
            column: column.into(),
            comparison: comparison.into(),
            comparison_column: None,
            comparator,
            tolerance: None,
            groupby: None,
        }
    }

    pub fn with_delta(mut self, delta: f64) -> Self {
        self.tolerance = Some(Tolerance::Delta(delta));
        self
    }

    pub fn with_factor(mut self, factor: f64) -> Self {
        self.tolerance = Some(Tolerance::Factor(factor));
        self
    }

    pub fn group_by(mut self, groupby: GroupBy) -> Self {
        self.groupby = Some(groupby);
        self
    }

    pub fn comparison_column(mut self, column: impl Into<String>) -> Self {
        self.comparison_column = Some(column.into());
        self
    }

    pub fn tolerance(&self) -> Option<Tolerance> {
        self.tolerance
    }

    fn target_column(&self) -> &str {
        self.comparison_column.as_deref().unwrap_or(&self.column)
    }

    async fn values(&self, table: &Table, object_key: &str, column: &str) -> Result<Vec<Option<f64>>> {
        match &self.groupby {
            Some(groupby) => groupby.aggregate(table, object_key, column).await,
            None => Ok(table
                .cells(column)?
                .ok_or_else(|| DaqualError::column_not_found(object_key, column))?
                .iter()
                .map(|c| c.as_f64())
                .collect()),
        }
    }

    fn to_params(&self) -> ComparisonParams {
        ComparisonParams {
            column: self.column.clone(),
            comparison: self.comparison.clone(),
            comparator: self.comparator,
            delta: match self.tolerance {
                Some(Tolerance::Delta(d)) => Some(d),
                _ => None,
            },
            factor: match self.tolerance {
                Some(Tolerance::Factor(f)) => Some(f),
                _ => None,
            },
            groupby: self.groupby.clone(),
            comparison_column: self.comparison_column.clone(),
        }
    }
}

impl TryFrom<ComparisonParams> for Comparison {
    type Error = DaqualError;

    fn try_from(params: ComparisonParams) -> Result<Self> {
        let tolerance = match (params.delta, params.factor) {
            (Some(_), Some(_)) => {
                return Err(DaqualError::Format(
                    "comparison accepts either 'delta' or 'factor', not both".to_string(),
                ))
            }
            (Some(d), None) => Some(Tolerance::Delta(d)),
            (None, Some(f)) => Some(Tolerance::Factor(f)),
            (None, None) => None,
        };
        if let Some(Tolerance::Delta(v) | Tolerance::Factor(v)) = tolerance {
            InputValidator::validate_finite(v, "comparison tolerance")?;
        }
        Ok(Self {
            column: params.column,
            comparison: params.comparison,
            comparison_column: params.comparison_column,
            comparator: params.comparator,
            tolerance,
            groupby: params.groupby,
        })
    }
}

#[async_trait]
impl Scorer for Comparison {
    #[instrument(skip(self, ctx), fields(
        object = %ctx.object_key(),
        comparison = %self.comparison,
        comparator = %self.comparator
    ))]
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let subject = self
            .values(ctx.table()?, ctx.object_key(), &self.column)
            .await?;
        let target = self
            .values(
                ctx.table_of(&self.comparison)?,
                &self.comparison,
                self.target_column(),
            )
            .await?;

        let original_rows = target.len();
        if original_rows == 0 {
            return Err(DaqualError::division(format!(
                "comparison object '{}' has no rows",
                self.comparison
            )));
        }

        let aligned = subject.len().max(target.len());
        let matched = (0..aligned)
            .filter(|&i| {
                match (
                    subject.get(i).copied().flatten(),
                    target.get(i).copied().flatten(),
                ) {
                    (Some(value), Some(other)) => {
                        self.comparator.holds(value, self.tolerance, other)
                    }
                    _ => false,
                }
            })
            .count();

        if matched < original_rows {
            warn!(
                object.key = %ctx.object_key(),
                comparison = %self.comparison,
                subject_rows = subject.len(),
                comparison_rows = original_rows,
                matched,
                "Comparison rows not matched"
            );
        }
        Ok(matched as f64 / original_rows as f64)
    }

    fn name(&self) -> &str {
        "comparison"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.comparison.clone()]
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self.to_params()).unwrap_or_default()
    }
}
