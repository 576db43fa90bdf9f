//! Column type predicates.

use super::{binary, Scorer, ScoringContext};
use crate::prelude::*;
use crate::table::{CellValue, ColumnKind};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// The inferred column type a [`ColumnType`] scorer expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeExpectation {
    #[serde(rename = "int")]
    Integer,
    Float,
    /// Integer or float
    #[default]
    Number,
}

impl TypeExpectation {
    pub fn name(&self) -> &'static str {
        match self {
            TypeExpectation::Integer => "int",
            TypeExpectation::Float => "float",
            TypeExpectation::Number => "number",
        }
    }

    fn accepts(&self, kind: ColumnKind) -> bool {
        match self {
            TypeExpectation::Integer => kind == ColumnKind::Integer,
            TypeExpectation::Float => kind == ColumnKind::Float,
            TypeExpectation::Number => kind.is_numeric(),
        }
    }
}

/// Scores 1 when a column's inferred type meets the expectation.
///
/// The check is on the column's type, not its values: a float column
/// holding only whole numbers is still a float column.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{ColumnType, Scorer, TypeExpectation};
///
/// let scorer = ColumnType::new("amount", TypeExpectation::Float);
/// assert_eq!(scorer.name(), "float");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnType {
    column: String,
    #[serde(skip)]
    expectation: TypeExpectation,
}

impl ColumnType {
    pub fn new(column: impl Into<String>, expectation: TypeExpectation) -> Self {
        Self {
            column: column.into(),
            expectation,
        }
    }

    /// Replaces the expected type.
    pub fn expecting(mut self, expectation: TypeExpectation) -> Self {
        self.expectation = expectation;
        self
    }

    pub fn expectation(&self) -> TypeExpectation {
        self.expectation
    }
}

#[async_trait]
impl Scorer for ColumnType {
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let kind = ctx
            .table()?
            .column_kind(&self.column)
            .ok_or_else(|| DaqualError::column_not_found(ctx.object_key(), &self.column))?;
        let passed = self.expectation.accepts(kind);
        if !passed {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.column,
                expected = self.expectation.name(),
                found = ?kind,
                "Column has unexpected type"
            );
        }
        Ok(binary(passed))
    }

    fn name(&self) -> &str {
        self.expectation.name()
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d %Y",
    "%B %d %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Lenient date inference over a handful of common layouts.
pub(crate) fn parses_as_date(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    DATE_FORMATS
        .iter()
        .any(|f| NaiveDate::parse_from_str(text, f).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(text, f).is_ok())
        || DateTime::parse_from_rfc3339(text).is_ok()
}

/// Scores 1 when every present cell of a column is a date.
///
/// Strings and integers are parsed from their text form; a single cell that
/// fails to parse scores 0. Columns already typed as dates score 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateColumn {
    column: String,
}

impl DateColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

#[async_trait]
impl Scorer for DateColumn {
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let table = ctx.table()?;
        match table.column_kind(&self.column) {
            None => return Err(DaqualError::column_not_found(ctx.object_key(), &self.column)),
            Some(ColumnKind::Date) => {
                debug!(column = %self.column, "Column is typed as a date");
                return Ok(1.0);
            }
            Some(_) => {}
        }

        let cells = ctx.cells(&self.column)?;
        let failed = cells.iter().find(|cell| match cell {
            CellValue::Null => false,
            CellValue::Float(_) => true,
            other => !parses_as_date(&other.render()),
        });
        if let Some(cell) = failed {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.column,
                value = %cell,
                "Cell is not a date"
            );
        }
        Ok(binary(failed.is_none()))
    }

    fn name(&self) -> &str {
        "date"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
