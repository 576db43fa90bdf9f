//! Pattern matching on a column's cells.

use super::{Scorer, ScoringContext};
use crate::prelude::*;
use crate::security::SqlSecurity;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// Parameters of [`ColumnFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnFormatParams {
    pub column: String,
    #[serde(rename = "match")]
    pub pattern: String,
}

/// Fraction of rows whose cell matches a pattern anchored at the start.
///
/// Missing cells are matched as the empty string, so `^$|[A-Z]{3}` accepts
/// blanks. The pattern only has to match a prefix of the cell.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{ColumnFormat, Scorer};
///
/// let scorer = ColumnFormat::new("Alphabetic Code", "^$|[A-Z]{3}").unwrap();
/// assert_eq!(scorer.name(), "column_format");
///
/// assert!(ColumnFormat::new("Alphabetic Code", "[A-Z").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ColumnFormat {
    params: ColumnFormatParams,
    regex: Regex,
}

impl ColumnFormat {
    /// Compiles the pattern; an invalid pattern is a format error.
    pub fn new(column: impl Into<String>, pattern: impl Into<String>) -> Result<Self> {
        Self::try_from(ColumnFormatParams {
            column: column.into(),
            pattern: pattern.into(),
        })
    }
}

impl TryFrom<ColumnFormatParams> for ColumnFormat {
    type Error = DaqualError;

    fn try_from(params: ColumnFormatParams) -> Result<Self> {
        let regex = SqlSecurity::validate_regex_pattern(&format!("^(?:{})", params.pattern))?;
        Ok(Self { params, regex })
    }
}

#[async_trait]
impl Scorer for ColumnFormat {
    #[instrument(skip(self, ctx), fields(object = %ctx.object_key(), column = %self.params.column))]
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let cells = ctx.cells(&self.params.column)?;
        if cells.is_empty() {
            return Err(DaqualError::division(format!(
                "column '{}' of '{}' is empty",
                self.params.column,
                ctx.object_key()
            )));
        }
        let matched = cells
            .iter()
            .filter(|cell| self.regex.is_match(&cell.render()))
            .count();
        if matched < cells.len() {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.params.column,
                pattern = %self.params.pattern,
                mismatched = cells.len() - matched,
                "Cells do not match the expected format"
            );
        }
        Ok(matched as f64 / cells.len() as f64)
    }

    fn name(&self) -> &str {
        "column_format"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(&self.params).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use crate::test_helpers::{score_object, text_table};

    #[tokio::test]
    async fn test_fraction_matching() {
        let scorer = ColumnFormat::new("groups", r"Group\d").unwrap();
        let table = text_table("groups", &["Group1", "Group2", "Other"]);
        let score = score_object(&scorer, "t/g.csv", vec![("t/g.csv", table)])
            .await
            .unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_anchored_at_start_only() {
        let scorer = ColumnFormat::new("code", "[A-Z]{3}").unwrap();
        let table = text_table("code", &["GBPX", "xGBP"]);
        let score = score_object(&scorer, "t/c.csv", vec![("t/c.csv", table)])
            .await
            .unwrap();
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_nulls_match_as_empty() {
        let scorer = ColumnFormat::new("code", "^$|[A-Z]{3}").unwrap();
        let table = Table::builder()
            .string_column("code", vec![Some("EUR"), None, Some("12")])
            .build()
            .unwrap();
        let score = score_object(&scorer, "t/c.csv", vec![("t/c.csv", table)])
            .await
            .unwrap();
        assert!((score - 2.0 / 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_numeric_cells_rendered() {
        let scorer = ColumnFormat::new("n", r"\d{3}$").unwrap();
        let table = Table::builder()
            .int_column("n", vec![Some(978), Some(12)])
            .build()
            .unwrap();
        let score = score_object(&scorer, "t/n.csv", vec![("t/n.csv", table)])
            .await
            .unwrap();
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_empty_column() {
        let scorer = ColumnFormat::new("code", "[A-Z]{3}").unwrap();
        let result =
            score_object(&scorer, "t/c.csv", vec![("t/c.csv", text_table("code", &[]))]).await;
        assert!(matches!(result, Err(DaqualError::Division { .. })));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            ColumnFormat::new("code", "(unclosed"),
            Err(DaqualError::Format(_))
        ));
    }

    #[tokio::test]
    async fn test_nested_quantifiers_accepted() {
        let scorer = crate::scoring::ScorerRegistry::with_builtins()
            .build("match", serde_json::json!({"column": "c", "match": "(a+)+b"}))
            .unwrap();
        let table = text_table("c", &["aaab", "aaaa"]);
        let score = score_object(scorer.as_ref(), "t/c.csv", vec![("t/c.csv", table)])
            .await
            .unwrap();
        assert_eq!(score, 0.5);
    }

    #[test]
    fn test_params_use_match_key() {
        let params: ColumnFormatParams =
            serde_json::from_str(r#"{"column": "Currency", "match": "[A-Z]{3}"}"#).unwrap();
        let scorer = ColumnFormat::try_from(params).unwrap();
        assert_eq!(
            scorer.parameters(),
            serde_json::json!({"column": "Currency", "match": "[A-Z]{3}"})
        );
    }
}
