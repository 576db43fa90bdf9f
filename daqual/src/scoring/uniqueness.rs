//! Column uniqueness.

use super::{binary, Scorer, ScoringContext};
use crate::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Scores 1 when every cell of a column is distinct.
///
/// Two missing cells count as duplicates of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UniqueColumn {
    column: String,
}

impl UniqueColumn {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

#[async_trait]
impl Scorer for UniqueColumn {
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let cells = ctx.cells(&self.column)?;
        let distinct: HashSet<_> = cells.iter().map(|c| c.key()).collect();
        let unique = distinct.len() == cells.len();
        if !unique {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.column,
                duplicates = cells.len() - distinct.len(),
                "Column values are not unique"
            );
        }
        Ok(binary(unique))
    }

    fn name(&self) -> &str {
        "unique_column"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Table;
    use crate::test_helpers::{score_object, text_table};

    async fn unique_score(table: Table) -> f64 {
        score_object(&UniqueColumn::new("v"), "t/u.csv", vec![("t/u.csv", table)])
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_distinct_values() {
        assert_eq!(unique_score(text_table("v", &["A", "B", "C"])).await, 1.0);
    }

    #[tokio::test]
    async fn test_repeated_value() {
        assert_eq!(unique_score(text_table("v", &["A", "A", "B"])).await, 0.0);
    }

    #[tokio::test]
    async fn test_repeated_nulls() {
        let table = Table::builder()
            .string_column("v", vec![Some("A"), None, None])
            .build()
            .unwrap();
        assert_eq!(unique_score(table).await, 0.0);
    }

    #[tokio::test]
    async fn test_empty_column_is_unique() {
        assert_eq!(unique_score(text_table("v", &[])).await, 1.0);
    }
}
