//! Mandatory-column completeness.

use super::{binary, Scorer, ScoringContext};
use crate::prelude::*;
use crate::table::ColumnKind;
use arrow::array::Array;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Scores 1 when a column has no missing cells, 0 otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoBlanks {
    column: String,
}

impl NoBlanks {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
        }
    }
}

#[async_trait]
impl Scorer for NoBlanks {
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let table = ctx.table()?;
        let array = table
            .column(&self.column)
            .ok_or_else(|| DaqualError::column_not_found(ctx.object_key(), &self.column))?;
        // NaN reads as a missing cell, so float columns need a cell pass.
        let blanks = if table.column_kind(&self.column) == Some(ColumnKind::Float) {
            ctx.cells(&self.column)?
                .iter()
                .filter(|cell| cell.is_null())
                .count()
        } else {
            array.logical_null_count()
        };
        if blanks > 0 {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.column,
                blanks,
                "Mandatory column has blank cells"
            );
        }
        Ok(binary(blanks == 0))
    }

    fn name(&self) -> &str {
        "no_blanks"
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
