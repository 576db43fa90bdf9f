//! Referential checks of a column against a master table.
//!
//! Both scorers compare cell identities ([`CellKey`](crate::table::CellKey)),
//! so an integer `1` in one table matches a float `1.0` in the other.
//! Missing cells never count as a reference into the master data.

use super::{Scorer, ScoringContext};
use crate::prelude::*;
use crate::table::CellKey;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{instrument, warn};

/// A subject column paired with a column of a master object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MasterColumn {
    pub column: String,
    pub master: String,
    pub master_column: String,
}

impl MasterColumn {
    pub fn new(
        column: impl Into<String>,
        master: impl Into<String>,
        master_column: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            master: master.into(),
            master_column: master_column.into(),
        }
    }

    fn master_keys(&self, ctx: &ScoringContext<'_>) -> Result<HashSet<CellKey>> {
        Ok(ctx
            .cells_of(&self.master, &self.master_column)?
            .iter()
            .filter(|c| !c.is_null())
            .map(|c| c.key())
            .collect())
    }
}

/// Fraction of the subject column's cells that appear in the master column.
///
/// Every cell counts individually, duplicates included. An empty subject
/// column has no defined score and fails with a division error.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{ColumnValidValues, Scorer};
///
/// // Do all balances reference a known account?
/// let scorer = ColumnValidValues::new("account", "daqual/accounts.csv", "Account Number");
/// assert_eq!(scorer.dependencies(), vec!["daqual/accounts.csv".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnValidValues {
    target: MasterColumn,
}

impl ColumnValidValues {
    pub fn new(
        column: impl Into<String>,
        master: impl Into<String>,
        master_column: impl Into<String>,
    ) -> Self {
        Self {
            target: MasterColumn::new(column, master, master_column),
        }
    }
}

#[async_trait]
impl Scorer for ColumnValidValues {
    #[instrument(skip(self, ctx), fields(object = %ctx.object_key(), master = %self.target.master))]
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let cells = ctx.cells(&self.target.column)?;
        if cells.is_empty() {
            return Err(DaqualError::division(format!(
                "column '{}' of '{}' is empty",
                self.target.column,
                ctx.object_key()
            )));
        }
        let master = self.target.master_keys(ctx)?;
        let valid = cells
            .iter()
            .filter(|c| !c.is_null() && master.contains(&c.key()))
            .count();
        if valid < cells.len() {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.target.column,
                master = %self.target.master,
                master_column = %self.target.master_column,
                invalid = cells.len() - valid,
                "Unexpected values not present in master data"
            );
        }
        Ok(valid as f64 / cells.len() as f64)
    }

    fn name(&self) -> &str {
        "column_valid_values"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.target.master.clone()]
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Fraction of the distinct master values used at least once by the subject.
///
/// Missing master cells are not part of the distinct set; a master column
/// with no values fails with a division error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EveryMasterValueUsed {
    target: MasterColumn,
}

impl EveryMasterValueUsed {
    pub fn new(
        column: impl Into<String>,
        master: impl Into<String>,
        master_column: impl Into<String>,
    ) -> Self {
        Self {
            target: MasterColumn::new(column, master, master_column),
        }
    }
}

#[async_trait]
impl Scorer for EveryMasterValueUsed {
    #[instrument(skip(self, ctx), fields(object = %ctx.object_key(), master = %self.target.master))]
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let master = self.target.master_keys(ctx)?;
        if master.is_empty() {
            return Err(DaqualError::division(format!(
                "master column '{}' of '{}' has no values",
                self.target.master_column, self.target.master
            )));
        }
        let used: HashSet<CellKey> = ctx
            .cells(&self.target.column)?
            .iter()
            .map(|c| c.key())
            .collect();
        let covered = master.iter().filter(|k| used.contains(k)).count();
        if covered < master.len() {
            warn!(
                object.key = %ctx.object_key(),
                column = %self.target.column,
                master = %self.target.master,
                unused = master.len() - covered,
                "Master values never used"
            );
        }
        Ok(covered as f64 / master.len() as f64)
    }

    fn name(&self) -> &str {
        "every_master_value_used"
    }

    fn dependencies(&self) -> Vec<String> {
        vec![self.target.master.clone()]
    }

    fn parameters(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
