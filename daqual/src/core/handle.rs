//! A loaded object together with its scoring state for the current run.

use crate::prelude::*;
use crate::table::Table;
use std::sync::Arc;

/// In-memory handle to one retrieved object plus its accumulated scores.
///
/// Handles are created by the [`ObjectCache`](super::ObjectCache) with
/// zeroed counters. Only the engine mutates them, and only while a run is
/// in progress.
#[derive(Debug, Clone)]
pub struct TableHandle {
    object_key: String,
    table: Arc<Table>,
    cumulative_score: f64,
    test_count: usize,
    total_weight: f64,
}

impl TableHandle {
    pub fn new(object_key: impl Into<String>, table: Table) -> Self {
        Self {
            object_key: object_key.into(),
            table: Arc::new(table),
            cumulative_score: 0.0,
            test_count: 0,
            total_weight: 0.0,
        }
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn cumulative_score(&self) -> f64 {
        self.cumulative_score
    }

    pub fn test_count(&self) -> usize {
        self.test_count
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Counts one more rule against this object.
    pub(crate) fn record_test(&mut self, weight: f64) {
        self.test_count += 1;
        self.total_weight += weight;
    }

    /// Adds a weighted score to the running total.
    pub(crate) fn add_weighted_score(&mut self, weighted: f64) {
        self.cumulative_score += weighted;
    }

    /// Zeroes the scoring state, keeping the table.
    pub(crate) fn reset(&mut self) {
        self.cumulative_score = 0.0;
        self.test_count = 0;
        self.total_weight = 0.0;
    }

    /// Weighted quality: cumulative score over total weight.
    pub fn quality(&self) -> Result<f64> {
        if self.total_weight == 0.0 {
            return Err(DaqualError::division(format!(
                "total weight of '{}' is zero",
                self.object_key
            )));
        }
        Ok(self.cumulative_score / self.total_weight)
    }
}
