//! Test helpers for scorers that read resolved objects.

use crate::core::ObjectCache;
use crate::prelude::*;
use crate::provider::InMemoryProvider;
use crate::scoring::{Scorer, ScoringContext};
use crate::table::Table;
use std::sync::Arc;

/// Resolves `subject` and the scorer's dependencies from `tables`, then scores.
pub async fn score_object(
    scorer: &dyn Scorer,
    subject: &str,
    tables: Vec<(&str, Table)>,
) -> Result<f64> {
    let provider = tables
        .into_iter()
        .fold(InMemoryProvider::new(), |p, (key, table)| {
            p.with_table(key, table)
        });
    let mut cache = ObjectCache::new(Arc::new(provider));
    cache.resolve(subject).await?;
    for dependency in scorer.dependencies() {
        cache.resolve(&dependency).await?;
    }
    scorer.score(&ScoringContext::new(&cache, subject)).await
}

/// A single-column text table.
pub fn text_table(column: &str, values: &[&str]) -> Table {
    Table::builder()
        .string_column(column, values.iter().map(|v| Some(*v)).collect())
        .build()
        .unwrap()
}

/// A single-column float table.
pub fn float_table(column: &str, values: Vec<Option<f64>>) -> Table {
    Table::builder().float_column(column, values).build().unwrap()
}

/// A table with `n` integer columns of three rows each.
pub fn wide_table(n: usize) -> Table {
    (0..n)
        .fold(Table::builder(), |b, i| {
            b.int_column(format!("col_{i}"), vec![Some(1), Some(2), Some(3)])
        })
        .build()
        .unwrap()
}
