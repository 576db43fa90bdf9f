//! The constant scorer.

use super::{Scorer, ScoringContext};
use crate::prelude::*;
use async_trait::async_trait;

/// Always scores 1.
///
/// Useful to make a run resolve an object (so a missing file aborts the
/// run) without asserting anything about its content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct One;

#[async_trait]
impl Scorer for One {
    async fn score(&self, _ctx: &ScoringContext<'_>) -> Result<f64> {
        Ok(1.0)
    }

    fn name(&self) -> &str {
        "one"
    }
}
