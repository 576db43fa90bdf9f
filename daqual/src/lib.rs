//! # daqual - Weighted Data Quality Scoring
//!
//! daqual scores the quality of tabular objects held in an object store. A
//! run applies a list of rules, each naming an object, a scoring function,
//! a weight and a minimum acceptable score. Every object receives a
//! weighted quality in `[0, 1]` that is written back onto it as a metadata
//! tag, and the run reports the mean quality over all validated objects.
//!
//! ## Quick Start
//!
//! ```rust
//! use daqual::prelude::*;
//! use daqual::core::{EngineConfig, RuleSet, ValidationEngine};
//! use daqual::provider::InMemoryProvider;
//! use daqual::scoring::ScorerRegistry;
//! use std::sync::Arc;
//!
//! # async fn example() -> daqual::error::Result<()> {
//! let currencies = Table::builder()
//!     .string_column("Alphabetic Code", vec![Some("EUR"), Some("USD"), None])
//!     .build()?;
//! let provider = Arc::new(
//!     InMemoryProvider::new().with_table("daqual/iso-currencies.csv", currencies),
//! );
//!
//! let rules = RuleSet::from_json(r#"[
//!     ["daqual/iso-currencies.csv", "column_count", {"expected_n": 1}, 1, 0],
//!     ["daqual/iso-currencies.csv", "no_blanks", {"column": "Alphabetic Code"}, 1, 0]
//! ]"#)?
//! .build(&ScorerRegistry::with_builtins())?;
//!
//! let mut engine = ValidationEngine::new(provider.clone(), EngineConfig::default());
//! let outcome = engine.validate_objects(&rules).await?;
//!
//! assert_eq!(outcome.overall_quality(), 0.5);
//! assert_eq!(
//!     provider.tag_value("daqual/iso-currencies.csv", "quality_score").await,
//!     Some("0.5".to_string())
//! );
//! println!("{}", outcome.to_human()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Runs
//!
//! [`ValidationEngine::validate_objects`](core::ValidationEngine::validate_objects)
//! works in three phases:
//!
//! 1. Every object a rule references (its subject plus any master or
//!    comparison object) is retrieved once. A retrieval failure aborts the
//!    run before anything is scored or tagged.
//! 2. Every rule is scored in order. A score below the rule's threshold
//!    forces the run's overall quality to 0 without changing the
//!    per-object qualities.
//! 3. Each object is tagged with its weighted quality. A failed tag write
//!    is reported but does not fail the run.
//!
//! ## Architecture
//!
//! - **`core`**: the object cache, rules, the engine and run results
//! - **`scoring`**: the scoring library and the [`ScorerRegistry`](scoring::ScorerRegistry)
//! - **`provider`**: the [`ObjectProvider`](provider::ObjectProvider) seam to storage
//! - **`table`**: the Arrow-backed [`Table`](table::Table)
//! - **`formatters`**: JSON and console rendering of run outcomes
//! - **`logging`**: `tracing` configuration

pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod provider;
pub mod scoring;
pub mod security;
pub mod table;

#[cfg(test)]
pub(crate) mod test_helpers;
