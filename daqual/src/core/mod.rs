//! Core validation types.
//!
//! - **[`ObjectCache`]** resolves object keys through an
//!   [`ObjectProvider`](crate::provider::ObjectProvider) at most once per key
//!   and owns one [`TableHandle`] per object.
//! - **[`Rule`]** pairs a scorer with an object, a weight and a threshold;
//!   [`RuleSpec`] and [`RuleSet`] are its serializable forms.
//! - **[`ValidationEngine`]** runs a rule list: it resolves every referenced
//!   object, scores every rule, aggregates weighted qualities and tags each
//!   object with its quality.
//!
//! ## Example
//!
//! ```rust
//! use daqual::core::{EngineConfig, Rule, ValidationEngine};
//! use daqual::provider::InMemoryProvider;
//! use daqual::scoring::{NoBlanks, UniqueColumn};
//! use daqual::table::Table;
//! use std::sync::Arc;
//!
//! # async fn example() -> daqual::error::Result<()> {
//! let table = Table::builder()
//!     .string_column("code", vec![Some("EUR"), Some("USD"), Some("USD")])
//!     .build()?;
//! let provider = Arc::new(InMemoryProvider::new().with_table("daqual/codes.csv", table));
//!
//! let mut engine = ValidationEngine::new(provider.clone(), EngineConfig::default());
//! let outcome = engine
//!     .validate_objects(&[
//!         Rule::of("daqual/codes.csv", NoBlanks::new("code")),
//!         Rule::of("daqual/codes.csv", UniqueColumn::new("code")),
//!     ])
//!     .await?;
//!
//! assert_eq!(outcome.overall_quality(), 0.5);
//! # Ok(())
//! # }
//! ```

mod cache;
mod engine;
mod handle;
mod result;
mod rule;

pub use cache::{CacheStats, ObjectCache};
pub use engine::{EngineConfig, ValidationEngine};
pub use handle::TableHandle;
pub use result::{ObjectReport, RunMetrics, RunOutcome, RunReport, TagFailure, ThresholdFailure};
pub use rule::{Rule, RuleSet, RuleSpec};
