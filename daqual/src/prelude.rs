//! Prelude for commonly used types and traits in daqual.

pub use crate::core::{EngineConfig, Rule, RuleSet, RunOutcome, ValidationEngine};
pub use crate::error::{DaqualError, ErrorContext, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::provider::ObjectProvider;
pub use crate::scoring::Scorer;
pub use crate::table::Table;
