//! Validation run result types.

use serde::{Deserialize, Serialize};

/// Metrics collected during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Number of rules scored
    pub rules_evaluated: usize,
    /// Provider retrievals performed by the run
    pub objects_retrieved: usize,
    /// Resolutions served from the object cache
    pub cache_hits: usize,
    /// Total execution time in milliseconds
    pub execution_time_ms: u64,
    /// When the run started (RFC 3339)
    pub timestamp: String,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self {
            rules_evaluated: 0,
            objects_retrieved: 0,
            cache_hits: 0,
            execution_time_ms: 0,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-object outcome of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectReport {
    pub object_key: String,
    /// Weighted quality, as computed (never zeroed by threshold failures)
    pub quality: f64,
    pub test_count: usize,
    pub total_weight: f64,
    /// SHA-256 of the table content
    pub fingerprint: String,
}

/// A rule that scored below its threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdFailure {
    pub object_key: String,
    pub function: String,
    pub parameters: serde_json::Value,
    pub score: f64,
    pub threshold: f64,
}

/// A quality tag that could not be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagFailure {
    pub object_key: String,
    pub tag: String,
    pub message: String,
}

/// Full report of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// The run's pass/fail signal: the mean object quality, or 0 when any
    /// rule missed its threshold
    pub overall_quality: f64,
    /// Mean object quality regardless of threshold failures
    pub computed_quality: f64,
    pub threshold_failed: bool,
    /// Objects in the order they were first referenced
    pub objects: Vec<ObjectReport>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub threshold_failures: Vec<ThresholdFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tag_failures: Vec<TagFailure>,
    pub metrics: RunMetrics,
}

impl RunReport {
    /// Looks up the report of one object.
    pub fn object(&self, object_key: &str) -> Option<&ObjectReport> {
        self.objects.iter().find(|o| o.object_key == object_key)
    }

    /// Quality of one object, if it was validated.
    pub fn quality_of(&self, object_key: &str) -> Option<f64> {
        self.object(object_key).map(|o| o.quality)
    }
}

/// The result of [`ValidationEngine::validate_objects`](super::ValidationEngine::validate_objects).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    /// Every object resolved and every rule was scored
    Completed(RunReport),
    /// An object could not be retrieved; nothing was scored or tagged
    Aborted { object_key: String, reason: String },
}

impl RunOutcome {
    /// Returns true if the run completed without threshold failures.
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(report) if !report.threshold_failed)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted { .. })
    }

    /// The reported overall quality; 0 for an aborted run.
    pub fn overall_quality(&self) -> f64 {
        match self {
            RunOutcome::Completed(report) => report.overall_quality,
            RunOutcome::Aborted { .. } => 0.0,
        }
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Aborted { .. } => None,
        }
    }

    /// Formats the outcome as JSON.
    pub fn to_json(&self) -> crate::prelude::Result<String> {
        use crate::formatters::{JsonFormatter, ReportFormatter};
        JsonFormatter::new().format(self)
    }

    /// Formats the outcome in a human-readable form.
    pub fn to_human(&self) -> crate::prelude::Result<String> {
        use crate::formatters::{HumanFormatter, ReportFormatter};
        HumanFormatter::new().format(self)
    }
}
