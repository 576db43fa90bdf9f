//! Rendering of run outcomes as JSON or console text.
//!
//! # Examples
//!
//! ```rust
//! use daqual::core::RunOutcome;
//! use daqual::formatters::{HumanFormatter, ReportFormatter};
//!
//! let outcome = RunOutcome::Aborted {
//!     object_key: "daqual/accounts.csv".to_string(),
//!     reason: "object not found".to_string(),
//! };
//! let text = HumanFormatter::new().format(&outcome).unwrap();
//! assert!(text.contains("ABORTED"));
//! ```

use crate::core::{RunOutcome, RunReport};
use crate::prelude::*;
use std::fmt::Write;

/// Options controlling how much of a run outcome is rendered.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include run metrics
    pub include_metrics: bool,
    /// Include the per-object table
    pub include_objects: bool,
    /// Include threshold and tag failures
    pub include_failures: bool,
    /// Maximum number of failures to list of each kind (`None` for all)
    pub max_failures: Option<usize>,
    /// Whether to use ANSI colours (human formatter)
    pub use_colors: bool,
    /// Whether to include the run timestamp
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_metrics: true,
            include_objects: true,
            include_failures: true,
            max_failures: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Only the overall verdict and quality.
    pub fn minimal() -> Self {
        Self {
            include_metrics: false,
            include_objects: false,
            include_failures: false,
            max_failures: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Creates a configuration suitable for CI logs.
    pub fn ci() -> Self {
        Self {
            include_metrics: true,
            include_objects: true,
            include_failures: true,
            max_failures: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_metrics(mut self, include: bool) -> Self {
        self.include_metrics = include;
        self
    }

    pub fn with_objects(mut self, include: bool) -> Self {
        self.include_objects = include;
        self
    }

    pub fn with_max_failures(mut self, max: Option<usize>) -> Self {
        self.max_failures = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn limit(&self, len: usize) -> usize {
        self.max_failures.map_or(len, |max| max.min(len))
    }
}

/// Converts a [`RunOutcome`] into a textual report.
pub trait ReportFormatter {
    fn format(&self, outcome: &RunOutcome) -> Result<String>;

    /// Formats with explicit options; the default ignores them.
    fn format_with_config(&self, outcome: &RunOutcome, _config: &FormatterConfig) -> Result<String> {
        self.format(outcome)
    }
}

/// Serializes outcomes as JSON, dropping sections the config excludes.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
            pretty: true,
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, outcome: &RunOutcome) -> Result<String> {
        self.format_with_config(outcome, &self.config)
    }

    fn format_with_config(&self, outcome: &RunOutcome, config: &FormatterConfig) -> Result<String> {
        let mut value = serde_json::to_value(outcome).context("Failed to serialize run outcome")?;
        if let Some(fields) = value.as_object_mut() {
            if !config.include_metrics {
                fields.remove("metrics");
            }
            if !config.include_objects {
                fields.remove("objects");
            }
            for key in ["threshold_failures", "tag_failures"] {
                if !config.include_failures {
                    fields.remove(key);
                } else if let Some(list) = fields.get_mut(key).and_then(|v| v.as_array_mut()) {
                    list.truncate(config.limit(list.len()));
                }
            }
        }
        let json = if self.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        json.context("Failed to render run outcome as JSON")
    }
}

/// Console-friendly summary of an outcome.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self {
            config: FormatterConfig::default(),
        }
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, outcome: &RunOutcome) -> Result<String> {
        self.format_with_config(outcome, &self.config)
    }

    fn format_with_config(&self, outcome: &RunOutcome, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        write_outcome(&mut output, outcome, config)
            .map_err(|e| DaqualError::Internal(format!("Failed to format run outcome: {e}")))?;
        Ok(output)
    }
}

fn paint(text: &str, color: &str, config: &FormatterConfig) -> String {
    if config.use_colors {
        format!("\x1b[{color}m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

fn write_outcome(
    out: &mut String,
    outcome: &RunOutcome,
    config: &FormatterConfig,
) -> std::fmt::Result {
    writeln!(out)?;
    let report = match outcome {
        RunOutcome::Aborted { object_key, reason } => {
            writeln!(out, "⛔ {}", paint("Validation ABORTED", "31", config))?;
            writeln!(out)?;
            writeln!(out, "Object: {object_key}")?;
            writeln!(out, "Reason: {reason}")?;
            return writeln!(out);
        }
        RunOutcome::Completed(report) => report,
    };

    if report.threshold_failed {
        writeln!(out, "❌ {}", paint("Validation FAILED", "31", config))?;
    } else {
        writeln!(out, "✅ {}", paint("Validation PASSED", "32", config))?;
    }
    writeln!(out)?;
    writeln!(out, "Overall quality: {:.3}", report.overall_quality)?;
    if report.threshold_failed {
        writeln!(out, "Computed quality: {:.3}", report.computed_quality)?;
    }
    if config.include_timestamps {
        writeln!(out, "Timestamp: {}", report.metrics.timestamp)?;
    }

    if config.include_objects {
        write_objects(out, report)?;
    }
    if config.include_failures {
        write_failures(out, report, config)?;
    }

    if config.include_metrics {
        let m = &report.metrics;
        writeln!(out)?;
        writeln!(out, "📊 Run Metrics:")?;
        writeln!(out, "   Rules Evaluated: {}", m.rules_evaluated)?;
        writeln!(out, "   Objects Retrieved: {}", m.objects_retrieved)?;
        writeln!(out, "   Cache Hits: {}", m.cache_hits)?;
        writeln!(out, "   Execution Time: {}ms", m.execution_time_ms)?;
    }
    writeln!(out)
}

fn write_objects(out: &mut String, report: &RunReport) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "📦 Objects:")?;
    for object in &report.objects {
        writeln!(
            out,
            "   {}: quality {:.3} ({} tests, weight {})",
            object.object_key, object.quality, object.test_count, object.total_weight
        )?;
    }
    Ok(())
}

fn write_failures(out: &mut String, report: &RunReport, config: &FormatterConfig) -> std::fmt::Result {
    let shown = config.limit(report.threshold_failures.len());
    if !report.threshold_failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "⚠️  Threshold Failures:")?;
        for (i, failure) in report.threshold_failures[..shown].iter().enumerate() {
            writeln!(
                out,
                "   #{} {} on '{}': score {:.3} < threshold {:.3}",
                i + 1,
                paint(&failure.function, "33", config),
                failure.object_key,
                failure.score,
                failure.threshold
            )?;
            if !failure.parameters.is_null() {
                writeln!(out, "      Parameters: {}", failure.parameters)?;
            }
        }
        if report.threshold_failures.len() > shown {
            writeln!(
                out,
                "   ... and {} more",
                report.threshold_failures.len() - shown
            )?;
        }
    }

    let shown = config.limit(report.tag_failures.len());
    if !report.tag_failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "🏷️  Tag Failures:")?;
        for failure in &report.tag_failures[..shown] {
            writeln!(
                out,
                "   {} on '{}': {}",
                failure.tag, failure.object_key, failure.message
            )?;
        }
        if report.tag_failures.len() > shown {
            writeln!(out, "   ... and {} more", report.tag_failures.len() - shown)?;
        }
    }
    Ok(())
}
