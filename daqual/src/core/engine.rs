//! The validation engine.

use super::{
    ObjectCache, ObjectReport, Rule, RunMetrics, RunOutcome, RunReport, TagFailure,
    ThresholdFailure,
};
use crate::logging::{truncate_field, LogConfig};
use crate::prelude::*;
use crate::provider::ObjectProvider;
use crate::scoring::ScoringContext;
use crate::{log_data_op, log_rule};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Metadata tag that receives each object's quality
    pub quality_tag: String,
    /// Keep retrieved tables across runs instead of re-fetching them
    pub retain_tables: bool,
    /// Write quality tags after scoring
    pub tag_results: bool,
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            quality_tag: "quality_score".to_string(),
            retain_tables: false,
            tag_results: true,
            log: LogConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_quality_tag(mut self, tag: impl Into<String>) -> Self {
        self.quality_tag = tag.into();
        self
    }

    pub fn with_retain_tables(mut self, retain: bool) -> Self {
        self.retain_tables = retain;
        self
    }

    pub fn with_tag_results(mut self, enabled: bool) -> Self {
        self.tag_results = enabled;
        self
    }

    pub fn with_log(mut self, log: LogConfig) -> Self {
        self.log = log;
        self
    }
}

/// Runs rule lists against objects supplied by an [`ObjectProvider`].
///
/// A run has three phases, strictly in sequence:
///
/// 1. **Resolution**: every object any rule reads is retrieved. The first
///    failure aborts the run with [`RunOutcome::Aborted`]; nothing is scored
///    and no tag is written.
/// 2. **Scoring**: each rule is scored in order and its weighted score is
///    added to its object's handle. Rules below their threshold are
///    recorded but do not stop the run.
/// 3. **Finalization**: each object's weighted quality is computed, then
///    written back as a metadata tag. Tag failures are recorded, never
///    fatal. The overall quality is the mean object quality, forced to 0 if
///    any rule missed its threshold.
///
/// # Examples
///
/// ```rust
/// use daqual::prelude::*;
/// use daqual::core::{EngineConfig, Rule, ValidationEngine};
/// use daqual::provider::InMemoryProvider;
/// use daqual::scoring::{NoBlanks, UniqueColumn};
/// use daqual::table::Table;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> daqual::prelude::Result<()> {
/// let accounts = Table::builder()
///     .string_column("Account Number", vec![Some("A-1"), Some("A-2")])
///     .build()?;
/// let provider = Arc::new(InMemoryProvider::new().with_table("daqual/accounts.csv", accounts));
///
/// let mut engine = ValidationEngine::new(provider, EngineConfig::default());
/// let outcome = engine
///     .validate_objects(&[
///         Rule::of("daqual/accounts.csv", UniqueColumn::new("Account Number")),
///         Rule::of("daqual/accounts.csv", NoBlanks::new("Account Number")),
///     ])
///     .await?;
///
/// assert_eq!(outcome.overall_quality(), 1.0);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ValidationEngine {
    cache: ObjectCache,
    config: EngineConfig,
}

impl ValidationEngine {
    pub fn new(provider: Arc<dyn ObjectProvider>, config: EngineConfig) -> Self {
        Self {
            cache: ObjectCache::new(provider),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The object cache as left by the last run.
    pub fn cache(&self) -> &ObjectCache {
        &self.cache
    }

    /// Validates objects against an ordered rule list.
    ///
    /// Returns `Ok(RunOutcome::Aborted)` when an object cannot be retrieved.
    /// Scoring failures (a missing column, an empty denominator, an object
    /// whose rules carry no weight) are returned as `Err` before any tag is
    /// written.
    #[instrument(skip(self, rules), fields(rules = rules.len(), provider = %self.cache.provider().description()))]
    pub async fn validate_objects(&mut self, rules: &[Rule]) -> Result<RunOutcome> {
        let start_time = Instant::now();
        let mut metrics = RunMetrics::new();
        self.cache.begin_run(self.config.retain_tables);
        info!(rules = rules.len(), "Starting validation run");

        if let Some(aborted) = self.resolve_all(rules).await {
            return Ok(aborted);
        }

        let mut subjects: Vec<&str> = Vec::new();
        let mut threshold_failures = Vec::new();
        for rule in rules {
            if let Some(failure) = self.score_rule(rule).await? {
                threshold_failures.push(failure);
            }
            if !subjects.contains(&rule.object_key()) {
                subjects.push(rule.object_key());
            }
        }

        let objects = self.finalize(&subjects)?;
        let tag_failures = self.write_tags(&objects).await;

        let computed_quality =
            objects.iter().map(|o| o.quality).sum::<f64>() / objects.len() as f64;
        let threshold_failed = !threshold_failures.is_empty();
        let overall_quality = if threshold_failed {
            0.0
        } else {
            computed_quality
        };

        let stats = self.cache.stats();
        metrics.rules_evaluated = rules.len();
        metrics.objects_retrieved = stats.retrievals;
        metrics.cache_hits = stats.hits;
        metrics.execution_time_ms = start_time.elapsed().as_millis() as u64;

        if self.config.log.log_metrics {
            info!(
                run.overall_quality = overall_quality,
                run.computed_quality = computed_quality,
                run.objects = objects.len(),
                run.threshold_failures = threshold_failures.len(),
                run.tag_failures = tag_failures.len(),
                run.execution_time_ms = metrics.execution_time_ms,
                "Validation run completed"
            );
        }

        Ok(RunOutcome::Completed(RunReport {
            overall_quality,
            computed_quality,
            threshold_failed,
            objects,
            threshold_failures,
            tag_failures,
            metrics,
        }))
    }

    /// Resolves every object the rules read, in rule order.
    #[instrument(skip_all)]
    async fn resolve_all(&mut self, rules: &[Rule]) -> Option<RunOutcome> {
        for rule in rules {
            for key in rule.required_objects() {
                if let Err(e) = self.cache.resolve(&key).await {
                    warn!(
                        object.key = %key,
                        error = %e,
                        "Could not resolve object, aborting run"
                    );
                    return Some(RunOutcome::Aborted {
                        object_key: key,
                        reason: e.to_string(),
                    });
                }
            }
        }
        log_data_op!(
            self.config.log,
            objects = self.cache.stats().entries,
            "All objects resolved"
        );
        None
    }

    /// Scores one rule into its object's handle.
    async fn score_rule(&mut self, rule: &Rule) -> Result<Option<ThresholdFailure>> {
        let key = rule.object_key();
        self.cache.handle_mut(key)?.record_test(rule.weight());

        let scorer = rule.scorer();
        let score = scorer
            .score(&ScoringContext::new(&self.cache, key))
            .await?;
        if !(0.0..=1.0).contains(&score) {
            return Err(DaqualError::Internal(format!(
                "scorer '{}' returned {score} for '{key}', outside [0, 1]",
                scorer.name()
            )));
        }
        log_rule!(
            self.config.log,
            object.key = %key,
            rule.function = scorer.name(),
            rule.weight = rule.weight(),
            score,
            "Rule scored"
        );

        let failure = if score < rule.threshold() {
            let parameters = scorer.parameters();
            warn!(
                object.key = %key,
                rule.function = scorer.name(),
                rule.parameters = %truncate_field(&parameters.to_string(), self.config.log.max_field_length),
                score,
                threshold = rule.threshold(),
                "Quality threshold failure"
            );
            Some(ThresholdFailure {
                object_key: key.to_string(),
                function: scorer.name().to_string(),
                parameters,
                score,
                threshold: rule.threshold(),
            })
        } else {
            None
        };

        self.cache
            .handle_mut(key)?
            .add_weighted_score(rule.weight() * score);
        Ok(failure)
    }

    /// Computes every object's quality; nothing is written yet.
    fn finalize(&self, subjects: &[&str]) -> Result<Vec<ObjectReport>> {
        if subjects.is_empty() {
            return Err(DaqualError::division("no objects were validated"));
        }
        subjects
            .iter()
            .map(|key| {
                let handle = self.cache.handle(key)?;
                let quality = handle.quality()?;
                info!(
                    object.key = %key,
                    quality,
                    tests = handle.test_count(),
                    total_weight = handle.total_weight(),
                    "Object quality"
                );
                Ok(ObjectReport {
                    object_key: key.to_string(),
                    quality,
                    test_count: handle.test_count(),
                    total_weight: handle.total_weight(),
                    fingerprint: handle.table().fingerprint()?,
                })
            })
            .collect()
    }

    /// Writes each object's quality tag; failures are collected, not raised.
    async fn write_tags(&self, objects: &[ObjectReport]) -> Vec<TagFailure> {
        let mut failures = Vec::new();
        if !self.config.tag_results {
            return failures;
        }
        let provider = self.cache.provider();
        let tag = &self.config.quality_tag;
        for object in objects {
            match provider
                .tag(&object.object_key, tag, &object.quality.to_string())
                .await
            {
                Ok(()) => log_data_op!(
                    self.config.log,
                    object.key = %object.object_key,
                    tag = %tag,
                    "Quality tag written"
                ),
                Err(e) => {
                    warn!(
                        object.key = %object.object_key,
                        tag = %tag,
                        error = %e,
                        "Could not write quality tag"
                    );
                    failures.push(TagFailure {
                        object_key: object.object_key.clone(),
                        tag: tag.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;
    use crate::scoring::{ColumnCount, NoBlanks, One, UniqueColumn};
    use crate::test_helpers::{text_table, wide_table};

    const ISO: &str = "daqual/iso-currencies.csv";
    const GROUPS: &str = "daqual/groups.csv";

    fn provider() -> Arc<InMemoryProvider> {
        Arc::new(
            InMemoryProvider::new()
                .with_table(ISO, wide_table(8))
                .with_table(GROUPS, text_table("groups", &["Group1", "Group1", "Group2"])),
        )
    }

    fn engine(provider: Arc<InMemoryProvider>) -> ValidationEngine {
        ValidationEngine::new(provider, EngineConfig::default())
    }

    #[tokio::test]
    async fn test_weighted_mean_quality() {
        let provider = provider();
        let mut engine = engine(provider.clone());
        let rules = vec![
            Rule::of(ISO, ColumnCount::new(8)),
            Rule::of(ISO, ColumnCount::new(16)).with_weight(3.0).unwrap(),
            Rule::of(GROUPS, UniqueColumn::new("groups")),
            Rule::of(GROUPS, NoBlanks::new("groups")),
        ];

        let outcome = engine.validate_objects(&rules).await.unwrap();
        let report = outcome.report().unwrap();

        // ISO: (1*1.0 + 3*0.5) / 4; GROUPS: (0 + 1) / 2
        assert_eq!(report.quality_of(ISO), Some(0.625));
        assert_eq!(report.quality_of(GROUPS), Some(0.5));
        assert!((report.overall_quality - 0.5625).abs() < 1e-12);
        assert_eq!(report.objects[0].object_key, ISO);
        assert_eq!(report.objects[0].test_count, 2);
        assert_eq!(report.objects[0].total_weight, 4.0);
        assert!(!report.threshold_failed);

        assert_eq!(
            provider.tag_value(ISO, "quality_score").await,
            Some("0.625".to_string())
        );
        assert_eq!(provider.tag_writes(), 2);
    }

    #[tokio::test]
    async fn test_missing_object_aborts_without_tags() {
        let provider = provider();
        let mut engine = engine(provider.clone());
        let rules = vec![
            Rule::of(ISO, One),
            Rule::of("daqual/missing.csv", One),
        ];

        let outcome = engine.validate_objects(&rules).await.unwrap();
        assert!(matches!(
            &outcome,
            RunOutcome::Aborted { object_key, .. } if object_key == "daqual/missing.csv"
        ));
        assert_eq!(outcome.overall_quality(), 0.0);
        assert_eq!(provider.tag_writes(), 0);
    }

    #[tokio::test]
    async fn test_threshold_failure_zeroes_overall_only() {
        let mut engine = engine(provider());
        let rules = vec![
            Rule::of(GROUPS, UniqueColumn::new("groups"))
                .with_threshold(1.0)
                .unwrap(),
            Rule::of(GROUPS, One),
        ];

        let report = engine
            .validate_objects(&rules)
            .await
            .unwrap()
            .report()
            .cloned()
            .unwrap();
        assert!(report.threshold_failed);
        assert_eq!(report.overall_quality, 0.0);
        assert_eq!(report.computed_quality, 0.5);
        assert_eq!(report.quality_of(GROUPS), Some(0.5));
        assert_eq!(report.threshold_failures.len(), 1);
        assert_eq!(report.threshold_failures[0].function, "unique_column");
        assert_eq!(
            report.threshold_failures[0].parameters,
            serde_json::json!({"column": "groups"})
        );
    }

    #[tokio::test]
    async fn test_zero_weight_is_division_error() {
        let provider = provider();
        let mut engine = engine(provider.clone());
        let rules = vec![Rule::of(ISO, One).with_weight(0.0).unwrap()];

        let result = engine.validate_objects(&rules).await;
        assert!(matches!(result, Err(DaqualError::Division { .. })));
        assert_eq!(provider.tag_writes(), 0);
    }

    #[tokio::test]
    async fn test_empty_rule_list() {
        let mut engine = engine(provider());
        assert!(matches!(
            engine.validate_objects(&[]).await,
            Err(DaqualError::Division { .. })
        ));
    }

    #[tokio::test]
    async fn test_tag_failure_is_not_fatal() {
        let provider = Arc::new(
            InMemoryProvider::new()
                .with_table(GROUPS, text_table("groups", &["a"]))
                .with_failing_tags(GROUPS),
        );
        let mut engine = engine(provider);
        let outcome = engine
            .validate_objects(&[Rule::of(GROUPS, One)])
            .await
            .unwrap();
        let report = outcome.report().unwrap();
        assert_eq!(report.overall_quality, 1.0);
        assert_eq!(report.tag_failures.len(), 1);
        assert_eq!(report.tag_failures[0].tag, "quality_score");
    }

    #[tokio::test]
    async fn test_tagging_can_be_disabled() {
        let provider = provider();
        let mut engine = ValidationEngine::new(
            provider.clone(),
            EngineConfig::default().with_tag_results(false),
        );
        engine.validate_objects(&[Rule::of(ISO, One)]).await.unwrap();
        assert_eq!(provider.tag_writes(), 0);
    }

    #[tokio::test]
    async fn test_custom_quality_tag() {
        let provider = provider();
        let mut engine = ValidationEngine::new(
            provider.clone(),
            EngineConfig::default().with_quality_tag("dq"),
        );
        engine.validate_objects(&[Rule::of(ISO, One)]).await.unwrap();
        assert_eq!(provider.tag_value(ISO, "dq").await, Some("1".to_string()));
    }

    #[tokio::test]
    async fn test_scoring_error_aborts_before_tags() {
        let provider = provider();
        let mut engine = engine(provider.clone());
        let rules = vec![Rule::of(ISO, One), Rule::of(GROUPS, NoBlanks::new("nope"))];
        assert!(matches!(
            engine.validate_objects(&rules).await,
            Err(DaqualError::ColumnNotFound { .. })
        ));
        assert_eq!(provider.tag_writes(), 0);
    }

    #[tokio::test]
    async fn test_metrics() {
        let mut engine = engine(provider());
        let rules = vec![Rule::of(ISO, One), Rule::of(ISO, One), Rule::of(GROUPS, One)];
        let outcome = engine.validate_objects(&rules).await.unwrap();
        let metrics = &outcome.report().unwrap().metrics;
        assert_eq!(metrics.rules_evaluated, 3);
        assert_eq!(metrics.objects_retrieved, 2);
        assert_eq!(metrics.cache_hits, 1);
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"retain_tables": true}"#).unwrap();
        assert!(config.retain_tables);
        assert!(config.tag_results);
        assert_eq!(config.quality_tag, "quality_score");
    }

    #[tokio::test]
    async fn test_table_fingerprint_reported() {
        let mut engine = engine(provider());
        let outcome = engine.validate_objects(&[Rule::of(ISO, One)]).await.unwrap();
        let expected = wide_table(8).fingerprint().unwrap();
        assert_eq!(outcome.report().unwrap().objects[0].fingerprint, expected);
    }
}
