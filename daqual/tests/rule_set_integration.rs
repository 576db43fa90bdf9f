//! Rule sets loaded from JSON and resolved through the scorer registry.

use async_trait::async_trait;
use daqual::core::{EngineConfig, RuleSet, ValidationEngine};
use daqual::error::{DaqualError, Result};
use daqual::provider::InMemoryProvider;
use daqual::scoring::{Scorer, ScorerRegistry, ScoringContext};
use daqual::table::Table;
use serde::Deserialize;
use std::sync::Arc;

const CURRENCIES: &str = "daqual/iso-currencies.csv";
const ACCOUNTS: &str = "daqual/accounts.csv";

const RULES: &str = r#"[
    ["daqual/iso-currencies.csv", "column_count", {"expected_n": 2}, 1, 0],
    ["daqual/iso-currencies.csv", "match", {"column": "Alphabetic Code", "match": "[A-Z]{3}"}, 1, 0],
    ["daqual/iso-currencies.csv", "int", {"column": "Numeric Code"}, 1, 0],
    ["daqual/iso-currencies.csv", "row_count", {"expected_rows": 8}, 2, 0],
    {"object": "daqual/accounts.csv", "function": "date", "parameters": {"column": "Opened"}},
    {"object": "daqual/accounts.csv", "function": "1"}
]"#;

fn provider() -> InMemoryProvider {
    let currencies = Table::builder()
        .string_column(
            "Alphabetic Code",
            vec![Some("EUR"), Some("USD"), Some("GBP"), Some("eur")],
        )
        .int_column("Numeric Code", vec![Some(978), Some(840), Some(826), Some(978)])
        .build()
        .unwrap();
    let accounts = Table::builder()
        .int_column("Account Number", vec![Some(1), Some(2)])
        .string_column("Opened", vec![Some("2019-03-01"), Some("04/03/2019")])
        .build()
        .unwrap();
    InMemoryProvider::new()
        .with_table(CURRENCIES, currencies)
        .with_table(ACCOUNTS, accounts)
}

#[tokio::test]
async fn test_json_rules_end_to_end() {
    let rules = RuleSet::from_json(RULES)
        .unwrap()
        .build(&ScorerRegistry::with_builtins())
        .unwrap();
    assert_eq!(rules.len(), 6);

    let provider = Arc::new(provider());
    let mut engine = ValidationEngine::new(provider.clone(), EngineConfig::default());
    let outcome = engine.validate_objects(&rules).await.unwrap();
    let report = outcome.report().unwrap();

    // (1 + 0.75 + 1 + 2 * 0.5) / 5
    assert_eq!(report.quality_of(CURRENCIES), Some(0.75));
    assert_eq!(report.objects[0].test_count, 4);
    assert_eq!(report.objects[0].total_weight, 5.0);
    assert_eq!(report.quality_of(ACCOUNTS), Some(1.0));
    assert_eq!(outcome.overall_quality(), 0.875);
    assert_eq!(
        provider.tag_value(CURRENCIES, "quality_score").await,
        Some("0.75".to_string())
    );
}

#[test]
fn test_unknown_function_is_rejected() {
    let set = RuleSet::from_json(r#"[["daqual/a.csv", "no_such_check", {}, 1, 0]]"#).unwrap();
    let err = set.build(&ScorerRegistry::with_builtins()).unwrap_err();
    assert!(matches!(err, DaqualError::UnknownScorer(ref name) if name == "no_such_check"), "{err}");
}

#[test]
fn test_invalid_rule_values_are_rejected() {
    let registry = ScorerRegistry::with_builtins();

    let negative_weight = RuleSet::from_json(r#"[["daqual/a.csv", "one", {}, -1, 0]]"#).unwrap();
    assert!(matches!(
        negative_weight.build(&registry),
        Err(DaqualError::Format(_))
    ));

    let bad_threshold = RuleSet::from_json(r#"[["daqual/a.csv", "one", {}, 1, 2]]"#).unwrap();
    assert!(matches!(
        bad_threshold.build(&registry),
        Err(DaqualError::Format(_))
    ));

    let bad_regex = RuleSet::from_json(
        r#"[["daqual/a.csv", "match", {"column": "x", "match": "[unclosed"}, 1, 0]]"#,
    )
    .unwrap();
    assert!(matches!(
        bad_regex.build(&registry),
        Err(DaqualError::Format(_))
    ));
}

/// Scores 1 when the object has at least `min_rows` rows.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MinRows {
    min_rows: usize,
}

#[async_trait]
impl Scorer for MinRows {
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        Ok(if ctx.table()?.num_rows() >= self.min_rows {
            1.0
        } else {
            0.0
        })
    }

    fn name(&self) -> &str {
        "min_rows"
    }
}

#[tokio::test]
async fn test_custom_scorer_registration() {
    let mut registry = ScorerRegistry::with_builtins();
    registry.register("min_rows", |p: MinRows| Ok(p));
    registry.register_alias("at_least", "min_rows").unwrap();

    let rules = RuleSet::from_json(
        r#"[
            ["daqual/accounts.csv", "min_rows", {"min_rows": 2}, 1, 0],
            ["daqual/accounts.csv", "at_least", {"min_rows": 3}, 1, 0]
        ]"#,
    )
    .unwrap()
    .build(&registry)
    .unwrap();

    let mut engine = ValidationEngine::new(Arc::new(provider()), EngineConfig::default());
    let outcome = engine.validate_objects(&rules).await.unwrap();
    assert_eq!(outcome.overall_quality(), 0.5);
}
