//! Property-based tests for scoring and quality aggregation.
//!
//! Runs are executed against an in-memory provider; each property builds
//! its own tables and rules from generated inputs and checks the engine's
//! output against an independently computed expectation.

use daqual::core::{EngineConfig, Rule, ValidationEngine};
use daqual::provider::InMemoryProvider;
use daqual::scoring::{ColumnCount, NoBlanks, One, RowCount};
use daqual::table::Table;
use proptest::prelude::*;
use std::sync::Arc;

fn wide_table(columns: usize) -> Table {
    (0..columns)
        .fold(Table::builder(), |b, i| {
            b.int_column(format!("c{i}"), vec![Some(1), Some(2)])
        })
        .build()
        .unwrap()
}

fn expected_overage(actual: usize, expected: usize) -> f64 {
    let ratio = actual as f64 / expected as f64;
    if ratio <= 1.0 {
        ratio
    } else if ratio <= 2.0 {
        2.0 - ratio
    } else {
        0.0
    }
}

fn run_single(table: Table, rules: Vec<Rule>) -> f64 {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async {
        let provider = Arc::new(InMemoryProvider::new().with_table("t/subject.csv", table));
        let mut engine = ValidationEngine::new(provider, EngineConfig::default());
        engine.validate_objects(&rules).await.unwrap().overall_quality()
    })
}

proptest! {
    #[test]
    fn prop_column_count_follows_overage_curve(actual in 1usize..24, expected in 1usize..12) {
        let quality = run_single(
            wide_table(actual),
            vec![Rule::of("t/subject.csv", ColumnCount::new(expected))],
        );
        prop_assert!((0.0..=1.0).contains(&quality));
        prop_assert!((quality - expected_overage(actual, expected)).abs() < 1e-12);
    }

    #[test]
    fn prop_row_count_peaks_at_expected(expected in 1usize..50) {
        let rows: Vec<Option<i64>> = (0..expected as i64).map(Some).collect();
        let table = Table::builder().int_column("id", rows).build().unwrap();
        let quality = run_single(table, vec![Rule::of("t/subject.csv", RowCount::exact(expected))]);
        prop_assert_eq!(quality, 1.0);
    }

    #[test]
    fn prop_quality_is_weighted_mean(
        rules in prop::collection::vec((0.1f64..10.0, any::<bool>()), 1..12)
    ) {
        let table = Table::builder()
            .int_column("full", vec![Some(1), Some(2)])
            .int_column("holey", vec![Some(1), None])
            .build()
            .unwrap();

        let built: Vec<Rule> = rules
            .iter()
            .map(|&(weight, pass)| {
                let rule = if pass {
                    Rule::of("t/subject.csv", One)
                } else {
                    Rule::of("t/subject.csv", NoBlanks::new("holey"))
                };
                rule.with_weight(weight).unwrap()
            })
            .collect();

        let total: f64 = rules.iter().map(|(w, _)| w).sum();
        let passed: f64 = rules.iter().filter(|(_, p)| *p).map(|(w, _)| w).sum();

        let quality = run_single(table, built);
        prop_assert!((quality - passed / total).abs() < 1e-9);
    }

    #[test]
    fn prop_overall_is_mean_of_objects(scores in prop::collection::vec(any::<bool>(), 1..6)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let provider = scores.iter().enumerate().fold(InMemoryProvider::new(), |p, (i, _)| {
                p.with_table(
                    format!("t/object-{i}.csv"),
                    Table::builder()
                        .int_column("v", vec![Some(1), None])
                        .build()
                        .unwrap(),
                )
            });
            let rules: Vec<Rule> = scores
                .iter()
                .enumerate()
                .map(|(i, &pass)| {
                    let key = format!("t/object-{i}.csv");
                    if pass {
                        Rule::of(key, One)
                    } else {
                        Rule::of(key, NoBlanks::new("v"))
                    }
                })
                .collect();

            let mut engine = ValidationEngine::new(Arc::new(provider), EngineConfig::default());
            let outcome = engine.validate_objects(&rules).await.unwrap();
            let report = outcome.report().unwrap();

            let expected = scores.iter().filter(|p| **p).count() as f64 / scores.len() as f64;
            assert_eq!(report.objects.len(), scores.len());
            assert!((report.overall_quality - expected).abs() < 1e-12);
        });
    }
}
