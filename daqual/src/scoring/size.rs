//! Row count scorer, absolute or relative to another object.

use super::{binary, overage_score, Scorer, ScoringContext};
use crate::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// How the subject's row count relates to a comparison object's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDelta", into = "RawDelta")]
pub enum RowDelta {
    /// Expect exactly `comparison rows + n`, scored on the overage curve.
    Offset(i64),
    /// Expect at least as many rows as the comparison; scored 0 or 1.
    AtLeast,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDelta {
    Number(i64),
    Symbol(String),
}

impl TryFrom<RawDelta> for RowDelta {
    type Error = String;

    fn try_from(raw: RawDelta) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawDelta::Number(n) => Ok(RowDelta::Offset(n)),
            RawDelta::Symbol(s) if s == ">=" => Ok(RowDelta::AtLeast),
            RawDelta::Symbol(s) => Err(format!(
                "expected_delta must be an integer or \">=\", got \"{s}\""
            )),
        }
    }
}

impl From<RowDelta> for RawDelta {
    fn from(delta: RowDelta) -> Self {
        match delta {
            RowDelta::Offset(n) => RawDelta::Number(n),
            RowDelta::AtLeast => RawDelta::Symbol(">=".to_string()),
        }
    }
}

/// What the row count is measured against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowExpectation {
    Exact(usize),
    Relative { comparison: String, delta: RowDelta },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RowCountParams {
    #[serde(
        default,
        alias = "expected_row_count",
        skip_serializing_if = "Option::is_none"
    )]
    expected_rows: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comparison: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expected_delta: Option<RowDelta>,
}

/// Scores the number of rows.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{RowCount, RowDelta, Scorer};
///
/// // Exactly 279 rows expected
/// let exact = RowCount::exact(279);
///
/// // At least as many accounts as yesterday
/// let growing = RowCount::relative("daqual/accounts-20190301.csv", RowDelta::AtLeast);
/// assert_eq!(growing.dependencies(), vec!["daqual/accounts-20190301.csv".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCount {
    expectation: RowExpectation,
}

impl RowCount {
    pub fn exact(expected_rows: usize) -> Self {
        Self {
            expectation: RowExpectation::Exact(expected_rows),
        }
    }

    pub fn relative(comparison: impl Into<String>, delta: RowDelta) -> Self {
        Self {
            expectation: RowExpectation::Relative {
                comparison: comparison.into(),
                delta,
            },
        }
    }

    pub fn expectation(&self) -> &RowExpectation {
        &self.expectation
    }
}

impl TryFrom<RowCountParams> for RowCount {
    type Error = DaqualError;

    fn try_from(params: RowCountParams) -> Result<Self> {
        match (params.expected_rows, params.comparison, params.expected_delta) {
            (Some(rows), None, None) => Ok(Self::exact(rows)),
            (None, Some(comparison), delta) => Ok(Self::relative(
                comparison,
                delta.unwrap_or(RowDelta::Offset(0)),
            )),
            (None, None, _) => Err(DaqualError::Format(
                "row_count needs either expected_rows or comparison".to_string(),
            )),
            _ => Err(DaqualError::Format(
                "row_count takes expected_rows or comparison, not both".to_string(),
            )),
        }
    }
}

#[async_trait]
impl Scorer for RowCount {
    #[instrument(skip(self, ctx), fields(object = %ctx.object_key()))]
    async fn score(&self, ctx: &ScoringContext<'_>) -> Result<f64> {
        let rows = ctx.table()?.num_rows();
        match &self.expectation {
            RowExpectation::Exact(expected) => overage_score(rows, *expected, "row count"),
            RowExpectation::Relative { comparison, delta } => {
                let comparison_rows = ctx.table_of(comparison)?.num_rows();
                debug!(rows, comparison_rows, ?delta, "Comparing row counts");
                match delta {
                    RowDelta::AtLeast => Ok(binary(rows >= comparison_rows)),
                    RowDelta::Offset(offset) => {
                        let expected = i64::try_from(comparison_rows)
                            .ok()
                            .and_then(|rows| rows.checked_add(*offset))
                            .ok_or_else(|| {
                                DaqualError::Format(format!(
                                    "expected row count {comparison_rows} + {offset} overflows"
                                ))
                            })?;
                        if expected < 0 {
                            return Err(DaqualError::Format(format!(
                                "expected row count {expected} is negative"
                            )));
                        }
                        overage_score(rows, expected as usize, "row count")
                    }
                }
            }
        }
    }

    fn name(&self) -> &str {
        "row_count"
    }

    fn dependencies(&self) -> Vec<String> {
        match &self.expectation {
            RowExpectation::Exact(_) => Vec::new(),
            RowExpectation::Relative { comparison, .. } => vec![comparison.clone()],
        }
    }

    fn parameters(&self) -> serde_json::Value {
        let params = match &self.expectation {
            RowExpectation::Exact(rows) => RowCountParams {
                expected_rows: Some(*rows),
                ..Default::default()
            },
            RowExpectation::Relative { comparison, delta } => RowCountParams {
                comparison: Some(comparison.clone()),
                expected_delta: Some(*delta),
                ..Default::default()
            },
        };
        serde_json::to_value(params).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{score_object, text_table};

    fn rows(n: usize) -> crate::table::Table {
        let values: Vec<String> = (0..n).map(|i| format!("A-{i:03}")).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        text_table("Account Number", &refs)
    }

    #[tokio::test]
    async fn test_exact_rows() {
        let score = score_object(&RowCount::exact(5), "t/a.csv", vec![("t/a.csv", rows(5))])
            .await
            .unwrap();
        assert_eq!(score, 1.0);

        let score = score_object(&RowCount::exact(4), "t/a.csv", vec![("t/a.csv", rows(6))])
            .await
            .unwrap();
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_relative_offset() {
        let scorer = RowCount::relative("t/prev.csv", RowDelta::Offset(2));
        let score = score_object(
            &scorer,
            "t/a.csv",
            vec![("t/a.csv", rows(3)), ("t/prev.csv", rows(4))],
        )
        .await
        .unwrap();
        assert_eq!(score, 0.5);
    }

    #[tokio::test]
    async fn test_relative_at_least() {
        let scorer = RowCount::relative("t/prev.csv", RowDelta::AtLeast);
        let grown = score_object(
            &scorer,
            "t/a.csv",
            vec![("t/a.csv", rows(5)), ("t/prev.csv", rows(4))],
        )
        .await
        .unwrap();
        assert_eq!(grown, 1.0);

        let shrunk = score_object(
            &scorer,
            "t/a.csv",
            vec![("t/a.csv", rows(3)), ("t/prev.csv", rows(4))],
        )
        .await
        .unwrap();
        assert_eq!(shrunk, 0.0);
    }

    #[tokio::test]
    async fn test_negative_expectation_rejected() {
        let scorer = RowCount::relative("t/prev.csv", RowDelta::Offset(-10));
        let result = score_object(
            &scorer,
            "t/a.csv",
            vec![("t/a.csv", rows(3)), ("t/prev.csv", rows(4))],
        )
        .await;
        assert!(matches!(result, Err(DaqualError::Format(_))));
    }

    #[tokio::test]
    async fn test_overflowing_offset_rejected() {
        let scorer = RowCount::relative("t/prev.csv", RowDelta::Offset(i64::MAX));
        let result = score_object(
            &scorer,
            "t/a.csv",
            vec![("t/a.csv", rows(3)), ("t/prev.csv", rows(4))],
        )
        .await;
        assert!(
            matches!(&result, Err(DaqualError::Format(msg)) if msg.contains("overflows")),
            "{result:?}"
        );
    }

    #[test]
    fn test_params_parsing() {
        let parse = |json: &str| {
            let params: RowCountParams = serde_json::from_str(json).unwrap();
            RowCount::try_from(params)
        };

        assert_eq!(
            parse(r#"{"expected_row_count": 3}"#).unwrap(),
            RowCount::exact(3)
        );
        assert_eq!(
            parse(r#"{"comparison": "t/prev.csv", "expected_delta": ">="}"#).unwrap(),
            RowCount::relative("t/prev.csv", RowDelta::AtLeast)
        );
        assert_eq!(
            parse(r#"{"comparison": "t/prev.csv", "expected_delta": -1}"#).unwrap(),
            RowCount::relative("t/prev.csv", RowDelta::Offset(-1))
        );
        assert!(parse("{}").is_err());
        assert!(parse(r#"{"expected_rows": 3, "comparison": "t/prev.csv"}"#).is_err());
        assert!(serde_json::from_str::<RowCountParams>(r#"{"expected_delta": "<"}"#).is_err());
    }

    #[test]
    fn test_parameters_round_trip_shape() {
        let params = RowCount::relative("t/prev.csv", RowDelta::AtLeast).parameters();
        assert_eq!(
            params,
            serde_json::json!({"comparison": "t/prev.csv", "expected_delta": ">="})
        );
    }
}
