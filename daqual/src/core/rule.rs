//! Rules and their serializable form.

use crate::prelude::*;
use crate::provider::ObjectKey;
use crate::scoring::{Scorer, ScorerRegistry};
use crate::security::InputValidator;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One scoring function applied to one object with a weight and a minimum
/// acceptable score.
#[derive(Debug, Clone)]
pub struct Rule {
    object_key: String,
    scorer: Arc<dyn Scorer>,
    weight: f64,
    threshold: f64,
}

impl Rule {
    /// Creates a rule, checking `weight ≥ 0` and `threshold ∈ [0, 1]`.
    ///
    /// The subject key and every object the scorer reads must be of the
    /// form `<container>/<path>`.
    pub fn new(
        object_key: impl Into<String>,
        scorer: Arc<dyn Scorer>,
        weight: f64,
        threshold: f64,
    ) -> Result<Self> {
        let object_key = object_key.into();
        ObjectKey::parse(&object_key)?;
        for dependency in scorer.dependencies() {
            ObjectKey::parse(&dependency)?;
        }
        InputValidator::validate_non_negative(weight, "weight")?;
        InputValidator::validate_fraction(threshold, "threshold")?;
        Ok(Self {
            object_key,
            scorer,
            weight,
            threshold,
        })
    }

    /// A rule with weight 1 and no threshold. Keys are not checked; rules
    /// built from external input go through [`Rule::new`] or [`RuleSpec`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use daqual::core::Rule;
    /// use daqual::scoring::NoBlanks;
    ///
    /// let rule = Rule::of("daqual/transactions.csv", NoBlanks::new("amount"));
    /// assert_eq!(rule.weight(), 1.0);
    /// assert_eq!(rule.threshold(), 0.0);
    /// ```
    pub fn of(object_key: impl Into<String>, scorer: impl Scorer + 'static) -> Self {
        Self {
            object_key: object_key.into(),
            scorer: Arc::new(scorer),
            weight: 1.0,
            threshold: 0.0,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Result<Self> {
        InputValidator::validate_non_negative(weight, "weight")?;
        self.weight = weight;
        Ok(self)
    }

    pub fn with_threshold(mut self, threshold: f64) -> Result<Self> {
        InputValidator::validate_fraction(threshold, "threshold")?;
        self.threshold = threshold;
        Ok(self)
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn scorer(&self) -> &dyn Scorer {
        self.scorer.as_ref()
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The subject key followed by every object the scorer reads.
    pub fn required_objects(&self) -> Vec<String> {
        let mut keys = vec![self.object_key.clone()];
        keys.extend(self.scorer.dependencies());
        keys
    }
}

fn default_weight() -> f64 {
    1.0
}

/// Serializable description of a [`Rule`].
///
/// Deserializes from an object
/// `{"object", "function", "parameters", "weight", "threshold"}` (weight
/// defaults to 1, threshold to 0) or from the positional array
/// `[object, function, parameters, weight, threshold]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRuleSpec")]
pub struct RuleSpec {
    pub object: String,
    pub function: String,
    pub parameters: serde_json::Value,
    pub weight: f64,
    pub threshold: f64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NamedRuleSpec {
    object: String,
    function: String,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    threshold: f64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRuleSpec {
    Named(NamedRuleSpec),
    Positional(String, String, serde_json::Value, f64, f64),
}

impl From<RawRuleSpec> for RuleSpec {
    fn from(raw: RawRuleSpec) -> Self {
        match raw {
            RawRuleSpec::Named(n) => Self {
                object: n.object,
                function: n.function,
                parameters: n.parameters,
                weight: n.weight,
                threshold: n.threshold,
            },
            RawRuleSpec::Positional(object, function, parameters, weight, threshold) => Self {
                object,
                function,
                parameters,
                weight,
                threshold,
            },
        }
    }
}

impl RuleSpec {
    pub fn new(
        object: impl Into<String>,
        function: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            object: object.into(),
            function: function.into(),
            parameters,
            weight: 1.0,
            threshold: 0.0,
        }
    }

    /// Resolves the scoring function and validates the parameters.
    pub fn build(&self, registry: &ScorerRegistry) -> Result<Rule> {
        let scorer = registry.build(&self.function, self.parameters.clone())?;
        Rule::new(self.object.clone(), scorer, self.weight, self.threshold)
    }
}

/// An ordered list of rule specs, typically loaded from JSON.
///
/// # Examples
///
/// ```rust
/// use daqual::core::RuleSet;
/// use daqual::scoring::ScorerRegistry;
///
/// let set = RuleSet::from_json(r#"[
///     ["daqual/iso-currencies.csv", "column_count", {"expected_n": 8}, 1, 1],
///     {"object": "daqual/iso-currencies.csv", "function": "match",
///      "parameters": {"column": "Alphabetic Code", "match": "^$|[A-Z]{3}"}}
/// ]"#).unwrap();
///
/// let rules = set.build(&ScorerRegistry::with_builtins()).unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    specs: Vec<RuleSpec>,
}

impl RuleSet {
    pub fn new(specs: Vec<RuleSpec>) -> Self {
        Self { specs }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn push(&mut self, spec: RuleSpec) {
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[RuleSpec] {
        &self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Builds every rule, failing on the first invalid spec.
    pub fn build(&self, registry: &ScorerRegistry) -> Result<Vec<Rule>> {
        self.specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                spec.build(registry).map_err(|e| match e {
                    DaqualError::Format(msg) => DaqualError::Format(format!(
                        "rule {i} ({} on '{}'): {msg}",
                        spec.function, spec.object
                    )),
                    other => other,
                })
            })
            .collect()
    }
}
