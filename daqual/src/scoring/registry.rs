//! Name-based construction of scorers from JSON parameters.

use super::{
    ColumnCount, ColumnFormat, ColumnFormatParams, ColumnNames, ColumnType, ColumnValidValues,
    Comparison, ComparisonParams, DateColumn, EveryMasterValueUsed, NoBlanks, One, RowCount,
    Scorer, TypeExpectation, UniqueColumn,
};
use super::size::RowCountParams;
use crate::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds a scorer from its JSON parameter object.
pub type ScorerFactory = Arc<dyn Fn(serde_json::Value) -> Result<Arc<dyn Scorer>> + Send + Sync>;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NoParams {}

/// Maps scoring function identifiers to factories.
///
/// Parameters are deserialized into each scorer's typed parameter struct,
/// so a misspelled or missing parameter is rejected when the rule is
/// built rather than when it runs.
///
/// # Examples
///
/// ```rust
/// use daqual::scoring::{Scorer, ScorerRegistry};
/// use serde_json::json;
///
/// let registry = ScorerRegistry::with_builtins();
/// let scorer = registry.build("match", json!({"column": "Alphabetic Code", "match": "[A-Z]{3}"})).unwrap();
/// assert_eq!(scorer.name(), "column_format");
///
/// assert!(registry.build("column_count", json!({"columns": 8})).is_err());
/// assert!(registry.build("no_such_check", json!({})).is_err());
/// ```
#[derive(Clone, Default)]
pub struct ScorerRegistry {
    factories: HashMap<String, ScorerFactory>,
}

impl fmt::Debug for ScorerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScorerRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl ScorerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in scoring function.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("column_count", |p: ColumnCount| Ok(p));
        registry.register("column_names", |p: ColumnNames| Ok(p));
        registry.register("row_count", |p: RowCountParams| RowCount::try_from(p));
        registry.register("no_blanks", |p: NoBlanks| Ok(p));
        registry.register("unique_column", |p: UniqueColumn| Ok(p));
        registry.register("column_valid_values", |p: ColumnValidValues| Ok(p));
        registry.register("every_master_value_used", |p: EveryMasterValueUsed| Ok(p));
        registry.register("column_format", |p: ColumnFormatParams| ColumnFormat::try_from(p));
        registry.register("int", |p: ColumnType| Ok(p.expecting(TypeExpectation::Integer)));
        registry.register("float", |p: ColumnType| Ok(p.expecting(TypeExpectation::Float)));
        registry.register("number", |p: ColumnType| Ok(p.expecting(TypeExpectation::Number)));
        registry.register("date", |p: DateColumn| Ok(p));
        registry.register("comparison", |p: ComparisonParams| Comparison::try_from(p));
        registry.register("one", |_: NoParams| Ok(One));

        registry.alias("match", "column_format");
        registry.alias("1", "one");
        registry
    }

    /// Registers a scorer built from typed parameters `P`.
    pub fn register<P, S, F>(&mut self, name: impl Into<String>, build: F)
    where
        P: DeserializeOwned + 'static,
        S: Scorer + 'static,
        F: Fn(P) -> Result<S> + Send + Sync + 'static,
    {
        let name = name.into();
        let label = name.clone();
        let factory: ScorerFactory = Arc::new(move |value| {
            let params: P = serde_json::from_value(value).map_err(|e| {
                DaqualError::Format(format!("invalid parameters for '{label}': {e}"))
            })?;
            Ok(Arc::new(build(params)?) as Arc<dyn Scorer>)
        });
        self.register_factory(name, factory);
    }

    /// Registers a raw factory, replacing any previous entry of that name.
    pub fn register_factory(&mut self, name: impl Into<String>, factory: ScorerFactory) {
        let name = name.into();
        debug!(scorer = %name, "Registering scoring function");
        self.factories.insert(name, factory);
    }

    /// Makes `alias` resolve to the factory currently registered as `target`.
    pub fn register_alias(&mut self, alias: impl Into<String>, target: &str) -> Result<()> {
        let factory = self
            .factories
            .get(target)
            .cloned()
            .ok_or_else(|| DaqualError::UnknownScorer(target.to_string()))?;
        self.register_factory(alias, factory);
        Ok(())
    }

    fn alias(&mut self, alias: &str, target: &str) {
        if let Some(factory) = self.factories.get(target).cloned() {
            self.factories.insert(alias.to_string(), factory);
        }
    }

    /// Builds the scorer `name` from `params`; `null` means no parameters.
    pub fn build(&self, name: &str, params: serde_json::Value) -> Result<Arc<dyn Scorer>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| DaqualError::UnknownScorer(name.to_string()))?;
        let params = match params {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        factory(params)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered identifiers, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtins_registered() {
        let registry = ScorerRegistry::with_builtins();
        for name in [
            "column_count",
            "column_names",
            "row_count",
            "no_blanks",
            "unique_column",
            "column_valid_values",
            "every_master_value_used",
            "column_format",
            "match",
            "int",
            "float",
            "number",
            "date",
            "comparison",
            "one",
            "1",
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
    }

    #[test]
    fn test_build_with_aliases() {
        let registry = ScorerRegistry::with_builtins();
        let scorer = registry
            .build("column_count", json!({"expected_n": 8}))
            .unwrap();
        assert_eq!(scorer.parameters(), json!({"expected_columns": 8}));

        let scorer = registry
            .build("row_count", json!({"expected_row_count": 180}))
            .unwrap();
        assert_eq!(scorer.name(), "row_count");

        assert_eq!(registry.build("1", serde_json::Value::Null).unwrap().name(), "one");
        assert_eq!(registry.build("int", json!({"column": "n"})).unwrap().name(), "int");
    }

    #[test]
    fn test_dependencies_survive_build() {
        let registry = ScorerRegistry::with_builtins();
        let scorer = registry
            .build(
                "every_master_value_used",
                json!({"column": "account", "master": "m.csv", "master_column": "id"}),
            )
            .unwrap();
        assert_eq!(scorer.dependencies(), vec!["m.csv".to_string()]);
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let registry = ScorerRegistry::with_builtins();
        assert!(matches!(
            registry.build("no_blanks", json!({"colum": "x"})),
            Err(DaqualError::Format(_))
        ));
        assert!(matches!(
            registry.build("no_blanks", json!({})),
            Err(DaqualError::Format(_))
        ));
        assert!(matches!(
            registry.build("one", json!({"column": "x"})),
            Err(DaqualError::Format(_))
        ));
        assert!(matches!(
            registry.build("column_format", json!({"column": "x", "match": "("})),
            Err(DaqualError::Format(_))
        ));
    }

    #[test]
    fn test_unknown_scorer() {
        let registry = ScorerRegistry::with_builtins();
        assert!(matches!(
            registry.build("checksum", json!({})),
            Err(DaqualError::UnknownScorer(name)) if name == "checksum"
        ));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = ScorerRegistry::new();
        assert!(registry.register_alias("always", "one").is_err());
        registry.register("one", |_: NoParams| Ok(One));
        registry.register_alias("always", "one").unwrap();
        assert_eq!(registry.names(), vec!["always", "one"]);
    }
}
