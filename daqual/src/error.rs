//! Error types for the daqual validation engine.
//!
//! All failures are represented by [`DaqualError`]. Retrieval failures are
//! turned into an aborted run by the engine, tag failures are recorded and
//! logged, and every other variant fails the run.

use thiserror::Error;

/// The main error type for daqual.
#[derive(Error, Debug)]
pub enum DaqualError {
    /// An object could not be retrieved from the provider.
    #[error("Could not retrieve object '{object_key}': {message}")]
    Retrieval {
        /// Key of the object that failed to load
        object_key: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A score or quality computation had a zero denominator.
    #[error("Division by zero: {context}")]
    Division {
        /// What was being divided
        context: String,
    },

    /// A rule or its parameters are malformed.
    #[error("Format error: {0}")]
    Format(String),

    /// Writing a metadata tag failed.
    #[error("Could not set tag '{tag}' on '{object_key}': {message}")]
    Tag {
        /// Key of the object being tagged
        object_key: String,
        /// Tag name
        tag: String,
        /// Detailed error message
        message: String,
    },

    /// A column referenced by a rule does not exist.
    #[error("Column '{column}' not found in object '{object_key}'")]
    ColumnNotFound { object_key: String, column: String },

    /// A scorer asked for an object that was not resolved in this run.
    #[error("Object '{0}' has not been resolved")]
    ObjectNotResolved(String),

    /// No scorer is registered under the given identifier.
    #[error("Unknown scoring function '{0}'")]
    UnknownScorer(String),

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A type alias for `Result<T, DaqualError>`.
pub type Result<T> = std::result::Result<T, DaqualError>;

impl DaqualError {
    /// Creates a retrieval error for the given object.
    pub fn retrieval(object_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Retrieval {
            object_key: object_key.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a retrieval error wrapping an underlying error.
    pub fn retrieval_with_source(
        object_key: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Retrieval {
            object_key: object_key.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a division error describing the zero denominator.
    pub fn division(context: impl Into<String>) -> Self {
        Self::Division {
            context: context.into(),
        }
    }

    /// Creates a tag error.
    pub fn tag(
        object_key: impl Into<String>,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Tag {
            object_key: object_key.into(),
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(object_key: impl Into<String>, column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            object_key: object_key.into(),
            column: column.into(),
        }
    }

    /// Returns true if this error aborts a run before scoring.
    pub fn is_retrieval(&self) -> bool {
        matches!(self, Self::Retrieval { .. })
    }
}

impl From<serde_json::Error> for DaqualError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ErrorContext<T> {
    /// Adds context to an error.
    fn context(self, msg: &str) -> Result<T>;

    /// Adds context with a lazy message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<DaqualError>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| match e.into() {
            DaqualError::Internal(inner) => DaqualError::Internal(format!("{msg}: {inner}")),
            other => DaqualError::Internal(format!("{msg}: {other}")),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let msg = f();
            match e.into() {
                DaqualError::Internal(inner) => DaqualError::Internal(format!("{msg}: {inner}")),
                other => DaqualError::Internal(format!("{msg}: {other}")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_retrieval_error() {
        let err = DaqualError::retrieval("daqual/missing.csv", "no such object");
        assert_eq!(
            err.to_string(),
            "Could not retrieve object 'daqual/missing.csv': no such object"
        );
        assert!(err.is_retrieval());
    }

    #[test]
    fn test_retrieval_with_source() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err = DaqualError::retrieval_with_source("a/b.csv", "copy failed", Box::new(source));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_division_error() {
        let err = DaqualError::division("total weight of 'a/b.csv'");
        assert_eq!(err.to_string(), "Division by zero: total weight of 'a/b.csv'");
        assert!(!err.is_retrieval());
    }

    #[test]
    fn test_column_not_found() {
        let err = DaqualError::column_not_found("a/b.csv", "amount");
        assert_eq!(err.to_string(), "Column 'amount' not found in object 'a/b.csv'");
    }

    #[test]
    fn test_error_context() {
        fn failing_operation() -> Result<()> {
            Err(DaqualError::Internal("Something went wrong".to_string()))
        }

        let err = failing_operation().context("During scoring").unwrap_err();
        assert!(err.to_string().contains("During scoring"));
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let err: DaqualError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, DaqualError::Serialization(_)));
    }
}
