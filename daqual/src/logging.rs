//! Logging configuration for validation runs.
//!
//! Every component emits `tracing` events; [`LogConfig`] decides which of
//! the chattier ones the engine produces, and [`setup`] installs a
//! subscriber for applications that don't bring their own.

use serde::{Deserialize, Serialize};

/// Logging configuration for a [`ValidationEngine`](crate::core::ValidationEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether to log every rule's score
    pub log_rule_details: bool,
    /// Whether to log object resolution and tag writes
    pub log_data_operations: bool,
    /// Whether to log the run summary
    pub log_metrics: bool,
    /// Maximum length for logged field values (to prevent huge logs)
    pub max_field_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_rule_details: false,
            log_data_operations: true,
            log_metrics: true,
            max_field_length: 256,
        }
    }
}

impl LogConfig {
    /// Creates a verbose configuration suitable for debugging rule sets.
    pub fn verbose() -> Self {
        Self {
            log_rule_details: true,
            log_data_operations: true,
            log_metrics: true,
            max_field_length: 1024,
        }
    }

    /// Creates a minimal configuration for scheduled production runs.
    pub fn production() -> Self {
        Self {
            log_rule_details: false,
            log_data_operations: false,
            log_metrics: false,
            max_field_length: 128,
        }
    }

    /// Creates a balanced configuration suitable for most use cases.
    pub fn balanced() -> Self {
        Self::default()
    }
}

/// Logs a rule-level event at debug level when rule details are enabled.
#[macro_export]
macro_rules! log_rule {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_rule_details {
            tracing::debug!($($arg)*);
        }
    };
}

/// Logs a data operation at info level when data operations are enabled.
#[macro_export]
macro_rules! log_data_op {
    ($config:expr, $($arg:tt)*) => {
        if $config.log_data_operations {
            tracing::info!($($arg)*);
        }
    };
}

/// Truncates a string to the maximum field length if needed.
pub fn truncate_field(value: &str, max_length: usize) -> String {
    if value.len() <= max_length {
        value.to_string()
    } else {
        let mut end = max_length;
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...(truncated)", &value[..end])
    }
}

/// Subscriber installation for applications embedding the engine.
pub mod setup {
    use tracing::Level;

    /// Configuration for the global `tracing` subscriber.
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        /// Log level for the application
        pub level: Level,
        /// Log level for daqual components specifically
        pub daqual_level: Level,
        /// Whether to use JSON output format
        pub json_format: bool,
        /// Environment filter override
        pub env_filter: Option<String>,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                daqual_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }
    }

    impl LoggingConfig {
        /// Creates a configuration for production use.
        pub fn production() -> Self {
            Self {
                level: Level::WARN,
                daqual_level: Level::INFO,
                json_format: true,
                env_filter: None,
            }
        }

        /// Creates a configuration for development use.
        pub fn development() -> Self {
            Self {
                level: Level::DEBUG,
                daqual_level: Level::DEBUG,
                json_format: false,
                env_filter: None,
            }
        }

        pub fn with_level(mut self, level: Level) -> Self {
            self.level = level;
            self
        }

        pub fn with_daqual_level(mut self, level: Level) -> Self {
            self.daqual_level = level;
            self
        }

        pub fn with_json_format(mut self, enabled: bool) -> Self {
            self.json_format = enabled;
            self
        }

        /// Sets a custom environment filter.
        pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
            self.env_filter = Some(filter.into());
            self
        }

        /// Builds the environment filter string.
        pub fn env_filter(&self) -> String {
            if let Some(ref filter) = self.env_filter {
                filter.clone()
            } else {
                format!(
                    "{},daqual={}",
                    self.level.as_str().to_lowercase(),
                    self.daqual_level.as_str().to_lowercase()
                )
            }
        }
    }

    /// Installs a global subscriber with an `EnvFilter` and a plain or JSON
    /// formatting layer. `RUST_LOG` takes precedence over the config.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use daqual::logging::setup::{LoggingConfig, init_logging};
    ///
    /// init_logging(LoggingConfig::development().with_json_format(true)).unwrap();
    /// ```
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.env_filter()));

        let fmt_layer = if config.json_format {
            tracing_subscriber::fmt::layer().json().boxed()
        } else {
            tracing_subscriber::fmt::layer().boxed()
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::setup::LoggingConfig;
    use super::*;

    #[test]
    fn test_log_config_presets() {
        let config = LogConfig::default();
        assert!(!config.log_rule_details);
        assert!(config.log_data_operations);

        let verbose = LogConfig::verbose();
        assert!(verbose.log_rule_details);

        let production = LogConfig::production();
        assert!(!production.log_metrics);
        assert_eq!(production.max_field_length, 128);
    }

    #[test]
    fn test_log_config_serde() {
        let json = serde_json::to_value(LogConfig::verbose()).unwrap();
        assert_eq!(json["log_rule_details"], true);

        let parsed: LogConfig = serde_json::from_str(r#"{"log_metrics": false}"#).unwrap();
        assert!(!parsed.log_metrics);
        assert!(parsed.log_data_operations);
        assert_eq!(parsed.max_field_length, 256);
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("hello", 10), "hello");
        assert_eq!(
            truncate_field("this is a very long text that should be truncated", 10),
            "this is a ...(truncated)"
        );
        assert_eq!(truncate_field("ééé", 3), "é...(truncated)");
    }

    #[test]
    fn test_env_filter() {
        assert_eq!(LoggingConfig::default().env_filter(), "info,daqual=debug");
        assert_eq!(
            LoggingConfig::default()
                .with_env_filter("daqual=trace")
                .env_filter(),
            "daqual=trace"
        );
    }
}
