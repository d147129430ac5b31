//! Configuration for the demo binary and the service layer.
//!
//! Every value comes from a `KIMBO_*` environment variable and falls back to
//! a default when unset.

use crate::export::{DEFAULT_COMPANY_NAME, ExportOptions};
use crate::labels::Locale;
use crate::types::DEFAULT_CURRENCY;
use kimbo_runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Label and document wording
    pub presentation: PresentationConfig,
    /// Conflict retry policy
    pub retry: RetryConfig,
    /// Observability
    pub observability: ObservabilityConfig,
}

/// Wording of timelines and documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Label language (`KIMBO_LOCALE`, default `en`)
    pub locale: Locale,
    /// Default currency of new requests (`KIMBO_CURRENCY`, default `XAF`)
    pub currency: String,
    /// Company printed on documents (`KIMBO_COMPANY_NAME`)
    pub company_name: String,
}

/// Retry policy for version conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (`KIMBO_RETRY_MAX`, default 3)
    pub max_retries: usize,
    /// Delay before the first retry (`KIMBO_RETRY_INITIAL_DELAY_MS`, default 50)
    pub initial_delay_ms: u64,
}

/// Logging and metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Filter directive (`KIMBO_LOG_LEVEL`, then `RUST_LOG`, default `info`)
    pub log_level: String,
    /// Install the Prometheus recorder (`KIMBO_METRICS_ENABLED`, default false)
    pub metrics_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            presentation: PresentationConfig {
                locale: Locale::default(),
                currency: DEFAULT_CURRENCY.to_string(),
                company_name: DEFAULT_COMPANY_NAME.to_string(),
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 50,
            },
            observability: ObservabilityConfig {
                log_level: "info".to_string(),
                metrics_enabled: false,
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            presentation: PresentationConfig {
                locale: lookup("KIMBO_LOCALE")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.presentation.locale),
                currency: lookup("KIMBO_CURRENCY")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(defaults.presentation.currency),
                company_name: lookup("KIMBO_COMPANY_NAME")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(defaults.presentation.company_name),
            },
            retry: RetryConfig {
                max_retries: lookup("KIMBO_RETRY_MAX")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry.max_retries),
                initial_delay_ms: lookup("KIMBO_RETRY_INITIAL_DELAY_MS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry.initial_delay_ms),
            },
            observability: ObservabilityConfig {
                log_level: lookup("KIMBO_LOG_LEVEL")
                    .or_else(|| lookup("RUST_LOG"))
                    .unwrap_or(defaults.observability.log_level),
                metrics_enabled: lookup("KIMBO_METRICS_ENABLED")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.observability.metrics_enabled),
            },
        }
    }

    /// Retry policy for [`transition_with_retry`](crate::service::ProcurementService::transition_with_retry).
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_retries(self.retry.max_retries)
            .initial_delay(Duration::from_millis(self.retry.initial_delay_ms))
            .build()
    }

    /// Export wording.
    #[must_use]
    pub fn export_options(&self) -> ExportOptions {
        ExportOptions {
            locale: self.presentation.locale,
            company: self.presentation.company_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = Config::from_lookup(lookup(&[
            ("KIMBO_LOCALE", "fr-FR"),
            ("KIMBO_CURRENCY", "EUR"),
            ("KIMBO_COMPANY_NAME", "ACME"),
            ("KIMBO_RETRY_MAX", "5"),
            ("KIMBO_RETRY_INITIAL_DELAY_MS", "10"),
            ("RUST_LOG", "debug"),
            ("KIMBO_METRICS_ENABLED", "true"),
        ]));

        assert_eq!(config.presentation.locale, Locale::French);
        assert_eq!(config.presentation.currency, "EUR");
        assert_eq!(config.export_options().company, "ACME");
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.retry_policy().initial_delay, Duration::from_millis(10));
        assert_eq!(config.observability.log_level, "debug");
        assert!(config.observability.metrics_enabled);
    }

    #[test]
    fn kimbo_log_level_wins_over_rust_log() {
        let config = Config::from_lookup(lookup(&[("KIMBO_LOG_LEVEL", "warn"), ("RUST_LOG", "trace")]));
        assert_eq!(config.observability.log_level, "warn");
    }

    #[test]
    fn unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup(&[("KIMBO_LOCALE", "klingon"), ("KIMBO_RETRY_MAX", "many")]));
        assert_eq!(config.presentation.locale, Locale::English);
        assert_eq!(config.retry.max_retries, 3);
    }
}
