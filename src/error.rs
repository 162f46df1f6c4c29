// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Error types for masking, context extraction, export and configuration

use thiserror::Error;

/// Errors raised while building masking rules or processors
#[derive(Debug, Error)]
pub enum MaskingError {
    /// A required builder field was never set
    #[error("masking rule is missing required field `{0}`")]
    MissingField(&'static str),

    /// The detection pattern of a rule does not compile
    #[error("invalid pattern for masking rule '{name}': {source}")]
    InvalidPattern {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// The combined prefilter over all rule patterns does not compile
    #[error("failed to compile masking rule set: {0}")]
    RuleSet(#[source] regex::Error),
}

/// Errors reported by a tracing agent implementation
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("tracing agent is not available")]
    Unavailable,

    #[error("tracing agent failed: {0}")]
    Failed(String),
}

/// Errors raised while delivering a payload
#[derive(Debug, Error)]
pub enum ExportError {
    /// No access credential was resolved
    #[error("export client has no access credential")]
    NotConfigured,

    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connection, timeout or protocol failure
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Errors raised when handing work to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("dispatch queue is full")]
    QueueFull,

    #[error("dispatcher is stopped")]
    Stopped,
}

/// Errors raised while resolving configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid properties document: {0}")]
    InvalidProperties(#[source] serde_json::Error),

    #[error("invalid value '{value}' for '{key}': expected a non-negative integer")]
    InvalidNumber { key: String, value: String },
}

/// Top-level error for bootstrap operations
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Masking(#[from] MaskingError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = MaskingError::MissingField("pattern");
        assert_eq!(
            err.to_string(),
            "masking rule is missing required field `pattern`"
        );
    }

    #[test]
    fn test_invalid_number_message() {
        let err = ConfigError::InvalidNumber {
            key: "newrelic.config.queue_capacity".to_string(),
            value: "lots".to_string(),
        };
        assert!(err.to_string().contains("newrelic.config.queue_capacity"));
        assert!(err.to_string().contains("lots"));
    }
}
