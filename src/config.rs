// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Exporter configuration
//
// Every setting is looked up as a process property first and as an
// environment variable second. Empty values count as absent.

use secrecy::SecretString;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::context::DEFAULT_APP_NAME;
use crate::error::ConfigError;
use crate::export::client::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOG_API_URL, DEFAULT_REQUEST_TIMEOUT};
use crate::export::dispatcher::{DEFAULT_GRACE_PERIOD, DEFAULT_QUEUE_CAPACITY};

/// A setting with its property key and environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub property: &'static str,
    pub env: &'static str,
}

pub const LICENSE_KEY: Setting = Setting {
    property: "newrelic.config.license_key",
    env: "NEW_RELIC_LICENSE_KEY",
};
pub const APP_NAME: Setting = Setting {
    property: "newrelic.config.app_name",
    env: "NEW_RELIC_APP_NAME",
};
pub const LOG_API_URL: Setting = Setting {
    property: "newrelic.config.log_api_url",
    env: "NEW_RELIC_LOG_API_URL",
};
pub const CONNECT_TIMEOUT_MS: Setting = Setting {
    property: "newrelic.config.connect_timeout_ms",
    env: "NEW_RELIC_CONNECT_TIMEOUT_MS",
};
pub const READ_TIMEOUT_MS: Setting = Setting {
    property: "newrelic.config.read_timeout_ms",
    env: "NEW_RELIC_READ_TIMEOUT_MS",
};
pub const SHUTDOWN_GRACE_MS: Setting = Setting {
    property: "newrelic.config.shutdown_grace_ms",
    env: "NEW_RELIC_SHUTDOWN_GRACE_MS",
};
pub const QUEUE_CAPACITY: Setting = Setting {
    property: "newrelic.config.queue_capacity",
    env: "NEW_RELIC_QUEUE_CAPACITY",
};

/// Process-level key/value properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties(HashMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a flat JSON object; non-string scalars are kept in their JSON form
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidProperties`] if the document is not a JSON object.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let values: HashMap<String, Value> =
            serde_json::from_str(json).map_err(ConfigError::InvalidProperties)?;

        Ok(Self(
            values
                .into_iter()
                .filter_map(|(key, value)| match value {
                    Value::Null => None,
                    Value::String(s) => Some((key, s)),
                    other => Some((key, other.to_string())),
                })
                .collect(),
        ))
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// Resolved exporter settings
#[derive(Debug)]
pub struct ExportConfig {
    pub license_key: Option<SecretString>,
    pub app_name: String,
    pub log_api_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub shutdown_grace: Duration,
    pub queue_capacity: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            license_key: None,
            app_name: DEFAULT_APP_NAME.to_string(),
            log_api_url: DEFAULT_LOG_API_URL.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_grace: DEFAULT_GRACE_PERIOD,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl ExportConfig {
    /// Resolve from `properties` with the process environment as fallback
    pub fn resolve(properties: &Properties) -> Result<Self, ConfigError> {
        Self::resolve_with(properties, |name| std::env::var(name).ok())
    }

    /// Resolve from `properties` with a custom environment lookup
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a numeric setting does not parse.
    pub fn resolve_with<E>(properties: &Properties, env: E) -> Result<Self, ConfigError>
    where
        E: Fn(&str) -> Option<String>,
    {
        let lookup = |setting: Setting| -> Option<(String, &'static str)> {
            properties
                .get(setting.property)
                .filter(|v| !v.is_empty())
                .map(|v| (v.to_string(), setting.property))
                .or_else(|| {
                    env(setting.env)
                        .filter(|v| !v.is_empty())
                        .map(|v| (v, setting.env))
                })
        };

        let millis = |setting: Setting, default: Duration| -> Result<Duration, ConfigError> {
            lookup(setting)
                .map(|(value, key)| parse_number::<u64>(&value, key).map(Duration::from_millis))
                .transpose()
                .map(|value| value.unwrap_or(default))
        };

        let defaults = Self::default();
        Ok(Self {
            license_key: lookup(LICENSE_KEY).map(|(value, _)| SecretString::from(value)),
            app_name: lookup(APP_NAME)
                .map(|(value, _)| value)
                .unwrap_or(defaults.app_name),
            log_api_url: lookup(LOG_API_URL)
                .map(|(value, _)| value)
                .unwrap_or(defaults.log_api_url),
            connect_timeout: millis(CONNECT_TIMEOUT_MS, defaults.connect_timeout)?,
            request_timeout: millis(READ_TIMEOUT_MS, defaults.request_timeout)?,
            shutdown_grace: millis(SHUTDOWN_GRACE_MS, defaults.shutdown_grace)?,
            queue_capacity: lookup(QUEUE_CAPACITY)
                .map(|(value, key)| parse_number::<usize>(&value, key))
                .transpose()?
                .unwrap_or(defaults.queue_capacity),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.license_key.is_some()
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, key: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key: key.to_string(),
        value: value.to_string(),
    })
}
