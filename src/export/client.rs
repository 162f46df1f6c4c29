// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// HTTP delivery of export payloads

use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use super::payload::ExportPayload;
use crate::config::ExportConfig;
use crate::error::ExportError;

pub const DEFAULT_LOG_API_URL: &str = "https://log-api.newrelic.com/log/v1";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Outcome of a completed HTTP exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// The backend accepted the payload (200 or 202)
    Delivered { status: u16 },
    /// Any other status; the payload is dropped
    Rejected { status: u16 },
}

impl DeliveryStatus {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered { .. })
    }

    pub fn status(&self) -> u16 {
        match self {
            DeliveryStatus::Delivered { status } | DeliveryStatus::Rejected { status } => *status,
        }
    }
}

/// Backend that ships payloads to the log ingestion endpoint
///
/// Implementations are called from the dispatcher worker only.
pub trait ExportClient: Send + Sync {
    /// Whether a usable access credential is present
    fn is_configured(&self) -> bool;

    /// Send a single payload, without retries
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::NotConfigured`] without a credential, and
    /// [`ExportError::Transport`] on connection, timeout or protocol failures.
    fn send(&self, payload: &ExportPayload) -> Result<DeliveryStatus, ExportError>;
}

/// Log API client using a blocking `reqwest` client
///
/// The underlying client is built on first use, so construction never touches
/// the network stack and happens cheaply on the caller thread.
pub struct HttpExportClient {
    endpoint: String,
    api_key: Option<SecretString>,
    connect_timeout: Duration,
    request_timeout: Duration,
    client: OnceCell<reqwest::blocking::Client>,
}

impl HttpExportClient {
    pub fn new(api_key: Option<SecretString>) -> Self {
        Self {
            endpoint: DEFAULT_LOG_API_URL.to_string(),
            api_key: api_key.filter(|key| !key.expose_secret().is_empty()),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            client: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ExportConfig) -> Self {
        let api_key = config
            .license_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_string()));

        Self::new(api_key)
            .with_endpoint(config.log_api_url.clone())
            .with_timeouts(config.connect_timeout, config.request_timeout)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeouts(mut self, connect: Duration, request: Duration) -> Self {
        self.connect_timeout = connect;
        self.request_timeout = request;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client(&self) -> Result<&reqwest::blocking::Client, ExportError> {
        self.client.get_or_try_init(|| {
            reqwest::blocking::Client::builder()
                .user_agent(format!("masking-exporter/{}", env!("CARGO_PKG_VERSION")))
                .connect_timeout(self.connect_timeout)
                .timeout(self.request_timeout)
                // One request per connection
                .pool_max_idle_per_host(0)
                .build()
                .map_err(ExportError::Client)
        })
    }
}

impl ExportClient for HttpExportClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn send(&self, payload: &ExportPayload) -> Result<DeliveryStatus, ExportError> {
        let api_key = self.api_key.as_ref().ok_or(ExportError::NotConfigured)?;

        let response = self
            .client()?
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .header("Api-Key", api_key.expose_secret())
            .body(payload.as_str().to_string())
            .send()
            .map_err(ExportError::Transport)?;

        let status = response.status();
        Ok(match status {
            StatusCode::OK | StatusCode::ACCEPTED => DeliveryStatus::Delivered {
                status: status.as_u16(),
            },
            _ => DeliveryStatus::Rejected {
                status: status.as_u16(),
            },
        })
    }
}

impl std::fmt::Debug for HttpExportClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpExportClient")
            .field("endpoint", &self.endpoint)
            .field("configured", &self.is_configured())
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
