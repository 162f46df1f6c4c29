// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Logging bootstrap
//
// Installs a registry with masked console output and the export layer. The
// returned guard stops the appender, draining queued events, when dropped.

use std::sync::Arc;
use tracing::Subscriber;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ExportConfig;
use crate::console::MaskingMakeWriter;
use crate::context::TracingAgent;
use crate::error::Error;
use crate::export::{MaskingExportAppender, ShutdownOutcome};
use crate::layer::ExportLayer;
use crate::masking::MaskingProcessor;

/// Default filter directive when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info";

/// Keeps the export appender alive and stops it on drop
#[derive(Debug)]
pub struct AppenderGuard {
    appender: Arc<MaskingExportAppender>,
}

impl AppenderGuard {
    pub fn appender(&self) -> &Arc<MaskingExportAppender> {
        &self.appender
    }

    /// Stop now and report how the queue ended
    pub fn stop(self) -> ShutdownOutcome {
        self.appender.stop()
    }
}

impl Drop for AppenderGuard {
    fn drop(&mut self) {
        self.appender.stop();
    }
}

/// Install the global subscriber with the built-in masking rules
///
/// # Errors
///
/// Fails if the default rules do not compile or a global subscriber is
/// already installed.
pub fn init_logging(
    config: &ExportConfig,
    agent: Arc<dyn TracingAgent>,
) -> Result<AppenderGuard, Error> {
    let processor = Arc::new(MaskingProcessor::with_default_rules()?);
    init_logging_with(config, processor, agent)
}

/// Install the global subscriber with a custom masking processor
///
/// The same processor masks both console lines and exported messages.
pub fn init_logging_with(
    config: &ExportConfig,
    processor: Arc<MaskingProcessor>,
    agent: Arc<dyn TracingAgent>,
) -> Result<AppenderGuard, Error> {
    let appender = Arc::new(MaskingExportAppender::from_config(
        config,
        Arc::clone(&processor),
        agent,
    ));

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    build_subscriber(Arc::clone(&appender), processor)
        .with(filter)
        .try_init()?;

    appender.start();
    Ok(AppenderGuard { appender })
}

/// Registry with masked console output and the export layer, not installed
pub fn build_subscriber<C>(
    appender: Arc<MaskingExportAppender<C>>,
    processor: Arc<MaskingProcessor>,
) -> impl Subscriber + for<'a> LookupSpan<'a> + Send + Sync
where
    C: crate::export::ExportClient + 'static,
{
    let console = fmt::layer()
        .with_ansi(false)
        .with_writer(MaskingMakeWriter::stdout(processor));

    tracing_subscriber::registry()
        .with(console)
        .with(ExportLayer::new(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextExtractor, NoopAgent};
    use crate::error::ExportError;
    use crate::export::client::{DeliveryStatus, ExportClient};
    use crate::export::payload::ExportPayload;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        sent: Arc<Mutex<Vec<String>>>,
    }

    impl ExportClient for RecordingClient {
        fn is_configured(&self) -> bool {
            true
        }

        fn send(&self, payload: &ExportPayload) -> Result<DeliveryStatus, ExportError> {
            self.sent.lock().unwrap().push(payload.as_str().to_string());
            Ok(DeliveryStatus::Delivered { status: 202 })
        }
    }

    #[test]
    fn test_build_subscriber_exports_events() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let processor = Arc::new(MaskingProcessor::with_default_rules().unwrap());
        let appender = Arc::new(MaskingExportAppender::new(
            RecordingClient {
                sent: Arc::clone(&sent),
            },
            Arc::clone(&processor),
            ContextExtractor::new(Arc::new(NoopAgent)),
        ));
        appender.start();

        let subscriber = build_subscriber(Arc::clone(&appender), processor);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("payment with card 1234567812345678");
        });
        appender.stop();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("payment with card ***5678"));
    }

    #[test]
    fn test_guard_stops_appender() {
        let config = ExportConfig::default();
        let appender = Arc::new(MaskingExportAppender::from_config(
            &config,
            Arc::new(MaskingProcessor::with_default_rules().unwrap()),
            Arc::new(NoopAgent),
        ));
        let guard = AppenderGuard {
            appender: Arc::clone(&appender),
        };
        // No credential in the default config
        assert!(!guard.appender().is_configured());
        assert_eq!(guard.stop(), ShutdownOutcome::Drained);
    }
}
