// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Masking export appender: capture on the caller, mask and send on a worker

use once_cell::sync::OnceCell;
use std::cell::Cell;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::client::{ExportClient, HttpExportClient};
use super::dispatcher::{AsyncDispatcher, ShutdownOutcome, DEFAULT_GRACE_PERIOD, DEFAULT_QUEUE_CAPACITY};
use super::event::LogEvent;
use super::payload::PayloadBuilder;
use super::snapshot::LogEventSnapshot;
use crate::config::ExportConfig;
use crate::context::{ContextExtractor, TracingAgent};
use crate::error::DispatchError;
use crate::masking::MaskingProcessor;
use crate::DIAGNOSTICS_TARGET;

thread_local! {
    static EXPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Whether the current thread is masking or sending an exported event
///
/// Events raised while this holds, such as the HTTP stack's own logs, must
/// not be appended again.
pub fn is_exporting() -> bool {
    EXPORTING.with(Cell::get)
}

/// Marks the current thread as exporting until dropped
struct ExportingGuard {
    previous: bool,
}

impl ExportingGuard {
    fn enter() -> Self {
        Self {
            previous: EXPORTING.with(|flag| flag.replace(true)),
        }
    }
}

impl Drop for ExportingGuard {
    fn drop(&mut self) {
        EXPORTING.with(|flag| flag.set(self.previous));
    }
}

/// Queue and shutdown tuning for one appender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppenderSettings {
    pub queue_capacity: usize,
    pub shutdown_grace: Duration,
}

impl Default for AppenderSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            shutdown_grace: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Sends masked log events to the log ingestion backend
///
/// `append` only snapshots the event on the calling thread and queues it.
/// Masking, payload construction and delivery happen on the appender's own
/// worker, one event at a time, in submission order.
pub struct MaskingExportAppender<C: ExportClient + 'static = HttpExportClient> {
    id: Uuid,
    client: Arc<C>,
    processor: Arc<MaskingProcessor>,
    extractor: ContextExtractor,
    settings: AppenderSettings,
    dispatcher: OnceCell<AsyncDispatcher<LogEventSnapshot>>,
}

impl MaskingExportAppender<HttpExportClient> {
    /// Appender wired from resolved configuration
    pub fn from_config(
        config: &ExportConfig,
        processor: Arc<MaskingProcessor>,
        agent: Arc<dyn TracingAgent>,
    ) -> Self {
        let extractor = ContextExtractor::new(agent).with_default_app_name(config.app_name.clone());
        Self::new(HttpExportClient::from_config(config), processor, extractor).with_settings(
            AppenderSettings {
                queue_capacity: config.queue_capacity,
                shutdown_grace: config.shutdown_grace,
            },
        )
    }
}

impl<C: ExportClient + 'static> MaskingExportAppender<C> {
    pub fn new(client: C, processor: Arc<MaskingProcessor>, extractor: ContextExtractor) -> Self {
        Self {
            id: Uuid::new_v4(),
            client: Arc::new(client),
            processor,
            extractor,
            settings: AppenderSettings::default(),
            dispatcher: OnceCell::new(),
        }
    }

    pub fn with_settings(mut self, settings: AppenderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn processor(&self) -> &Arc<MaskingProcessor> {
        &self.processor
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    /// Whether the worker is running and accepting events
    pub fn is_started(&self) -> bool {
        self.dispatcher
            .get()
            .is_some_and(|dispatcher| dispatcher.is_running())
    }

    /// Spawn the worker
    ///
    /// Without a credential the appender stays idle and every `append` is a
    /// no-op. Starting twice, or after `stop`, does nothing.
    pub fn start(&self) {
        if self.dispatcher.get().is_some() {
            return;
        }

        if !self.client.is_configured() {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                appender = %self.id,
                "Log API credential not found, logs will not be exported"
            );
            return;
        }

        let client = Arc::clone(&self.client);
        let processor = Arc::clone(&self.processor);
        let id = self.id;
        let spawned = AsyncDispatcher::spawn(
            format!("masking-exporter-{}", &id.simple().to_string()[..8]),
            self.settings.queue_capacity,
            move |snapshot: LogEventSnapshot| export_snapshot(client.as_ref(), &processor, &snapshot, id),
        );

        match spawned {
            Ok(dispatcher) => {
                if self.dispatcher.set(dispatcher).is_ok() {
                    tracing::info!(
                        target: DIAGNOSTICS_TARGET,
                        appender = %self.id,
                        queue_capacity = self.settings.queue_capacity,
                        "Masking export appender started"
                    );
                }
            }
            Err(e) => {
                tracing::error!(
                    target: DIAGNOSTICS_TARGET,
                    appender = %self.id,
                    error = %e,
                    "Failed to spawn export worker"
                );
            }
        }
    }

    /// Capture `event` on the calling thread and queue it for export
    ///
    /// Never blocks on masking or network I/O. Does nothing, not even a
    /// context read, unless the appender is configured and started.
    pub fn append(&self, event: &LogEvent) {
        if !self.client.is_configured() {
            return;
        }
        let Some(dispatcher) = self.dispatcher.get().filter(|d| d.is_running()) else {
            return;
        };

        let snapshot = LogEventSnapshot::capture(event, &self.extractor);
        match dispatcher.dispatch(snapshot) {
            Ok(()) => {}
            Err(DispatchError::QueueFull) => {
                tracing::warn!(
                    target: DIAGNOSTICS_TARGET,
                    appender = %self.id,
                    "Export queue full, dropping log event"
                );
            }
            // Lost the race with stop()
            Err(DispatchError::Stopped) => {}
        }
    }

    /// Drain queued events for the grace period, then cancel the rest
    ///
    /// Never fails; safe to call more than once.
    pub fn stop(&self) -> ShutdownOutcome {
        let Some(dispatcher) = self.dispatcher.get() else {
            return ShutdownOutcome::Drained;
        };
        let outcome = dispatcher.shutdown(self.settings.shutdown_grace);
        tracing::debug!(
            target: DIAGNOSTICS_TARGET,
            appender = %self.id,
            outcome = ?outcome,
            "Masking export appender stopped"
        );
        outcome
    }
}

impl<C: ExportClient + 'static> std::fmt::Debug for MaskingExportAppender<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaskingExportAppender")
            .field("id", &self.id)
            .field("configured", &self.client.is_configured())
            .field("started", &self.is_started())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// Worker side: mask, build and send one snapshot
fn export_snapshot<C: ExportClient + ?Sized>(
    client: &C,
    processor: &MaskingProcessor,
    snapshot: &LogEventSnapshot,
    appender: Uuid,
) {
    let _exporting = ExportingGuard::enter();
    let message = processor.process(&snapshot.message);
    let error = snapshot.error.as_ref().map(|error| error.masked(processor));
    let payload = PayloadBuilder::new(snapshot, &message)
        .with_error(error.as_ref())
        .mask_attributes(processor)
        .build();

    match client.send(&payload) {
        Ok(status) if status.is_delivered() => {
            tracing::trace!(
                target: DIAGNOSTICS_TARGET,
                appender = %appender,
                status = status.status(),
                "Log delivered"
            );
        }
        Ok(status) => {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                appender = %appender,
                status = status.status(),
                "Log API rejected payload"
            );
        }
        Err(e) => {
            tracing::warn!(
                target: DIAGNOSTICS_TARGET,
                appender = %appender,
                error = %e,
                "Failed to send log to Log API"
            );
        }
    }
}
