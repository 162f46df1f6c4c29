// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Immutable event snapshots captured on the producing thread

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;
use tracing::Level;

use super::event::LogEvent;
use crate::context::{ContextExtractor, TracingContext};
use crate::masking::MaskingProcessor;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Process-unique numeric id of the calling thread
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Error details flattened for export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorSnapshot {
    pub class_name: String,
    pub message: Option<String>,
    pub stack: String,
}

impl ErrorSnapshot {
    /// Copy with the message and stack text masked
    pub fn masked(&self, processor: &MaskingProcessor) -> ErrorSnapshot {
        ErrorSnapshot {
            class_name: self.class_name.clone(),
            message: self
                .message
                .as_deref()
                .map(|message| processor.process(message).into_owned()),
            stack: processor.process(&self.stack).into_owned(),
        }
    }
}

/// Everything the worker needs to export one event
///
/// Holds the raw, unmasked message: masking happens on the worker.
#[derive(Debug, Clone)]
pub struct LogEventSnapshot {
    pub message: String,
    pub logger_name: String,
    pub level: Level,
    pub thread_name: String,
    pub thread_id: u64,
    pub timestamp_millis: u64,
    pub attributes: BTreeMap<String, String>,
    pub context: TracingContext,
    pub error: Option<ErrorSnapshot>,
}

impl LogEventSnapshot {
    /// Freeze `event` together with the tracing context of the calling thread
    ///
    /// Must run on the thread that produced the event: the ambient trace scope
    /// is not visible from the worker.
    pub fn capture(event: &LogEvent, extractor: &ContextExtractor) -> Self {
        let timestamp_millis = event
            .timestamp()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);

        Self {
            message: event.message().to_string(),
            logger_name: event.logger_name().to_string(),
            level: event.level(),
            thread_name: event.thread_name().to_string(),
            thread_id: current_thread_id(),
            timestamp_millis,
            attributes: event.attributes().clone(),
            context: extractor.extract_all(),
            error: event.error().map(|error| ErrorSnapshot {
                class_name: error.class_name.clone(),
                message: error.message.clone(),
                stack: error.stack_text(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{enter_trace_scope, AmbientAgent, TraceScope};
    use crate::export::event::ErrorInfo;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    fn extractor() -> ContextExtractor {
        ContextExtractor::new(Arc::new(AmbientAgent::new().with_entity_name("orders")))
    }

    #[test]
    fn test_capture_reads_context_on_calling_thread() {
        let _guard = enter_trace_scope(TraceScope::new("trace-9", "span-9"));
        let event = LogEvent::new(Level::WARN, "orders", "DNI 12345678")
            .with_attribute("request.id", "r-1")
            .with_timestamp(UNIX_EPOCH + Duration::from_millis(1_700_000_000_123));

        let snapshot = LogEventSnapshot::capture(&event, &extractor());

        assert_eq!(snapshot.message, "DNI 12345678");
        assert_eq!(snapshot.level, Level::WARN);
        assert_eq!(snapshot.timestamp_millis, 1_700_000_000_123);
        assert_eq!(snapshot.context.trace_id.as_deref(), Some("trace-9"));
        assert_eq!(snapshot.context.entity_name.as_deref(), Some("orders"));
        assert_eq!(snapshot.attributes.get("request.id").map(String::as_str), Some("r-1"));
        assert_eq!(snapshot.thread_id, current_thread_id());
    }

    #[test]
    fn test_snapshot_moved_to_other_thread_keeps_context() {
        let _guard = enter_trace_scope(TraceScope::new("trace-1", "span-1"));
        let snapshot =
            LogEventSnapshot::capture(&LogEvent::new(Level::INFO, "orders", "x"), &extractor());
        let producer_id = current_thread_id();

        let (trace_id, worker_id) = std::thread::spawn(move || {
            (snapshot.context.trace_id.clone(), (snapshot.thread_id, current_thread_id()))
        })
        .join()
        .unwrap();

        assert_eq!(trace_id.as_deref(), Some("trace-1"));
        assert_eq!(worker_id.0, producer_id);
        assert_ne!(worker_id.1, producer_id);
    }

    #[test]
    fn test_error_snapshot_masked() {
        let event = LogEvent::new(Level::ERROR, "orders", "failed")
            .with_timestamp(SystemTime::now())
            .with_error(ErrorInfo::new("LookupError", "no customer 12345678"));
        let snapshot = LogEventSnapshot::capture(&event, &extractor());
        let processor = MaskingProcessor::with_default_rules().unwrap();

        let masked = snapshot.error.unwrap().masked(&processor);
        assert_eq!(masked.class_name, "LookupError");
        assert_eq!(masked.message.as_deref(), Some("no customer 12***78"));
        assert_eq!(masked.stack, "LookupError: no customer 12***78\n");
    }
}
