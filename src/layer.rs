// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// tracing-subscriber layer feeding the masking export appender
//
// Span fields play the role of per-thread correlation attributes: every
// event carries the fields of its enclosing spans, root first, with the
// event's own fields on top.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::export::appender::is_exporting;
use crate::export::client::{ExportClient, HttpExportClient};
use crate::export::event::{ErrorInfo, LogEvent};
use crate::export::MaskingExportAppender;

/// Crates whose events are never exported: this one and the HTTP stack that
/// delivers exports, which logs from its own runtime threads
const IGNORED_CRATES: &[&str] = &[
    "masking_exporter",
    "reqwest",
    "hyper",
    "hyper_util",
    "h2",
    "rustls",
    "tokio_rustls",
    "want",
];

fn is_ignored_target(target: &str) -> bool {
    let krate = target.split("::").next().unwrap_or(target);
    IGNORED_CRATES.contains(&krate)
}

/// Correlation fields recorded on a span
#[derive(Debug, Clone, Default)]
struct SpanFields(BTreeMap<String, String>);

/// Collects event or span fields as strings
#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
    error: Option<ErrorInfo>,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = Some(value);
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn StdError + 'static)) {
        if self.error.is_none() {
            self.error = Some(ErrorInfo::from_dyn_error(value));
        } else {
            self.insert(field, value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, format!("{:?}", value));
    }
}

/// Hands every `tracing` event to a [`MaskingExportAppender`]
///
/// Capture runs synchronously inside `on_event`, so the ambient trace scope of
/// the producing thread is recorded before the event leaves it.
pub struct ExportLayer<C: ExportClient + 'static = HttpExportClient> {
    appender: Arc<MaskingExportAppender<C>>,
}

impl<C: ExportClient + 'static> ExportLayer<C> {
    pub fn new(appender: Arc<MaskingExportAppender<C>>) -> Self {
        Self { appender }
    }

    pub fn appender(&self) -> &Arc<MaskingExportAppender<C>> {
        &self.appender
    }
}

impl<S, C> Layer<S> for ExportLayer<C>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    C: ExportClient + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(SpanFields(visitor.fields));
        }
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        values.record(&mut visitor);

        if let Some(span) = ctx.span(id) {
            let mut extensions = span.extensions_mut();
            match extensions.get_mut::<SpanFields>() {
                Some(fields) => fields.0.extend(visitor.fields),
                None => extensions.insert(SpanFields(visitor.fields)),
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_exporting() || is_ignored_target(metadata.target()) || !self.appender.is_started() {
            return;
        }

        let mut attributes = BTreeMap::new();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                if let Some(fields) = span.extensions().get::<SpanFields>() {
                    attributes.extend(fields.0.iter().map(|(k, v)| (k.clone(), v.clone())));
                }
            }
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);
        attributes.extend(visitor.fields);

        let mut log_event = LogEvent::new(
            *metadata.level(),
            metadata.target(),
            visitor.message.unwrap_or_default(),
        )
        .with_attributes(attributes);
        if let Some(error) = visitor.error {
            log_event = log_event.with_error(error);
        }

        self.appender.append(&log_event);
    }
}

impl<C: ExportClient + 'static> fmt::Debug for ExportLayer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportLayer")
            .field("appender", &self.appender)
            .finish()
    }
}
