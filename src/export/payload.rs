// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Log API wire payload
//
// The payload is assembled by hand so the attribute order is fixed and no
// intermediate JSON tree is allocated per event.

use std::fmt::Write as _;

use super::snapshot::{ErrorSnapshot, LogEventSnapshot};
use crate::context::agent::{ENTITY_GUID, ENTITY_NAME, HOSTNAME};
use crate::masking::MaskingProcessor;

pub const INSTRUMENTATION: &str = "masking-exporter";
pub const LOGGER_FQCN: &str = "tracing::Event";
pub const NEWRELIC_SOURCE: &str = "logs.APM";

pub const TRACE_ID: &str = "trace.id";
pub const SPAN_ID: &str = "span.id";

/// Attribute names written by the builder itself
const RESERVED_KEYS: &[&str] = &[
    "level",
    "log.level",
    "logger.name",
    "logger.fqcn",
    "thread.name",
    "thread.id",
    "newrelic.source",
    TRACE_ID,
    SPAN_ID,
    ENTITY_GUID,
    "entity.guids",
    ENTITY_NAME,
    HOSTNAME,
    "error.class",
    "error.message",
    "error.stack",
];

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Serialized request body, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload(String);

impl ExportPayload {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Builds one [`ExportPayload`] from a snapshot and its masked message
pub struct PayloadBuilder<'a> {
    snapshot: &'a LogEventSnapshot,
    message: &'a str,
    error: Option<&'a ErrorSnapshot>,
    attribute_masking: Option<&'a MaskingProcessor>,
}

impl<'a> PayloadBuilder<'a> {
    pub fn new(snapshot: &'a LogEventSnapshot, masked_message: &'a str) -> Self {
        Self {
            snapshot,
            message: masked_message,
            error: None,
            attribute_masking: None,
        }
    }

    /// Error details to export, normally already masked
    pub fn with_error(mut self, error: Option<&'a ErrorSnapshot>) -> Self {
        self.error = error;
        self
    }

    /// Mask the values of free-form correlation attributes
    pub fn mask_attributes(mut self, processor: &'a MaskingProcessor) -> Self {
        self.attribute_masking = Some(processor);
        self
    }

    pub fn build(&self) -> ExportPayload {
        let snapshot = self.snapshot;
        let context = &snapshot.context;

        let trace_id = self.effective(TRACE_ID, context.trace_id.as_deref());
        let span_id = self.effective(SPAN_ID, context.span_id.as_deref());
        let entity_guid = self.effective(ENTITY_GUID, context.entity_guid.as_deref());
        let entity_name = self.effective(ENTITY_NAME, context.entity_name.as_deref());
        let hostname = self.effective(HOSTNAME, context.hostname.as_deref());

        let mut json = String::with_capacity(512 + self.message.len());

        json.push_str("[{\"common\":{\"attributes\":{");
        json.push_str("\"logtype\":\"application\"");
        push_str_field(&mut json, "service", entity_name.unwrap_or_default());
        push_str_field(&mut json, "hostname", hostname.unwrap_or_default());
        push_str_field(&mut json, "instrumentation", INSTRUMENTATION);
        json.push_str("}},");

        json.push_str("\"logs\":[{");
        let _ = write!(json, "\"timestamp\":{}", snapshot.timestamp_millis);
        push_str_field(&mut json, "message", self.message);

        json.push_str(",\"attributes\":{");
        let level = snapshot.level.to_string();
        json.push_str("\"level\":");
        push_json_string(&mut json, &level);
        push_str_field(&mut json, "log.level", &level);
        push_str_field(&mut json, "logger.name", &snapshot.logger_name);
        push_str_field(&mut json, "logger.fqcn", LOGGER_FQCN);
        push_str_field(&mut json, "thread.name", &snapshot.thread_name);
        let _ = write!(json, ",\"thread.id\":{}", snapshot.thread_id);
        push_str_field(&mut json, "newrelic.source", NEWRELIC_SOURCE);

        push_opt_field(&mut json, TRACE_ID, trace_id);
        push_opt_field(&mut json, SPAN_ID, span_id);
        push_opt_field(&mut json, ENTITY_GUID, entity_guid);
        push_opt_field(&mut json, "entity.guids", entity_guid);
        push_opt_field(&mut json, ENTITY_NAME, entity_name);
        push_opt_field(&mut json, HOSTNAME, hostname);

        if let Some(error) = self.error {
            push_opt_field(&mut json, "error.class", Some(error.class_name.as_str()));
            push_opt_field(&mut json, "error.message", error.message.as_deref());
            push_opt_field(&mut json, "error.stack", Some(error.stack.as_str()));
        }

        for (key, value) in &snapshot.attributes {
            if is_reserved(key) {
                continue;
            }
            match self.attribute_masking {
                Some(processor) => push_str_field(&mut json, key, &processor.process(value)),
                None => push_str_field(&mut json, key, value),
            }
        }

        json.push_str("}}]}]");
        ExportPayload(json)
    }

    /// A non-empty correlation attribute wins over the captured context
    fn effective(&self, key: &str, fallback: Option<&'a str>) -> Option<&'a str> {
        self.snapshot
            .attributes
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .or(fallback)
            .filter(|v| !v.is_empty())
    }
}

fn push_str_field(json: &mut String, key: &str, value: &str) {
    json.push(',');
    push_json_string(json, key);
    json.push(':');
    push_json_string(json, value);
}

fn push_opt_field(json: &mut String, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        push_str_field(json, key, value);
    }
}

/// Append `value` as a quoted JSON string
pub fn push_json_string(json: &mut String, value: &str) {
    json.push('"');
    for c in value.chars() {
        match c {
            '"' => json.push_str("\\\""),
            '\\' => json.push_str("\\\\"),
            '\n' => json.push_str("\\n"),
            '\r' => json.push_str("\\r"),
            '\t' => json.push_str("\\t"),
            '\u{08}' => json.push_str("\\b"),
            '\u{0C}' => json.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(json, "\\u{:04x}", c as u32);
            }
            c => json.push(c),
        }
    }
    json.push('"');
}
