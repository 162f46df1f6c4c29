// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Inbound log events

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::time::SystemTime;
use tracing::Level;

/// A log event as handed to the appender
#[derive(Debug, Clone)]
pub struct LogEvent {
    message: String,
    logger_name: String,
    level: Level,
    thread_name: String,
    timestamp: SystemTime,
    attributes: BTreeMap<String, String>,
    error: Option<ErrorInfo>,
}

impl LogEvent {
    /// New event stamped with the current time and the calling thread's name
    pub fn new(level: Level, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            logger_name: logger_name.into(),
            level,
            thread_name: current_thread_name(),
            timestamp: SystemTime::now(),
            attributes: BTreeMap::new(),
            error: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes<I, K, V>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.attributes
            .extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn with_error(mut self, error: ErrorInfo) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Correlation attributes, ordered by key
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref()
    }
}

pub(crate) fn current_thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("unnamed")
        .to_string()
}

/// Error attached to a log event, with its cause chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub class_name: String,
    pub message: Option<String>,
    pub frames: Vec<String>,
    pub cause: Option<Box<ErrorInfo>>,
}

impl ErrorInfo {
    pub fn new(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            message: Some(message.into()),
            frames: Vec::new(),
            cause: None,
        }
    }

    pub fn with_frames<I, S>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frames = frames.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cause(mut self, cause: ErrorInfo) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Build from a typed error, naming it after its Rust type
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        let mut info = Self::from_dyn_error(error);
        info.class_name = std::any::type_name::<E>().to_string();
        info
    }

    /// Build from a type-erased error and its `source()` chain
    ///
    /// The class name is taken from the leading identifier of the `Debug`
    /// representation, which is the type or variant name for derived impls.
    pub fn from_dyn_error(error: &(dyn StdError + 'static)) -> Self {
        let message = error.to_string();
        Self {
            class_name: debug_class_name(error),
            message: (!message.is_empty()).then_some(message),
            frames: Vec::new(),
            cause: error.source().map(|source| Box::new(Self::from_dyn_error(source))),
        }
    }

    /// Flatten into stack text: header line, frame lines, then each cause
    pub fn stack_text(&self) -> String {
        let mut out = String::new();
        let mut current = Some(self);
        while let Some(info) = current {
            if !out.is_empty() {
                out.push_str("Caused by: ");
            }
            out.push_str(&info.class_name);
            if let Some(message) = &info.message {
                out.push_str(": ");
                out.push_str(message);
            }
            out.push('\n');
            for frame in &info.frames {
                out.push_str("\tat ");
                out.push_str(frame);
                out.push('\n');
            }
            current = info.cause.as_deref();
        }
        out
    }
}

fn debug_class_name(error: &(dyn StdError + 'static)) -> String {
    let debug = format!("{:?}", error);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == ':')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}
