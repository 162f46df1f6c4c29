// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Asynchronous export of masked log events
//
// Capture happens on the producing thread; masking, payload construction and
// HTTP delivery run on one worker per appender.

pub mod appender;
pub mod client;
pub mod dispatcher;
pub mod event;
pub mod payload;
pub mod snapshot;

pub use appender::{AppenderSettings, MaskingExportAppender};
pub use client::{DeliveryStatus, ExportClient, HttpExportClient, DEFAULT_LOG_API_URL};
pub use dispatcher::{AsyncDispatcher, ShutdownOutcome};
pub use event::{ErrorInfo, LogEvent};
pub use payload::{ExportPayload, PayloadBuilder};
pub use snapshot::{ErrorSnapshot, LogEventSnapshot};
