// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// PII-masking log exporter
//
// Redacts sensitive data from log events before they leave the process and
// ships them to a log ingestion API with their tracing context intact.

//! Mask personally identifiable information in logs, then export them.
//!
//! The pipeline has two halves:
//!
//! - On the producing thread, [`MaskingExportAppender::append`] freezes the
//!   event and the ambient tracing context into a snapshot.
//! - On the appender's worker thread, the snapshot is masked with a
//!   [`MaskingProcessor`], serialized and sent with an [`ExportClient`].
//!
//! # Examples
//!
//! ```
//! use masking_exporter::MaskingProcessor;
//!
//! let processor = MaskingProcessor::with_default_rules()?;
//! let masked = processor.process("DNI 12345678, card 1234567812345678");
//! assert_eq!(masked, "DNI 12***78, card ***5678");
//! # Ok::<(), masking_exporter::error::MaskingError>(())
//! ```
//!
//! Wiring into `tracing`:
//!
//! ```no_run
//! use std::sync::Arc;
//! use masking_exporter::{init_logging, AmbientAgent, ExportConfig, Properties};
//!
//! let config = ExportConfig::resolve(&Properties::new())?;
//! let _guard = init_logging(&config, Arc::new(AmbientAgent::new()))?;
//! tracing::info!("customer 12345678 created an order");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod console;
pub mod context;
pub mod error;
pub mod export;
pub mod layer;
pub mod logging;
pub mod masking;

/// Target of this crate's own diagnostics; never exported
pub const DIAGNOSTICS_TARGET: &str = "masking_exporter::diagnostics";

pub use config::{ExportConfig, Properties};
pub use console::MaskingMakeWriter;
pub use context::{
    enter_trace_scope, AmbientAgent, ContextExtractor, NoopAgent, TraceScope, TracingAgent,
    TracingContext,
};
pub use error::Error;
pub use export::{
    DeliveryStatus, ErrorInfo, ExportClient, HttpExportClient, LogEvent, MaskingExportAppender,
    ShutdownOutcome,
};
pub use layer::ExportLayer;
pub use logging::{init_logging, init_logging_with, AppenderGuard};
pub use masking::{mask_uri, MaskingProcessor, MaskingRule, MaskingStrategy, SensitiveCategory};
