// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Distributed tracing context
//
// The ambient trace scope lives in a thread-local, so it must be read on the
// thread that produced the log event, before any hand-off to a worker.

pub mod agent;
pub mod ambient;
pub mod extractor;

pub use agent::{AmbientAgent, NoopAgent, TraceMetadata, TracingAgent};
pub use ambient::{current_trace_scope, enter_trace_scope, TraceScope, TraceScopeGuard};
pub use extractor::{ContextExtractor, TracingContext, DEFAULT_APP_NAME, DEFAULT_HOSTNAME};
