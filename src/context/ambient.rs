// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Thread-local trace scope propagation

use std::cell::RefCell;

/// Trace and span identifiers active on the current thread
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TraceScope {
    trace_id: String,
    span_id: String,
}

impl TraceScope {
    pub fn new(trace_id: impl Into<String>, span_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.span_id
    }
}

thread_local! {
    static CURRENT_SCOPE: RefCell<Option<TraceScope>> = const { RefCell::new(None) };
}

/// Guard that restores the previous trace scope on drop
#[derive(Debug)]
pub struct TraceScopeGuard {
    previous: Option<TraceScope>,
}

impl Drop for TraceScopeGuard {
    fn drop(&mut self) {
        CURRENT_SCOPE.with(|slot| {
            *slot.borrow_mut() = self.previous.take();
        });
    }
}

/// Enter a trace scope for the current thread
#[must_use]
pub fn enter_trace_scope(scope: TraceScope) -> TraceScopeGuard {
    let previous = CURRENT_SCOPE.with(|slot| slot.borrow_mut().replace(scope));
    TraceScopeGuard { previous }
}

/// Trace scope of the current thread, if any
pub fn current_trace_scope() -> Option<TraceScope> {
    CURRENT_SCOPE.with(|slot| slot.borrow().clone())
}
