// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Tracing agent interface and the built-in agents

use std::collections::HashMap;

use super::ambient;
use crate::error::AgentError;

/// Linking metadata key for the entity guid
pub const ENTITY_GUID: &str = "entity.guid";
/// Linking metadata key for the entity (service) name
pub const ENTITY_NAME: &str = "entity.name";
/// Linking metadata key for the host name
pub const HOSTNAME: &str = "hostname";

/// Identifiers of the trace active on the calling thread
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceMetadata {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
}

/// Source of distributed tracing context
///
/// Both calls read the state of the calling thread. Implementations may fail
/// at any time; callers treat failures as missing values.
pub trait TracingAgent: Send + Sync {
    fn trace_metadata(&self) -> Result<TraceMetadata, AgentError>;

    /// Entity and host metadata keyed by [`ENTITY_GUID`], [`ENTITY_NAME`] and [`HOSTNAME`]
    fn linking_metadata(&self) -> Result<HashMap<String, String>, AgentError>;
}

/// Agent backed by the thread-local trace scope and static linking metadata
#[derive(Debug, Clone, Default)]
pub struct AmbientAgent {
    linking: HashMap<String, String>,
}

impl AmbientAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_guid(self, guid: impl Into<String>) -> Self {
        self.with_linking(ENTITY_GUID, guid)
    }

    pub fn with_entity_name(self, name: impl Into<String>) -> Self {
        self.with_linking(ENTITY_NAME, name)
    }

    pub fn with_hostname(self, hostname: impl Into<String>) -> Self {
        self.with_linking(HOSTNAME, hostname)
    }

    fn with_linking(mut self, key: &str, value: impl Into<String>) -> Self {
        self.linking.insert(key.to_string(), value.into());
        self
    }
}

impl TracingAgent for AmbientAgent {
    fn trace_metadata(&self) -> Result<TraceMetadata, AgentError> {
        Ok(ambient::current_trace_scope()
            .map(|scope| TraceMetadata {
                trace_id: Some(scope.trace_id().to_string()),
                span_id: Some(scope.span_id().to_string()),
            })
            .unwrap_or_default())
    }

    fn linking_metadata(&self) -> Result<HashMap<String, String>, AgentError> {
        Ok(self.linking.clone())
    }
}

/// Agent used when no tracing backend is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAgent;

impl TracingAgent for NoopAgent {
    fn trace_metadata(&self) -> Result<TraceMetadata, AgentError> {
        Err(AgentError::Unavailable)
    }

    fn linking_metadata(&self) -> Result<HashMap<String, String>, AgentError> {
        Err(AgentError::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ambient::{enter_trace_scope, TraceScope};

    #[test]
    fn test_ambient_agent_reads_thread_scope() {
        let agent = AmbientAgent::new();
        assert_eq!(agent.trace_metadata().unwrap(), TraceMetadata::default());

        let _guard = enter_trace_scope(TraceScope::new("abc", "def"));
        let meta = agent.trace_metadata().unwrap();
        assert_eq!(meta.trace_id.as_deref(), Some("abc"));
        assert_eq!(meta.span_id.as_deref(), Some("def"));
    }

    #[test]
    fn test_ambient_agent_linking() {
        let agent = AmbientAgent::new()
            .with_entity_guid("guid-1")
            .with_entity_name("ms-order")
            .with_hostname("host-a");
        let linking = agent.linking_metadata().unwrap();
        assert_eq!(linking.get(ENTITY_GUID).map(String::as_str), Some("guid-1"));
        assert_eq!(linking.get(ENTITY_NAME).map(String::as_str), Some("ms-order"));
        assert_eq!(linking.get(HOSTNAME).map(String::as_str), Some("host-a"));
    }

    #[test]
    fn test_noop_agent_unavailable() {
        assert!(matches!(NoopAgent.trace_metadata(), Err(AgentError::Unavailable)));
        assert!(NoopAgent.linking_metadata().is_err());
    }
}
