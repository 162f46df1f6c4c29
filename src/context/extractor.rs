// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Fault-tolerant extraction of tracing and host context

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;

use super::agent::{TraceMetadata, TracingAgent, ENTITY_GUID, ENTITY_NAME, HOSTNAME};

/// Service name used when neither the agent nor the configuration provide one
pub const DEFAULT_APP_NAME: &str = "ms-order";

/// Host name used when the local host name cannot be resolved
pub const DEFAULT_HOSTNAME: &str = "unknown";

/// Tracing context captured at a single point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracingContext {
    pub trace_id: Option<String>,
    pub span_id: Option<String>,
    pub entity_guid: Option<String>,
    pub entity_name: Option<String>,
    pub hostname: Option<String>,
}

/// Reads tracing context through a [`TracingAgent`]
///
/// Every accessor swallows agent failures and reports them as a missing value.
/// `entity_name` and `hostname` fall back to local defaults.
pub struct ContextExtractor {
    agent: Arc<dyn TracingAgent>,
    default_app_name: String,
    local_hostname: OnceCell<String>,
}

impl ContextExtractor {
    pub fn new(agent: Arc<dyn TracingAgent>) -> Self {
        Self {
            agent,
            default_app_name: DEFAULT_APP_NAME.to_string(),
            local_hostname: OnceCell::new(),
        }
    }

    pub fn with_default_app_name(mut self, name: impl Into<String>) -> Self {
        self.default_app_name = name.into();
        self
    }

    pub fn trace_id(&self) -> Option<String> {
        self.trace_metadata().trace_id.filter(|v| !v.is_empty())
    }

    pub fn span_id(&self) -> Option<String> {
        self.trace_metadata().span_id.filter(|v| !v.is_empty())
    }

    pub fn entity_guid(&self) -> Option<String> {
        linking_value(&self.linking_metadata(), ENTITY_GUID)
    }

    pub fn entity_name(&self) -> Option<String> {
        Some(self.entity_name_from(&self.linking_metadata()))
    }

    pub fn hostname(&self) -> Option<String> {
        Some(self.hostname_from(&self.linking_metadata()))
    }

    /// Capture the whole context with one read of each agent call
    pub fn extract_all(&self) -> TracingContext {
        let trace = self.trace_metadata();
        let linking = self.linking_metadata();

        TracingContext {
            trace_id: trace.trace_id.filter(|v| !v.is_empty()),
            span_id: trace.span_id.filter(|v| !v.is_empty()),
            entity_guid: linking_value(&linking, ENTITY_GUID),
            entity_name: Some(self.entity_name_from(&linking)),
            hostname: Some(self.hostname_from(&linking)),
        }
    }

    fn trace_metadata(&self) -> TraceMetadata {
        self.agent.trace_metadata().unwrap_or_default()
    }

    fn linking_metadata(&self) -> HashMap<String, String> {
        self.agent.linking_metadata().unwrap_or_default()
    }

    fn entity_name_from(&self, linking: &HashMap<String, String>) -> String {
        linking_value(linking, ENTITY_NAME).unwrap_or_else(|| self.default_app_name.clone())
    }

    fn hostname_from(&self, linking: &HashMap<String, String>) -> String {
        linking_value(linking, HOSTNAME).unwrap_or_else(|| self.local_hostname().to_string())
    }

    fn local_hostname(&self) -> &str {
        self.local_hostname.get_or_init(|| {
            hostname::get()
                .ok()
                .and_then(|name| name.into_string().ok())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| DEFAULT_HOSTNAME.to_string())
        })
    }
}

impl std::fmt::Debug for ContextExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextExtractor")
            .field("default_app_name", &self.default_app_name)
            .finish_non_exhaustive()
    }
}

fn linking_value(linking: &HashMap<String, String>, key: &str) -> Option<String> {
    linking.get(key).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::agent::{AmbientAgent, NoopAgent};
    use crate::context::ambient::{enter_trace_scope, TraceScope};
    use crate::error::AgentError;

    struct FailingLinkingAgent;

    impl TracingAgent for FailingLinkingAgent {
        fn trace_metadata(&self) -> Result<TraceMetadata, AgentError> {
            Ok(TraceMetadata {
                trace_id: Some("trace-1".to_string()),
                span_id: Some(String::new()),
            })
        }

        fn linking_metadata(&self) -> Result<HashMap<String, String>, AgentError> {
            Err(AgentError::Failed("boom".to_string()))
        }
    }

    #[test]
    fn test_extract_all_from_ambient_agent() {
        let agent = AmbientAgent::new()
            .with_entity_guid("guid-1")
            .with_entity_name("orders")
            .with_hostname("host-a");
        let extractor = ContextExtractor::new(Arc::new(agent));

        let _guard = enter_trace_scope(TraceScope::new("abc", "def"));
        let ctx = extractor.extract_all();
        assert_eq!(
            ctx,
            TracingContext {
                trace_id: Some("abc".to_string()),
                span_id: Some("def".to_string()),
                entity_guid: Some("guid-1".to_string()),
                entity_name: Some("orders".to_string()),
                hostname: Some("host-a".to_string()),
            }
        );
    }

    #[test]
    fn test_unavailable_agent_uses_fallbacks() {
        let extractor =
            ContextExtractor::new(Arc::new(NoopAgent)).with_default_app_name("billing");

        assert_eq!(extractor.trace_id(), None);
        assert_eq!(extractor.span_id(), None);
        assert_eq!(extractor.entity_guid(), None);
        assert_eq!(extractor.entity_name().as_deref(), Some("billing"));

        let hostname = extractor.hostname().unwrap();
        assert!(!hostname.is_empty());
    }

    #[test]
    fn test_failures_are_independent() {
        let extractor = ContextExtractor::new(Arc::new(FailingLinkingAgent));
        assert_eq!(extractor.trace_id().as_deref(), Some("trace-1"));
        // Empty identifiers count as missing
        assert_eq!(extractor.span_id(), None);
        assert_eq!(extractor.entity_guid(), None);
        assert_eq!(extractor.entity_name().as_deref(), Some(DEFAULT_APP_NAME));
    }

    #[test]
    fn test_hostname_resolved_once() {
        let extractor = ContextExtractor::new(Arc::new(NoopAgent));
        let first = extractor.hostname();
        assert_eq!(extractor.hostname(), first);
    }
}
