//! In-memory connector implementation
//!
//! Serves fixed definitions and scripted responses. Used by embedders that
//! expose local capabilities through the same pipeline, and by tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

use super::{Connector, ConnectorId};
use crate::{
    CallError, InitializationError, PromptDefinition, RawResult, ResourceDefinition,
    ToolDefinition,
};

/// Connector backed by in-memory definitions and canned responses
#[derive(Debug)]
pub struct StaticConnector {
    id: ConnectorId,
    name: String,
    tools: Vec<ToolDefinition>,
    resources: Vec<ResourceDefinition>,
    prompts: Vec<PromptDefinition>,
    /// Keyed by tool name, resource URI or prompt name
    responses: HashMap<String, Result<RawResult, CallError>>,
    init_failure: Option<String>,
    init_delay: Option<Duration>,
    call_delay: Option<Duration>,
    initialized: AtomicBool,
    init_calls: AtomicUsize,
    calls: AtomicUsize,
}

impl StaticConnector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ConnectorId::new(),
            name: name.into(),
            tools: Vec::new(),
            resources: Vec::new(),
            prompts: Vec::new(),
            responses: HashMap::new(),
            init_failure: None,
            init_delay: None,
            call_delay: None,
            initialized: AtomicBool::new(false),
            init_calls: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool: ToolDefinition) -> Self {
        self.tools.push(tool);
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: impl IntoIterator<Item = ToolDefinition>) -> Self {
        self.tools.extend(tools);
        self
    }

    #[must_use]
    pub fn with_resource(mut self, resource: ResourceDefinition) -> Self {
        self.resources.push(resource);
        self
    }

    #[must_use]
    pub fn with_prompt(mut self, prompt: PromptDefinition) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Script the outcome for a tool name, resource URI or prompt name
    #[must_use]
    pub fn with_response(
        mut self,
        key: impl Into<String>,
        response: Result<RawResult, CallError>,
    ) -> Self {
        self.responses.insert(key.into(), response);
        self
    }

    #[must_use]
    pub fn with_init_failure(mut self, reason: impl Into<String>) -> Self {
        self.init_failure = Some(reason.into());
        self
    }

    #[must_use]
    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = Some(delay);
        self
    }

    #[must_use]
    pub fn with_call_delay(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Start out already initialized
    #[must_use]
    pub fn initialized(self) -> Self {
        self.initialized.store(true, Ordering::SeqCst);
        self
    }

    /// Number of `initialize` calls received
    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    /// Number of call / read / prompt requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, key: &str) -> Result<RawResult, CallError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.call_delay {
            tokio::time::sleep(delay).await;
        }

        match self.responses.get(key) {
            Some(response) => response.clone(),
            None => Err(CallError::Execution(format!("unknown capability: {key}"))),
        }
    }
}

#[async_trait]
impl Connector for StaticConnector {
    fn id(&self) -> ConnectorId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    async fn initialize(&self) -> Result<(), InitializationError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.init_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = &self.init_failure {
            return Err(InitializationError::failed(&self.name, reason.clone()));
        }

        self.initialized.store(true, Ordering::SeqCst);
        debug!(connector = %self.name, "Static connector initialized");
        Ok(())
    }

    fn tools(&self) -> Vec<ToolDefinition> {
        self.tools.clone()
    }

    fn resources(&self) -> Vec<ResourceDefinition> {
        self.resources.clone()
    }

    fn prompts(&self) -> Vec<PromptDefinition> {
        self.prompts.clone()
    }

    async fn call(&self, name: &str, _args: Value) -> Result<RawResult, CallError> {
        self.respond(name).await
    }

    async fn read_resource(&self, uri: &str) -> Result<RawResult, CallError> {
        self.respond(uri).await
    }

    async fn get_prompt(&self, name: &str, _args: Value) -> Result<RawResult, CallError> {
        self.respond(name).await
    }
}
