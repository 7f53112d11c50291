//! Connector contract
//!
//! A connector owns the session to a remote capability server. This crate
//! never talks to the server itself; it reads the connector's definitions and
//! routes invocations through it.

mod memory;

pub use memory::StaticConnector;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::{
    CallError, Definition, InitializationError, PromptDefinition, RawResult, ResourceDefinition,
    ToolDefinition,
};

/// Stable connector identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectorId(pub Uuid);

impl ConnectorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectorId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session to a remote capability server
#[async_trait]
pub trait Connector: Send + Sync {
    fn id(&self) -> ConnectorId;

    /// Display name, also used for tool name prefixes
    fn name(&self) -> &str;

    fn is_initialized(&self) -> bool;

    async fn initialize(&self) -> Result<(), InitializationError>;

    fn tools(&self) -> Vec<ToolDefinition>;

    fn resources(&self) -> Vec<ResourceDefinition> {
        Vec::new()
    }

    fn prompts(&self) -> Vec<PromptDefinition> {
        Vec::new()
    }

    /// Everything advertised, in order: tools, resources, prompts
    fn definitions(&self) -> Vec<Definition> {
        let mut definitions: Vec<Definition> =
            self.tools().into_iter().map(Definition::Tool).collect();
        definitions.extend(self.resources().into_iter().map(Definition::Resource));
        definitions.extend(self.prompts().into_iter().map(Definition::Prompt));
        definitions
    }

    async fn call(&self, name: &str, args: Value) -> Result<RawResult, CallError>;

    async fn read_resource(&self, uri: &str) -> Result<RawResult, CallError> {
        Err(CallError::Execution(format!(
            "connector '{}' does not support reading resources ({uri})",
            self.name()
        )))
    }

    async fn get_prompt(&self, name: &str, _args: Value) -> Result<RawResult, CallError> {
        Err(CallError::Execution(format!(
            "connector '{}' does not support prompts ({name})",
            self.name()
        )))
    }
}

/// Shared connector reference
pub type SharedConnector = Arc<dyn Connector>;

/// Non-owning reference to a connector.
///
/// Identity and name are captured at creation so diagnostics keep working
/// after the connector itself is gone.
#[derive(Clone)]
pub struct ConnectorHandle {
    id: ConnectorId,
    name: Arc<str>,
    connector: Weak<dyn Connector>,
}

impl ConnectorHandle {
    pub fn new(connector: &Arc<dyn Connector>) -> Self {
        Self {
            id: connector.id(),
            name: Arc::from(connector.name()),
            connector: Arc::downgrade(connector),
        }
    }

    pub fn id(&self) -> ConnectorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Strong reference, if the connector is still alive
    pub fn upgrade(&self) -> Option<Arc<dyn Connector>> {
        self.connector.upgrade()
    }

    pub fn is_alive(&self) -> bool {
        self.connector.strong_count() > 0
    }
}

impl std::fmt::Debug for ConnectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}
