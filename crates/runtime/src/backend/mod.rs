//! Backends - 转换目标
//!
//! A backend turns remote definitions into the shape one host framework
//! expects. Each backend is chosen when the adapter is built; the adapter
//! never inspects types at runtime to pick one.
//!
//! The three conversion hooks fail with `ConversionError::NotImplemented`
//! unless overridden. A backend that has no use for a kind returns
//! [`Conversion::Skip`] instead of leaving the hook out.

mod function;
mod namespaced;

pub use function::{FunctionBackend, function_schema, function_schemas};
pub use namespaced::NamespacedBackend;

use async_trait::async_trait;
use serde_json::Value;
use toolbridge_core::{
    Connector, ConnectorHandle, ConversionError, Definition, PromptDefinition,
    ResourceDefinition, ToolDefinition,
};

/// What an invocation ends up calling on the connector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeTarget {
    CallTool { name: String },
    ReadResource { uri: String },
    GetPrompt { name: String },
}

/// Backend-native description of one invocable
#[derive(Debug, Clone, PartialEq)]
pub struct NativeTool {
    pub name: String,
    pub description: String,
    pub schema: Value,
    pub target: InvokeTarget,
}

/// Outcome of a conversion hook
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Native(NativeTool),
    /// The backend has no representation for this definition
    Skip,
}

/// State produced by the one-time setup before a tool's first call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub target: InvokeTarget,
}

impl PreparedCall {
    pub fn new(target: InvokeTarget) -> Self {
        Self { target }
    }
}

/// Conversion target for one host framework
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    async fn convert_tool(
        &self,
        _tool: &ToolDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Err(ConversionError::not_implemented(self.name(), "convert_tool"))
    }

    async fn convert_resource(
        &self,
        _resource: &ResourceDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Err(ConversionError::not_implemented(self.name(), "convert_resource"))
    }

    async fn convert_prompt(
        &self,
        _prompt: &PromptDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Err(ConversionError::not_implemented(self.name(), "convert_prompt"))
    }

    /// Expensive per-tool setup, run once on first invocation
    async fn prepare(
        &self,
        tool: &NativeTool,
        _connector: &dyn Connector,
    ) -> Result<PreparedCall, ConversionError> {
        Ok(PreparedCall::new(tool.target.clone()))
    }
}

/// Dispatch a definition to the matching hook
pub async fn convert_definition(
    backend: &dyn Backend,
    definition: &Definition,
    connector: &ConnectorHandle,
) -> Result<Conversion, ConversionError> {
    match definition {
        Definition::Tool(tool) => backend.convert_tool(tool, connector).await,
        Definition::Resource(resource) => backend.convert_resource(resource, connector).await,
        Definition::Prompt(prompt) => backend.convert_prompt(prompt, connector).await,
    }
}

/// Coerce an input schema into a JSON object schema.
///
/// `null` becomes the empty object schema; a missing `type` is filled in.
pub(crate) fn object_schema(schema: &Value) -> Option<Value> {
    match schema {
        Value::Null => Some(toolbridge_core::empty_object_schema()),
        Value::Object(map) => {
            let mut map = map.clone();
            match map.get("type") {
                None => {
                    map.insert("type".to_string(), Value::String("object".to_string()));
                }
                Some(Value::String(t)) if t == "object" => {}
                Some(_) => return None,
            }
            map.entry("properties")
                .or_insert_with(|| Value::Object(serde_json::Map::new()));
            Some(Value::Object(map))
        }
        _ => None,
    }
}
