//! Namespaced backend
//!
//! Tool names follow `mcp__{connector}__{tool}` so tools from different
//! servers never shadow each other. Resources and prompts have no
//! representation here and are skipped.

use async_trait::async_trait;
use toolbridge_core::{
    ConnectorHandle, ConversionError, DefinitionKind, PromptDefinition, ResourceDefinition,
    ToolDefinition,
};

use super::{Backend, Conversion, InvokeTarget, NativeTool, object_schema};

const NAME_PREFIX: &str = "mcp";

#[derive(Debug, Clone, Copy, Default)]
pub struct NamespacedBackend;

impl NamespacedBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn namespaced_name(connector: &str, tool: &str) -> String {
        format!("{NAME_PREFIX}__{connector}__{tool}")
    }
}

#[async_trait]
impl Backend for NamespacedBackend {
    fn name(&self) -> &str {
        "namespaced"
    }

    async fn convert_tool(
        &self,
        tool: &ToolDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        let schema = object_schema(&tool.input_schema).ok_or_else(|| {
            ConversionError::failed(
                DefinitionKind::Tool,
                &tool.name,
                "input schema must be a JSON object schema",
            )
        })?;

        let description = if tool.description.is_empty() {
            format!("MCP tool: {}", tool.name)
        } else {
            tool.description.clone()
        };

        Ok(Conversion::Native(NativeTool {
            name: Self::namespaced_name(connector.name(), &tool.name),
            description,
            schema,
            target: InvokeTarget::CallTool {
                name: tool.name.clone(),
            },
        }))
    }

    async fn convert_resource(
        &self,
        _resource: &ResourceDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Ok(Conversion::Skip)
    }

    async fn convert_prompt(
        &self,
        _prompt: &PromptDefinition,
        _connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        Ok(Conversion::Skip)
    }
}
