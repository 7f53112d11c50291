//! Function-calling backend
//!
//! Targets hosts that take OpenAI-style function definitions:
//! - names restricted to `[A-Za-z0-9_-]`, at most 64 characters
//! - parameters always a JSON object schema
//! - resources exposed as `read_{name}` tools, prompts as `prompt_{name}`

use async_trait::async_trait;
use serde_json::{Value, json};
use toolbridge_core::{
    BackendConfig, ConnectorHandle, ConversionError, DefinitionKind, PromptDefinition,
    ResourceDefinition, ToolDefinition, empty_object_schema,
};

use super::{Backend, Conversion, InvokeTarget, NativeTool, object_schema};
use crate::tool::ConvertedTool;

const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct FunctionBackend {
    config: BackendConfig,
}

impl FunctionBackend {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    /// Agent-facing name, prefixed with the connector name when configured
    fn agent_name(
        &self,
        kind: DefinitionKind,
        base: &str,
        connector: &ConnectorHandle,
    ) -> Result<String, ConversionError> {
        let raw = if self.config.use_prefix {
            format!("{}_{}", connector.name(), base)
        } else {
            base.to_string()
        };

        let name = sanitize_name(&raw);
        if name.trim_matches('_').is_empty() {
            return Err(ConversionError::failed(
                kind,
                base,
                "name has no usable characters",
            ));
        }
        Ok(name)
    }
}

#[async_trait]
impl Backend for FunctionBackend {
    fn name(&self) -> &str {
        "function"
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

        Ok(Conversion::Native(NativeTool {
            name: self.agent_name(DefinitionKind::Tool, &tool.name, connector)?,
            description: tool.description.clone(),
            schema,
            target: InvokeTarget::CallTool {
                name: tool.name.clone(),
            },
        }))
    }

    async fn convert_resource(
        &self,
        resource: &ResourceDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        if !self.config.include_resources {
            return Ok(Conversion::Skip);
        }

        let description = if resource.description.is_empty() {
            format!("Read the resource {}", resource.uri)
        } else {
            resource.description.clone()
        };

        Ok(Conversion::Native(NativeTool {
            name: self.agent_name(
                DefinitionKind::Resource,
                &format!("read_{}", resource.name),
                connector,
            )?,
            description,
            schema: empty_object_schema(),
            target: InvokeTarget::ReadResource {
                uri: resource.uri.clone(),
            },
        }))
    }

    async fn convert_prompt(
        &self,
        prompt: &PromptDefinition,
        connector: &ConnectorHandle,
    ) -> Result<Conversion, ConversionError> {
        if !self.config.include_prompts {
            return Ok(Conversion::Skip);
        }

        Ok(Conversion::Native(NativeTool {
            name: self.agent_name(
                DefinitionKind::Prompt,
                &format!("prompt_{}", prompt.name),
                connector,
            )?,
            description: prompt.description.clone(),
            schema: prompt.arguments_schema(),
            target: InvokeTarget::GetPrompt {
                name: prompt.name.clone(),
            },
        }))
    }
}

/// Replace characters outside `[A-Za-z0-9_-]` and cap the length
fn sanitize_name(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_NAME_LEN)
        .collect()
}

/// Function definition for one converted tool
pub fn function_schema(tool: &ConvertedTool) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name(),
            "description": tool.description(),
            "parameters": tool.schema(),
        }
    })
}

/// Function definitions for a tool set, as a JSON array
pub fn function_schemas(tools: &[ConvertedTool]) -> Value {
    Value::Array(tools.iter().map(function_schema).collect())
}
