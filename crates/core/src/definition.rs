//! Capability definitions advertised by a connector
//!
//! Tools, resources and prompts exactly as the remote server describes them.
//! These are plain values: the connector owns them, the adapter only reads.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// The empty JSON object schema (`{"type":"object","properties":{}}`).
pub fn empty_object_schema() -> Value {
    json!({
        "type": "object",
        "properties": {}
    })
}

/// Kind of capability a definition describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Tool,
    Resource,
    Prompt,
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tool => write!(f, "tool"),
            Self::Resource => write!(f, "resource"),
            Self::Prompt => write!(f, "prompt"),
        }
    }
}

/// Behaviour hints a server may attach to a tool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    #[serde(default)]
    pub read_only_hint: bool,
    #[serde(default)]
    pub destructive_hint: bool,
    #[serde(default)]
    pub idempotent_hint: bool,
    #[serde(default)]
    pub open_world_hint: bool,
}

/// A callable tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON Schema for the tool arguments
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
    #[serde(default)]
    pub annotations: ToolAnnotations,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: empty_object_schema(),
            annotations: ToolAnnotations::default(),
        }
    }

    #[must_use]
    pub fn with_schema(mut self, input_schema: Value) -> Self {
        self.input_schema = input_schema;
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, annotations: ToolAnnotations) -> Self {
        self.annotations = annotations;
        self
    }
}

/// A readable resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceDefinition {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: String::new(),
            mime_type: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

/// A prompt template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

impl PromptDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            arguments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_argument(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.arguments.push(PromptArgument {
            name: name.into(),
            description: description.into(),
            required,
        });
        self
    }

    /// Prompt arguments as a JSON object schema (all arguments are strings)
    pub fn arguments_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for arg in &self.arguments {
            let mut prop = serde_json::Map::new();
            prop.insert("type".to_string(), json!("string"));
            if !arg.description.is_empty() {
                prop.insert("description".to_string(), json!(arg.description));
            }
            properties.insert(arg.name.clone(), Value::Object(prop));

            if arg.required {
                required.push(arg.name.clone());
            }
        }

        let mut schema = json!({
            "type": "object",
            "properties": properties,
        });
        if !required.is_empty() {
            schema["required"] = json!(required);
        }
        schema
    }
}

/// Any capability a connector advertises
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Definition {
    Tool(ToolDefinition),
    Resource(ResourceDefinition),
    Prompt(PromptDefinition),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Self::Tool(tool) => &tool.name,
            Self::Resource(resource) => &resource.name,
            Self::Prompt(prompt) => &prompt.name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Tool(tool) => &tool.description,
            Self::Resource(resource) => &resource.description,
            Self::Prompt(prompt) => &prompt.description,
        }
    }

    /// Argument schema; resources take no arguments
    pub fn schema(&self) -> Value {
        match self {
            Self::Tool(tool) => tool.input_schema.clone(),
            Self::Resource(_) => empty_object_schema(),
            Self::Prompt(prompt) => prompt.arguments_schema(),
        }
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            Self::Tool(_) => DefinitionKind::Tool,
            Self::Resource(_) => DefinitionKind::Resource,
            Self::Prompt(_) => DefinitionKind::Prompt,
        }
    }
}

impl From<ToolDefinition> for Definition {
    fn from(tool: ToolDefinition) -> Self {
        Self::Tool(tool)
    }
}

impl From<ResourceDefinition> for Definition {
    fn from(resource: ResourceDefinition) -> Self {
        Self::Resource(resource)
    }
}

impl From<PromptDefinition> for Definition {
    fn from(prompt: PromptDefinition) -> Self {
        Self::Prompt(prompt)
    }
}
