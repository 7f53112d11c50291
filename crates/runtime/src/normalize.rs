//! Result Normalizer
//!
//! Folds whatever a connector returns into a single string outcome. Tool
//! failures stay values so the calling agent can react to them; only a
//! broken connection or a malformed response escalates.

use serde::{Deserialize, Serialize};
use toolbridge_core::{CallError, Content, EmbeddedResource, InvokeError, RawResult};

/// Canonical outcome of an invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "output", rename_all = "lowercase")]
pub enum NormalizedResult {
    Success(String),
    Failure(String),
}

impl NormalizedResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn output(&self) -> &str {
        match self {
            Self::Success(output) | Self::Failure(output) => output,
        }
    }

    pub fn into_output(self) -> String {
        match self {
            Self::Success(output) | Self::Failure(output) => output,
        }
    }
}

impl std::fmt::Display for NormalizedResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success(output) => write!(f, "{output}"),
            Self::Failure(output) => write!(f, "Error: {output}"),
        }
    }
}

/// Normalize the outcome of calling `tool`
pub fn normalize(
    tool: &str,
    outcome: Result<RawResult, CallError>,
) -> Result<NormalizedResult, InvokeError> {
    match outcome {
        Ok(raw) => {
            let text = render_content(&raw.content);
            if raw.is_error {
                let message = if text.is_empty() {
                    format!("Tool '{tool}' reported an error")
                } else {
                    text
                };
                Ok(NormalizedResult::Failure(message))
            } else {
                Ok(NormalizedResult::Success(text))
            }
        }
        Err(CallError::Execution(message)) => Ok(NormalizedResult::Failure(message)),
        Err(CallError::Timeout(after)) => Ok(NormalizedResult::Failure(format!(
            "Tool '{tool}' timed out after {}ms",
            after.as_millis()
        ))),
        Err(CallError::Transport(message)) => Err(InvokeError::Transport {
            tool: tool.to_string(),
            message,
        }),
        Err(CallError::Protocol(message)) => Err(InvokeError::Protocol {
            tool: tool.to_string(),
            message,
        }),
    }
}

/// Render content segments in order, one per line
pub fn render_content(content: &[Content]) -> String {
    content
        .iter()
        .map(render_segment)
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_segment(segment: &Content) -> String {
    match segment {
        Content::Text { text } => text.clone(),
        Content::Image { mime_type, .. } => format!("[Image: {mime_type}]"),
        Content::Audio { mime_type, .. } => format!("[Audio: {mime_type}]"),
        Content::Resource { resource } => render_resource(resource),
    }
}

fn render_resource(resource: &EmbeddedResource) -> String {
    match (&resource.text, &resource.blob) {
        (Some(text), _) => text.clone(),
        (None, Some(blob)) => format!("[Resource blob: {} bytes]", decoded_len(blob)),
        (None, None) => format!("[Resource: {}]", resource.uri),
    }
}

/// Byte length of a base64 payload
fn decoded_len(blob: &str) -> usize {
    let trimmed = blob.trim_end_matches('=');
    trimmed.len() * 3 / 4
}
