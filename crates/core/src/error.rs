//! Error taxonomy
//!
//! Every enum here is `Clone` so one settled result can be handed to every
//! caller waiting on the same single-flight computation.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::DefinitionKind;

/// Invalid filter or configuration input. Fatal to the triggering call only.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid {field} pattern '{pattern}': {reason}")]
    InvalidPattern {
        field: &'static str,
        pattern: String,
        reason: String,
    },

    #[error("empty name in {field} list")]
    EmptyName { field: &'static str },

    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("{field} must be greater than zero")]
    InvalidTimeout { field: &'static str },

    #[error("failed to read config {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },
}

/// A definition could not be turned into a native tool
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    /// The backend lacks a conversion hook it was asked to run
    #[error("backend '{backend}' does not implement {hook}")]
    NotImplemented { backend: String, hook: &'static str },

    #[error("cannot convert {kind} '{name}': {reason}")]
    Failed {
        kind: DefinitionKind,
        name: String,
        reason: String,
    },
}

impl ConversionError {
    pub fn not_implemented(backend: impl Into<String>, hook: &'static str) -> Self {
        Self::NotImplemented {
            backend: backend.into(),
            hook,
        }
    }

    pub fn failed(kind: DefinitionKind, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Programming misuse, not a per-item problem
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

/// A connector failed to start
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InitializationError {
    #[error("connector '{connector}' failed to initialize: {reason}")]
    Failed { connector: String, reason: String },

    #[error("connector '{connector}' did not initialize within {timeout_ms}ms")]
    Timeout { connector: String, timeout_ms: u64 },
}

impl InitializationError {
    pub fn failed(connector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Failed {
            connector: connector.into(),
            reason: reason.into(),
        }
    }
}

/// Failure reported by `Connector::call` and friends
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// The tool ran and failed
    #[error("{0}")]
    Execution(String),

    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The connector could not be reached
    #[error("transport error: {0}")]
    Transport(String),

    /// The connector answered with something unparseable
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// Conditions `invoke` escalates instead of normalizing
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("connector for tool '{tool}' is no longer available")]
    ConnectorDropped { tool: String },

    #[error("tool '{tool}' could not reach its connector: {message}")]
    Transport { tool: String, message: String },

    #[error("tool '{tool}' received a malformed response: {message}")]
    Protocol { tool: String, message: String },

    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error("setup for tool '{tool}' failed: {reason}")]
    Setup { tool: String, reason: String },
}

/// Hard failures surfaced by the adapter facade
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Initialization(#[from] InitializationError),

    #[error("backend skipped {kind} '{name}'")]
    Skipped { kind: DefinitionKind, name: String },
}
