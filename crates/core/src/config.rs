//! Toolbridge 配置系统
//!
//! 支持 YAML 配置文件和环境变量

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{ConfigurationError, FilterConfig};

pub const ENV_CHUNK_SIZE: &str = "TOOLBRIDGE_CHUNK_SIZE";
pub const ENV_INIT_TIMEOUT_MS: &str = "TOOLBRIDGE_INIT_TIMEOUT_MS";
pub const ENV_CALL_TIMEOUT_MS: &str = "TOOLBRIDGE_CALL_TIMEOUT_MS";
pub const ENV_USE_PREFIX: &str = "TOOLBRIDGE_USE_PREFIX";

/// 主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Adapter 配置
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Backend 配置
    #[serde(default)]
    pub backend: BackendConfig,
}

impl BridgeConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_yaml::from_str(content)
            .map_err(|e| ConfigurationError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), "Loading toolbridge config");
        Self::from_yaml_str(&content)
    }

    /// Apply `TOOLBRIDGE_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigurationError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CHUNK_SIZE) {
            self.adapter.chunk_size = parse_env(ENV_CHUNK_SIZE, &value)?;
        }
        if let Some(value) = lookup(ENV_INIT_TIMEOUT_MS) {
            self.adapter.init_timeout_ms = parse_env(ENV_INIT_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_CALL_TIMEOUT_MS) {
            self.adapter.call_timeout_ms = parse_env(ENV_CALL_TIMEOUT_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_USE_PREFIX) {
            self.backend.use_prefix = parse_bool(ENV_USE_PREFIX, &value)?;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.adapter.validate()
    }
}

/// Adapter 配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// 批量转换的块大小
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Connector 初始化超时 (毫秒)
    #[serde(default = "default_timeout_ms")]
    pub init_timeout_ms: u64,

    /// 工具调用超时 (毫秒)
    #[serde(default = "default_timeout_ms")]
    pub call_timeout_ms: u64,

    /// 默认过滤器 (调用未指定时使用)
    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_chunk_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    30000
}

fn default_true() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            init_timeout_ms: default_timeout_ms(),
            call_timeout_ms: default_timeout_ms(),
            filter: FilterConfig::default(),
        }
    }
}

impl AdapterConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.chunk_size == 0 {
            return Err(ConfigurationError::InvalidChunkSize);
        }
        if self.init_timeout_ms == 0 {
            return Err(ConfigurationError::InvalidTimeout {
                field: "init_timeout_ms",
            });
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigurationError::InvalidTimeout {
                field: "call_timeout_ms",
            });
        }
        self.filter.compile()?;
        Ok(())
    }
}

/// Backend 配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// 工具名加上 connector 前缀 (e.g. "filesystem_read" instead of "read")
    #[serde(default)]
    pub use_prefix: bool,

    /// 将 resource 转换为工具
    #[serde(default = "default_true")]
    pub include_resources: bool,

    /// 将 prompt 转换为工具
    #[serde(default = "default_true")]
    pub include_prompts: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            use_prefix: false,
            include_resources: true,
            include_prompts: true,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigurationError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigurationError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigurationError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigurationError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
