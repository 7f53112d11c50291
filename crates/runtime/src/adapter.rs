//! Tool Adapter - 编排入口
//!
//! 职责：
//! - 确保 connector 初始化 (single-flight)
//! - 过滤定义 → 批量转换 → 缓存
//! - 多 connector 聚合与冲突处理
//!
//! Connectors are processed concurrently; the aggregated result follows the
//! order the caller passed them in. When two connectors expose the same tool
//! name the first connector wins and the later tool is reported as a
//! collision.

use futures::FutureExt;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use toolbridge_core::{
    AdapterConfig, AdapterError, ConfigurationError, Connector, ConnectorHandle, ConnectorId,
    Definition, FilterConfig, InitializationError, ToolFilter,
};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Conversion, convert_definition};
use crate::batch::BatchConverter;
use crate::cache::{CacheEntry, CacheKey, ToolCache};
use crate::lifecycle::{ConnectorLifecycle, ConnectorState};
use crate::tool::ConvertedTool;

/// A connector whose contribution was lost
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorFailure {
    pub connector: ConnectorId,
    pub name: String,
    pub error: InitializationError,
}

/// A tool dropped because an earlier connector already claimed its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    /// Connector whose tool was kept
    pub kept: String,
    /// Connector whose tool was dropped
    pub dropped: String,
}

/// Tools from a multi-connector request, with what went missing
#[derive(Debug, Clone, Default)]
pub struct ToolCollection {
    pub tools: Vec<ConvertedTool>,
    pub failures: Vec<ConnectorFailure>,
    pub collisions: Vec<NameCollision>,
}

impl ToolCollection {
    /// No connector failed and no tool was shadowed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.collisions.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ConvertedTool::name).collect()
    }
}

/// What a conversion pass needs, detached from the adapter that started it
#[derive(Clone)]
struct PassContext {
    backend: Arc<dyn Backend>,
    lifecycle: Arc<ConnectorLifecycle>,
    batch: BatchConverter,
    call_timeout: Duration,
}

impl PassContext {
    async fn run(
        self,
        connector: Arc<dyn Connector>,
        filter: Arc<ToolFilter>,
    ) -> Result<CacheEntry, AdapterError> {
        self.lifecycle.ensure_ready(&connector).await?;

        let handle = ConnectorHandle::new(&connector);
        let definitions = filter.apply(connector.definitions(), |d| d.name());
        debug!(
            connector = %connector.name(),
            definitions = definitions.len(),
            "Converting definitions"
        );

        let backend = self.backend.as_ref();
        let outcome = self
            .batch
            .run(definitions, |definition| {
                let handle = &handle;
                async move {
                    let conversion = convert_definition(backend, &definition, handle).await;
                    conversion.map(|conversion| match conversion {
                        Conversion::Native(native) => Some((native, definition)),
                        Conversion::Skip => None,
                    })
                }
            })
            .await?;

        let mut names = HashSet::new();
        let mut tools = Vec::with_capacity(outcome.items.len());
        for (native, definition) in outcome.items {
            if !names.insert(native.name.clone()) {
                warn!(
                    connector = %connector.name(),
                    tool = %native.name,
                    "Dropping duplicate tool name"
                );
                continue;
            }
            tools.push(ConvertedTool::new(
                native,
                Arc::new(definition),
                handle.clone(),
                Arc::clone(&self.backend),
                Arc::clone(&self.lifecycle),
                self.call_timeout,
            ));
        }

        info!(
            connector = %connector.name(),
            tools = tools.len(),
            skipped = outcome.skipped,
            dropped = outcome.failures.len(),
            "Connector tools converted"
        );
        Ok(CacheEntry::new(tools, outcome.failures.len()))
    }
}

/// Adapts connector definitions into tools for one backend
pub struct ToolAdapter {
    backend: Arc<dyn Backend>,
    config: AdapterConfig,
    lifecycle: Arc<ConnectorLifecycle>,
    cache: ToolCache,
    batch: BatchConverter,
}

impl ToolAdapter {
    pub fn new(backend: impl Backend + 'static) -> Self {
        let config = AdapterConfig::default();
        Self {
            backend: Arc::new(backend),
            lifecycle: Arc::new(ConnectorLifecycle::new(config.init_timeout())),
            cache: ToolCache::new(),
            batch: BatchConverter::default(),
            config,
        }
    }

    pub fn with_config(
        backend: impl Backend + 'static,
        config: AdapterConfig,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self {
            backend: Arc::new(backend),
            lifecycle: Arc::new(ConnectorLifecycle::new(config.init_timeout())),
            cache: ToolCache::new(),
            batch: BatchConverter::new(config.chunk_size)?,
            config,
        })
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Tools for every connector that came up.
    ///
    /// Connectors that fail to initialize contribute nothing; see
    /// [`collect_tools`](Self::collect_tools) for the diagnostics.
    pub async fn create_tools(
        &self,
        connectors: &[Arc<dyn Connector>],
        filter: Option<&FilterConfig>,
    ) -> Result<Vec<ConvertedTool>, AdapterError> {
        Ok(self.collect_tools(connectors, filter).await?.tools)
    }

    pub async fn collect_tools(
        &self,
        connectors: &[Arc<dyn Connector>],
        filter: Option<&FilterConfig>,
    ) -> Result<ToolCollection, AdapterError> {
        let filter_config = filter.unwrap_or(&self.config.filter).clone();
        let filter = Arc::new(filter_config.compile()?);

        let results = join_all(
            connectors
                .iter()
                .map(|connector| self.connector_tools(connector, &filter_config, &filter)),
        )
        .await;

        let mut collection = ToolCollection::default();
        let mut owners: HashMap<String, (ConnectorId, String)> = HashMap::new();

        for (connector, result) in connectors.iter().zip(results) {
            let entry = match result {
                Ok(entry) => entry,
                Err(AdapterError::Initialization(error)) => {
                    warn!(connector = %connector.name(), error = %error, "Skipping connector");
                    collection.failures.push(ConnectorFailure {
                        connector: connector.id(),
                        name: connector.name().to_string(),
                        error,
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            for tool in entry.tools.iter() {
                match owners.get(tool.name()) {
                    // same connector listed twice
                    Some((owner, _)) if *owner == connector.id() => {}
                    Some((_, kept)) => {
                        warn!(
                            tool = %tool.name(),
                            kept = %kept,
                            dropped = %connector.name(),
                            "Tool name collision, keeping first connector"
                        );
                        collection.collisions.push(NameCollision {
                            name: tool.name().to_string(),
                            kept: kept.clone(),
                            dropped: connector.name().to_string(),
                        });
                    }
                    None => {
                        owners.insert(
                            tool.name().to_string(),
                            (connector.id(), connector.name().to_string()),
                        );
                        collection.tools.push(tool.clone());
                    }
                }
            }
        }

        Ok(collection)
    }

    /// Convert a single definition. The connector is not touched until the
    /// tool is first invoked.
    pub async fn create_tool(
        &self,
        definition: &Definition,
        connector: &Arc<dyn Connector>,
    ) -> Result<ConvertedTool, AdapterError> {
        let handle = ConnectorHandle::new(connector);
        match convert_definition(self.backend.as_ref(), definition, &handle).await? {
            Conversion::Native(native) => Ok(ConvertedTool::new(
                native,
                Arc::new(definition.clone()),
                handle,
                Arc::clone(&self.backend),
                Arc::clone(&self.lifecycle),
                self.config.call_timeout(),
            )),
            Conversion::Skip => Err(AdapterError::Skipped {
                kind: definition.kind(),
                name: definition.name().to_string(),
            }),
        }
    }

    pub fn connector_state(&self, id: ConnectorId) -> ConnectorState {
        self.lifecycle.state(id)
    }

    /// Return a connector to `Idle` and drop its cached tools
    pub fn reset(&self, id: ConnectorId) {
        self.lifecycle.reset(id);
        self.cache.invalidate_connector(id);
    }

    pub fn reset_all(&self) {
        self.lifecycle.reset_all();
        self.cache.clear();
    }

    pub fn cache(&self) -> &ToolCache {
        &self.cache
    }

    async fn connector_tools(
        &self,
        connector: &Arc<dyn Connector>,
        filter_config: &FilterConfig,
        filter: &Arc<ToolFilter>,
    ) -> Result<CacheEntry, AdapterError> {
        if let ConnectorState::Failed(error) = self.lifecycle.state(connector.id()) {
            return Err(error.into());
        }

        let key = CacheKey::new(connector.id(), filter_config.clone());
        let context = self.pass_context();
        let connector = Arc::clone(connector);
        let filter = Arc::clone(filter);
        self.cache
            .get_or_convert(key, move || context.run(connector, filter).boxed())
            .await
    }

    fn pass_context(&self) -> PassContext {
        PassContext {
            backend: Arc::clone(&self.backend),
            lifecycle: Arc::clone(&self.lifecycle),
            batch: self.batch,
            call_timeout: self.config.call_timeout(),
        }
    }
}

impl std::fmt::Debug for ToolAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolAdapter")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
