//! Tool Cache
//!
//! Per-connector memoization of conversion passes. Entries are keyed by the
//! connector identity and the filter the pass ran with; a completed entry is
//! immutable until the connector is invalidated.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::sync::Arc;
use toolbridge_core::{AdapterError, ConnectorId, FilterConfig};
use tracing::debug;

use crate::flight::FlightGroup;
use crate::tool::ConvertedTool;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub connector: ConnectorId,
    pub filter: FilterConfig,
}

impl CacheKey {
    pub fn new(connector: ConnectorId, filter: FilterConfig) -> Self {
        Self { connector, filter }
    }
}

/// Result of one completed conversion pass
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Converted tools in the connector's advertised order
    pub tools: Arc<Vec<ConvertedTool>>,
    pub completed_at: DateTime<Utc>,
    /// Definitions dropped because their conversion failed
    pub dropped: usize,
}

impl CacheEntry {
    pub fn new(tools: Vec<ConvertedTool>, dropped: usize) -> Self {
        Self {
            tools: Arc::new(tools),
            completed_at: Utc::now(),
            dropped,
        }
    }
}

/// Single-flight cache of conversion passes
#[derive(Debug, Default)]
pub struct ToolCache {
    entries: FlightGroup<CacheKey, CacheEntry, AdapterError>,
}

impl ToolCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached entry, or the result of the (single) pass producing it
    pub async fn get_or_convert<F>(&self, key: CacheKey, pass: F) -> Result<CacheEntry, AdapterError>
    where
        F: FnOnce() -> BoxFuture<'static, Result<CacheEntry, AdapterError>>,
    {
        self.entries.run(key, pass).await
    }

    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.get(key)
    }

    /// Drop every entry of a connector
    pub fn invalidate_connector(&self, connector: ConnectorId) -> usize {
        let removed = self.entries.invalidate_where(|key| key.connector == connector);
        debug!(connector = %connector, removed, "Invalidated cached tools");
        removed
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Conversion passes started since creation
    pub fn conversion_passes(&self) -> usize {
        self.entries.started()
    }
}
