//! Converted tools handed to the host

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use toolbridge_core::{ConnectorHandle, ConnectorId, Definition, InvokeError};

use crate::backend::{Backend, InvokeTarget, NativeTool};
use crate::lazy::LazyInvoker;
use crate::lifecycle::ConnectorLifecycle;
use crate::normalize::NormalizedResult;

/// Host-native invocable wrapping one remote definition.
///
/// Cloning is cheap and clones share the lazy setup state. The tool holds
/// only a weak reference to its connector.
#[derive(Clone)]
pub struct ConvertedTool {
    inner: Arc<LazyInvoker>,
}

impl ConvertedTool {
    pub(crate) fn new(
        native: NativeTool,
        definition: Arc<Definition>,
        connector: ConnectorHandle,
        backend: Arc<dyn Backend>,
        lifecycle: Arc<ConnectorLifecycle>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(LazyInvoker::new(
                native,
                definition,
                connector,
                backend,
                lifecycle,
                call_timeout,
            )),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.native.name
    }

    pub fn description(&self) -> &str {
        &self.inner.native.description
    }

    pub fn schema(&self) -> &Value {
        &self.inner.native.schema
    }

    pub fn connector_id(&self) -> ConnectorId {
        self.inner.connector.id()
    }

    pub fn connector_name(&self) -> &str {
        self.inner.connector.name()
    }

    /// The remote definition this tool was converted from
    pub fn definition(&self) -> &Definition {
        &self.inner.definition
    }

    pub fn target(&self) -> &InvokeTarget {
        &self.inner.native.target
    }

    /// Whether the one-time setup has completed
    pub fn is_prepared(&self) -> bool {
        self.inner.is_prepared()
    }

    /// Same underlying instance (clones of one another)
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Call the tool.
    ///
    /// Tool failures and timeouts come back as [`NormalizedResult::Failure`];
    /// `Err` means the connector could not be used at all.
    pub async fn invoke(&self, args: Value) -> Result<NormalizedResult, InvokeError> {
        self.inner.invoke(args).await
    }
}

impl std::fmt::Debug for ConvertedTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertedTool")
            .field("name", &self.name())
            .field("connector", &self.connector_name())
            .field("target", self.target())
            .field("prepared", &self.is_prepared())
            .finish()
    }
}
