//! Lazy Invocable Wrapper
//!
//! Nothing expensive happens when a tool is created. The first `invoke`
//! brings the connector up and runs the backend's `prepare` hook; concurrent
//! first calls share that one setup, later calls reuse its result until the
//! connector is reset.

use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use toolbridge_core::{CallError, Connector, ConnectorHandle, Definition, InvokeError, RawResult};
use tracing::debug;

use crate::backend::{Backend, InvokeTarget, NativeTool, PreparedCall};
use crate::flight::FlightCell;
use crate::lifecycle::{ConnectorLifecycle, ConnectorState};
use crate::normalize::{NormalizedResult, normalize};

pub(crate) struct LazyInvoker {
    pub(crate) native: NativeTool,
    pub(crate) definition: Arc<Definition>,
    pub(crate) connector: ConnectorHandle,
    backend: Arc<dyn Backend>,
    lifecycle: Arc<ConnectorLifecycle>,
    call_timeout: Duration,
    prepared: FlightCell<Arc<PreparedCall>, InvokeError>,
}

impl LazyInvoker {
    pub(crate) fn new(
        native: NativeTool,
        definition: Arc<Definition>,
        connector: ConnectorHandle,
        backend: Arc<dyn Backend>,
        lifecycle: Arc<ConnectorLifecycle>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            native,
            definition,
            connector,
            backend,
            lifecycle,
            call_timeout,
            prepared: FlightCell::new(),
        }
    }

    pub(crate) fn is_prepared(&self) -> bool {
        self.prepared.is_settled()
    }

    pub(crate) async fn invoke(&self, args: Value) -> Result<NormalizedResult, InvokeError> {
        let tool = self.native.name.as_str();
        let connector = self
            .connector
            .upgrade()
            .ok_or_else(|| InvokeError::ConnectorDropped {
                tool: tool.to_string(),
            })?;

        let prepared = self.prepare(&connector).await?;

        let start = Instant::now();
        let outcome = match tokio::time::timeout(
            self.call_timeout,
            dispatch(connector.as_ref(), &prepared.target, args),
        )
        .await
        {
            Ok(outcome) => outcome,
            Err(_) => Err(CallError::Timeout(self.call_timeout)),
        };

        debug!(
            connector = %self.connector.name(),
            tool,
            ok = outcome.is_ok(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tool invoked"
        );
        normalize(tool, outcome)
    }

    /// One-time setup, shared by concurrent first callers.
    /// A failure is not memoized; the next invoke retries. A connector that
    /// is no longer `Ready` (reset since) runs setup again.
    async fn prepare(&self, connector: &Arc<dyn Connector>) -> Result<Arc<PreparedCall>, InvokeError> {
        if let Some(prepared) = self.prepared.get() {
            if self.lifecycle.state(connector.id()) == ConnectorState::Ready {
                return Ok(prepared);
            }
            debug!(connector = %connector.name(), tool = %self.native.name, "Connector reset, preparing again");
            self.prepared.reset();
        }

        let connector = Arc::clone(connector);
        let backend = Arc::clone(&self.backend);
        let lifecycle = Arc::clone(&self.lifecycle);
        let native = self.native.clone();

        self.prepared
            .get_or_run(move || setup(connector, backend, lifecycle, native).boxed())
            .await
    }
}

async fn setup(
    connector: Arc<dyn Connector>,
    backend: Arc<dyn Backend>,
    lifecycle: Arc<ConnectorLifecycle>,
    native: NativeTool,
) -> Result<Arc<PreparedCall>, InvokeError> {
    lifecycle.ensure_ready(&connector).await?;

    let prepared = backend
        .prepare(&native, connector.as_ref())
        .await
        .map_err(|err| InvokeError::Setup {
            tool: native.name.clone(),
            reason: err.to_string(),
        })?;

    debug!(connector = %connector.name(), tool = %native.name, "Tool prepared");
    Ok(Arc::new(prepared))
}

async fn dispatch(
    connector: &dyn Connector,
    target: &InvokeTarget,
    args: Value,
) -> Result<RawResult, CallError> {
    match target {
        InvokeTarget::CallTool { name } => connector.call(name, args).await,
        InvokeTarget::ReadResource { uri } => connector.read_resource(uri).await,
        InvokeTarget::GetPrompt { name } => connector.get_prompt(name, args).await,
    }
}
