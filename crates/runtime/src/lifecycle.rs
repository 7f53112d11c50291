//! Connector lifecycle
//!
//! Per-connector state machine:
//!
//! ```text
//! Idle ──> Initializing ──> Ready
//!                 └───────> Failed   (terminal until reset)
//! ```
//!
//! Initialization is single-flight per connector: concurrent requests share
//! one `initialize()` call and all observe its outcome. Each attempt carries
//! a token; an attempt whose connector was reset meanwhile does not record
//! its outcome.

use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use toolbridge_core::{Connector, ConnectorId, InitializationError};
use tracing::{debug, info, warn};

use crate::flight::FlightGroup;

/// Where a connector is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectorState {
    Idle,
    Initializing,
    Ready,
    Failed(InitializationError),
}

#[derive(Debug, Default)]
struct Table {
    states: HashMap<ConnectorId, ConnectorState>,
    /// Token of the attempt currently allowed to record an outcome
    attempts: HashMap<ConnectorId, u64>,
    next_attempt: u64,
}

impl Table {
    fn begin(&mut self, id: ConnectorId) -> u64 {
        let attempt = self.next_attempt;
        self.next_attempt += 1;
        self.attempts.insert(id, attempt);
        self.states.insert(id, ConnectorState::Initializing);
        attempt
    }

    /// Record the outcome of `attempt`; false if it was superseded
    fn finish(&mut self, id: ConnectorId, attempt: u64, state: ConnectorState) -> bool {
        if self.attempts.get(&id) != Some(&attempt) {
            return false;
        }
        self.attempts.remove(&id);
        self.states.insert(id, state);
        true
    }

    fn forget(&mut self, id: ConnectorId) {
        self.states.remove(&id);
        self.attempts.remove(&id);
    }

    fn clear(&mut self) {
        self.states.clear();
        self.attempts.clear();
    }
}

type StateTable = Arc<Mutex<Table>>;

/// Lifecycle bookkeeping for every connector an adapter has seen
#[derive(Debug)]
pub struct ConnectorLifecycle {
    states: StateTable,
    flights: FlightGroup<ConnectorId, (), InitializationError>,
    init_timeout: Duration,
}

impl ConnectorLifecycle {
    pub fn new(init_timeout: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(Table::default())),
            flights: FlightGroup::new(),
            init_timeout,
        }
    }

    pub fn state(&self, id: ConnectorId) -> ConnectorState {
        lock(&self.states)
            .states
            .get(&id)
            .cloned()
            .unwrap_or(ConnectorState::Idle)
    }

    /// Bring the connector to `Ready`, initializing it at most once.
    ///
    /// A connector in `Failed` returns its recorded error without retrying.
    pub async fn ensure_ready(
        &self,
        connector: &Arc<dyn Connector>,
    ) -> Result<(), InitializationError> {
        let id = connector.id();
        match self.state(id) {
            ConnectorState::Ready => return Ok(()),
            ConnectorState::Failed(err) => return Err(err),
            ConnectorState::Idle | ConnectorState::Initializing => {}
        }

        let states = Arc::clone(&self.states);
        let connector = Arc::clone(connector);
        let timeout = self.init_timeout;
        self.flights
            .run(id, move || initialize(states, connector, timeout).boxed())
            .await
    }

    /// Return a connector to `Idle`.
    ///
    /// An initialization still in flight keeps running for its waiters but
    /// leaves the state alone when it settles.
    pub fn reset(&self, id: ConnectorId) {
        lock(&self.states).forget(id);
        self.flights.invalidate(&id);
    }

    pub fn reset_all(&self) {
        lock(&self.states).clear();
        self.flights.clear();
    }
}

async fn initialize(
    states: StateTable,
    connector: Arc<dyn Connector>,
    timeout: Duration,
) -> Result<(), InitializationError> {
    let id = connector.id();
    let attempt = lock(&states).begin(id);

    let result = if connector.is_initialized() {
        Ok(())
    } else {
        info!(connector = %connector.name(), "Initializing connector");
        match tokio::time::timeout(timeout, connector.initialize()).await {
            Ok(result) => result,
            Err(_) => Err(InitializationError::Timeout {
                connector: connector.name().to_string(),
                timeout_ms: timeout_millis(timeout),
            }),
        }
    };

    let outcome = match &result {
        Ok(()) => ConnectorState::Ready,
        Err(err) => {
            warn!(connector = %connector.name(), error = %err, "Connector initialization failed");
            ConnectorState::Failed(err.clone())
        }
    };
    if !lock(&states).finish(id, attempt, outcome) {
        debug!(connector = %connector.name(), attempt, "Connector reset during initialization, outcome discarded");
    }
    result
}

fn timeout_millis(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX)
}

fn lock(states: &StateTable) -> MutexGuard<'_, Table> {
    states.lock().unwrap_or_else(PoisonError::into_inner)
}
