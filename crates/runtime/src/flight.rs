//! Single-flight coordination
//!
//! The first caller for a key installs a shared pending computation; later
//! callers attach to it and get the same settled result. Successes are
//! memoized until invalidated; failures are handed to every waiter and then
//! forgotten so a later call can start over.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

type Flight<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

enum Slot<T, E> {
    Pending(Flight<T, E>),
    Done(T),
}

enum Lookup<T, E> {
    Done(T),
    Wait(Flight<T, E>),
}

/// Keyed single-flight group
pub struct FlightGroup<K, T, E> {
    slots: Mutex<HashMap<K, Slot<T, E>>>,
    started: AtomicUsize,
}

impl<K, T, E> FlightGroup<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            started: AtomicUsize::new(0),
        }
    }

    /// Return the memoized value, join the pending flight, or start one with `start`
    pub async fn run<F>(&self, key: K, start: F) -> Result<T, E>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, E>>,
    {
        let flight = match self.join_or_start(&key, start) {
            Lookup::Done(value) => return Ok(value),
            Lookup::Wait(flight) => flight,
        };

        let result = flight.clone().await;
        self.settle(&key, &flight, &result);
        result
    }

    fn join_or_start<F>(&self, key: &K, start: F) -> Lookup<T, E>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, E>>,
    {
        let mut slots = self.lock();
        match slots.get(key) {
            Some(Slot::Done(value)) => Lookup::Done(value.clone()),
            Some(Slot::Pending(flight)) => Lookup::Wait(flight.clone()),
            None => {
                let flight = start().shared();
                self.started.fetch_add(1, Ordering::SeqCst);
                slots.insert(key.clone(), Slot::Pending(flight.clone()));
                Lookup::Wait(flight)
            }
        }
    }

    /// Record the outcome, unless the slot was invalidated or replaced meanwhile
    fn settle(&self, key: &K, flight: &Flight<T, E>, result: &Result<T, E>) {
        let mut slots = self.lock();
        let current = matches!(
            slots.get(key),
            Some(Slot::Pending(pending)) if pending.ptr_eq(flight)
        );
        if !current {
            return;
        }

        match result {
            Ok(value) => {
                slots.insert(key.clone(), Slot::Done(value.clone()));
            }
            Err(_) => {
                slots.remove(key);
            }
        }
    }

    /// Memoized value for `key`, if settled successfully
    pub fn get(&self, key: &K) -> Option<T> {
        match self.lock().get(key) {
            Some(Slot::Done(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        matches!(self.lock().get(key), Some(Slot::Pending(_)))
    }

    /// Forget `key`. A flight still pending keeps running for its waiters,
    /// but its result is not memoized.
    pub fn invalidate(&self, key: &K) -> bool {
        self.lock().remove(key).is_some()
    }

    /// Forget every key the predicate matches
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&K) -> bool,
    {
        let mut slots = self.lock();
        let before = slots.len();
        slots.retain(|key, _| !predicate(key));
        before - slots.len()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Settled plus pending keys
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of computations started over the group's lifetime
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot<T, E>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<K, T, E> Default for FlightGroup<K, T, E>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T, E> std::fmt::Debug for FlightGroup<K, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightGroup")
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Single-flight cell for one value
pub struct FlightCell<T, E> {
    group: FlightGroup<(), T, E>,
}

impl<T, E> FlightCell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            group: FlightGroup::new(),
        }
    }

    pub async fn get_or_run<F>(&self, start: F) -> Result<T, E>
    where
        F: FnOnce() -> BoxFuture<'static, Result<T, E>>,
    {
        self.group.run((), start).await
    }

    pub fn get(&self) -> Option<T> {
        self.group.get(&())
    }

    pub fn is_settled(&self) -> bool {
        self.get().is_some()
    }

    pub fn reset(&self) {
        self.group.invalidate(&());
    }

    pub fn started(&self) -> usize {
        self.group.started()
    }
}

impl<T, E> Default for FlightCell<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> std::fmt::Debug for FlightCell<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightCell")
            .field("started", &self.group.started.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}
