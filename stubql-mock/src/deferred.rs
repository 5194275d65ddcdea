//! Deferred results and the setup handle

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use stubql_core::{InvocationError, OperationId, StubResult, StubValue};

pub(crate) type Producer<T> = Arc<dyn Fn() -> StubValue<T> + Send + Sync>;
pub(crate) type Callback = Arc<dyn Fn() + Send + Sync>;

/// Producer plus optional callback for one binding.
///
/// With no producer the binding is unconfigured and yields `Null`.
pub struct DeferredResult<T> {
    producer: Option<Producer<T>>,
    callback: Option<Callback>,
}

impl<T> Default for DeferredResult<T> {
    fn default() -> Self {
        Self {
            producer: None,
            callback: None,
        }
    }
}

impl<T> DeferredResult<T> {
    pub fn is_configured(&self) -> bool {
        self.producer.is_some()
    }
}

/// Shared state behind a binding and its [`Setup`] handles.
pub(crate) struct Slot<T> {
    deferred: RwLock<DeferredResult<T>>,
    invocations: AtomicUsize,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            deferred: RwLock::new(DeferredResult::default()),
            invocations: AtomicUsize::new(0),
        }
    }

    /// Run the current producer. The callback is handed back so the caller
    /// can fire it once the value has been consumed.
    pub(crate) fn pull(&self) -> StubResult<(StubValue<T>, Option<Callback>)> {
        let (producer, callback) = {
            let guard = self
                .deferred
                .read()
                .map_err(|_| InvocationError::LockPoisoned)?;
            (guard.producer.clone(), guard.callback.clone())
        };
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let value = producer.map(|produce| produce()).unwrap_or_default();
        Ok((value, callback))
    }

    pub(crate) fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Drop the producer and callback, releasing whatever they captured.
    pub(crate) fn clear(&self) {
        let released = {
            let mut guard = self
                .deferred
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        drop(released);
    }

    fn update(&self, f: impl FnOnce(&mut DeferredResult<T>)) {
        let mut guard = self
            .deferred
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut *guard);
    }
}

/// Handle for configuring one stubbed operation.
///
/// Cloning yields another handle to the same binding, so a callback can
/// hold a clone and change the result for later invocations. Such a
/// callback keeps the binding alive until the connection is reset or
/// dropped. A handle whose operation has been registered again no longer
/// affects the connection.
pub struct Setup<T> {
    operation: OperationId,
    slot: Arc<Slot<T>>,
}

impl<T> Clone for Setup<T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> std::fmt::Debug for Setup<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setup")
            .field("operation", &self.operation)
            .field("invocations", &self.slot.invocation_count())
            .finish()
    }
}

impl<T: 'static> Setup<T> {
    pub(crate) fn new(operation: OperationId, slot: Arc<Slot<T>>) -> Self {
        Self { operation, slot }
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    /// Return a fixed value on every invocation.
    pub fn returns<V>(&self, value: V) -> &Self
    where
        V: Into<StubValue<T>>,
        T: Clone + Send + Sync,
    {
        let value = value.into();
        self.set_producer(Arc::new(move || value.clone()))
    }

    /// Compute the value on every invocation.
    pub fn returns_with<V, F>(&self, producer: F) -> &Self
    where
        V: Into<StubValue<T>>,
        F: Fn() -> V + Send + Sync + 'static,
    {
        self.set_producer(Arc::new(move || -> StubValue<T> { producer().into() }))
    }

    /// Return the values in order, one per invocation, repeating the last.
    /// An empty sequence behaves like an unconfigured binding.
    pub fn returns_sequence<V, I>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = V>,
        V: Into<StubValue<T>>,
        T: Clone + Send + Sync,
    {
        let values: Vec<StubValue<T>> = values.into_iter().map(Into::into).collect();
        let next = AtomicUsize::new(0);
        self.set_producer(Arc::new(move || {
            let index = next.fetch_add(1, Ordering::SeqCst);
            values
                .get(index.min(values.len().saturating_sub(1)))
                .cloned()
                .unwrap_or_default()
        }))
    }

    /// Run `callback` after each invocation has read its value.
    pub fn callback<F>(&self, callback: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.slot
            .update(|deferred| deferred.callback = Some(Arc::new(callback)));
        self
    }

    /// Number of invocations this binding has served.
    pub fn invocation_count(&self) -> usize {
        self.slot.invocation_count()
    }

    pub fn is_configured(&self) -> bool {
        self.slot
            .deferred
            .read()
            .map(|deferred| deferred.is_configured())
            .unwrap_or(false)
    }

    fn set_producer(&self, producer: Producer<T>) -> &Self {
        tracing::debug!(operation = %self.operation, "Replaced stub producer");
        self.slot
            .update(|deferred| deferred.producer = Some(producer));
        self
    }
}
