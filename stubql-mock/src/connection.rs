//! Mock connection and operation registry

use crate::binding::{Binding, TypedBinding};
use crate::command::MockCommand;
use crate::deferred::{Setup, Slot};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use stubql_core::{
    Call, ColumnMatching, Command, Connection, ConnectionState, Invocation, InvocationError,
    OperationId, RowShape, StubConfig, StubResult,
};

// ============================================================================
// REGISTRY
// ============================================================================

/// State shared by a connection and every command it created.
pub(crate) struct Registry {
    config: StubConfig,
    state: RwLock<ConnectionState>,
    bindings: RwLock<HashMap<OperationId, Arc<dyn Binding>>>,
    invocations: RwLock<Vec<Invocation>>,
}

impl Registry {
    fn new(config: StubConfig) -> Self {
        Self {
            config,
            state: RwLock::new(ConnectionState::Closed),
            bindings: RwLock::new(HashMap::new()),
            invocations: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn binding(&self, operation: &OperationId) -> StubResult<Option<Arc<dyn Binding>>> {
        let bindings = self
            .bindings
            .read()
            .map_err(|_| InvocationError::LockPoisoned)?;
        Ok(bindings.get(operation).cloned())
    }

    pub(crate) fn record(&self, invocation: Invocation) -> StubResult<()> {
        if !self.config.record_invocations {
            return Ok(());
        }
        self.invocations
            .write()
            .map_err(|_| InvocationError::LockPoisoned)?
            .push(invocation);
        Ok(())
    }

    /// Remove every binding and release its deferred result outside the
    /// registry lock.
    fn clear_bindings(&self) {
        let removed: Vec<Arc<dyn Binding>> = self
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, binding)| binding)
            .collect();
        for binding in &removed {
            binding.clear();
        }
    }

    fn set_state(&self, state: ConnectionState) -> StubResult<()> {
        *self
            .state
            .write()
            .map_err(|_| InvocationError::LockPoisoned)? = state;
        Ok(())
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let bindings = self
            .bindings
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for binding in bindings.values() {
            binding.clear();
        }
    }
}

// ============================================================================
// MOCK CONNECTION
// ============================================================================

/// In-memory connection whose mapper calls are answered by stubs.
///
/// Clones share bindings, state, and the invocation log.
#[derive(Clone)]
pub struct MockConnection {
    registry: Arc<Registry>,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockConnection")
            .field("config", &self.registry.config)
            .field("state", &self.state())
            .field("bindings", &self.binding_count())
            .finish()
    }
}

impl MockConnection {
    /// Create a mock connection with the default configuration.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry::new(StubConfig::default())),
        }
    }

    /// Create a mock connection with a validated configuration.
    pub fn with_config(config: StubConfig) -> StubResult<Self> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(Registry::new(config)),
        })
    }

    pub fn config(&self) -> &StubConfig {
        &self.registry.config
    }

    /// Register a stub for `call` and return its setup handle.
    ///
    /// Fails immediately when the call is a mapper method without stub
    /// support or not a mapper call at all. Registering an operation again
    /// replaces the earlier binding.
    pub fn setup_dapper<T: RowShape>(&self, call: Call<T>) -> StubResult<Setup<T>> {
        let (operation, shape) = call.resolve()?;
        let slot = Arc::new(Slot::new());
        let binding: Arc<dyn Binding> = Arc::new(TypedBinding::new(
            operation,
            shape,
            &self.registry.config,
            Arc::clone(&slot),
        ));

        let replaced = self
            .registry
            .bindings
            .write()
            .map_err(|_| InvocationError::LockPoisoned)?
            .insert(operation, binding)
            .is_some();
        self.registry.set_state(ConnectionState::Open)?;

        tracing::debug!(%operation, ?shape, replaced, "Registered stub");
        Ok(Setup::new(operation, slot))
    }

    /// Every stubbed invocation so far, in call order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.registry
            .invocations
            .read()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    /// The invocation log rendered as JSON.
    pub fn invocations_json(&self) -> serde_json::Value {
        serde_json::to_value(self.invocations()).unwrap_or(serde_json::Value::Null)
    }

    /// Number of logged invocations of `operation`.
    pub fn invocation_count(&self, operation: &OperationId) -> usize {
        self.registry
            .invocations
            .read()
            .map(|log| log.iter().filter(|i| &i.operation == operation).count())
            .unwrap_or(0)
    }

    pub fn binding_count(&self) -> usize {
        self.registry
            .bindings
            .read()
            .map(|bindings| bindings.len())
            .unwrap_or(0)
    }

    /// Drop every binding and logged invocation and close the connection.
    ///
    /// Producers and callbacks are released too, so callbacks holding
    /// setup handles or connection clones are freed.
    pub fn reset(&self) {
        self.registry.clear_bindings();
        self.registry
            .invocations
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self
            .registry
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner) = ConnectionState::Closed;
        tracing::debug!("Reset mock connection");
    }
}

impl Connection for MockConnection {
    fn state(&self) -> ConnectionState {
        self.registry
            .state
            .read()
            .map(|state| *state)
            .unwrap_or(ConnectionState::Broken)
    }

    fn open(&self) -> StubResult<()> {
        self.registry.set_state(ConnectionState::Open)
    }

    fn close(&self) -> StubResult<()> {
        self.registry.set_state(ConnectionState::Closed)
    }

    fn create_command(&self) -> StubResult<Box<dyn Command>> {
        Ok(Box::new(MockCommand::new(Arc::clone(&self.registry))))
    }

    fn column_matching(&self) -> ColumnMatching {
        self.registry.config.column_matching
    }
}

// =============================================================================
// TESTS
// =============================================================================
