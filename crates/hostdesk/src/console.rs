//! `Console` builder and handle.
//!
//! This is the entry point for an admin front end. It ties the layers
//! together: backend → session gate → route guards / table queries.

use std::sync::Arc;

use hostdesk_backend::{Backend, QueryFilter};
use hostdesk_guard::{GuardConfig, RouteGuard};
use hostdesk_resource::TableQuery;
use hostdesk_session::{CredentialStore, GateConfig, GateState, Identity, SessionGate};

use crate::{ConsoleConfig, HostdeskError};

/// Builder for a [`Console`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use hostdesk::prelude::*;
///
/// # async fn run() -> Result<(), HostdeskError> {
/// let console = ConsoleBuilder::new()
///     .config(ConsoleConfig::from_env())
///     .build(Arc::new(MemoryBackend::new()), Arc::new(MemoryStore::new()));
///
/// let guard = console.guard("/admin/orders");
/// let orders = console.table("orders", QueryFilter::new().limit(20))?;
/// # let _ = (guard, orders);
/// # Ok(()) }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConsoleBuilder {
    config: ConsoleConfig,
}

impl ConsoleBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the session gate configuration.
    pub fn gate_config(mut self, config: GateConfig) -> Self {
        self.config.gate = config;
        self
    }

    /// Sets the configuration every guard is mounted with.
    pub fn guard_config(mut self, config: GuardConfig) -> Self {
        self.config.guard = config;
        self
    }

    /// Starts the session gate and returns the console.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build<B: Backend, S: CredentialStore>(self, backend: Arc<B>, store: Arc<S>) -> Console<B, S> {
        let gate = SessionGate::start(Arc::clone(&backend), store, self.config.gate);
        tracing::info!(
            guard_timeout = ?self.config.guard.timeout,
            sign_in_path = %self.config.guard.sign_in_path,
            "console started"
        );
        Console {
            backend,
            gate,
            guard_config: self.config.guard,
        }
    }
}

/// A running console: one session gate shared by every guard and query.
pub struct Console<B: Backend, S: CredentialStore> {
    backend: Arc<B>,
    gate: SessionGate<B, S>,
    guard_config: GuardConfig,
}

impl<B: Backend, S: CredentialStore> Console<B, S> {
    /// The session gate.
    pub fn gate(&self) -> &SessionGate<B, S> {
        &self.gate
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Current gate snapshot.
    pub fn session(&self) -> GateState {
        self.gate.state()
    }

    /// Mounts a guard in front of `requested` using the console's guard
    /// settings.
    pub fn guard(&self, requested: impl Into<String>) -> RouteGuard {
        self.guard_with(requested, self.guard_config.clone())
    }

    /// Mounts a guard with explicit settings.
    pub fn guard_with(&self, requested: impl Into<String>, config: GuardConfig) -> RouteGuard {
        RouteGuard::mount(self.gate.subscribe(), requested, config)
    }

    /// Opens a live query over `table`.
    pub fn table(&self, table: &str, filter: QueryFilter) -> Result<TableQuery<B>, HostdeskError> {
        Ok(TableQuery::new(Arc::clone(&self.backend), table, filter)?)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, HostdeskError> {
        Ok(self.gate.sign_in(email, password).await?)
    }

    pub async fn sign_out(&self) -> Result<(), HostdeskError> {
        Ok(self.gate.sign_out().await?)
    }

    /// Stops the session gate's background work.
    pub async fn shutdown(self) {
        self.gate.shutdown().await;
        tracing::info!("console stopped");
    }
}
