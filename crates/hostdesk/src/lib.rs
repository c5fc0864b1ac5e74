//! # Hostdesk
//!
//! Core of a hosting-company admin console.
//!
//! Hostdesk answers "who is signed in, and are they an administrator?",
//! keeps protected screens behind a route guard that never spins forever,
//! and loads backend tables into resources that only ever show the newest
//! result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use hostdesk::prelude::*;
//!
//! # async fn run() -> Result<(), HostdeskError> {
//! hostdesk::init_tracing();
//!
//! let console = ConsoleBuilder::new()
//!     .config(ConsoleConfig::from_env())
//!     .build(Arc::new(MemoryBackend::new()), Arc::new(MemoryStore::new()));
//!
//! console.sign_in("demo@hostdesk.app", "demo1234").await?;
//! let guard = console.guard("/admin");
//! assert!(guard.settled().await.is_authorized());
//! # Ok(()) }
//! ```

mod config;
mod console;
mod error;

pub use config::{ConsoleConfig, ENV_DEMO_BYPASS, ENV_GUARD_TIMEOUT_MS, ENV_SIGN_IN_PATH};
pub use console::{Console, ConsoleBuilder};
pub use error::HostdeskError;

use tracing_subscriber::{EnvFilter, fmt};

/// Installs a `tracing` subscriber that honours `RUST_LOG` and defaults to
/// `info`.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Everything needed to build an admin front end.
pub mod prelude {
    pub use crate::{Console, ConsoleBuilder, ConsoleConfig, HostdeskError};

    pub use hostdesk_backend::{
        AdminRecord, Backend, BackendError, Latency, MemoryBackend, Order, QueryFilter, Session,
        SessionChange, SessionEvent, SessionSubscription, User,
    };
    pub use hostdesk_guard::{GuardConfig, GuardState, Redirect, RouteGuard, View};
    pub use hostdesk_resource::{AsyncResource, ResourceError, ResourceState, TableQuery};
    pub use hostdesk_session::{
        CredentialStore, FileStore, GateConfig, GateError, GateState, Identity, IdentitySource,
        MemoryStore, SessionGate, StoreError,
    };
}
