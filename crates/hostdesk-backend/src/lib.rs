//! Remote data client contract for hostdesk.
//!
//! The admin console never talks to a database directly. Everything it
//! knows about sessions, administrators and table rows comes from a hosted
//! backend (auth service + row-level tables). This crate defines the
//! [`Backend`] trait that abstracts over that service, plus the small set of
//! types that cross the boundary.
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard / Resource layers (above)  ← consume GateState and table rows
//!     ↕
//! Session layer                    ← classifies identities, owns the gate
//!     ↕
//! Backend layer (this crate)       ← session store, admin registry, tables
//! ```
//!
//! # Feature Flags
//!
//! - `memory` (default): [`MemoryBackend`], a fully in-process backend with
//!   configurable latency. Tests and the demo console run against it.

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "memory")]
mod memory;
mod subscription;
mod types;

pub use error::BackendError;
#[cfg(feature = "memory")]
pub use memory::{CallCounts, Latency, MemoryBackend};
pub use subscription::SessionSubscription;
pub use types::{
    AdminRecord, Order, QueryFilter, Session, SessionChange, SessionEvent,
    User,
};

use std::future::Future;

/// The operations the console needs from the hosted backend.
///
/// Every method is an async suspension point: callers must stay responsive
/// while a call is in flight. All failures come back as [`BackendError`]
/// values; implementations never panic for network or credential problems.
///
/// The futures are `Send` because the session gate drives them from
/// spawned Tokio tasks.
pub trait Backend: Send + Sync + 'static {
    /// Returns the currently active session, if any.
    fn get_session(
        &self,
    ) -> impl Future<Output = Result<Option<Session>, BackendError>> + Send;

    /// Registers a listener for session-change notifications.
    ///
    /// The returned handle receives one [`SessionChange`] per backend event
    /// and unsubscribes when dropped.
    fn on_session_change(&self) -> SessionSubscription;

    /// Exchanges an email/password pair for a session.
    fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Session, BackendError>> + Send;

    /// Creates a new account. No session is started.
    fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: serde_json::Value,
    ) -> impl Future<Output = Result<User, BackendError>> + Send;

    /// Ends the active session (if any).
    fn sign_out(&self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Sends a password-reset message to `email`.
    fn reset_password_for_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Looks up `email` in the admin registry.
    ///
    /// `Ok(None)` means the registry answered and the account is not an
    /// administrator.
    fn lookup_admin(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<AdminRecord>, BackendError>> + Send;

    /// Reads rows from `table` matching `filter`.
    fn query(
        &self,
        table: &str,
        filter: &QueryFilter,
    ) -> impl Future<Output = Result<Vec<serde_json::Value>, BackendError>> + Send;
}
