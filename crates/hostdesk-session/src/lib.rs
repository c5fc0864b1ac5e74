//! Session gate for hostdesk.
//!
//! This crate answers one question for the rest of the console: *who is
//! acting, and are they an administrator?* It reconciles two sources of
//! identity:
//!
//! 1. **Demo bypass**: a fixed email/password pair that grants demo
//!    administrator access without contacting the backend. A small marker
//!    is persisted in a [`CredentialStore`] so the demo survives restarts.
//! 2. **Remote session**: a real backend session, classified as
//!    administrator only if the account's email is found in the admin
//!    registry.
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard / Resource layers (above)  ← watch GateState, render or redirect
//!     ↕
//! Session layer (this crate)       ← SessionGate state machine
//!     ↕
//! Backend layer (below)            ← sessions, admin registry
//! ```

mod config;
mod error;
mod gate;
mod identity;
mod marker;
mod store;

pub use config::GateConfig;
pub use error::{GateError, StoreError};
pub use gate::SessionGate;
pub use identity::{GateState, Identity, IdentitySource};
pub use marker::{DEMO_ADMIN_KEY, DEMO_USER_KEY};
pub use store::{CredentialStore, FileStore, MemoryStore};
