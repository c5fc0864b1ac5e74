//! Identity and gate-state types.
//!
//! An [`Identity`] is the actor the gate currently recognizes. A
//! [`GateState`] is the snapshot every consumer sees: the identity (if
//! any) plus whether the gate is still resolving.
//!
//! ```text
//!   Resolving ──(marker found / session checked)──→ Settled(identity?)
//!                                                     │        ↑
//!                                                     └────────┘
//!                                         (sign-in, sign-out, backend event)
//! ```

use chrono::{DateTime, Utc};
use hostdesk_backend::User;
use serde::{Deserialize, Serialize};

/// Fixed id of the synthesized demo identity.
const DEMO_IDENTITY_ID: &str = "demo-admin";

/// Where an identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentitySource {
    /// The local bypass credential. Never seen by the backend.
    Demo,
    /// A backend session.
    Remote,
}

/// The actor currently recognized by the gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub source: IdentitySource,
    /// For `Remote`, the result of an admin-registry lookup. For `Demo`,
    /// always `true`.
    pub is_administrator: bool,
}

impl Identity {
    /// Synthesizes the demo administrator identity.
    pub fn demo(email: &str) -> Self {
        Self {
            id: DEMO_IDENTITY_ID.to_string(),
            email: email.to_string(),
            created_at: Utc::now(),
            source: IdentitySource::Demo,
            is_administrator: true,
        }
    }

    /// Builds a remote identity from a backend user and the outcome of the
    /// admin-registry lookup.
    pub fn remote(user: &User, is_administrator: bool) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
            source: IdentitySource::Remote,
            is_administrator,
        }
    }

    pub fn is_demo(&self) -> bool {
        self.source == IdentitySource::Demo
    }
}

/// Externally visible snapshot of the gate.
///
/// Administrator status is read through [`is_administrator`](Self::is_administrator)
/// so it can never disagree with the identity it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct GateState {
    pub identity: Option<Identity>,
    /// `true` from construction until the first resolution completes.
    pub is_resolving: bool,
}

impl GateState {
    /// The initial state: nothing known yet.
    pub fn resolving() -> Self {
        Self {
            identity: None,
            is_resolving: true,
        }
    }

    /// A resolved state with the given identity (or none).
    pub fn settled(identity: Option<Identity>) -> Self {
        Self {
            identity,
            is_resolving: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Mirrors `identity.is_administrator`; `false` without an identity.
    pub fn is_administrator(&self) -> bool {
        self.identity.as_ref().is_some_and(|i| i.is_administrator)
    }

    /// Whether the current identity is the demo bypass.
    pub fn is_demo(&self) -> bool {
        self.identity.as_ref().is_some_and(Identity::is_demo)
    }
}
