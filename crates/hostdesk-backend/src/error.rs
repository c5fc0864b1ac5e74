//! Error types for the backend layer.

/// Errors a [`Backend`](crate::Backend) call can return.
///
/// `Clone` so higher layers can keep the last error around in state
/// snapshots (an async resource shows "stale data + error banner").
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend rejected the credentials (bad password, unknown user).
    /// The message is the backend's own wording and is shown verbatim.
    #[error("{0}")]
    InvalidCredentials(String),

    /// The call failed at the network/protocol level.
    #[error("backend unreachable: {0}")]
    Transport(String),

    /// The backend understood the request and refused it
    /// (e.g. signing up with an email that already exists).
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl BackendError {
    /// Returns `true` for network/protocol failures.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
