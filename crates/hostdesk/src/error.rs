//! Unified error type for the hostdesk console.

use hostdesk_backend::BackendError;
use hostdesk_resource::ResourceError;
use hostdesk_session::{GateError, StoreError};

/// Top-level error that wraps all crate-specific errors.
///
/// Code that only talks to the `hostdesk` facade handles this single type;
/// `?` converts the layer errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum HostdeskError {
    /// A backend call failed (bad credentials, unreachable, rejected).
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A session gate operation failed.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The credential store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A resource could not be configured.
    #[error(transparent)]
    Resource(#[from] ResourceError),
}

impl HostdeskError {
    /// `true` when the underlying cause is a rejected email/password pair.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::InvalidCredentials(_))
                | Self::Gate(GateError::Backend(BackendError::InvalidCredentials(_)))
        )
    }
}
