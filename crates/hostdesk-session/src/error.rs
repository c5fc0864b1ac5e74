//! Error types for the session layer.

use hostdesk_backend::BackendError;

/// Errors returned by [`SessionGate`](crate::SessionGate) operations.
///
/// Nothing in the gate panics for expected failures; every operation hands
/// one of these back and the caller decides how to show it (usually as an
/// inline form error).
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// The backend refused or failed the call. Credential rejections are
    /// passed through with the backend's own message.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// The backend accepted the credentials but the account is not in the
    /// admin registry. The session has already been signed out again.
    #[error("administrator privileges required")]
    AdminRequired,

    /// The local credential store could not be read or written.
    #[error("credential store: {0}")]
    Store(#[from] StoreError),
}

/// Errors from a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored data is not valid JSON of the expected shape.
    #[error("corrupt entry: {0}")]
    Corrupt(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_required_message() {
        assert_eq!(
            GateError::AdminRequired.to_string(),
            "administrator privileges required"
        );
    }

    #[test]
    fn test_backend_error_is_transparent() {
        let err: GateError =
            BackendError::InvalidCredentials("Invalid login credentials".into()).into();
        assert_eq!(err.to_string(), "Invalid login credentials");
    }
}
