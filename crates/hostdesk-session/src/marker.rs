//! The demo-bypass marker: two store entries that let a demo sign-in
//! survive a restart.
//!
//! | Key | Value |
//! |---|---|
//! | [`DEMO_USER_KEY`] | the demo [`Identity`] as JSON |
//! | [`DEMO_ADMIN_KEY`] | `"true"` |
//!
//! Both must be present for the marker to count.

use crate::{CredentialStore, Identity, IdentitySource, StoreError};

/// Store key holding the serialized demo identity.
pub const DEMO_USER_KEY: &str = "demo_user";
/// Store key holding the demo administrator flag.
pub const DEMO_ADMIN_KEY: &str = "demo_admin";

/// Reads the marker. Returns `None` unless both entries are present and
/// the flag is `"true"`.
///
/// The stored record only supplies id/email/timestamp: source and
/// administrator status are properties of the bypass itself, so they are
/// forced to `Demo`/`true` whatever the store says.
pub(crate) fn load<S: CredentialStore + ?Sized>(
    store: &S,
) -> Result<Option<Identity>, StoreError> {
    let user = store.get(DEMO_USER_KEY)?;
    let admin = store.get(DEMO_ADMIN_KEY)?;

    match (user, admin) {
        (Some(raw), Some(flag)) if flag == "true" => {
            let mut identity: Identity =
                serde_json::from_str(&raw).map_err(StoreError::Corrupt)?;
            identity.source = IdentitySource::Demo;
            identity.is_administrator = true;
            Ok(Some(identity))
        }
        _ => Ok(None),
    }
}

/// Writes both marker entries.
pub(crate) fn save<S: CredentialStore + ?Sized>(
    store: &S,
    identity: &Identity,
) -> Result<(), StoreError> {
    let raw = serde_json::to_string(identity).map_err(StoreError::Corrupt)?;
    store.set(DEMO_USER_KEY, &raw)?;
    store.set(DEMO_ADMIN_KEY, "true")
}

/// Removes both marker entries. Attempts both even if the first fails.
pub(crate) fn clear<S: CredentialStore + ?Sized>(store: &S) -> Result<(), StoreError> {
    let user = store.remove(DEMO_USER_KEY);
    let admin = store.remove(DEMO_ADMIN_KEY);
    user.and(admin)
}
