//! Structural dependency keys.
//!
//! Callers typically build a fresh filter/options value every time they
//! configure a resource. Comparing those by identity would restart the
//! fetch every time, so dependencies are compared by *content*: each
//! dependency list is serialized into a `serde_json::Value`, whose maps
//! are key-sorted, and the values are compared.

use serde::Serialize;
use serde_json::Value;

use crate::ResourceError;

/// Content-based fingerprint of a dependency list.
#[derive(Debug, Clone, PartialEq)]
pub struct DepsKey(Value);

impl DepsKey {
    /// Serializes `deps` into a key.
    pub fn of<D: Serialize + ?Sized>(deps: &D) -> Result<Self, ResourceError> {
        serde_json::to_value(deps)
            .map(Self)
            .map_err(ResourceError::Dependencies)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}
