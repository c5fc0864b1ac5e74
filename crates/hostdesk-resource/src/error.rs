//! Error types for the resource layer.

/// Errors raised while (re)configuring a resource.
///
/// Fetch failures are not `ResourceError`s: they are stored in the
/// resource state as the fetch function's own error type.
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The dependency values could not be turned into a comparison key
    /// (e.g. a map with non-string keys).
    #[error("dependencies are not serializable: {0}")]
    Dependencies(#[source] serde_json::Error),
}
