//! Common error types for the Skiff control plane.

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`SkiffError`].
pub type SkiffResult<T> = Result<T, SkiffError>;

/// Common errors across the Skiff control plane.
///
/// Every variant carries owned, clonable data: one-shot initialization
/// memoizes its first failure and replays it to later callers.
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum SkiffError {
    /// Container not found.
    #[error("Container not found: {id}")]
    #[diagnostic(code(skiff::container::not_found))]
    ContainerNotFound {
        /// The container ID that was not found.
        id: String,
    },

    /// Invalid container ID format.
    #[error("Invalid container ID: {id}")]
    #[diagnostic(
        code(skiff::container::invalid_id),
        help("Container IDs must be alphanumeric with hyphens and underscores, 1-64 characters")
    )]
    InvalidContainerId {
        /// The invalid container ID.
        id: String,
    },

    /// The configured compute resource set does not contain exactly one entry.
    #[error("expected singular compute resource element, found {found}")]
    #[diagnostic(code(skiff::bootstrap::compute_resource))]
    SingularComputeResource {
        /// Number of compute resource descriptors in the configuration.
        found: usize,
    },

    /// A configured reference could not be resolved on the backend.
    #[error("could not resolve backend reference {reference}: {reason}")]
    #[diagnostic(code(skiff::backend::resolution))]
    ReferenceResolution {
        /// The reference that failed to resolve.
        reference: String,
        /// Why resolution failed.
        reason: String,
    },

    /// A reference resolved to an object of the wrong type.
    #[error("reference {reference} resolved to an unsupported object type")]
    #[diagnostic(code(skiff::backend::reference_type))]
    UnsupportedReference {
        /// The offending reference.
        reference: String,
    },

    /// The backend event source failed to start.
    #[error("{name} failed to start: {reason}")]
    #[diagnostic(code(skiff::events::source))]
    EventSource {
        /// Name of the event source.
        name: String,
        /// Why the source failed.
        reason: String,
    },

    /// A named network endpoint is missing from the configuration.
    #[error("could not get {name} network reference")]
    #[diagnostic(code(skiff::bootstrap::network))]
    MissingNetwork {
        /// The missing endpoint name.
        name: String,
    },

    /// Generic backend failure (inventory listing, attribute collection).
    #[error("Backend error: {message}")]
    #[diagnostic(code(skiff::backend))]
    Backend {
        /// The error message.
        message: String,
    },

    /// Invalid resource quantity format.
    #[error("Invalid resource quantity: {value}")]
    #[diagnostic(
        code(skiff::resource::invalid_quantity),
        help("Use formats like '1500MHz', '2GHz', '512Mi', '4Gi'")
    )]
    InvalidResourceQuantity {
        /// The invalid value.
        value: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(skiff::config))]
    Config {
        /// The error message.
        message: String,
    },

    /// A blocking wait ended without observing the awaited state.
    #[error("wait for container {id} failed: {cause}")]
    #[diagnostic(code(skiff::wait))]
    WaitFailed {
        /// The container being awaited.
        id: String,
        /// The underlying cancellation or timeout cause.
        cause: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SkiffError::ContainerNotFound {
            id: "abc123".to_string(),
        };
        assert_eq!(err.to_string(), "Container not found: abc123");
    }

    #[test]
    fn compute_resource_display() {
        let err = SkiffError::SingularComputeResource { found: 3 };
        assert_eq!(
            err.to_string(),
            "expected singular compute resource element, found 3"
        );
    }

    #[test]
    fn errors_are_clonable() {
        let err = SkiffError::EventSource {
            name: "collector".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.clone().to_string(), err.to_string());
    }
}
