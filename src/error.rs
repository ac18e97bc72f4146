//! Error types for the provisioner

use thiserror::Error;

/// Main error type for provisioner operations
///
/// The variants mirror the HTTP surface: validation failures become 400,
/// duplicate Job creation becomes 409, missing resources become 404 and
/// everything else is a 500. Only Job creation conflicts are surfaced as
/// [`Error::AlreadyExists`] - PVC conflicts are swallowed by the orchestrator
/// because the volumes are shared, idempotent infrastructure.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Request failed boundary validation
    #[error("validation error: {0}")]
    Validation(String),

    /// A Job with the same name already exists.
    ///
    /// Raised on duplicate test/provision/destroy submissions so a second
    /// caller never silently double-provisions.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The requested cluster has no Jobs or no state volume
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an already-exists error with the given message
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Create a not-found error with the given message
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Duplicate Job submissions must be distinguishable from validation
    /// failures - the HTTP layer maps them to different status codes.
    #[test]
    fn conflict_is_distinct_from_validation() {
        let conflict = Error::already_exists("job provision-demo already exists");
        let invalid = Error::validation("cluster name must be DNS-compliant");

        match conflict {
            Error::AlreadyExists(msg) => assert!(msg.contains("provision-demo")),
            _ => panic!("expected AlreadyExists variant"),
        }
        match invalid {
            Error::Validation(msg) => assert!(msg.contains("DNS-compliant")),
            _ => panic!("expected Validation variant"),
        }
    }

    #[test]
    fn display_includes_category_and_message() {
        let err = Error::not_found("no job found for cluster: demo-1");
        assert!(err.to_string().contains("not found"));
        assert!(err.to_string().contains("demo-1"));

        let err = Error::validation("kubernetes version 1.99 is not supported");
        assert!(err.to_string().starts_with("validation error"));
    }

    /// Constructors accept both String and &str
    #[test]
    fn constructor_ergonomics() {
        let name = "prod-us-west";
        let err = Error::already_exists(format!("job destroy-{} already exists", name));
        assert!(err.to_string().contains("prod-us-west"));

        let err = Error::not_found("static message");
        assert!(err.to_string().contains("static message"));
    }
}
