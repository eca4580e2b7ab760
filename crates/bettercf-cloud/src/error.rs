//! Error types for bettercf-cloud

use thiserror::Error;

/// Result type for bettercf-cloud operations
pub type Result<T> = std::result::Result<T, CloudError>;

/// Errors that can occur while talking to the cloud provider
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CloudError {
    /// The addressed resource does not exist
    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    /// Any other provider failure
    #[error("{operation} failed: {message}")]
    Provider { operation: String, message: String },

    /// Stack settled in a status other than the expected one
    #[error("stack '{stack}' {action} failed: {status}")]
    TerminalFailure {
        stack: String,
        action: &'static str,
        status: String,
    },

    /// Delete found zero or several stacks with the same name
    #[error("expected exactly one instance of {name} stack, instead {count} were found")]
    AmbiguousStack { name: String, count: usize },

    /// Artifact has no stored versions
    #[error("no versions of '{name}' found in bucket '{bucket}'")]
    NoVersions { name: String, bucket: String },

    /// Stack did not settle in time
    #[error("stack '{stack}' still {status} after {elapsed}")]
    Timeout {
        stack: String,
        status: String,
        elapsed: String,
    },

    /// Invalid tool settings
    #[error("invalid settings: {0}")]
    Settings(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Domain error
    #[error(transparent)]
    Core(#[from] bettercf_core::CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for CloudError {
    fn from(e: serde_json::Error) -> Self {
        CloudError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for CloudError {
    fn from(e: serde_yaml::Error) -> Self {
        CloudError::Serialization(e.to_string())
    }
}

impl From<bettercf_core::OverrideError> for CloudError {
    fn from(e: bettercf_core::OverrideError) -> Self {
        CloudError::Core(e.into())
    }
}

impl CloudError {
    /// Create a provider error
    pub fn provider(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = CloudError::NotFound {
            kind: "stack",
            name: "foo".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!CloudError::provider("CreateStack", "throttled").is_not_found());
    }

    #[test]
    fn test_ambiguous_message() {
        let err = CloudError::AmbiguousStack {
            name: "foo".to_string(),
            count: 2,
        };
        insta::assert_snapshot!(err.to_string(), @"expected exactly one instance of foo stack, instead 2 were found");
    }

    #[test]
    fn test_override_error_wraps_into_core() {
        let err: CloudError = bettercf_core::OverrideError::MissingDeleteTarget {
            key: "Bucket".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            CloudError::Core(bettercf_core::CoreError::Override(_))
        ));
    }
}
