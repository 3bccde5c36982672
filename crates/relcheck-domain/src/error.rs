//! Domain error types for check resolution.

use thiserror::Error;

/// Domain-specific errors for check resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The check context was cancelled before a decision was reached.
    #[error("check cancelled")]
    Cancelled,

    /// The check context deadline elapsed before a decision was reached.
    #[error("timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The resolution depth budget was exhausted on a branch.
    #[error("resolution depth exceeded (max: {max_depth})")]
    DepthLimitExceeded { max_depth: u32 },

    /// Error during permission check resolution.
    #[error("resolver error: {message}")]
    ResolverError { message: String },

    /// Invalid user format.
    #[error("invalid user format: {value}")]
    InvalidUserFormat { value: String },

    /// Invalid object format.
    #[error("invalid object format: {value}")]
    InvalidObjectFormat { value: String },

    /// Invalid relation format.
    #[error("invalid relation format: {value}")]
    InvalidRelationFormat { value: String },

    /// Type not found in authorization model.
    #[error("type not found: {type_name}")]
    TypeNotFound { type_name: String },

    /// Relation not found on type.
    #[error("relation '{relation}' not found on type '{type_name}'")]
    RelationNotFound { type_name: String, relation: String },

    /// The tuple reader failed.
    #[error("storage error: {message}")]
    StorageError { message: String },
}

impl DomainError {
    /// Returns true for failures caused by the caller's context
    /// (cancellation or deadline) rather than by resolution itself.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, DomainError::Cancelled | DomainError::Timeout { .. })
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_classification() {
        assert!(DomainError::Cancelled.is_cancellation());
        assert!(DomainError::Timeout { duration_ms: 10 }.is_cancellation());
        assert!(!DomainError::DepthLimitExceeded { max_depth: 25 }.is_cancellation());
        assert!(!DomainError::ResolverError {
            message: "boom".to_string()
        }
        .is_cancellation());
    }

    #[test]
    fn test_depth_error_message_names_budget() {
        let err = DomainError::DepthLimitExceeded { max_depth: 25 };
        assert_eq!(err.to_string(), "resolution depth exceeded (max: 25)");
    }
}
