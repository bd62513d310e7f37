//! Core error types for Federa.

use thiserror::Error;

/// Result type alias using `FederaError`.
pub type FederaResult<T> = std::result::Result<T, FederaError>;

/// Generic boxed error for external error sources.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for Federa operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FederaError {
    /// Type mismatch or invalid type operation.
    #[error("TypeError: {0}")]
    TypeError(String),

    /// Invalid value provided.
    #[error("ValueError: {0}")]
    ValueError(String),

    /// Row type or field resolution error.
    #[error("SchemaError: {0}")]
    SchemaError(String),

    /// The planner could not produce a plan satisfying the requested traits.
    #[error("PlanningError: {0}")]
    PlanningError(String),

    /// Catalog lookup or mutation failed.
    #[error("CatalogError: {0}")]
    CatalogError(String),

    /// Partition function setup or routing error (DDL-time).
    #[error("PartitionError: {0}")]
    PartitionError(String),

    /// A placement change would leave data uncovered.
    #[error("PlacementError: {0}")]
    PlacementError(String),

    /// Malformed grouping sets on an aggregate.
    #[error("GroupingError: {0}")]
    GroupingError(String),

    /// Feature not yet implemented.
    #[error("NotImplemented: {0}")]
    NotImplemented(String),

    /// Invalid parameter provided.
    #[error("InvalidParameter: {0}")]
    InvalidParameter(String),

    /// Internal error (bug in Federa).
    #[error("InternalError: {0}")]
    InternalError(String),

    /// JSON serialization error.
    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// External error from third-party libraries.
    #[error("ExternalError: {0}")]
    ExternalError(GenericError),
}

impl FederaError {
    /// Create a new `TypeError`.
    pub fn type_error<S: Into<String>>(msg: S) -> Self {
        Self::TypeError(msg.into())
    }

    /// Create a new `ValueError`.
    pub fn value_error<S: Into<String>>(msg: S) -> Self {
        Self::ValueError(msg.into())
    }

    /// Create a new `SchemaError`.
    pub fn schema_error<S: Into<String>>(msg: S) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a new `PlanningError`.
    pub fn planning<S: Into<String>>(msg: S) -> Self {
        Self::PlanningError(msg.into())
    }

    /// Create a new `CatalogError`.
    pub fn catalog<S: Into<String>>(msg: S) -> Self {
        Self::CatalogError(msg.into())
    }

    /// Create a new `PartitionError`.
    pub fn partition<S: Into<String>>(msg: S) -> Self {
        Self::PartitionError(msg.into())
    }

    /// Create a new `PlacementError`.
    pub fn placement<S: Into<String>>(msg: S) -> Self {
        Self::PlacementError(msg.into())
    }

    /// Create a new `GroupingError`.
    pub fn grouping<S: Into<String>>(msg: S) -> Self {
        Self::GroupingError(msg.into())
    }

    /// Create a new `NotImplemented` error.
    pub fn not_implemented<S: Into<String>>(msg: S) -> Self {
        Self::NotImplemented(msg.into())
    }

    /// Create a new `InvalidParameter` error.
    pub fn invalid_parameter<S: Into<String>>(msg: S) -> Self {
        Self::InvalidParameter(msg.into())
    }

    /// Create a new `InternalError`.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::InternalError(msg.into())
    }

    /// Wrap a foreign error.
    pub fn external<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ExternalError(Box::new(err))
    }

    /// Error raised when a shared lock was poisoned by a panicking holder.
    pub fn poisoned(what: &str) -> Self {
        Self::InternalError(format!("lock poisoned: {what}"))
    }
}

/// Ensure a condition holds, returning an error if not.
///
/// The single-message form produces an `InternalError`; the `Variant: fmt` form
/// picks the variant explicitly.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $variant:ident: $($msg:tt)*) => {
        if !$cond {
            return Err($crate::FederaError::$variant(format!($($msg)*)));
        }
    };
    ($cond:expr, $msg:expr) => {
        if !$cond {
            return Err($crate::FederaError::InternalError($msg.to_string()));
        }
    };
}

/// Return early with a `ValueError`.
#[macro_export]
macro_rules! value_err {
    ($($arg:tt)*) => {
        return Err($crate::FederaError::ValueError(format!($($arg)*)))
    };
}

/// Return early with a `TypeError`.
#[macro_export]
macro_rules! type_err {
    ($($arg:tt)*) => {
        return Err($crate::FederaError::TypeError(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FederaError::type_error("expected Int64, got String");
        assert_eq!(err.to_string(), "TypeError: expected Int64, got String");

        let err = FederaError::partition("HASH partitioning requires at least 2 groups");
        assert_eq!(
            err.to_string(),
            "PartitionError: HASH partitioning requires at least 2 groups"
        );
    }

    #[test]
    fn test_error_constructors() {
        let _ = FederaError::value_error("invalid value");
        let _ = FederaError::schema_error("field not found");
        let _ = FederaError::not_implemented("feature X");
        let _ = FederaError::internal("unexpected state");
        let _ = FederaError::grouping("group sets out of order");
        let _ = FederaError::placement("group 3 would lose its last placement");
    }

    fn checked(n: usize) -> FederaResult<usize> {
        ensure!(n >= 2, PartitionError: "need at least 2 groups, got {}", n);
        Ok(n)
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(checked(3).unwrap(), 3);
        let err = checked(1).unwrap_err();
        assert!(matches!(err, FederaError::PartitionError(_)));
        assert!(err.to_string().contains("got 1"));
    }

    #[test]
    fn test_serde_json_conversion() {
        let parsed: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: FederaError = parsed.unwrap_err().into();
        assert!(matches!(err, FederaError::SerdeJsonError(_)));
    }
}
