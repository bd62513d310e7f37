//! Data type definitions for Federa row types.

use serde::{Deserialize, Serialize};

/// Data type of a column or expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Null type (unknown or absent).
    Null,
    /// Boolean type.
    Bool,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Binary data.
    Binary,
    /// Date (days since epoch).
    Date,
    /// Timestamp with millisecond precision.
    Timestamp,
    /// Placeholder type for untyped dynamic parameters.
    Any,
}

impl DataType {
    /// Check if this type is numeric.
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Int64 | Self::Float64)
    }

    /// Check if this type is a string type.
    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Check if this type is a temporal type.
    pub const fn is_temporal(&self) -> bool {
        matches!(self, Self::Timestamp | Self::Date)
    }

    /// Whether values of this type have a total order usable for range bounds.
    pub const fn is_orderable(&self) -> bool {
        matches!(
            self,
            Self::Int64 | Self::Float64 | Self::String | Self::Date | Self::Timestamp
        )
    }

    /// Get the display name for this type.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Bool => "BOOLEAN",
            Self::Int64 => "BIGINT",
            Self::Float64 => "DOUBLE",
            Self::String => "VARCHAR",
            Self::Binary => "VARBINARY",
            Self::Date => "DATE",
            Self::Timestamp => "TIMESTAMP",
            Self::Any => "ANY",
        }
    }

    /// Check if this type can be coerced to another type.
    pub fn can_coerce_to(&self, target: &Self) -> bool {
        if self == target {
            return true;
        }

        matches!(
            (self, target),
            (Self::Null | Self::Any, _) | (_, Self::Any) | (Self::Int64, Self::Float64)
        )
    }

    /// Get the common supertype of two types (for type inference).
    pub fn common_supertype(&self, other: &Self) -> Option<Self> {
        if self == other {
            return Some(self.clone());
        }

        match (self, other) {
            (Self::Null | Self::Any, t) | (t, Self::Null | Self::Any) => Some(t.clone()),
            (Self::Int64, Self::Float64) | (Self::Float64, Self::Int64) => Some(Self::Float64),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_predicates() {
        assert!(DataType::Int64.is_numeric());
        assert!(!DataType::String.is_numeric());
        assert!(DataType::Date.is_temporal());
        assert!(DataType::String.is_orderable());
        assert!(!DataType::Bool.is_orderable());
    }

    #[test]
    fn test_coercion() {
        assert!(DataType::Int64.can_coerce_to(&DataType::Float64));
        assert!(!DataType::Float64.can_coerce_to(&DataType::Int64));
        assert!(DataType::Null.can_coerce_to(&DataType::String));
        assert_eq!(
            DataType::Int64.common_supertype(&DataType::Float64),
            Some(DataType::Float64)
        );
        assert_eq!(DataType::Bool.common_supertype(&DataType::String), None);
    }
}
