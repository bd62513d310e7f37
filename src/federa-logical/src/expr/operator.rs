//! Operators of call expressions.

use federa_core::DataType;
use serde::{Deserialize, Serialize};

/// Operator of a [`Expr::Call`](super::Expr::Call).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    // Comparison operators
    /// Equality (=)
    Eq,
    /// Inequality (<>)
    NotEq,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    LtEq,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    GtEq,

    // Logical operators (three-valued logic)
    /// N-ary logical AND
    And,
    /// N-ary logical OR
    Or,
    /// Logical NOT
    Not,
    /// IS NULL
    IsNull,
    /// IS NOT NULL
    IsNotNull,

    // Arithmetic operators
    /// Addition (+)
    Plus,
    /// Subtraction (-)
    Minus,
    /// Multiplication (*)
    Multiply,
    /// Division (/)
    Divide,

    /// SQL LIKE pattern match
    Like,
    /// Conversion to the call's result type
    Cast,
}

impl Operator {
    /// Check if this is a binary comparison.
    pub const fn is_comparison(&self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq
        )
    }

    /// Check if this is an arithmetic operator.
    pub const fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Plus | Self::Minus | Self::Multiply | Self::Divide
        )
    }

    /// Check if this is a boolean connective.
    pub const fn is_logical(&self) -> bool {
        matches!(self, Self::And | Self::Or | Self::Not)
    }

    /// The operator that yields the same result with swapped operands:
    /// `5 < $0` is `$0 > 5`.
    ///
    /// Returns `None` for operators that are not binary comparisons.
    pub const fn reverse(&self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::Eq),
            Self::NotEq => Some(Self::NotEq),
            Self::Lt => Some(Self::Gt),
            Self::LtEq => Some(Self::GtEq),
            Self::Gt => Some(Self::Lt),
            Self::GtEq => Some(Self::LtEq),
            _ => None,
        }
    }

    /// The operator computing the logical complement for non-null operands.
    pub const fn negate(&self) -> Option<Self> {
        match self {
            Self::Eq => Some(Self::NotEq),
            Self::NotEq => Some(Self::Eq),
            Self::Lt => Some(Self::GtEq),
            Self::LtEq => Some(Self::Gt),
            Self::Gt => Some(Self::LtEq),
            Self::GtEq => Some(Self::Lt),
            Self::IsNull => Some(Self::IsNotNull),
            Self::IsNotNull => Some(Self::IsNull),
            _ => None,
        }
    }

    /// SQL spelling used in digests and explain output.
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Like => "LIKE",
            Self::Cast => "CAST",
        }
    }

    /// Result type for the given operand types.
    ///
    /// Returns `None` if the operands are not valid for this operator. `Cast`
    /// has no inferable result type and always returns `None`.
    pub fn result_type(&self, operands: &[DataType]) -> Option<DataType> {
        match self {
            Self::Eq | Self::NotEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => {
                match operands {
                    [l, r] if l.common_supertype(r).is_some() => Some(DataType::Bool),
                    _ => None,
                }
            }
            Self::And | Self::Or => operands
                .iter()
                .all(|t| matches!(t, DataType::Bool | DataType::Null | DataType::Any))
                .then_some(DataType::Bool),
            Self::Not => match operands {
                [DataType::Bool | DataType::Null | DataType::Any] => Some(DataType::Bool),
                _ => None,
            },
            Self::IsNull | Self::IsNotNull => (operands.len() == 1).then_some(DataType::Bool),
            Self::Plus | Self::Minus | Self::Multiply | Self::Divide => match operands {
                [l, r] => {
                    let t = l.common_supertype(r)?;
                    match t {
                        DataType::Int64 | DataType::Float64 => Some(t),
                        DataType::Any | DataType::Null => Some(DataType::Float64),
                        _ => None,
                    }
                }
                _ => None,
            },
            Self::Like => match operands {
                [l, r]
                    if matches!(l, DataType::String | DataType::Any | DataType::Null)
                        && matches!(r, DataType::String | DataType::Any | DataType::Null) =>
                {
                    Some(DataType::Bool)
                }
                _ => None,
            },
            Self::Cast => None,
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}
