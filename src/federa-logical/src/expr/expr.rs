//! Immutable scalar expression trees.

use std::fmt;
use std::sync::Arc;

use federa_core::{BitSet, DataType, Value};
use serde::{Deserialize, Serialize};

use super::Operator;

/// Scalar expression evaluated against one input row.
///
/// Expressions are immutable; operands are reference counted so rewrites can
/// share unchanged sub-expressions between the old and the new tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Constant value.
    Literal { value: Value, data_type: DataType },
    /// Reference to field `index` of the input row.
    FieldRef { index: usize, data_type: DataType },
    /// Execution-time parameter `?index`, unknown while planning.
    DynamicParam { index: usize, data_type: DataType },
    /// Operator applied to operands.
    Call {
        op: Operator,
        operands: Vec<Arc<Expr>>,
        data_type: DataType,
    },
}

/// Create a literal expression typed by its value.
pub fn lit(value: impl Into<Value>) -> Expr {
    let value = value.into();
    Expr::Literal {
        data_type: value.data_type(),
        value,
    }
}

/// Create a field reference.
pub fn field(index: usize, data_type: DataType) -> Expr {
    Expr::FieldRef { index, data_type }
}

/// Create a dynamic parameter reference.
pub fn param(index: usize, data_type: DataType) -> Expr {
    Expr::DynamicParam { index, data_type }
}

impl Expr {
    /// Literal `TRUE`.
    pub fn true_literal() -> Self {
        lit(true)
    }

    /// Literal `FALSE`.
    pub fn false_literal() -> Self {
        lit(false)
    }

    /// Typed `NULL` literal.
    pub fn null(data_type: DataType) -> Self {
        Self::Literal {
            value: Value::Null,
            data_type,
        }
    }

    /// Build a call, inferring its result type from the operands.
    ///
    /// Operand combinations that have no valid result type are typed `ANY`
    /// and rejected later by [`validate`](Self::validate).
    pub fn call(op: Operator, operands: Vec<Arc<Expr>>) -> Self {
        let types: Vec<DataType> = operands.iter().map(|e| e.data_type().clone()).collect();
        let data_type = op.result_type(&types).unwrap_or(DataType::Any);
        Self::Call {
            op,
            operands,
            data_type,
        }
    }

    fn binary(self, op: Operator, other: Expr) -> Self {
        Self::call(op, vec![Arc::new(self), Arc::new(other)])
    }

    fn unary(self, op: Operator) -> Self {
        Self::call(op, vec![Arc::new(self)])
    }

    /// Result type.
    pub fn data_type(&self) -> &DataType {
        match self {
            Self::Literal { data_type, .. }
            | Self::FieldRef { data_type, .. }
            | Self::DynamicParam { data_type, .. }
            | Self::Call { data_type, .. } => data_type,
        }
    }

    /// Literal value, if this is a literal.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Self::Literal { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Field index, if this is a field reference.
    pub fn as_field(&self) -> Option<usize> {
        match self {
            Self::FieldRef { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Operator and operands, if this is a call.
    pub fn as_call(&self) -> Option<(Operator, &[Arc<Expr>])> {
        match self {
            Self::Call { op, operands, .. } => Some((*op, operands)),
            _ => None,
        }
    }

    /// Whether this is the literal `TRUE`.
    pub fn is_always_true(&self) -> bool {
        matches!(self.as_literal(), Some(Value::Bool(true)))
    }

    /// Whether this is the literal `FALSE`.
    pub fn is_always_false(&self) -> bool {
        matches!(self.as_literal(), Some(Value::Bool(false)))
    }

    // Comparison operators

    /// Equality comparison.
    pub fn eq(self, other: Expr) -> Self {
        self.binary(Operator::Eq, other)
    }

    /// Inequality comparison.
    pub fn not_eq(self, other: Expr) -> Self {
        self.binary(Operator::NotEq, other)
    }

    /// Less than comparison.
    pub fn lt(self, other: Expr) -> Self {
        self.binary(Operator::Lt, other)
    }

    /// Less than or equal comparison.
    pub fn lt_eq(self, other: Expr) -> Self {
        self.binary(Operator::LtEq, other)
    }

    /// Greater than comparison.
    pub fn gt(self, other: Expr) -> Self {
        self.binary(Operator::Gt, other)
    }

    /// Greater than or equal comparison.
    pub fn gt_eq(self, other: Expr) -> Self {
        self.binary(Operator::GtEq, other)
    }

    // Logical operators

    /// Logical AND.
    pub fn and(self, other: Expr) -> Self {
        self.binary(Operator::And, other)
    }

    /// Logical OR.
    pub fn or(self, other: Expr) -> Self {
        self.binary(Operator::Or, other)
    }

    /// Logical NOT.
    pub fn not(self) -> Self {
        self.unary(Operator::Not)
    }

    /// IS NULL check.
    pub fn is_null(self) -> Self {
        self.unary(Operator::IsNull)
    }

    /// IS NOT NULL check.
    pub fn is_not_null(self) -> Self {
        self.unary(Operator::IsNotNull)
    }

    // Arithmetic operators

    /// Addition.
    pub fn plus(self, other: Expr) -> Self {
        self.binary(Operator::Plus, other)
    }

    /// Subtraction.
    pub fn minus(self, other: Expr) -> Self {
        self.binary(Operator::Minus, other)
    }

    /// Multiplication.
    pub fn multiply(self, other: Expr) -> Self {
        self.binary(Operator::Multiply, other)
    }

    /// Division.
    pub fn divide(self, other: Expr) -> Self {
        self.binary(Operator::Divide, other)
    }

    /// SQL LIKE.
    pub fn like(self, pattern: Expr) -> Self {
        self.binary(Operator::Like, pattern)
    }

    /// Cast to `target`.
    pub fn cast(self, target: DataType) -> Self {
        Self::Call {
            op: Operator::Cast,
            operands: vec![Arc::new(self)],
            data_type: target,
        }
    }

    /// Fields of the input row this expression reads.
    pub fn input_refs(&self) -> BitSet {
        let mut refs = Vec::new();
        self.collect_refs(&mut refs);
        BitSet::of(refs)
    }

    fn collect_refs(&self, out: &mut Vec<usize>) {
        match self {
            Self::FieldRef { index, .. } => out.push(*index),
            Self::Call { operands, .. } => operands.iter().for_each(|e| e.collect_refs(out)),
            Self::Literal { .. } | Self::DynamicParam { .. } => {}
        }
    }

    /// Indexes of the dynamic parameters this expression reads.
    pub fn dynamic_params(&self) -> BitSet {
        match self {
            Self::DynamicParam { index, .. } => BitSet::of([*index]),
            Self::Call { operands, .. } => operands
                .iter()
                .fold(BitSet::empty(), |acc, e| acc.union(&e.dynamic_params())),
            Self::Literal { .. } | Self::FieldRef { .. } => BitSet::empty(),
        }
    }

    /// Copy with every field reference rewritten by `f`.
    pub fn remap(&self, f: &impl Fn(usize) -> usize) -> Self {
        match self {
            Self::FieldRef { index, data_type } => Self::FieldRef {
                index: f(*index),
                data_type: data_type.clone(),
            },
            Self::Call {
                op,
                operands,
                data_type,
            } => Self::Call {
                op: *op,
                operands: operands.iter().map(|e| Arc::new(e.remap(f))).collect(),
                data_type: data_type.clone(),
            },
            Self::Literal { .. } | Self::DynamicParam { .. } => self.clone(),
        }
    }

    /// Copy with every field reference moved by `offset`.
    pub fn shift(&self, offset: isize) -> Self {
        self.remap(&|i| i.saturating_add_signed(offset))
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value, .. } => write!(f, "{value}"),
            Self::FieldRef { index, .. } => write!(f, "${index}"),
            Self::DynamicParam { index, .. } => write!(f, "?{index}"),
            Self::Call {
                op: Operator::Cast,
                operands,
                data_type,
            } => {
                write!(f, "CAST(")?;
                if let Some(operand) = operands.first() {
                    write!(f, "{operand}")?;
                }
                write!(f, "):{data_type}")
            }
            Self::Call { op, operands, .. } => {
                write!(f, "{op}(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                write!(f, ")")
            }
        }
    }
}
