//! Aggregate calls.

use std::fmt;

use common_error::{FederaError, FederaResult};
use federa_core::{DataType, RowType};
use serde::{Deserialize, Serialize};

use crate::traits::Collation;

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggKind {
    /// Count rows (no argument) or non-null values.
    Count,
    /// Sum of values.
    Sum,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Average value.
    Avg,
}

impl AggKind {
    /// Result type for the given argument types.
    ///
    /// Returns `None` if the function cannot be applied to them.
    pub fn result_type(&self, args: &[DataType]) -> Option<DataType> {
        match (self, args) {
            (Self::Count, _) => Some(DataType::Int64),
            (Self::Sum, [t]) if t.is_numeric() => Some(t.clone()),
            (Self::Min | Self::Max, [t]) if t.is_orderable() => Some(t.clone()),
            (Self::Avg, [t]) if t.is_numeric() => Some(DataType::Float64),
            _ => None,
        }
    }

    /// Function name for display.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::Avg => "AVG",
        }
    }
}

impl fmt::Display for AggKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One aggregate function applied to fields of the aggregate's input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggCall {
    pub kind: AggKind,
    /// Input field ordinals.
    pub args: Vec<usize>,
    pub distinct: bool,
    /// Boolean input field restricting the rows fed to this call.
    pub filter_arg: Option<usize>,
    /// Order of the values within each group, for order-sensitive functions.
    pub collation: Collation,
    /// Result type.
    pub data_type: DataType,
    /// Output field name.
    pub name: Option<String>,
}

impl AggCall {
    /// Create a call over `input`, checking argument ordinals and deriving the
    /// result type.
    pub fn create(
        kind: AggKind,
        args: Vec<usize>,
        distinct: bool,
        filter_arg: Option<usize>,
        input: &RowType,
        name: Option<String>,
    ) -> FederaResult<Self> {
        let arg_types = args
            .iter()
            .map(|&a| input.field(a).map(|f| f.data_type.clone()))
            .collect::<FederaResult<Vec<_>>>()?;
        let data_type = kind.result_type(&arg_types).ok_or_else(|| {
            FederaError::type_error(format!(
                "{kind} cannot be applied to ({})",
                arg_types
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })?;
        if let Some(f) = filter_arg {
            let field = input.field(f)?;
            if field.data_type != DataType::Bool {
                return Err(FederaError::type_error(format!(
                    "aggregate filter '{}' must be BOOLEAN, got {}",
                    field.name, field.data_type
                )));
            }
        }
        Ok(Self {
            kind,
            args,
            distinct,
            filter_arg,
            collation: Collation::empty(),
            data_type,
            name,
        })
    }

    /// Whether the result may be NULL.
    pub fn is_nullable(&self) -> bool {
        self.kind != AggKind::Count
    }

    /// Fields of the input this call reads, including its ordering fields.
    pub fn input_refs(&self) -> impl Iterator<Item = usize> + '_ {
        self.args
            .iter()
            .copied()
            .chain(self.filter_arg)
            .chain(self.collation.0.iter().map(|c| c.field))
    }

    /// Copy with argument, filter and ordering ordinals rewritten by `f`.
    pub fn remap(&self, f: &impl Fn(usize) -> FederaResult<usize>) -> FederaResult<Self> {
        let collation = self
            .collation
            .0
            .iter()
            .map(|c| {
                Ok(crate::traits::FieldCollation {
                    field: f(c.field)?,
                    ..*c
                })
            })
            .collect::<FederaResult<Vec<_>>>()?;
        Ok(Self {
            args: self.args.iter().map(|&a| f(a)).collect::<FederaResult<_>>()?,
            filter_arg: self.filter_arg.map(f).transpose()?,
            collation: Collation(collation),
            ..self.clone()
        })
    }
}

impl fmt::Display for AggCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.kind)?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        for (i, a) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "${a}")?;
        }
        for (i, c) in self.collation.0.iter().enumerate() {
            write!(f, "{}{c}", if i == 0 { " ORDER BY " } else { ", " })?;
        }
        write!(f, ")")?;
        if let Some(filter) = self.filter_arg {
            write!(f, " FILTER ${filter}")?;
        }
        Ok(())
    }
}
