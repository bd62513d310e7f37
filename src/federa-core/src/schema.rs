//! Row types: the ordered, named and typed fields produced by a plan node.

use common_error::{FederaError, FederaResult};
use serde::{Deserialize, Serialize};

use crate::types::DataType;

/// A single named, typed field of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name.
    pub name: String,
    /// Field type.
    pub data_type: DataType,
    /// Whether the field may hold NULL.
    pub nullable: bool,
}

impl Field {
    /// Create a non-nullable field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
        }
    }

    /// Create a nullable field.
    pub fn nullable(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Return a copy with the given nullability.
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if !self.nullable {
            write!(f, " NOT NULL")?;
        }
        Ok(())
    }
}

/// Ordered list of fields describing a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RowType {
    /// Fields in positional order.
    pub fields: Vec<Field>,
}

impl RowType {
    /// Create a row type from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Number of fields.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Field at `index`.
    pub fn field(&self, index: usize) -> FederaResult<&Field> {
        self.fields.get(index).ok_or_else(|| {
            FederaError::schema_error(format!(
                "field index {index} out of bounds for row of arity {}",
                self.arity()
            ))
        })
    }

    /// Position of the field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Field names in order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Row type containing only the fields at `indices`, in that order.
    pub fn project(&self, indices: &[usize]) -> FederaResult<Self> {
        indices
            .iter()
            .map(|&i| self.field(i).cloned())
            .collect::<FederaResult<Vec<_>>>()
            .map(Self::new)
    }

    /// Whether two row types have the same field types and nullability.
    /// Names are ignored.
    pub fn equal_sans_names(&self, other: &Self) -> bool {
        self.arity() == other.arity()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|(a, b)| a.data_type == b.data_type && a.nullable == b.nullable)
    }
}

impl std::fmt::Display for RowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ")")
    }
}
