//! Runtime value representation.

use std::cmp::Ordering;

use common_error::{FederaError, FederaResult};
use serde::{Deserialize, Serialize};

use super::DataType;

/// Runtime value in Federa.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Date (days since Unix epoch).
    Date(i32),
    /// Timestamp (milliseconds since Unix epoch).
    Timestamp(i64),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as i64.
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Self::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as f64.
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Self::Float64(f) => Some(*f),
            Self::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int64(_) => "Int64",
            Self::Float64(_) => "Float64",
            Self::String(_) => "String",
            Self::Binary(_) => "Binary",
            Self::Date(_) => "Date",
            Self::Timestamp(_) => "Timestamp",
        }
    }

    /// The natural data type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Null => DataType::Null,
            Self::Bool(_) => DataType::Bool,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::String(_) => DataType::String,
            Self::Binary(_) => DataType::Binary,
            Self::Date(_) => DataType::Date,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Compare two values of compatible types.
    ///
    /// Integers and floats compare numerically with each other. Returns `None`
    /// for nulls, NaN and incompatible types.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Int64(a), Self::Int64(b)) => Some(a.cmp(b)),
            (Self::Int64(_) | Self::Float64(_), Self::Int64(_) | Self::Float64(_)) => {
                self.as_float64()?.partial_cmp(&other.as_float64()?)
            }
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Date(a), Self::Date(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Binary(a), Self::Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Canonical text form.
    ///
    /// Strings are returned verbatim, numbers in their shortest decimal form,
    /// dates as days and timestamps as milliseconds since the epoch, binary as
    /// lowercase hex and NULL as the empty string. This form is stable across
    /// platforms and is what partition functions hash and match against.
    pub fn canonical_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int64(i) => i.to_string(),
            Self::Float64(f) => f.to_string(),
            Self::String(s) => s.clone(),
            Self::Binary(bytes) => bytes.iter().map(|b| format!("{b:02x}")).collect(),
            Self::Date(d) => d.to_string(),
            Self::Timestamp(t) => t.to_string(),
        }
    }

    /// Parse a textual qualifier into a value of the given type.
    pub fn parse(text: &str, data_type: &DataType) -> FederaResult<Self> {
        let trimmed = text.trim();
        let invalid = || {
            FederaError::value_error(format!(
                "'{text}' is not a valid {} value",
                data_type.display_name()
            ))
        };

        match data_type {
            DataType::Int64 => trimmed.parse().map(Self::Int64).map_err(|_| invalid()),
            DataType::Float64 => trimmed.parse().map(Self::Float64).map_err(|_| invalid()),
            DataType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(invalid()),
            },
            DataType::Date => trimmed.parse().map(Self::Date).map_err(|_| invalid()),
            DataType::Timestamp => trimmed.parse().map(Self::Timestamp).map_err(|_| invalid()),
            DataType::String | DataType::Any => Ok(Self::String(text.to_string())),
            DataType::Null | DataType::Binary => Err(FederaError::type_error(format!(
                "cannot parse a {} value from text",
                data_type.display_name()
            ))),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Int64(i) => write!(f, "{i}"),
            Self::Float64(v) => write!(f, "{v:?}"),
            Self::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Self::Binary(_) => write!(f, "X'{}'", self.canonical_text()),
            Self::Date(d) => write!(f, "DATE({d})"),
            Self::Timestamp(t) => write!(f, "TIMESTAMP({t})"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int64(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int64(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float64(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}
