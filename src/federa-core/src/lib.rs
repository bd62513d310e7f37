//! Core data model for Federa.
//!
//! This crate provides the fundamental types shared by every planning layer:
//! - `Value` and `DataType` for the type system
//! - `Field` and `RowType` for the shape of relational rows
//! - `BitSet` for column sets (grouping keys, referenced fields)
//! - `BackendKind` for the families of storage backends a plan may target
//! - `like_match` for SQL `LIKE` patterns, shared by name lookup and evaluation

pub mod backend;
pub mod bitset;
pub mod like;
pub mod schema;
pub mod types;

pub use backend::BackendKind;
pub use bitset::BitSet;
pub use like::like_match;
pub use schema::{Field, RowType};
pub use types::{DataType, Value};
