//! Logical layer for Federa.
//!
//! `federa-logical` provides the backend-neutral algebra the optimizer
//! rewrites:
//!
//! - **Expression Model**: immutable scalar expressions ([`Expr`]) with
//!   boolean decomposition helpers and three-valued evaluation
//! - **Algebra Node Model**: relational operators ([`NodeKind`]) stored in an
//!   append-only [`PlanArena`] and addressed by [`NodeId`]
//! - **Conventions and traits**: which engine runs a node ([`Convention`])
//!   plus its ordering and distribution ([`TraitSet`])
//! - **Grouping sets**: classification of aggregate grouping sets and the
//!   derived aggregate row type ([`grouping`])
//!
//! # Example
//!
//! ```rust
//! use federa_core::{DataType, Field, RowType, Value};
//! use federa_logical::{AggKind, PlanBuilder};
//!
//! let row = RowType::new(vec![
//!     Field::new("region", DataType::String),
//!     Field::new("amount", DataType::Float64),
//! ]);
//! let builder = PlanBuilder::values(row, vec![vec![Value::from("EU"), Value::Float64(2.5)]]).unwrap();
//! let total = builder.agg_call(AggKind::Sum, &["amount"], false, Some("total")).unwrap();
//! let plan = builder.group_by(&["region"], vec![total]).unwrap().build();
//!
//! println!("{}", plan.explain().unwrap());
//! ```

pub mod expr;
pub mod grouping;
pub mod native;
pub mod ops;
pub mod traits;

mod builder;
mod plan;

pub use builder::PlanBuilder;
pub use plan::{Node, NodeId, Plan, PlanArena};

pub use expr::{Expr, FieldComparison, Operator, field, lit, param};
pub use grouping::GroupType;
pub use native::{Clause, NativeBody, NativeFragment};
pub use ops::{AggCall, AggKind, ModifyOp, NodeKind, OpKind, TableRef};
pub use traits::{Collation, Convention, Direction, Distribution, FieldCollation, NullOrder, TraitSet};
