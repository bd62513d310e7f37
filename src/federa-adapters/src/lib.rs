//! Native predicate translation and per-store rule sets.
//!
//! Each backend kind has a translator that turns filters (and, where the
//! backend can, projections, aggregates and sorts) into fragments of its own
//! query language. A filter the backend cannot fully evaluate is split into
//! a pushed part and a residual the enumerable engine applies afterwards;
//! a filter it cannot evaluate at all yields
//! [`Translation::Untranslatable`] rather than an error.
//!
//! | backend     | filters                                      | OR  | params |
//! |-------------|----------------------------------------------|-----|--------|
//! | document    | comparisons, null tests, LIKE                | yes | yes    |
//! | wide-column | partition-key equality, clustering ranges    | no  | yes    |
//! | search      | `bool` of `term`/`range`/`exists`/`wildcard` | yes | yes    |
//! | file        | primary-key equality                         | no  | no     |
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use federa_adapters::{TranslateContext, Translation, translate};
//! use federa_core::{BackendKind, DataType};
//! use federa_logical::{field, lit};
//!
//! let ctx = TranslateContext::new(["pk", "v"]).with_partition_key(vec![0]);
//! let condition = Arc::new(field(0, DataType::Int64).eq(lit(7i64)));
//! let t = translate(BackendKind::WideColumn, &condition, &ctx);
//! assert!(matches!(t, Translation::Full(_)));
//! ```

pub mod capability;
pub mod client;
pub mod translation;

mod document;
mod file;
mod render;
mod rules;
mod search;
mod wide_column;

pub use capability::{AggregateSpec, Capabilities, SortSpec, capabilities, translate};
pub use client::{BackendClient, RowIter, StoreQuery, execute_store_query, store_queries};
pub use rules::{StoreRule, register_all_stores, register_store_rules, store_rules};
pub use translation::{Bound, FilterPlan, NativeValue, Term, TranslateContext, Translation, plan_filter};
