//! Rules and the driver that applies them.
//!
//! # Rule Categories
//!
//! - **Logical rewrites**: [`FilterMergeRule`], [`AggregateInputTrimRule`]
//! - **Enumerable implementations**: [`EnumerableRule`], one per operator
//!   kind, so every plan has an in-process fallback
//! - **Backend rules**: registered by adapter crates against their own
//!   conventions

mod aggregate_trim;
mod enumerable;
mod filter_merge;
mod optimizer;
mod rule;

pub use aggregate_trim::AggregateInputTrimRule;
pub use enumerable::EnumerableRule;
pub use filter_merge::FilterMergeRule;
pub use optimizer::{Optimizer, OptimizerConfig};
pub use rule::{OptimizedPlan, Rule, RuleCall, RuleTrace};
