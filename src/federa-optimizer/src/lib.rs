//! Rule-based, cost-based optimizer for Federa plans.
//!
//! Plans are copied into a [`Memo`] of equivalence groups. Registered
//! [`Rule`]s match [`Operand`] patterns against memo nodes and add
//! equivalent alternatives, possibly under another convention; the
//! [`CostModel`] then picks the cheapest alternative that runs in
//! `ENUMERABLE` at the root.
//!
//! ```rust
//! use federa_core::{DataType, Field, RowType, Value};
//! use federa_logical::{PlanBuilder, lit};
//!
//! let row = RowType::new(vec![Field::new("x", DataType::Int64)]);
//! let plan = PlanBuilder::values(row, vec![vec![Value::Int64(4)]])
//!     .unwrap()
//!     .filter_by(|b| Ok(b.field("x")?.gt(lit(3i64))))
//!     .unwrap()
//!     .build();
//!
//! let optimized = federa_optimizer::optimize(&plan).unwrap();
//! println!("{}", optimized.plan.explain().unwrap());
//! ```

pub mod cost;
mod memo;
mod operand;
mod registry;
mod rules;

pub use cost::{Cost, CostModel};
pub use memo::{GroupId, Memo};
pub use operand::{Guard, Matcher, Operand};
pub use registry::RuleRegistry;
pub use rules::{
    AggregateInputTrimRule, EnumerableRule, FilterMergeRule, OptimizedPlan, Optimizer,
    OptimizerConfig, Rule, RuleCall, RuleTrace,
};

use common_error::FederaResult;
use federa_logical::Plan;

/// Optimize a plan with the default rules and configuration.
pub fn optimize(plan: &Plan) -> FederaResult<OptimizedPlan> {
    Optimizer::default().optimize(plan)
}
