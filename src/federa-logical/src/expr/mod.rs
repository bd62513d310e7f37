//! Expression trees for relational operators.

mod eval;
#[allow(clippy::module_inception)]
mod expr;
mod operator;
mod util;

pub use expr::{Expr, field, lit, param};
pub use operator::Operator;
pub use util::{
    FieldComparison, and_all, conjunctions, decompose, disjunctions, or_all, recompose,
};
