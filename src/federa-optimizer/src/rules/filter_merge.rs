//! Merge adjacent filters.

use common_error::FederaResult;
use federa_logical::expr::{and_all, conjunctions};
use federa_logical::{Convention, Node, NodeKind, OpKind};

use super::{Rule, RuleCall};
use crate::operand::Operand;

/// Rewrites `Filter(Filter(x, a), b)` to `Filter(x, a AND b)`.
///
/// Conjuncts of the lower filter come first; duplicates are dropped.
pub struct FilterMergeRule {
    operand: Operand,
}

impl FilterMergeRule {
    pub fn new() -> Self {
        let operand = Operand::of(OpKind::Filter)
            .with_convention(Convention::Logical)
            .with_children(vec![
                Operand::of(OpKind::Filter).with_convention(Convention::Logical),
            ]);
        Self { operand }
    }
}

impl Default for FilterMergeRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for FilterMergeRule {
    fn name(&self) -> &str {
        "FilterMergeRule"
    }

    fn description(&self) -> &str {
        "Combines a filter over a filter into one filter"
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn on_match(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let top = call.node(0)?.clone();
        let bottom = call.node(1)?;
        let (
            NodeKind::Filter { condition: upper, .. },
            NodeKind::Filter {
                input,
                condition: lower,
            },
        ) = (&top.kind, &bottom.kind)
        else {
            return Ok(());
        };

        let mut merged = conjunctions(lower);
        for c in conjunctions(upper) {
            if !merged.contains(&c) {
                merged.push(c);
            }
        }
        let node = Node::new(
            NodeKind::Filter {
                input: *input,
                condition: and_all(merged),
            },
            top.traits.clone(),
            top.row_type.clone(),
        );
        call.transform_to(node)?;
        Ok(())
    }
}
