//! Trim the input of an aggregate to the fields it reads.

use std::sync::Arc;

use common_error::{FederaError, FederaResult};
use federa_core::BitSet;
use federa_logical::{Convention, Node, NodeKind, OpKind, TraitSet, field};

use super::{Rule, RuleCall};
use crate::operand::Operand;

/// Inserts a Project beneath an Aggregate so the aggregate only receives
/// the grouping columns and the fields its calls read.
///
/// The child operand refuses inputs that already are a Project; without
/// that guard the rule would keep stacking projects.
pub struct AggregateInputTrimRule {
    operand: Operand,
}

impl AggregateInputTrimRule {
    pub fn new() -> Self {
        let operand = Operand::of(OpKind::Aggregate)
            .with_convention(Convention::Logical)
            .with_children(vec![
                Operand::any()
                    .with_convention(Convention::Logical)
                    .guarded(|n| n.op() != OpKind::Project),
            ]);
        Self { operand }
    }
}

impl Default for AggregateInputTrimRule {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for AggregateInputTrimRule {
    fn name(&self) -> &str {
        "AggregateInputTrimRule"
    }

    fn description(&self) -> &str {
        "Projects away input fields an aggregate does not use"
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn on_match(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let aggregate = call.node(0)?.clone();
        let input_id = call.node_id(1)?;
        let input_row = call.node(1)?.row_type.clone();
        let NodeKind::Aggregate {
            group_set,
            group_sets,
            agg_calls,
            indicator,
            ..
        } = &aggregate.kind
        else {
            return Ok(());
        };

        let read: BitSet = agg_calls.iter().flat_map(|c| c.input_refs()).collect();
        let used = group_set.union(&read);
        if used.cardinality() == input_row.arity() {
            return Ok(());
        }

        let exprs = used
            .iter()
            .map(|i| Ok(Arc::new(field(i, input_row.field(i)?.data_type.clone()))))
            .collect::<FederaResult<Vec<_>>>()?;
        let project = call.register(Node::new(
            NodeKind::Project {
                input: input_id,
                exprs,
            },
            TraitSet::logical(),
            input_row.project(&used.to_vec())?,
        ))?;

        let remap = |i: usize| {
            used.index_of(i).ok_or_else(|| {
                FederaError::internal(format!("aggregate reads ${i}, which the trimmed input {used} drops"))
            })
        };
        let remap_set = |set: &BitSet| set.iter().map(remap).collect::<FederaResult<BitSet>>();
        let trimmed = Node::new(
            NodeKind::Aggregate {
                input: project,
                group_set: remap_set(group_set)?,
                group_sets: group_sets.iter().map(remap_set).collect::<FederaResult<_>>()?,
                agg_calls: agg_calls
                    .iter()
                    .map(|c| c.remap(&remap))
                    .collect::<FederaResult<_>>()?,
                indicator: *indicator,
            },
            aggregate.traits.clone(),
            aggregate.row_type.clone(),
        );
        call.transform_to(trimmed)?;
        Ok(())
    }
}
