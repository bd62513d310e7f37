//! In-process implementation rules.
//!
//! Every logical operator has an enumerable twin, so any plan can run
//! locally even when no backend accepts any part of it.

use common_error::FederaResult;
use federa_logical::{Convention, OpKind};

use super::{Rule, RuleCall};
use crate::operand::Operand;

/// Implements one logical operator kind in the `ENUMERABLE` convention.
pub struct EnumerableRule {
    kind: OpKind,
    name: String,
    operand: Operand,
}

impl EnumerableRule {
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            name: format!("Enumerable{kind}Rule"),
            operand: Operand::of(kind).with_convention(Convention::Logical),
        }
    }

    /// One rule per logical operator kind.
    pub fn all() -> Vec<Self> {
        [
            OpKind::Scan,
            OpKind::Filter,
            OpKind::Project,
            OpKind::Aggregate,
            OpKind::Sort,
            OpKind::Values,
            OpKind::Modify,
        ]
        .into_iter()
        .map(Self::new)
        .collect()
    }

    pub fn kind(&self) -> OpKind {
        self.kind
    }
}

impl Rule for EnumerableRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Implements a logical operator in process"
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn on_match(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let node = call.node(0)?.with_convention(Convention::Enumerable);
        call.transform_to(node)?;
        Ok(())
    }
}
