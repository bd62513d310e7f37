//! Operand patterns matched against memo nodes.

use std::fmt;
use std::sync::Arc;

use common_error::FederaResult;
use federa_logical::{Convention, Node, NodeId, OpKind};
use log::trace;

use crate::memo::Memo;

/// Test applied to a node's operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Exactly this operator kind.
    Exact(OpKind),
    /// Any operator.
    Any,
}

/// Caller-supplied predicate on a candidate node.
pub type Guard = Arc<dyn Fn(&Node) -> bool + Send + Sync>;

/// A rooted tree of node matchers.
///
/// A node matches an operand when its operator passes the matcher, its
/// convention equals the operand's convention (if one is set) and the guard
/// (if any) accepts it. Child operands are matched against every member of
/// the corresponding input group; an operand without children accepts any
/// inputs.
#[derive(Clone)]
pub struct Operand {
    matcher: Matcher,
    convention: Option<Convention>,
    guard: Option<Guard>,
    children: Vec<Operand>,
}

impl Operand {
    /// Match nodes of operator `kind`.
    pub fn of(kind: OpKind) -> Self {
        Self {
            matcher: Matcher::Exact(kind),
            convention: None,
            guard: None,
            children: Vec::new(),
        }
    }

    /// Match any node.
    pub fn any() -> Self {
        Self {
            matcher: Matcher::Any,
            convention: None,
            guard: None,
            children: Vec::new(),
        }
    }

    /// Restrict to nodes of `convention`.
    #[must_use]
    pub fn with_convention(mut self, convention: Convention) -> Self {
        self.convention = Some(convention);
        self
    }

    /// Restrict to nodes accepted by `guard`.
    #[must_use]
    pub fn guarded(mut self, guard: impl Fn(&Node) -> bool + Send + Sync + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    /// Set child operands, one per input.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Operand>) -> Self {
        self.children = children;
        self
    }

    pub fn matcher(&self) -> Matcher {
        self.matcher
    }

    pub fn children(&self) -> &[Operand] {
        &self.children
    }

    /// Number of operands in the tree, which is the length of every binding.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Operand::size).sum::<usize>()
    }

    /// Whether `node` passes this operand, ignoring children.
    pub fn matches(&self, node: &Node) -> bool {
        let kind_ok = match self.matcher {
            Matcher::Exact(kind) => node.op() == kind,
            Matcher::Any => true,
        };
        kind_ok
            && self
                .convention
                .as_ref()
                .is_none_or(|c| node.convention() == c)
            && self.guard.as_ref().is_none_or(|g| g(node))
    }

    /// All bindings of this operand tree rooted at `id`, each listing the
    /// matched nodes in preorder.
    pub(crate) fn bind(&self, memo: &Memo, id: NodeId) -> FederaResult<Vec<Vec<NodeId>>> {
        let node = memo.node(id)?;
        if !self.matches(node) {
            return Ok(Vec::new());
        }
        if self.children.is_empty() {
            return Ok(vec![vec![id]]);
        }
        let inputs = node.inputs();
        if inputs.len() != self.children.len() {
            return Ok(Vec::new());
        }

        let mut bindings = vec![vec![id]];
        for (child, input) in self.children.iter().zip(inputs) {
            let group = memo.group_of(input)?;
            let mut child_bindings = Vec::new();
            for member in memo.members(group) {
                child_bindings.extend(child.bind(memo, *member)?);
            }
            if child_bindings.is_empty() {
                return Ok(Vec::new());
            }
            bindings = bindings
                .iter()
                .flat_map(|prefix| {
                    child_bindings.iter().map(move |suffix| {
                        let mut b = prefix.clone();
                        b.extend_from_slice(suffix);
                        b
                    })
                })
                .collect();
        }
        trace!("operand {self:?} bound {} time(s) at {id}", bindings.len());
        Ok(bindings)
    }
}

impl fmt::Debug for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.matcher {
            Matcher::Exact(kind) => write!(f, "{kind}")?,
            Matcher::Any => write!(f, "any")?,
        }
        if let Some(c) = &self.convention {
            write!(f, "[{c}]")?;
        }
        if self.guard.is_some() {
            write!(f, "?")?;
        }
        if !self.children.is_empty() {
            write!(f, "(")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{child:?}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use federa_core::{DataType, Field, RowType, Value};
    use federa_logical::{NodeKind, TraitSet};

    use super::*;

    fn values() -> Node {
        Node::new(
            NodeKind::Values {
                tuples: vec![vec![Value::Int64(1)]],
            },
            TraitSet::logical(),
            RowType::new(vec![Field::new("x", DataType::Int64)]),
        )
    }

    #[test]
    fn test_matches_kind_convention_and_guard() {
        let node = values();
        assert!(Operand::of(OpKind::Values).matches(&node));
        assert!(!Operand::of(OpKind::Filter).matches(&node));
        assert!(Operand::any().with_convention(Convention::Logical).matches(&node));
        assert!(!Operand::any().with_convention(Convention::Enumerable).matches(&node));
        assert!(!Operand::any().guarded(|n| n.row_type.arity() > 1).matches(&node));
    }

    #[test]
    fn test_size_and_debug() {
        let op = Operand::of(OpKind::Filter)
            .with_convention(Convention::Logical)
            .with_children(vec![Operand::any().guarded(|_| true)]);
        assert_eq!(op.size(), 2);
        assert_eq!(format!("{op:?}"), "Filter[LOGICAL](any?)");
    }
}
