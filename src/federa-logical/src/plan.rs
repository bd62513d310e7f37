//! Arena-indexed algebra trees.
//!
//! Nodes are immutable once added to a [`PlanArena`]; a rewrite appends new
//! nodes that point at the unchanged inputs by id, so alternatives share
//! every subtree they do not touch.

use std::fmt;

use common_display::{DisplayNode, DisplayTree};
use common_error::{FederaError, FederaResult};
use federa_core::RowType;
use serde::{Deserialize, Serialize};

use crate::native::NativeFragment;
use crate::ops::{NodeKind, OpKind};
use crate::traits::{Convention, TraitSet};

/// Index of a node in its [`PlanArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One relational operator with its physical properties and output shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub traits: TraitSet,
    pub row_type: RowType,
    /// Native fragment for nodes executed by a store.
    pub native: Option<NativeFragment>,
}

impl Node {
    pub fn new(kind: NodeKind, traits: TraitSet, row_type: RowType) -> Self {
        Self {
            kind,
            traits,
            row_type,
            native: None,
        }
    }

    #[must_use]
    pub fn with_native(mut self, fragment: NativeFragment) -> Self {
        self.native = Some(fragment);
        self
    }

    /// Copy with the convention replaced.
    #[must_use]
    pub fn with_convention(&self, convention: Convention) -> Self {
        Self {
            traits: self.traits.with_convention(convention),
            ..self.clone()
        }
    }

    pub fn op(&self) -> OpKind {
        self.kind.op()
    }

    pub fn convention(&self) -> &Convention {
        &self.traits.convention
    }

    pub fn inputs(&self) -> Vec<NodeId> {
        self.kind.inputs()
    }

    /// Convention the inputs must be delivered in. Only a converter differs
    /// from its own convention.
    pub fn input_convention(&self) -> &Convention {
        match &self.kind {
            NodeKind::Converter { from, .. } => from,
            _ => &self.traits.convention,
        }
    }

    /// One-line label: operator, traits and details.
    pub fn label(&self) -> String {
        let mut s = format!("{} [{}] {}", self.op(), self.traits, self.kind.describe());
        if let Some(native) = &self.native {
            s.push_str(&format!(" native={native}"));
        }
        s
    }
}

/// Append-only storage for algebra nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanArena {
    nodes: Vec<Node>,
}

impl PlanArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node. Its inputs must already be in the arena.
    pub fn add(&mut self, node: Node) -> FederaResult<NodeId> {
        for input in node.inputs() {
            self.get(input)?;
        }
        let id = u32::try_from(self.nodes.len())
            .map_err(|_| FederaError::internal("plan arena is full"))?;
        self.nodes.push(node);
        Ok(NodeId(id))
    }

    pub fn get(&self, id: NodeId) -> FederaResult<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| FederaError::internal(format!("node {id} is not in the arena")))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes with their ids, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        (0u32..).zip(&self.nodes).map(|(i, n)| (NodeId(i), n))
    }

    /// Ids of the tree rooted at `root`, parents before children.
    pub fn preorder(&self, root: NodeId) -> FederaResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let node = self.get(id)?;
            out.push(id);
            stack.extend(node.inputs().into_iter().rev());
        }
        Ok(out)
    }

    fn display_node(&self, id: NodeId) -> FederaResult<DisplayNode> {
        let node = self.get(id)?;
        let mut details = format!("{}; {}", node.traits, node.kind.describe());
        if let Some(native) = &node.native {
            details.push_str(&format!("; native={native}"));
        }
        let mut out = DisplayNode::new(node.op().to_string()).with_details(details);
        for input in node.inputs() {
            out = out.with_child(self.display_node(input)?);
        }
        Ok(out)
    }

    /// Render the tree rooted at `root`.
    pub fn explain(&self, root: NodeId) -> FederaResult<String> {
        let tree = self.display_node(root)?;
        Ok(DisplayTree::new(&tree).to_string())
    }
}

/// A plan: an arena plus the id of its root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub arena: PlanArena,
    pub root: NodeId,
}

impl Plan {
    pub fn root_node(&self) -> FederaResult<&Node> {
        self.arena.get(self.root)
    }

    pub fn row_type(&self) -> FederaResult<&RowType> {
        Ok(&self.root_node()?.row_type)
    }

    /// Render the plan as an indented tree.
    pub fn explain(&self) -> FederaResult<String> {
        self.arena.explain(self.root)
    }

    /// Number of nodes reachable from the root.
    pub fn node_count(&self) -> FederaResult<usize> {
        Ok(self.arena.preorder(self.root)?.len())
    }

    /// Whether some reachable node satisfies `predicate`.
    pub fn contains<F>(&self, predicate: F) -> FederaResult<bool>
    where
        F: Fn(&Node) -> bool,
    {
        for id in self.arena.preorder(self.root)? {
            if predicate(self.arena.get(id)?) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use federa_core::{BitSet, DataType, Field, Value};

    use super::*;

    fn values(arena: &mut PlanArena) -> NodeId {
        arena
            .add(Node::new(
                NodeKind::Values {
                    tuples: vec![vec![Value::Int64(1)], vec![Value::Int64(2)]],
                },
                TraitSet::logical(),
                RowType::new(vec![Field::new("x", DataType::Int64)]),
            ))
            .unwrap()
    }

    #[test]
    fn test_add_rejects_dangling_input() {
        let mut arena = PlanArena::new();
        let node = Node::new(
            NodeKind::Converter {
                input: NodeId(5),
                from: Convention::Logical,
            },
            TraitSet::enumerable(),
            RowType::default(),
        );
        assert!(arena.add(node).is_err());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_explain() {
        let mut arena = PlanArena::new();
        let leaf = values(&mut arena);
        let agg = arena
            .add(Node::new(
                NodeKind::Aggregate {
                    input: leaf,
                    group_set: BitSet::of([0]),
                    group_sets: vec![BitSet::of([0])],
                    agg_calls: vec![],
                    indicator: false,
                },
                TraitSet::logical(),
                RowType::new(vec![Field::new("x", DataType::Int64)]),
            ))
            .unwrap();
        let plan = Plan { arena, root: agg };
        assert_eq!(
            plan.explain().unwrap(),
            "Aggregate (LOGICAL; group={0})\n└─ Values (LOGICAL; tuples=[(1), (2)])\n"
        );
        assert_eq!(plan.node_count().unwrap(), 2);
        assert!(plan.contains(|n| n.op() == OpKind::Values).unwrap());
    }
}
