//! Memo of equivalent alternatives.
//!
//! Every node lives in exactly one group; all nodes in a group produce the
//! same rows. Inputs of a node stand for their whole group, so an
//! alternative registered for a subtree is visible to every parent of that
//! subtree without copying the parents.

use std::collections::{HashMap, HashSet};
use std::fmt;

use common_error::{FederaError, FederaResult};
use federa_logical::{Node, NodeId, Plan, PlanArena};
use log::debug;

use crate::cost::estimate_rows;

/// Identifier of an equivalence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[derive(Debug)]
struct Group {
    members: Vec<NodeId>,
    rows: f64,
    merged_into: Option<GroupId>,
}

/// Groups of equivalent nodes, deduplicated by digest.
#[derive(Debug)]
pub struct Memo {
    arena: PlanArena,
    node_groups: Vec<GroupId>,
    groups: Vec<Group>,
    digests: HashMap<String, NodeId>,
    default_rows: f64,
    version: u64,
}

impl Memo {
    pub fn new(default_rows: f64) -> Self {
        Self {
            arena: PlanArena::new(),
            node_groups: Vec::new(),
            groups: Vec::new(),
            digests: HashMap::new(),
            default_rows,
            version: 0,
        }
    }

    /// Memo seeded with the nodes reachable from `plan`'s root; returns the
    /// root's group.
    pub fn from_plan(plan: &Plan, default_rows: f64) -> FederaResult<(Self, GroupId)> {
        let mut memo = Self::new(default_rows);
        let reachable: HashSet<NodeId> = plan.arena.preorder(plan.root)?.into_iter().collect();
        let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
        for (id, node) in plan.arena.iter() {
            if !reachable.contains(&id) {
                continue;
            }
            let inputs = node
                .inputs()
                .iter()
                .map(|i| {
                    mapping.get(i).copied().ok_or_else(|| {
                        FederaError::internal(format!("input {i} precedes its parent {id}"))
                    })
                })
                .collect::<FederaResult<Vec<_>>>()?;
            let copy = Node {
                kind: node.kind.with_inputs(&inputs),
                ..node.clone()
            };
            mapping.insert(id, memo.insert(copy, None)?);
        }
        let root = mapping
            .get(&plan.root)
            .copied()
            .ok_or_else(|| FederaError::internal("plan root was not copied"))?;
        let root_group = memo.group_of(root)?;
        Ok((memo, root_group))
    }

    /// Counter bumped whenever a node is added or two groups merge.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Ids of every node, in insertion order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.arena.iter().map(|(id, _)| id).collect()
    }

    pub fn node(&self, id: NodeId) -> FederaResult<&Node> {
        self.arena.get(id)
    }

    /// Current group of `id`, following merges.
    pub fn group_of(&self, id: NodeId) -> FederaResult<GroupId> {
        let group = self
            .node_groups
            .get(id.index())
            .copied()
            .ok_or_else(|| FederaError::internal(format!("node {id} is not in the memo")))?;
        Ok(self.find(group))
    }

    /// Representative of the group `group` was merged into, if any.
    pub fn find(&self, mut group: GroupId) -> GroupId {
        while let Some(next) = self
            .groups
            .get(group.0 as usize)
            .and_then(|g| g.merged_into)
        {
            group = next;
        }
        group
    }

    /// Members of a group. Empty for ids that were merged away.
    pub fn members(&self, group: GroupId) -> &[NodeId] {
        self.groups
            .get(self.find(group).0 as usize)
            .map_or(&[], |g| g.members.as_slice())
    }

    /// Row estimate of a group.
    pub fn rows(&self, group: GroupId) -> f64 {
        self.groups
            .get(self.find(group).0 as usize)
            .map_or(self.default_rows, |g| g.rows)
    }

    /// Live groups, in creation order.
    pub fn groups(&self) -> Vec<GroupId> {
        (0u32..)
            .zip(&self.groups)
            .filter(|(_, g)| g.merged_into.is_none())
            .map(|(i, _)| GroupId(i))
            .collect()
    }

    /// Groups of a node's inputs.
    pub fn input_groups(&self, id: NodeId) -> FederaResult<Vec<GroupId>> {
        self.node(id)?
            .inputs()
            .into_iter()
            .map(|i| self.group_of(i))
            .collect()
    }

    fn digest(&self, node: &Node) -> FederaResult<String> {
        let inputs = node
            .inputs()
            .into_iter()
            .map(|i| self.group_of(i).map(|g| g.to_string()))
            .collect::<FederaResult<Vec<_>>>()?;
        // Field names and types are part of identity: two projects differing
        // only in aliases are not interchangeable.
        Ok(format!("{} {}({})", node.label(), node.row_type, inputs.join(",")))
    }

    /// Add `node`, or find an identical existing node.
    ///
    /// With a `target`, the node is recorded as equivalent to that group;
    /// if an identical node already lives in another group, the two groups
    /// are merged. Without one, a new node starts its own group.
    pub fn insert(&mut self, node: Node, target: Option<GroupId>) -> FederaResult<NodeId> {
        let digest = self.digest(&node)?;
        if let Some(&existing) = self.digests.get(&digest) {
            if let Some(target) = target {
                let current = self.group_of(existing)?;
                self.merge(current, self.find(target));
            }
            return Ok(existing);
        }

        let group = match target {
            Some(t) => self.find(t),
            None => {
                let input_rows: Vec<f64> = node
                    .inputs()
                    .into_iter()
                    .map(|i| self.group_of(i).map(|g| self.rows(g)))
                    .collect::<FederaResult<_>>()?;
                let rows = estimate_rows(&node, &input_rows, self.default_rows);
                let id = u32::try_from(self.groups.len())
                    .map_err(|_| FederaError::internal("memo group limit reached"))?;
                self.groups.push(Group {
                    members: Vec::new(),
                    rows,
                    merged_into: None,
                });
                GroupId(id)
            }
        };

        let id = self.arena.add(node)?;
        self.node_groups.push(group);
        self.groups[group.0 as usize].members.push(id);
        self.digests.insert(digest, id);
        self.version += 1;
        Ok(id)
    }

    /// Merge two groups; the older one survives.
    pub fn merge(&mut self, a: GroupId, b: GroupId) {
        let (a, b) = (self.find(a), self.find(b));
        if a == b {
            return;
        }
        let (keep, gone) = if a < b { (a, b) } else { (b, a) };
        let moved = std::mem::take(&mut self.groups[gone.0 as usize].members);
        debug!("memo: merging {gone} into {keep} ({} node(s))", moved.len());
        self.groups[keep.0 as usize].members.extend(moved);
        self.groups[gone.0 as usize].merged_into = Some(keep);
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use federa_core::{DataType, Field, RowType, Value};
    use federa_logical::{Convention, NodeKind, TraitSet};

    use super::*;

    fn values(v: i64) -> Node {
        Node::new(
            NodeKind::Values {
                tuples: vec![vec![Value::Int64(v)]],
            },
            TraitSet::logical(),
            RowType::new(vec![Field::new("x", DataType::Int64)]),
        )
    }

    #[test]
    fn test_insert_deduplicates() {
        let mut memo = Memo::new(100.0);
        let a = memo.insert(values(1), None).unwrap();
        let b = memo.insert(values(1), None).unwrap();
        assert_eq!(a, b);
        assert_eq!(memo.len(), 1);
        assert_eq!(memo.rows(memo.group_of(a).unwrap()), 1.0);
    }

    #[test]
    fn test_nodes_with_different_row_types_stay_apart() {
        let mut memo = Memo::new(100.0);
        let a = memo.insert(values(1), None).unwrap();
        let renamed = Node::new(
            NodeKind::Values {
                tuples: vec![vec![Value::Int64(1)]],
            },
            TraitSet::logical(),
            RowType::new(vec![Field::new("y", DataType::Int64)]),
        );
        let b = memo.insert(renamed, None).unwrap();
        assert_ne!(a, b);

        let widened = Node::new(
            NodeKind::Values {
                tuples: vec![vec![Value::Int64(1)]],
            },
            TraitSet::logical(),
            RowType::new(vec![Field::new("x", DataType::Float64)]),
        );
        let c = memo.insert(widened, None).unwrap();
        assert_ne!(a, c);
        assert_eq!(memo.len(), 3);
        assert_ne!(memo.group_of(a).unwrap(), memo.group_of(b).unwrap());
    }

    #[test]
    fn test_equivalent_node_joins_target_group() {
        let mut memo = Memo::new(100.0);
        let a = memo.insert(values(1), None).unwrap();
        let g = memo.group_of(a).unwrap();
        let b = memo
            .insert(values(1).with_convention(Convention::Enumerable), Some(g))
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(memo.members(g), &[a, b]);
    }

    #[test]
    fn test_duplicate_in_other_group_merges() {
        let mut memo = Memo::new(100.0);
        let a = memo.insert(values(1), None).unwrap();
        let b = memo.insert(values(2), None).unwrap();
        let (ga, gb) = (memo.group_of(a).unwrap(), memo.group_of(b).unwrap());
        assert_ne!(ga, gb);

        let again = memo.insert(values(2), Some(ga)).unwrap();
        assert_eq!(again, b);
        assert_eq!(memo.group_of(b).unwrap(), ga);
        assert_eq!(memo.groups(), vec![ga]);
        assert!(memo.members(gb).contains(&a));
    }
}
