//! Relational operators.

mod aggregate;

use std::fmt;
use std::sync::Arc;

use federa_catalog::TableId;
use federa_core::{BitSet, Value};
use serde::{Deserialize, Serialize};

use crate::expr::Expr;
use crate::plan::NodeId;
use crate::traits::{Collation, Convention};

pub use aggregate::{AggCall, AggKind};

/// Reference to a catalog table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRef {
    pub id: TableId,
    pub namespace: String,
    pub name: String,
    /// Row count estimate at the time the plan was built.
    pub row_count: Option<f64>,
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.namespace, self.name)
    }
}

/// Kind of data modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifyOp {
    Insert,
    Update,
    Delete,
    Merge,
}

impl fmt::Display for ModifyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Merge => "MERGE",
        };
        f.write_str(name)
    }
}

/// Operator of an algebra node, with its payload.
///
/// Inputs are [`NodeId`]s into the owning [`PlanArena`](crate::PlanArena).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Read all rows of a table.
    Scan { table: TableRef },
    /// Keep rows for which `condition` is `TRUE`.
    Filter { input: NodeId, condition: Arc<Expr> },
    /// Compute one output field per expression.
    Project { input: NodeId, exprs: Vec<Arc<Expr>> },
    /// Group and aggregate.
    ///
    /// Every member of `group_sets` is a subset of `group_set`, and
    /// `group_sets` is strictly ordered by [`BitSet::grouping_cmp`].
    Aggregate {
        input: NodeId,
        group_set: BitSet,
        group_sets: Vec<BitSet>,
        agg_calls: Vec<AggCall>,
        indicator: bool,
    },
    /// Order rows, then skip `offset` and keep at most `fetch`.
    Sort {
        input: NodeId,
        collation: Collation,
        offset: Option<u64>,
        fetch: Option<u64>,
    },
    /// Literal rows.
    Values { tuples: Vec<Vec<Value>> },
    /// Write the input's rows to a table.
    Modify {
        input: NodeId,
        table: TableRef,
        op: ModifyOp,
    },
    /// Hand rows produced under `from` to the node's own convention.
    Converter { input: NodeId, from: Convention },
}

/// Payload-free discriminant of [`NodeKind`], used by rule operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OpKind {
    Scan,
    Filter,
    Project,
    Aggregate,
    Sort,
    Values,
    Modify,
    Converter,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl NodeKind {
    /// Discriminant.
    pub fn op(&self) -> OpKind {
        match self {
            Self::Scan { .. } => OpKind::Scan,
            Self::Filter { .. } => OpKind::Filter,
            Self::Project { .. } => OpKind::Project,
            Self::Aggregate { .. } => OpKind::Aggregate,
            Self::Sort { .. } => OpKind::Sort,
            Self::Values { .. } => OpKind::Values,
            Self::Modify { .. } => OpKind::Modify,
            Self::Converter { .. } => OpKind::Converter,
        }
    }

    /// Input nodes in order.
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Self::Scan { .. } | Self::Values { .. } => Vec::new(),
            Self::Filter { input, .. }
            | Self::Project { input, .. }
            | Self::Aggregate { input, .. }
            | Self::Sort { input, .. }
            | Self::Modify { input, .. }
            | Self::Converter { input, .. } => vec![*input],
        }
    }

    /// Copy with inputs replaced, in order. Extra ids are ignored.
    #[must_use]
    pub fn with_inputs(&self, inputs: &[NodeId]) -> Self {
        let mut copy = self.clone();
        if let Some(&new_input) = inputs.first() {
            match &mut copy {
                Self::Scan { .. } | Self::Values { .. } => {}
                Self::Filter { input, .. }
                | Self::Project { input, .. }
                | Self::Aggregate { input, .. }
                | Self::Sort { input, .. }
                | Self::Modify { input, .. }
                | Self::Converter { input, .. } => *input = new_input,
            }
        }
        copy
    }

    /// Operator-specific details without the inputs, for explain output and
    /// memo digests.
    pub fn describe(&self) -> String {
        match self {
            Self::Scan { table } => format!("table={table}"),
            Self::Filter { condition, .. } => format!("condition={condition}"),
            Self::Project { exprs, .. } => format!("exprs=[{}]", join(exprs)),
            Self::Aggregate {
                group_set,
                group_sets,
                agg_calls,
                indicator,
                ..
            } => {
                let mut s = format!("group={group_set}");
                if group_sets.len() != 1 || group_sets.first() != Some(group_set) {
                    s.push_str(&format!(", groups=[{}]", join(group_sets)));
                }
                if *indicator {
                    s.push_str(", indicator=true");
                }
                if !agg_calls.is_empty() {
                    s.push_str(&format!(", aggs=[{}]", join(agg_calls)));
                }
                s
            }
            Self::Sort {
                collation,
                offset,
                fetch,
                ..
            } => {
                let mut s = format!("sort={collation}");
                if let Some(o) = offset {
                    s.push_str(&format!(", offset={o}"));
                }
                if let Some(n) = fetch {
                    s.push_str(&format!(", fetch={n}"));
                }
                s
            }
            Self::Values { tuples } => {
                let rows: Vec<String> = tuples.iter().map(|t| format!("({})", join(t))).collect();
                format!("tuples=[{}]", rows.join(", "))
            }
            Self::Modify { table, op, .. } => format!("table={table}, op={op}"),
            Self::Converter { from, .. } => format!("from={from}"),
        }
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
