//! Cost model.
//!
//! Costs are `(rows, cpu, io)` triples totalled into one comparable number
//! with the weights from [`CostSettings`]. Every formula here is monotone:
//! more input rows or more aggregate calls never make a node cheaper.

use std::fmt;
use std::ops::Add;

use common_config::CostSettings;
use federa_logical::expr::conjunctions;
use federa_logical::{AggKind, Convention, Expr, Node, NodeKind, Operator};

/// Per-call weight of an aggregate call.
pub const AGG_CALL_WEIGHT: f64 = 0.125;
/// Extra weight of a SUM call; a deterministic tie-break between otherwise
/// equal aggregates.
pub const SUM_CALL_WEIGHT: f64 = 0.0125;

/// Share of a regular operator's cost charged for handing rows across a
/// convention boundary.
pub const CONVERTER_FACTOR: f64 = 0.1;

/// Fraction of rows kept by a predicate nothing is known about.
const DEFAULT_SELECTIVITY: f64 = 0.25;

/// Estimated cost of producing a node's rows.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Cost {
    pub rows: f64,
    pub cpu: f64,
    pub io: f64,
}

impl Cost {
    pub fn new(rows: f64, cpu: f64, io: f64) -> Self {
        Self { rows, cpu, io }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Scale every component.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.rows * factor, self.cpu * factor, self.io * factor)
    }

    /// Weighted total used to compare alternatives.
    pub fn value(&self, settings: &CostSettings) -> f64 {
        self.rows + self.cpu * settings.cpu_weight + self.io * settings.io_weight
    }
}

impl Add for Cost {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.rows + other.rows, self.cpu + other.cpu, self.io + other.io)
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{:.2} rows, {:.2} cpu, {:.2} io}}",
            self.rows, self.cpu, self.io
        )
    }
}

/// Cost factor of an aggregate with `num_calls` calls of which `num_sums`
/// are SUMs.
pub fn aggregate_factor(num_calls: usize, num_sums: usize) -> f64 {
    1.0 + AGG_CALL_WEIGHT * num_calls as f64 + SUM_CALL_WEIGHT * num_sums as f64
}

/// Estimated fraction of rows for which `condition` holds.
pub fn selectivity(condition: &Expr) -> f64 {
    let condition = std::sync::Arc::new(condition.clone());
    conjunctions(&condition)
        .iter()
        .map(|c| match c.as_call() {
            Some((Operator::IsNotNull, _)) => 0.9,
            Some((Operator::Eq, _)) => 0.15,
            Some((op, _)) if op.is_comparison() => 0.5,
            _ => DEFAULT_SELECTIVITY,
        })
        .product()
}

/// Estimated output rows of `node` given its inputs' estimates.
pub fn estimate_rows(node: &Node, input_rows: &[f64], default_rows: f64) -> f64 {
    let input = input_rows.first().copied().unwrap_or(default_rows);
    match &node.kind {
        NodeKind::Scan { table } => table.row_count.unwrap_or(default_rows),
        NodeKind::Filter { condition, .. } => input * selectivity(condition),
        NodeKind::Project { .. } | NodeKind::Converter { .. } => input,
        NodeKind::Aggregate {
            group_set,
            group_sets,
            ..
        } => {
            let sets = group_sets.len().max(1) as f64;
            if group_set.is_empty() {
                sets
            } else {
                (input * 0.1).max(1.0).min(input.max(1.0)) * sets
            }
        }
        NodeKind::Sort { offset, fetch, .. } => {
            let after_offset = (input - offset.unwrap_or(0) as f64).max(0.0);
            fetch.map_or(after_offset, |n| after_offset.min(n as f64))
        }
        NodeKind::Values { tuples } => tuples.len() as f64,
        NodeKind::Modify { .. } => 1.0,
    }
}

/// Computes node costs from configured weights and backend multipliers.
#[derive(Debug, Clone, Default)]
pub struct CostModel {
    settings: CostSettings,
}

impl CostModel {
    pub fn new(settings: CostSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CostSettings {
        &self.settings
    }

    /// Cost of `node` alone, excluding its inputs.
    ///
    /// `input_rows` are the estimates of the input groups and `rows` the
    /// node's own estimate. Nodes under a backend convention are scaled by
    /// that backend's multiplier.
    pub fn self_cost(&self, node: &Node, input_rows: &[f64], rows: f64) -> Cost {
        let input = input_rows.first().copied().unwrap_or(0.0);
        let cost = match &node.kind {
            NodeKind::Scan { .. } => Cost::new(rows, rows, rows),
            NodeKind::Filter { .. } | NodeKind::Project { .. } => Cost::new(rows, input, 0.0),
            NodeKind::Converter { .. } => Cost::new(rows, input, 0.0).scaled(CONVERTER_FACTOR),
            NodeKind::Aggregate { agg_calls, .. } => {
                let sums = agg_calls.iter().filter(|c| c.kind == AggKind::Sum).count();
                Cost::new(rows, input * aggregate_factor(agg_calls.len(), sums), 0.0)
            }
            NodeKind::Sort { collation, .. } => {
                let cpu = if collation.is_empty() {
                    rows
                } else {
                    input * input.max(2.0).log2()
                };
                Cost::new(rows, cpu, 0.0)
            }
            NodeKind::Values { .. } => Cost::new(rows, rows, 0.0),
            NodeKind::Modify { .. } => Cost::new(1.0, input, input),
        };
        match node.convention() {
            Convention::Adapter { kind, .. } => cost.scaled(self.settings.multiplier_for(kind.name())),
            _ => cost,
        }
    }

    /// Weighted total of `cost`.
    pub fn value(&self, cost: &Cost) -> f64 {
        cost.value(&self.settings)
    }
}
