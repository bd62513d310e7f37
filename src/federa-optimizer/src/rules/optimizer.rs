//! The memo-based driver.
//!
//! Optimization runs in two phases. Exploration fires every registered rule
//! on every memo node, round after round, until a round adds nothing (the
//! fixpoint) or a budget runs out. Selection then picks, for each group and
//! convention, the cheapest member whose inputs are available in the
//! convention that member expects, and extracts the tree rooted at the
//! root group in `ENUMERABLE`.

use std::collections::{HashMap, HashSet};

use common_config::{CostSettings, FederaConfig};
use common_error::{FederaError, FederaResult};
use federa_logical::{Convention, Node, NodeId, Plan, PlanArena};
use log::{debug, trace};

use super::rule::{OptimizedPlan, RuleCall, RuleTrace};
use crate::cost::{Cost, CostModel};
use crate::memo::{GroupId, Memo};
use crate::registry::RuleRegistry;

/// Configuration for the optimizer.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Maximum number of exploration rounds.
    pub max_iterations: usize,
    /// Maximum number of rule firings across all rounds.
    pub max_rule_firings: usize,
    /// Whether to record a trace entry per firing.
    pub enable_trace: bool,
    /// Cost weights and backend multipliers.
    pub cost: CostSettings,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::from(&FederaConfig::default())
    }
}

impl From<&FederaConfig> for OptimizerConfig {
    fn from(config: &FederaConfig) -> Self {
        Self {
            max_iterations: config.optimizer.max_iterations,
            max_rule_firings: config.optimizer.max_rule_firings,
            enable_trace: config.optimizer.enable_trace,
            cost: config.cost.clone(),
        }
    }
}

impl OptimizerConfig {
    /// Create a new config with the given max iterations.
    #[must_use]
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    #[must_use]
    pub fn with_max_rule_firings(mut self, max: usize) -> Self {
        self.max_rule_firings = max;
        self
    }

    /// Enable or disable tracing.
    #[must_use]
    pub fn with_trace(mut self, enable: bool) -> Self {
        self.enable_trace = enable;
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Winner {
    node: NodeId,
    cost: Cost,
    value: f64,
}

type Winners = HashMap<(GroupId, Convention), Winner>;

/// Explores equivalent plans and picks the cheapest executable one.
///
/// The optimizer only reads its registry and configuration, so one instance
/// can serve concurrent optimizations.
#[derive(Debug, Clone)]
pub struct Optimizer {
    registry: RuleRegistry,
    config: OptimizerConfig,
    cost_model: CostModel,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self::new(RuleRegistry::with_defaults())
    }
}

impl Optimizer {
    pub fn new(registry: RuleRegistry) -> Self {
        Self::with_config(registry, OptimizerConfig::default())
    }

    pub fn with_config(registry: RuleRegistry, config: OptimizerConfig) -> Self {
        let cost_model = CostModel::new(config.cost.clone());
        Self {
            registry,
            config,
            cost_model,
        }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &CostModel {
        &self.cost_model
    }

    /// Optimize `plan`, returning the cheapest plan in `ENUMERABLE`.
    pub fn optimize(&self, plan: &Plan) -> FederaResult<OptimizedPlan> {
        let (mut memo, root) = Memo::from_plan(plan, self.config.cost.default_row_count)?;
        let (iterations, rules_fired, trace) = self.explore(&mut memo)?;
        let winners = self.select(&memo)?;

        let required = Convention::Enumerable;
        let root = memo.find(root);
        let best = winners.get(&(root, required.clone())).ok_or_else(|| {
            FederaError::planning(format!(
                "no alternative of the root is executable in {required}"
            ))
        })?;
        debug!(
            "optimizer: chose {} for the root at cost {}",
            memo.node(best.node)?.label(),
            best.cost
        );

        let mut arena = PlanArena::new();
        let mut extracted = HashMap::new();
        let root_id = extract(&memo, &winners, root, &required, &mut arena, &mut extracted, 0)?;
        Ok(OptimizedPlan {
            plan: Plan {
                arena,
                root: root_id,
            },
            cost: best.cost,
            iterations,
            rules_fired,
            trace,
        })
    }

    fn explore(&self, memo: &mut Memo) -> FederaResult<(usize, usize, Vec<RuleTrace>)> {
        let rules = self.registry.rules();
        let mut fired: HashSet<(usize, Vec<NodeId>)> = HashSet::new();
        let mut iterations = 0;
        let mut firings = 0;
        let mut trace = Vec::new();

        'rounds: loop {
            if iterations >= self.config.max_iterations {
                debug!(
                    "optimizer reached max iterations ({}), stopping",
                    self.config.max_iterations
                );
                break;
            }
            iterations += 1;
            let start_version = memo.version();

            for id in memo.node_ids() {
                for (index, (convention, rule)) in rules.iter().enumerate() {
                    for binding in rule.operand().bind(memo, id)? {
                        if firings >= self.config.max_rule_firings {
                            debug!(
                                "optimizer exhausted its budget of {} rule firings in round {iterations}",
                                self.config.max_rule_firings
                            );
                            break 'rounds;
                        }
                        if !fired.insert((index, binding.clone())) {
                            continue;
                        }
                        trace!("rule '{}' ({convention}) matched {binding:?}", rule.name());
                        firings += 1;

                        let before = memo.version();
                        let matched = memo.node(id)?.label();
                        let mut call = RuleCall::new(memo, binding);
                        rule.on_match(&mut call)?;
                        let produced = call.into_produced();
                        let changed = memo.version() != before;
                        debug!(
                            "rule '{}' fired on {id}, {} node(s) produced",
                            rule.name(),
                            produced.len()
                        );
                        if self.config.enable_trace {
                            let produced = produced
                                .iter()
                                .map(|p| memo.node(*p).map(Node::label))
                                .collect::<FederaResult<Vec<_>>>()?;
                            trace.push(RuleTrace::new(rule.name(), matched, produced, changed));
                        }
                    }
                }
            }

            debug!(
                "optimizer round {iterations}: {} node(s) in {} group(s)",
                memo.len(),
                memo.groups().len()
            );
            if memo.version() == start_version {
                debug!("no changes in round {iterations}, reached fixpoint");
                break;
            }
        }
        Ok((iterations, firings, trace))
    }

    /// Cheapest member per `(group, convention)`, by repeated relaxation.
    fn select(&self, memo: &Memo) -> FederaResult<Winners> {
        let mut winners: Winners = HashMap::new();
        let groups = memo.groups();
        for _ in 0..=memo.len() {
            let mut improved = false;
            for &group in &groups {
                for &member in memo.members(group) {
                    let node = memo.node(member)?;
                    let Some(inputs_cost) = self.inputs_cost(memo, &winners, member, node)? else {
                        continue;
                    };
                    let input_rows = memo
                        .input_groups(member)?
                        .into_iter()
                        .map(|g| memo.rows(g))
                        .collect::<Vec<_>>();
                    let cost =
                        inputs_cost + self.cost_model.self_cost(node, &input_rows, memo.rows(group));
                    let value = self.cost_model.value(&cost);
                    let key = (group, node.convention().clone());
                    if winners.get(&key).is_none_or(|w| value < w.value) {
                        winners.insert(
                            key,
                            Winner {
                                node: member,
                                cost,
                                value,
                            },
                        );
                        improved = true;
                    }
                }
            }
            if !improved {
                break;
            }
        }
        Ok(winners)
    }

    fn inputs_cost(
        &self,
        memo: &Memo,
        winners: &Winners,
        member: NodeId,
        node: &Node,
    ) -> FederaResult<Option<Cost>> {
        let mut total = Cost::zero();
        for group in memo.input_groups(member)? {
            match winners.get(&(group, node.input_convention().clone())) {
                Some(w) => total = total + w.cost,
                None => return Ok(None),
            }
        }
        Ok(Some(total))
    }
}

fn extract(
    memo: &Memo,
    winners: &Winners,
    group: GroupId,
    convention: &Convention,
    arena: &mut PlanArena,
    extracted: &mut HashMap<(GroupId, Convention), NodeId>,
    depth: usize,
) -> FederaResult<NodeId> {
    let key = (group, convention.clone());
    if let Some(id) = extracted.get(&key) {
        return Ok(*id);
    }
    if depth > memo.len() {
        return Err(FederaError::internal(format!(
            "cycle while extracting {group} in {convention}"
        )));
    }
    let winner = winners.get(&key).ok_or_else(|| {
        FederaError::planning(format!("{group} has no alternative in {convention}"))
    })?;
    let node = memo.node(winner.node)?;
    let mut inputs = Vec::new();
    for input in memo.input_groups(winner.node)? {
        inputs.push(extract(
            memo,
            winners,
            input,
            node.input_convention(),
            arena,
            extracted,
            depth + 1,
        )?);
    }
    let id = arena.add(Node {
        kind: node.kind.with_inputs(&inputs),
        ..node.clone()
    })?;
    extracted.insert(key, id);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use federa_core::{DataType, Field, RowType, Value};
    use federa_logical::{OpKind, PlanBuilder, lit};

    use super::*;
    use crate::rules::{EnumerableRule, FilterMergeRule};

    fn two_filters() -> Plan {
        let row = RowType::new(vec![
            Field::new("a", DataType::Int64),
            Field::new("b", DataType::Int64),
        ]);
        PlanBuilder::values(row, vec![vec![Value::Int64(1), Value::Int64(2)]])
            .unwrap()
            .filter_by(|b| Ok(b.field("a")?.gt(lit(0i64))))
            .unwrap()
            .filter_by(|b| Ok(b.field("b")?.lt(lit(9i64))))
            .unwrap()
            .build()
    }

    #[test]
    fn test_optimizer_basic() {
        let result = Optimizer::default().optimize(&two_filters()).unwrap();
        assert!(result.rules_fired > 0);
        let plan = &result.plan;
        assert_eq!(plan.node_count().unwrap(), 2);
        assert!(
            plan.contains(|n| n.op() == OpKind::Filter && n.convention() == &Convention::Enumerable)
                .unwrap()
        );
        assert!(!plan.contains(|n| n.convention() == &Convention::Logical).unwrap());
    }

    #[test]
    fn test_optimizer_fixpoint() {
        let mut registry = RuleRegistry::new();
        registry.register(Convention::Enumerable, EnumerableRule::new(OpKind::Values));
        let row = RowType::new(vec![Field::new("x", DataType::Int64)]);
        let plan = PlanBuilder::values(row, vec![]).unwrap().build();

        let result = Optimizer::new(registry).optimize(&plan).unwrap();
        assert_eq!(result.iterations, 2);
        assert_eq!(result.rules_fired, 1);
    }

    #[test]
    fn test_missing_enumerable_rule_is_a_planning_error() {
        let mut registry = RuleRegistry::new();
        registry.register(Convention::Logical, FilterMergeRule::new());
        let err = Optimizer::new(registry).optimize(&two_filters()).unwrap_err();
        assert!(matches!(err, FederaError::PlanningError(_)));
    }

    #[test]
    fn test_optimizer_with_trace() {
        let config = OptimizerConfig::default().with_trace(true);
        let optimizer = Optimizer::with_config(RuleRegistry::with_defaults(), config);
        let result = optimizer.optimize(&two_filters()).unwrap();
        assert!(result.trace.iter().any(|t| t.rule_name == "FilterMergeRule" && t.changed));
        assert!(result.format_trace().contains("FilterMergeRule"));
    }

    #[test]
    fn test_firing_budget() {
        let config = OptimizerConfig::default().with_max_rule_firings(1);
        let optimizer = Optimizer::with_config(RuleRegistry::with_defaults(), config);
        // One firing cannot implement three operators.
        assert!(optimizer.optimize(&two_filters()).is_err());
    }
}
