//! Rule trait, rule calls and optimization results.

use common_error::{FederaError, FederaResult};
use federa_logical::{Node, NodeId, Plan};

use crate::cost::Cost;
use crate::memo::Memo;
use crate::operand::Operand;

/// A rewrite rule.
///
/// The optimizer binds the rule's [`Operand`] against every memo node and
/// calls [`on_match`](Rule::on_match) once per distinct binding. A rule never
/// mutates the nodes it matched: it builds new nodes and hands them to the
/// [`RuleCall`], which records them as alternatives.
pub trait Rule: Send + Sync {
    /// Unique name within a convention's rule set.
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        "No description available"
    }

    /// Pattern this rule fires on.
    fn operand(&self) -> &Operand;

    /// Build alternatives for one binding. Producing nothing is fine.
    fn on_match(&self, call: &mut RuleCall<'_>) -> FederaResult<()>;
}

/// One firing of a rule: the matched nodes plus write access to the memo.
pub struct RuleCall<'a> {
    memo: &'a mut Memo,
    bindings: Vec<NodeId>,
    produced: Vec<NodeId>,
}

impl<'a> RuleCall<'a> {
    pub(crate) fn new(memo: &'a mut Memo, bindings: Vec<NodeId>) -> Self {
        Self {
            memo,
            bindings,
            produced: Vec::new(),
        }
    }

    /// Id of the `i`-th matched node, in operand preorder.
    pub fn node_id(&self, i: usize) -> FederaResult<NodeId> {
        self.bindings.get(i).copied().ok_or_else(|| {
            FederaError::internal(format!(
                "binding {i} out of range ({} nodes matched)",
                self.bindings.len()
            ))
        })
    }

    /// The `i`-th matched node.
    pub fn node(&self, i: usize) -> FederaResult<&Node> {
        self.memo.node(self.node_id(i)?)
    }

    /// Read access to the memo, e.g. to inspect the other members of a group.
    pub fn memo(&self) -> &Memo {
        self.memo
    }

    /// Register a helper node that is not equivalent to the matched root,
    /// such as a new input for the rewritten root. Returns its id, which may
    /// be an existing identical node.
    pub fn register(&mut self, node: Node) -> FederaResult<NodeId> {
        let id = self.memo.insert(node, None)?;
        self.produced.push(id);
        Ok(id)
    }

    /// Register `node` as equivalent to the matched root.
    pub fn transform_to(&mut self, node: Node) -> FederaResult<NodeId> {
        let root = self.node_id(0)?;
        let original = self.memo.node(root)?;
        if !node.row_type.equal_sans_names(&original.row_type) {
            return Err(FederaError::internal(format!(
                "rule output {} does not match the row type of {}",
                node.label(),
                original.label()
            )));
        }
        let group = self.memo.group_of(root)?;
        let id = self.memo.insert(node, Some(group))?;
        self.produced.push(id);
        Ok(id)
    }

    pub(crate) fn into_produced(self) -> Vec<NodeId> {
        self.produced
    }
}

/// A trace entry for a single rule firing.
#[derive(Debug, Clone)]
pub struct RuleTrace {
    /// The name of the rule that fired.
    pub rule_name: String,
    /// Label of the matched root node.
    pub matched: String,
    /// Labels of the nodes the rule registered.
    pub produced: Vec<String>,
    /// Whether the memo changed.
    pub changed: bool,
}

impl RuleTrace {
    pub fn new(
        rule_name: impl Into<String>,
        matched: impl Into<String>,
        produced: Vec<String>,
        changed: bool,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            matched: matched.into(),
            produced,
            changed,
        }
    }
}

/// The result of optimization with optional trace information.
#[derive(Debug, Clone)]
pub struct OptimizedPlan {
    /// The cheapest plan found in the required convention.
    pub plan: Plan,
    /// Its total cost.
    pub cost: Cost,
    /// Number of exploration rounds performed.
    pub iterations: usize,
    /// Number of rule firings.
    pub rules_fired: usize,
    /// Detailed trace of rule firings (if tracing was enabled).
    pub trace: Vec<RuleTrace>,
}

impl OptimizedPlan {
    /// Format the trace as a human-readable string.
    pub fn format_trace(&self) -> String {
        let mut output = format!(
            "Optimization completed in {} iterations, {} rules fired, cost {}\n",
            self.iterations, self.rules_fired, self.cost
        );

        if self.trace.is_empty() {
            output.push_str("  (no trace available)\n");
            return output;
        }
        for (i, entry) in self.trace.iter().filter(|t| t.changed).enumerate() {
            output.push_str(&format!("\n--- Rule {} fired: {} ---\n", i + 1, entry.rule_name));
            output.push_str(&format!("Matched: {}\n", entry.matched));
            for produced in &entry.produced {
                output.push_str(&format!("Produced: {produced}\n"));
            }
        }
        output
    }
}
