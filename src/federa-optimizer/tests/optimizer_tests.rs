//! Integration tests for federa-optimizer

use std::sync::Arc;

use common_error::FederaResult;
use federa_catalog::{CatalogWriter, InMemoryCatalog, TableDef};
use federa_core::{BackendKind, BitSet, DataType, Field, RowType};
use federa_logical::{
    AggCall, AggKind, Collation, Convention, FieldCollation, Node, NodeId, NodeKind, OpKind, Plan,
    PlanBuilder, TraitSet, lit,
};
use federa_optimizer::cost::{aggregate_factor, estimate_rows};
use federa_optimizer::{
    CostModel, Operand, Optimizer, OptimizerConfig, Rule, RuleCall, RuleRegistry,
};
use proptest::prelude::*;

fn sales_plan() -> Plan {
    sales_plan_with(|total| total)
}

/// `SUM(amount) GROUP BY region` over `shop.sales`, with `adjust` applied
/// to the call.
fn sales_plan_with(adjust: impl FnOnce(AggCall) -> AggCall) -> Plan {
    let catalog = InMemoryCatalog::new();
    let table = TableDef::new("shop", "sales")
        .column("id", DataType::Int64, false)
        .column("region", DataType::String, false)
        .column("note", DataType::String, true)
        .column("amount", DataType::Float64, false)
        .row_count(10_000.0);
    catalog.create_table(table).unwrap();
    let reader = catalog.reader().unwrap();

    let builder = PlanBuilder::scan(reader.as_ref(), "shop", "sales").unwrap();
    let total = adjust(
        builder
            .agg_call(AggKind::Sum, &["amount"], false, Some("total"))
            .unwrap(),
    );
    builder.group_by(&["region"], vec![total]).unwrap().build()
}

#[test]
fn test_aggregate_trim_fires_once() {
    let config = OptimizerConfig::default().with_trace(true);
    let optimizer = Optimizer::with_config(RuleRegistry::with_defaults(), config);
    let result = optimizer.optimize(&sales_plan()).unwrap();

    let trims: Vec<_> = result
        .trace
        .iter()
        .filter(|t| t.rule_name == "AggregateInputTrimRule")
        .collect();
    assert_eq!(trims.len(), 1);
    assert!(trims[0].produced.iter().any(|p| p.starts_with("Project")));
    assert!(trims[0].produced.iter().any(|p| p.contains("group={0}")));

    let root = result.plan.root_node().unwrap();
    assert_eq!(root.op(), OpKind::Aggregate);
    assert_eq!(root.convention(), &Convention::Enumerable);
    assert_eq!(root.row_type.field_names(), vec!["region", "total"]);
}

#[test]
fn test_aggregate_trim_keeps_ordering_fields() {
    let plan = sales_plan_with(|mut total| {
        total.collation = Collation(vec![FieldCollation::desc(0)]);
        total
    });
    let config = OptimizerConfig::default().with_trace(true);
    let optimizer = Optimizer::with_config(RuleRegistry::with_defaults(), config);
    let result = optimizer.optimize(&plan).unwrap();

    let trim = result
        .trace
        .iter()
        .find(|t| t.rule_name == "AggregateInputTrimRule")
        .unwrap();
    assert!(trim.produced.iter().any(|p| p.ends_with("exprs=[$0, $1, $3]")), "{:?}", trim.produced);
    assert!(
        trim.produced
            .iter()
            .any(|p| p.ends_with("group={1}, aggs=[SUM($2 ORDER BY $0 DESC NULLS FIRST)]")),
        "{:?}",
        trim.produced
    );
}

/// Moves a scan into a pretend backend and converts it back.
struct FakeBackendScanRule {
    operand: Operand,
}

impl Rule for FakeBackendScanRule {
    fn name(&self) -> &str {
        "FakeBackendScanRule"
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn on_match(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let backend = Convention::adapter(BackendKind::Document, "docs");
        let scan = call.node(0)?.with_convention(backend.clone());
        let row_type = scan.row_type.clone();
        let native = call.register(scan)?;
        call.transform_to(Node::new(
            NodeKind::Converter {
                input: native,
                from: backend,
            },
            TraitSet::enumerable(),
            row_type,
        ))?;
        Ok(())
    }
}

#[test]
fn test_cheaper_backend_alternative_wins() {
    let mut registry = RuleRegistry::with_defaults();
    registry.register(
        Convention::Logical,
        FakeBackendScanRule {
            operand: Operand::of(OpKind::Scan).with_convention(Convention::Logical),
        },
    );
    let result = Optimizer::new(registry).optimize(&sales_plan()).unwrap();
    assert!(
        result
            .plan
            .contains(|n| n.op() == OpKind::Converter)
            .unwrap()
    );
    assert!(
        result
            .plan
            .contains(|n| n.op() == OpKind::Scan && n.convention().backend().is_some())
            .unwrap()
    );
}

#[test]
fn test_shared_optimizer_across_threads() {
    let optimizer = Arc::new(Optimizer::default());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let optimizer = Arc::clone(&optimizer);
            std::thread::spawn(move || optimizer.optimize(&sales_plan()).map(|r| r.cost.rows))
        })
        .collect();
    let costs: Vec<f64> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    assert!(costs.windows(2).all(|w| (w[0] - w[1]).abs() < 1e-9));
}

fn aggregate_node(kinds: &[AggKind]) -> Node {
    let input = RowType::new(vec![
        Field::new("k", DataType::Int64),
        Field::new("v", DataType::Int64),
    ]);
    let agg_calls = kinds
        .iter()
        .map(|k| AggCall::create(*k, vec![1], false, None, &input, None).unwrap())
        .collect();
    Node::new(
        NodeKind::Aggregate {
            input: NodeId(0),
            group_set: BitSet::of([0]),
            group_sets: vec![BitSet::of([0])],
            agg_calls,
            indicator: false,
        },
        TraitSet::logical(),
        input,
    )
}

fn arb_agg_kind() -> impl Strategy<Value = AggKind> {
    prop_oneof![
        Just(AggKind::Count),
        Just(AggKind::Sum),
        Just(AggKind::Min),
        Just(AggKind::Max),
        Just(AggKind::Avg),
    ]
}

proptest! {
    #[test]
    fn prop_extra_sum_strictly_increases_cost(
        kinds in prop::collection::vec(arb_agg_kind(), 0..8),
        rows in 1.0f64..1e7,
    ) {
        let model = CostModel::default();
        let base = aggregate_node(&kinds);
        let mut more = kinds.clone();
        more.push(AggKind::Sum);
        let extended = aggregate_node(&more);

        let out = estimate_rows(&base, &[rows], 100.0);
        let a = model.value(&model.self_cost(&base, &[rows], out));
        let b = model.value(&model.self_cost(&extended, &[rows], out));
        prop_assert!(b > a);
    }

    #[test]
    fn prop_more_rows_never_cheaper(
        kinds in prop::collection::vec(arb_agg_kind(), 0..8),
        rows in 0.0f64..1e7,
        extra in 0.0f64..1e6,
    ) {
        let model = CostModel::default();
        let node = aggregate_node(&kinds);
        let small = model.self_cost(&node, &[rows], estimate_rows(&node, &[rows], 100.0));
        let large = model.self_cost(
            &node,
            &[rows + extra],
            estimate_rows(&node, &[rows + extra], 100.0),
        );
        prop_assert!(model.value(&large) >= model.value(&small));
    }

    #[test]
    fn prop_aggregate_factor_monotone(calls in 0usize..64, sums in 0usize..64) {
        let sums = sums.min(calls);
        prop_assert!(aggregate_factor(calls + 1, sums) > aggregate_factor(calls, sums));
        prop_assert!(aggregate_factor(calls + 1, sums + 1) > aggregate_factor(calls + 1, sums));
    }
}

#[test]
fn test_filter_on_values_is_implemented_in_process() {
    let row = RowType::new(vec![Field::new("x", DataType::Int64)]);
    let plan = PlanBuilder::values(row, vec![])
        .unwrap()
        .filter_by(|b| Ok(b.field("x")?.eq(lit(1i64))))
        .unwrap()
        .build();
    let result = federa_optimizer::optimize(&plan).unwrap();
    let explain = result.plan.explain().unwrap();
    assert!(explain.starts_with("Filter (ENUMERABLE; condition==($0, 1))"));
}
