//! Per-store rule sets.
//!
//! Every store in the catalog contributes rules for its own convention
//! (`KIND:store`): a scan rule, pushdown rules for the operators its backend
//! can translate, and a converter rule that hands rows back to
//! `ENUMERABLE`.

use std::sync::Arc;

use common_config::OptimizerSettings;
use common_error::FederaResult;
use federa_catalog::{CatalogReader, StoreEntry, StoreId, TableId};
use federa_logical::{Convention, Node, NodeId, NodeKind, OpKind};
use federa_optimizer::{Memo, Operand, Rule, RuleCall, RuleRegistry};
use log::debug;

use crate::capability::{AggregateSpec, Capabilities, SortSpec, capabilities};
use crate::translation::{TranslateContext, Translation};

/// What the rules of one store share.
struct StoreTarget {
    store: StoreEntry,
    convention: Convention,
    catalog: Arc<dyn CatalogReader>,
    caps: &'static Capabilities,
}

impl StoreTarget {
    /// Context for a table as stored here: physical names where the
    /// catalog has them, logical names otherwise.
    fn table_context(&self, table: TableId) -> FederaResult<TranslateContext> {
        let entry = self.catalog.table(table)?;
        let columns = self.catalog.columns(table)?;
        let mut location = None;
        let mut names = Vec::with_capacity(columns.len());
        for column in &columns {
            let placement = self.catalog.column_placement(self.store.id, column.id);
            if location.is_none() {
                location = placement
                    .and_then(|p| p.physical_table.clone().map(|t| (p.physical_schema.clone(), t)));
            }
            names.push(
                placement
                    .and_then(|p| p.physical_column.clone())
                    .unwrap_or_else(|| column.name.clone()),
            );
        }
        let position = |id: &_| columns.iter().position(|c| c.id == *id);
        let (schema, name) = location.unwrap_or_else(|| (Some(entry.namespace.clone()), entry.name.clone()));
        Ok(TranslateContext::new(names)
            .with_partition_key(entry.partition_key.iter().filter_map(position).collect())
            .with_clustering_key(entry.clustering_key.iter().filter_map(position).collect())
            .with_location(schema, name))
    }

    /// Context for the rows an adapter node produces, or `None` if later
    /// translators cannot address them.
    fn node_context(&self, memo: &Memo, id: NodeId) -> FederaResult<Option<TranslateContext>> {
        let node = memo.node(id)?;
        match &node.kind {
            NodeKind::Scan { table } => self.table_context(table.id).map(Some),
            NodeKind::Filter { input, .. } | NodeKind::Sort { input, .. } => self.node_context(memo, *input),
            NodeKind::Project { input, .. } => Ok(self
                .node_context(memo, *input)?
                .map(|ctx| ctx.with_field_names(node.row_type.field_names()))),
            _ => Ok(None),
        }
    }
}

/// Store-convention input a pushed operator may sit on.
fn pushable(convention: &Convention, allowed: &'static [OpKind]) -> Operand {
    Operand::any()
        .with_convention(convention.clone())
        .guarded(move |n| allowed.contains(&n.op()))
}

/// One rule of a store's rule set. `op` is the operator it pushes, or
/// `Converter` for the rule that leaves the store's convention.
pub struct StoreRule {
    op: OpKind,
    name: String,
    operand: Operand,
    target: Arc<StoreTarget>,
}

impl StoreRule {
    fn new(op: OpKind, target: &Arc<StoreTarget>) -> Self {
        let convention = &target.convention;
        let operand = match op {
            OpKind::Scan => Operand::of(OpKind::Scan).with_convention(Convention::Logical),
            OpKind::Filter => Operand::of(OpKind::Filter)
                .with_convention(Convention::Logical)
                .with_children(vec![pushable(convention, &[OpKind::Scan])]),
            OpKind::Project => Operand::of(OpKind::Project)
                .with_convention(Convention::Logical)
                .with_children(vec![pushable(convention, &[OpKind::Scan, OpKind::Filter])]),
            OpKind::Converter => Operand::any().with_convention(convention.clone()),
            other => Operand::of(other)
                .with_convention(Convention::Logical)
                .with_children(vec![pushable(
                    convention,
                    &[OpKind::Scan, OpKind::Filter, OpKind::Project],
                )]),
        };
        let name = match op {
            OpKind::Converter => format!("ConverterRule[{}]", target.convention),
            other => format!("Adapter{other}Rule[{}]", target.convention),
        };
        Self {
            op,
            name,
            operand,
            target: Arc::clone(target),
        }
    }

    fn on_scan(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let node = call.node(0)?;
        let NodeKind::Scan { table } = &node.kind else {
            return Ok(());
        };
        if !self.target.catalog.store_holds_table(self.target.store.id, table.id)? {
            return Ok(());
        }
        let ctx = self.target.table_context(table.id)?;
        let scan = node
            .with_convention(self.target.convention.clone())
            .with_native((self.target.caps.translate_scan)(&ctx));
        call.transform_to(scan)?;
        Ok(())
    }

    fn on_filter(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let filter = call.node(0)?.clone();
        let NodeKind::Filter { condition, .. } = &filter.kind else {
            return Ok(());
        };
        let input = call.node_id(1)?;
        let Some(ctx) = self.target.node_context(call.memo(), input)? else {
            return Ok(());
        };
        let adapter_filter = |condition| {
            Node::new(
                NodeKind::Filter { input, condition },
                filter.traits.with_convention(self.target.convention.clone()),
                filter.row_type.clone(),
            )
        };
        match (self.target.caps.translate_filter)(condition, &ctx) {
            Translation::Full(native) => {
                call.transform_to(adapter_filter(Arc::clone(condition)).with_native(native))?;
            }
            Translation::Partial {
                native,
                pushed,
                residual,
            } => {
                let pushed = call.register(adapter_filter(pushed).with_native(native))?;
                call.transform_to(Node::new(
                    NodeKind::Filter {
                        input: pushed,
                        condition: residual,
                    },
                    filter.traits.with_convention(Convention::Enumerable),
                    filter.row_type.clone(),
                ))?;
            }
            Translation::Untranslatable(reason) => {
                debug!("{} keeps {condition} local: {reason}", self.name);
            }
        }
        Ok(())
    }

    fn on_project(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let Some(translate) = self.target.caps.translate_project else {
            return Ok(());
        };
        let project = call.node(0)?.clone();
        let NodeKind::Project { exprs, .. } = &project.kind else {
            return Ok(());
        };
        let input = call.node_id(1)?;
        let Some(ctx) = self.target.node_context(call.memo(), input)? else {
            return Ok(());
        };
        let Some(native) = translate(exprs, &project.row_type.field_names(), &ctx) else {
            return Ok(());
        };
        let pushed = Node::new(
            NodeKind::Project {
                input,
                exprs: exprs.clone(),
            },
            project.traits.with_convention(self.target.convention.clone()),
            project.row_type.clone(),
        );
        call.transform_to(pushed.with_native(native))?;
        Ok(())
    }

    fn on_aggregate(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let Some(translate) = self.target.caps.translate_aggregate else {
            return Ok(());
        };
        let aggregate = call.node(0)?.clone();
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
        if *indicator {
            return Ok(());
        }
        let input = call.node_id(1)?;
        let Some(ctx) = self.target.node_context(call.memo(), input)? else {
            return Ok(());
        };
        let output_names = aggregate.row_type.field_names();
        let spec = AggregateSpec {
            group_set,
            group_sets,
            agg_calls,
            output_names: &output_names,
        };
        let Some(native) = translate(&spec, &ctx) else {
            return Ok(());
        };
        let pushed = Node::new(
            NodeKind::Aggregate {
                input,
                group_set: group_set.clone(),
                group_sets: group_sets.clone(),
                agg_calls: agg_calls.clone(),
                indicator: false,
            },
            aggregate.traits.with_convention(self.target.convention.clone()),
            aggregate.row_type.clone(),
        );
        call.transform_to(pushed.with_native(native))?;
        Ok(())
    }

    fn on_sort(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let Some(translate) = self.target.caps.translate_sort else {
            return Ok(());
        };
        let sort = call.node(0)?.clone();
        let NodeKind::Sort {
            collation,
            offset,
            fetch,
            ..
        } = &sort.kind
        else {
            return Ok(());
        };
        let input = call.node_id(1)?;
        let Some(ctx) = self.target.node_context(call.memo(), input)? else {
            return Ok(());
        };
        let spec = SortSpec {
            collation,
            offset: *offset,
            fetch: *fetch,
        };
        let Some(native) = translate(&spec, &ctx) else {
            return Ok(());
        };
        let pushed = Node::new(
            NodeKind::Sort {
                input,
                collation: collation.clone(),
                offset: *offset,
                fetch: *fetch,
            },
            sort.traits.with_convention(self.target.convention.clone()),
            sort.row_type.clone(),
        );
        call.transform_to(pushed.with_native(native))?;
        Ok(())
    }

    fn on_convert(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        let input = call.node_id(0)?;
        let node = call.node(0)?;
        let converter = Node::new(
            NodeKind::Converter {
                input,
                from: self.target.convention.clone(),
            },
            node.traits.with_convention(Convention::Enumerable),
            node.row_type.clone(),
        );
        call.transform_to(converter)?;
        Ok(())
    }
}

impl Rule for StoreRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        match self.op {
            OpKind::Scan => "Reads a table held by the store",
            OpKind::Filter => "Pushes a filter into the store, keeping any residual local",
            OpKind::Converter => "Returns rows produced by the store to the enumerable engine",
            _ => "Pushes an operator into the store",
        }
    }

    fn operand(&self) -> &Operand {
        &self.operand
    }

    fn on_match(&self, call: &mut RuleCall<'_>) -> FederaResult<()> {
        match self.op {
            OpKind::Scan => self.on_scan(call),
            OpKind::Filter => self.on_filter(call),
            OpKind::Project => self.on_project(call),
            OpKind::Aggregate => self.on_aggregate(call),
            OpKind::Sort => self.on_sort(call),
            OpKind::Converter => self.on_convert(call),
            _ => Ok(()),
        }
    }
}

/// Rules for one store, in registration order.
pub fn store_rules(
    catalog: Arc<dyn CatalogReader>,
    store: StoreId,
    settings: &OptimizerSettings,
) -> FederaResult<Vec<StoreRule>> {
    let entry = catalog.store(store)?.clone();
    let caps = capabilities(entry.kind);
    let target = Arc::new(StoreTarget {
        convention: Convention::adapter(entry.kind, entry.name.clone()),
        store: entry,
        catalog,
        caps,
    });

    let mut ops = vec![OpKind::Scan, OpKind::Filter];
    if caps.translate_project.is_some() {
        ops.push(OpKind::Project);
    }
    if caps.translate_aggregate.is_some() {
        ops.push(OpKind::Aggregate);
    }
    if settings.enable_sort_pushdown && caps.translate_sort.is_some() {
        ops.push(OpKind::Sort);
    }
    ops.push(OpKind::Converter);
    Ok(ops.into_iter().map(|op| StoreRule::new(op, &target)).collect())
}

/// Register the rule set of `store`. Returns how many rules were added.
pub fn register_store_rules(
    registry: &mut RuleRegistry,
    catalog: Arc<dyn CatalogReader>,
    store: StoreId,
    settings: &OptimizerSettings,
) -> FederaResult<usize> {
    let mut added = 0;
    for rule in store_rules(catalog, store, settings)? {
        let convention = rule.target.convention.clone();
        if registry.register(convention, rule) {
            added += 1;
        }
    }
    Ok(added)
}

/// Register the rule sets of every store in the catalog.
pub fn register_all_stores(
    registry: &mut RuleRegistry,
    catalog: &Arc<dyn CatalogReader>,
    settings: &OptimizerSettings,
) -> FederaResult<usize> {
    let mut added = 0;
    for store in catalog.stores().iter().map(|s| s.id) {
        added += register_store_rules(registry, Arc::clone(catalog), store, settings)?;
    }
    debug!("registered {added} adapter rules for {} stores", catalog.stores().len());
    Ok(added)
}

#[cfg(test)]
mod tests {
    use federa_catalog::{CatalogWriter, InMemoryCatalog, TableDef};
    use federa_core::{BackendKind, DataType};

    use super::*;

    fn catalog_with(kind: BackendKind) -> (Arc<dyn CatalogReader>, StoreId) {
        let catalog = InMemoryCatalog::new();
        let store = catalog.add_store("s1", kind).unwrap();
        catalog
            .create_table(TableDef::new("app", "users").column("id", DataType::Int64, false))
            .unwrap();
        (catalog.reader().unwrap(), store)
    }

    fn names(rules: &[StoreRule]) -> Vec<&str> {
        rules.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_rule_set_follows_capabilities() {
        let (catalog, store) = catalog_with(BackendKind::WideColumn);
        let rules = store_rules(catalog, store, &OptimizerSettings::default()).unwrap();
        assert_eq!(
            names(&rules),
            vec![
                "AdapterScanRule[WIDE_COLUMN:s1]",
                "AdapterFilterRule[WIDE_COLUMN:s1]",
                "AdapterProjectRule[WIDE_COLUMN:s1]",
                "ConverterRule[WIDE_COLUMN:s1]",
            ]
        );
    }

    #[test]
    fn test_sort_rule_needs_setting() {
        let (catalog, store) = catalog_with(BackendKind::Document);
        let default = store_rules(Arc::clone(&catalog), store, &OptimizerSettings::default()).unwrap();
        assert!(!default.iter().any(|r| r.op == OpKind::Sort));

        let settings = OptimizerSettings {
            enable_sort_pushdown: true,
            ..OptimizerSettings::default()
        };
        let enabled = store_rules(catalog, store, &settings).unwrap();
        assert!(enabled.iter().any(|r| r.op == OpKind::Sort));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let (catalog, _) = catalog_with(BackendKind::File);
        let settings = OptimizerSettings::default();
        let mut registry = RuleRegistry::new();
        assert_eq!(register_all_stores(&mut registry, &catalog, &settings).unwrap(), 3);
        assert_eq!(register_all_stores(&mut registry, &catalog, &settings).unwrap(), 0);
    }
}
