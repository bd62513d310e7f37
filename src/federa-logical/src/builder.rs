//! Fluent construction of logical plans.

use std::sync::Arc;

use common_error::{FederaError, FederaResult};
use federa_catalog::CatalogReader;
use federa_core::{BitSet, DataType, Field, RowType, Value};

use crate::expr::{Expr, Operator, field};
use crate::grouping;
use crate::ops::{AggCall, AggKind, ModifyOp, NodeKind, TableRef};
use crate::plan::{Node, NodeId, Plan, PlanArena};
use crate::traits::{Collation, TraitSet};

/// Builds a logical plan bottom-up, validating each operator against the row
/// type of its input.
///
/// ```
/// use federa_core::{DataType, Field, RowType, Value};
/// use federa_logical::{PlanBuilder, lit};
///
/// let row = RowType::new(vec![Field::new("x", DataType::Int64)]);
/// let plan = PlanBuilder::values(row, vec![vec![Value::Int64(1)], vec![Value::Int64(7)]])
///     .unwrap()
///     .filter_by(|b| Ok(b.field("x")?.gt(lit(3i64))))
///     .unwrap()
///     .build();
/// assert_eq!(plan.node_count().unwrap(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    arena: PlanArena,
    root: NodeId,
}

impl PlanBuilder {
    fn start(node: Node) -> FederaResult<Self> {
        let mut arena = PlanArena::new();
        let root = arena.add(node)?;
        Ok(Self { arena, root })
    }

    fn push(mut self, kind: NodeKind, traits: TraitSet, row_type: RowType) -> FederaResult<Self> {
        self.root = self.arena.add(Node::new(kind, traits, row_type))?;
        Ok(self)
    }

    /// Start from a scan of a catalog table.
    pub fn scan(catalog: &dyn CatalogReader, namespace: &str, name: &str) -> FederaResult<Self> {
        let table = catalog.table_by_name(namespace, name)?;
        let row_type = catalog.row_type(table.id)?;
        Self::scan_table(
            TableRef {
                id: table.id,
                namespace: table.namespace.clone(),
                name: table.name.clone(),
                row_count: table.row_count,
            },
            row_type,
        )
    }

    /// Start from a scan of a table whose row type is already known.
    pub fn scan_table(table: TableRef, row_type: RowType) -> FederaResult<Self> {
        Self::start(Node::new(
            NodeKind::Scan { table },
            TraitSet::logical(),
            row_type,
        ))
    }

    /// Start from literal rows.
    pub fn values(row_type: RowType, tuples: Vec<Vec<Value>>) -> FederaResult<Self> {
        for (i, tuple) in tuples.iter().enumerate() {
            if tuple.len() != row_type.arity() {
                return Err(FederaError::schema_error(format!(
                    "tuple {i} has {} values but the row type has {} fields",
                    tuple.len(),
                    row_type.arity()
                )));
            }
            for (value, f) in tuple.iter().zip(&row_type.fields) {
                let fits = if value.is_null() {
                    f.nullable
                } else {
                    value.data_type().can_coerce_to(&f.data_type)
                };
                if !fits {
                    return Err(FederaError::type_error(format!(
                        "value {value} does not fit field {f}"
                    )));
                }
            }
        }
        Self::start(Node::new(
            NodeKind::Values { tuples },
            TraitSet::logical(),
            row_type,
        ))
    }

    /// Row type of the current top node.
    pub fn row_type(&self) -> FederaResult<&RowType> {
        Ok(&self.arena.get(self.root)?.row_type)
    }

    /// Reference to the current top node's field called `name`.
    pub fn field(&self, name: &str) -> FederaResult<Expr> {
        let row = self.row_type()?;
        let index = row
            .index_of(name)
            .ok_or_else(|| FederaError::schema_error(format!("no field named '{name}' in {row}")))?;
        Ok(field(index, row.fields[index].data_type.clone()))
    }

    /// Aggregate call over the current top node's fields.
    pub fn agg_call(
        &self,
        kind: AggKind,
        args: &[&str],
        distinct: bool,
        name: Option<&str>,
    ) -> FederaResult<AggCall> {
        let row = self.row_type()?;
        let args = args
            .iter()
            .map(|a| {
                row.index_of(a)
                    .ok_or_else(|| FederaError::schema_error(format!("no field named '{a}' in {row}")))
            })
            .collect::<FederaResult<Vec<_>>>()?;
        AggCall::create(kind, args, distinct, None, row, name.map(str::to_string))
    }

    /// Keep rows satisfying `condition`.
    pub fn filter(self, condition: Expr) -> FederaResult<Self> {
        let row = self.row_type()?.clone();
        condition.validate(&row)?;
        if !matches!(condition.data_type(), DataType::Bool | DataType::Any) {
            return Err(FederaError::type_error(format!(
                "filter condition {condition} must be BOOLEAN, got {}",
                condition.data_type()
            )));
        }
        let input = self.root;
        self.push(
            NodeKind::Filter {
                input,
                condition: Arc::new(condition),
            },
            TraitSet::logical(),
            row,
        )
    }

    /// Keep rows satisfying the condition produced by `f`, which may resolve
    /// fields through the builder.
    pub fn filter_by(self, f: impl FnOnce(&Self) -> FederaResult<Expr>) -> FederaResult<Self> {
        let condition = f(&self)?;
        self.filter(condition)
    }

    /// Compute named expressions.
    pub fn project(self, exprs: Vec<(Expr, Option<String>)>) -> FederaResult<Self> {
        let input_row = self.row_type()?.clone();
        let mut fields = Vec::with_capacity(exprs.len());
        let mut out = Vec::with_capacity(exprs.len());
        for (i, (expr, name)) in exprs.into_iter().enumerate() {
            expr.validate(&input_row)?;
            let name = name.unwrap_or_else(|| match expr.as_field() {
                Some(index) => input_row.fields[index].name.clone(),
                None => format!("$f{i}"),
            });
            fields.push(Field {
                name,
                data_type: expr.data_type().clone(),
                nullable: is_nullable(&expr, &input_row),
            });
            out.push(Arc::new(expr));
        }
        let input = self.root;
        self.push(
            NodeKind::Project { input, exprs: out },
            TraitSet::logical(),
            RowType::new(fields),
        )
    }

    /// Keep the named fields, in the given order.
    pub fn project_fields(self, names: &[&str]) -> FederaResult<Self> {
        let exprs = names
            .iter()
            .map(|n| self.field(n).map(|e| (e, None)))
            .collect::<FederaResult<Vec<_>>>()?;
        self.project(exprs)
    }

    /// Group by `group_set` with explicit grouping sets.
    pub fn aggregate(
        self,
        group_set: BitSet,
        group_sets: Vec<BitSet>,
        agg_calls: Vec<AggCall>,
        indicator: bool,
    ) -> FederaResult<Self> {
        let input_row = self.row_type()?.clone();
        for call in &agg_calls {
            for arg in call.input_refs() {
                input_row.field(arg)?;
            }
        }
        let row_type =
            grouping::derive_row_type(&input_row, &group_set, &group_sets, indicator, &agg_calls)?;
        let input = self.root;
        self.push(
            NodeKind::Aggregate {
                input,
                group_set,
                group_sets,
                agg_calls,
                indicator,
            },
            TraitSet::logical(),
            row_type,
        )
    }

    /// Plain `GROUP BY` over the named fields.
    pub fn group_by(self, keys: &[&str], agg_calls: Vec<AggCall>) -> FederaResult<Self> {
        let row = self.row_type()?;
        let group_set = keys
            .iter()
            .map(|k| {
                row.index_of(k)
                    .ok_or_else(|| FederaError::schema_error(format!("no field named '{k}' in {row}")))
            })
            .collect::<FederaResult<BitSet>>()?;
        self.aggregate(group_set.clone(), vec![group_set], agg_calls, false)
    }

    /// Order rows, then apply offset and fetch.
    pub fn sort(self, collation: Collation, offset: Option<u64>, fetch: Option<u64>) -> FederaResult<Self> {
        let row = self.row_type()?.clone();
        for f in collation.fields() {
            row.field(f)?;
        }
        let input = self.root;
        let traits = TraitSet::logical().with_collation(collation.clone());
        self.push(
            NodeKind::Sort {
                input,
                collation,
                offset,
                fetch,
            },
            traits,
            row,
        )
    }

    /// Skip `offset` rows and keep at most `fetch`, in input order.
    pub fn limit(self, offset: Option<u64>, fetch: Option<u64>) -> FederaResult<Self> {
        self.sort(Collation::empty(), offset, fetch)
    }

    /// Write the current rows to `table`. Produces a single row count field.
    pub fn modify(self, catalog: &dyn CatalogReader, table: &TableRef, op: ModifyOp) -> FederaResult<Self> {
        let target = catalog.row_type(table.id)?;
        let row = self.row_type()?;
        if matches!(op, ModifyOp::Insert) && row.arity() != target.arity() {
            return Err(FederaError::schema_error(format!(
                "INSERT into {table} expects {} columns, got {}",
                target.arity(),
                row.arity()
            )));
        }
        let input = self.root;
        self.push(
            NodeKind::Modify {
                input,
                table: table.clone(),
                op,
            },
            TraitSet::logical(),
            RowType::new(vec![Field::new("ROWCOUNT", DataType::Int64)]),
        )
    }

    /// Finish the plan.
    pub fn build(self) -> Plan {
        Plan {
            arena: self.arena,
            root: self.root,
        }
    }
}

fn is_nullable(expr: &Expr, input: &RowType) -> bool {
    match expr {
        Expr::Literal { value, .. } => value.is_null(),
        Expr::FieldRef { index, .. } => input.fields.get(*index).is_none_or(|f| f.nullable),
        Expr::DynamicParam { .. } => true,
        Expr::Call { op, operands, .. } => match op {
            Operator::IsNull | Operator::IsNotNull => false,
            Operator::Divide => true,
            _ => operands.iter().any(|e| is_nullable(e, input)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lit;
    use crate::ops::OpKind;
    use crate::traits::FieldCollation;

    fn orders() -> PlanBuilder {
        let row = RowType::new(vec![
            Field::new("region", DataType::String),
            Field::nullable("amount", DataType::Float64),
        ]);
        PlanBuilder::values(
            row,
            vec![
                vec![Value::from("EU"), Value::Float64(3.0)],
                vec![Value::from("US"), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_values_validation() {
        let row = RowType::new(vec![Field::new("x", DataType::Int64)]);
        assert!(PlanBuilder::values(row.clone(), vec![vec![Value::Null]]).is_err());
        assert!(PlanBuilder::values(row.clone(), vec![vec![]]).is_err());
        assert!(PlanBuilder::values(row, vec![vec![Value::from("a")]]).is_err());
    }

    #[test]
    fn test_project_names_and_nullability() {
        let b = orders();
        let amount = b.field("amount").unwrap();
        let region = b.field("region").unwrap();
        let plan = b
            .project(vec![
                (region, None),
                (amount.clone().is_null(), Some("missing".into())),
                (amount.multiply(lit(2.0)), None),
            ])
            .unwrap()
            .build();
        let row = plan.row_type().unwrap();
        assert_eq!(row.field_names(), vec!["region", "missing", "$f2"]);
        assert!(!row.fields[0].nullable);
        assert!(!row.fields[1].nullable);
        assert!(row.fields[2].nullable);
    }

    #[test]
    fn test_filter_rejects_non_boolean() {
        let b = orders();
        let amount = b.field("amount").unwrap();
        assert!(b.filter(amount).is_err());
    }

    #[test]
    fn test_group_by() {
        let b = orders();
        let sum = b.agg_call(AggKind::Sum, &["amount"], false, Some("total")).unwrap();
        let plan = b.group_by(&["region"], vec![sum]).unwrap().build();
        assert_eq!(plan.row_type().unwrap().field_names(), vec!["region", "total"]);
        assert_eq!(plan.root_node().unwrap().op(), OpKind::Aggregate);
    }

    #[test]
    fn test_sort_sets_collation_trait() {
        let plan = orders()
            .sort(Collation(vec![FieldCollation::desc(1)]), None, Some(10))
            .unwrap()
            .build();
        let root = plan.root_node().unwrap();
        assert_eq!(root.traits.collation.0.len(), 1);
        assert!(orders().sort(Collation(vec![FieldCollation::asc(5)]), None, None).is_err());
    }
}
