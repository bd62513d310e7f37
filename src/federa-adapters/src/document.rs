//! Document store translator.
//!
//! Filters become query documents (`{"a": 5, "b": {"$gt": 1}}`, with
//! `$or` across branches), projections and aggregates become pipeline
//! stages.

use std::sync::Arc;

use federa_core::BackendKind;
use federa_logical::{AggCall, AggKind, Clause, Direction, Expr, NativeBody, NativeFragment, NullOrder};
use serde_json::{Map, Value as Json, json};

use crate::capability::{AggregateSpec, Capabilities, SortSpec};
use crate::render::{json_value, like_to_regex};
use crate::translation::{Bound, TranslateContext, Term, Translation, fragment, translate_with};

pub(crate) static CAPABILITIES: Capabilities = Capabilities {
    backend: BackendKind::Document,
    supports_or: true,
    supports_partial: true,
    supports_params: true,
    requires_key_coverage: false,
    translate_scan,
    translate_filter,
    translate_project: Some(translate_project),
    translate_aggregate: Some(translate_aggregate),
    translate_sort: Some(translate_sort),
};

fn translate_scan(ctx: &TranslateContext) -> NativeFragment {
    let mut body = Map::new();
    body.insert("find".to_string(), json!(ctx.table().unwrap_or_default()));
    if let Some(db) = ctx.schema() {
        body.insert("$db".to_string(), json!(db));
    }
    NativeFragment::json(BackendKind::Document, Clause::Scan, Json::Object(body))
}

fn translate_filter(condition: &Arc<Expr>, ctx: &TranslateContext) -> Translation {
    translate_with(condition, ctx, &CAPABILITIES, &|_| true, &render_filter)
}

fn render_filter(branches: &[Vec<Term>], ctx: &TranslateContext) -> NativeBody {
    let mut docs: Vec<Json> = branches.iter().map(|terms| branch_document(terms, ctx)).collect();
    let body = if docs.len() == 1 {
        docs.remove(0)
    } else {
        json!({ "$or": docs })
    };
    NativeBody::Json(body)
}

fn add_bound(ops: &mut Map<String, Json>, bound: &Bound, strict: &str, inclusive: &str) {
    let key = if bound.inclusive { inclusive } else { strict };
    ops.insert(key.to_string(), json_value(&bound.value));
}

fn add_not_equal(ops: &mut Map<String, Json>, value: Json) {
    if let Some(Json::Array(values)) = ops.get_mut("$nin") {
        if !values.contains(&value) {
            values.push(value);
        }
    } else if let Some(previous) = ops.remove("$ne") {
        let values = if previous == value { vec![previous] } else { vec![previous, value] };
        ops.insert("$nin".to_string(), Json::Array(values));
    } else {
        ops.insert("$ne".to_string(), value);
    }
}

fn branch_document(terms: &[Term], ctx: &TranslateContext) -> Json {
    let mut fields: Map<String, Json> = Map::new();
    for term in terms {
        let entry = fields
            .entry(ctx.name(term.field()).to_string())
            .or_insert_with(|| Json::Object(Map::new()));
        let Json::Object(ops) = entry else {
            continue;
        };
        match term {
            Term::Eq { value, .. } => {
                ops.insert("$eq".to_string(), json_value(value));
            }
            Term::NotEq { value, .. } => add_not_equal(ops, json_value(value)),
            Term::Range { lower, upper, .. } => {
                if let Some(b) = lower {
                    add_bound(ops, b, "$gt", "$gte");
                }
                if let Some(b) = upper {
                    add_bound(ops, b, "$lt", "$lte");
                }
            }
            Term::IsNull { .. } => {
                ops.insert("$eq".to_string(), Json::Null);
            }
            Term::IsNotNull { .. } => add_not_equal(ops, Json::Null),
            Term::Like { pattern, .. } => {
                ops.insert("$regex".to_string(), json!(like_to_regex(pattern)));
            }
        }
    }
    // `$ne` and `$nin` match missing and null fields, which `<>` rejects.
    for term in terms.iter().filter(|t| matches!(t, Term::NotEq { .. })) {
        if let Some(Json::Object(ops)) = fields.get_mut(ctx.name(term.field())) {
            add_not_equal(ops, Json::Null);
        }
    }
    // A lone literal equality is written as the bare value.
    for value in fields.values_mut() {
        if let Json::Object(ops) = value {
            if ops.len() == 1 {
                if let Some(eq) = ops.get("$eq").filter(|v| !v.is_object() && !v.is_null()) {
                    *value = eq.clone();
                }
            }
        }
    }
    Json::Object(fields)
}

fn translate_project(exprs: &[Arc<Expr>], names: &[String], ctx: &TranslateContext) -> Option<NativeFragment> {
    let mut stage = Map::new();
    for (expr, name) in exprs.iter().zip(names) {
        let source = ctx.field_name(expr.as_field()?)?;
        stage.insert(name.clone(), json!(format!("${source}")));
    }
    if !stage.contains_key("_id") {
        stage.insert("_id".to_string(), json!(0));
    }
    Some(NativeFragment::json(
        BackendKind::Document,
        Clause::Project,
        json!({ "$project": stage }),
    ))
}

/// Counts the documents whose `path` is present and not null.
fn non_null_count(path: &str) -> Json {
    json!({ "$sum": { "$cond": [{ "$eq": [{ "$ifNull": [path, null] }, null] }, 0, 1] } })
}

/// Writes the `$group` accumulators for one call and its `$project` entry.
fn accumulator(
    call: &AggCall,
    name: &str,
    ctx: &TranslateContext,
    group: &mut Map<String, Json>,
    project: &mut Map<String, Json>,
) -> Option<()> {
    if call.distinct || call.filter_arg.is_some() {
        return None;
    }
    let arg = match call.args.as_slice() {
        [] => None,
        [a] => Some(format!("${}", ctx.field_name(*a)?)),
        _ => return None,
    };
    let output = format!("${name}");
    let (acc, projected) = match (call.kind, arg) {
        (AggKind::Count, None) => (json!({ "$sum": 1 }), json!(output)),
        (AggKind::Count, Some(a)) => (non_null_count(&a), json!(output)),
        // `$sum` yields 0 for a group without values, SUM yields NULL.
        (AggKind::Sum, Some(a)) => {
            let seen = format!("{name}__nonnull");
            if group.contains_key(&seen) {
                return None;
            }
            group.insert(seen.clone(), non_null_count(&a));
            (
                json!({ "$sum": a }),
                json!({ "$cond": [{ "$gt": [format!("${seen}"), 0] }, output, null] }),
            )
        }
        (AggKind::Min, Some(a)) => (json!({ "$min": a }), json!(output)),
        (AggKind::Max, Some(a)) => (json!({ "$max": a }), json!(output)),
        (AggKind::Avg, Some(a)) => (json!({ "$avg": a }), json!(output)),
        _ => return None,
    };
    if group.contains_key(name) {
        return None;
    }
    group.insert(name.to_string(), acc);
    project.insert(name.to_string(), projected);
    Some(())
}

fn translate_aggregate(spec: &AggregateSpec<'_>, ctx: &TranslateContext) -> Option<NativeFragment> {
    if spec.group_sets.len() != 1 || spec.group_sets[0] != *spec.group_set {
        return None;
    }
    let keys = spec.group_set.to_vec();
    let key_names = spec.output_names.get(..keys.len())?;
    let call_names = spec.output_names.get(keys.len()..)?;
    if call_names.len() != spec.agg_calls.len() {
        return None;
    }

    let mut group = Map::new();
    let mut project = Map::new();
    let id = match keys.as_slice() {
        // A global aggregate yields one row even over no input, `$group` none.
        [] => return None,
        [k] => {
            project.insert(key_names[0].clone(), json!("$_id"));
            json!(format!("${}", ctx.field_name(*k)?))
        }
        _ => {
            let mut id = Map::new();
            for (k, name) in keys.iter().zip(key_names) {
                id.insert(name.clone(), json!(format!("${}", ctx.field_name(*k)?)));
                project.insert(name.clone(), json!(format!("$_id.{name}")));
            }
            Json::Object(id)
        }
    };
    group.insert("_id".to_string(), id);
    for (call, name) in spec.agg_calls.iter().zip(call_names) {
        accumulator(call, name, ctx, &mut group, &mut project)?;
    }
    project.insert("_id".to_string(), json!(0));
    Some(NativeFragment::json(
        BackendKind::Document,
        Clause::Aggregate,
        json!([{ "$group": group }, { "$project": project }]),
    ))
}

/// Only orderings whose NULL placement matches the store's (NULLs lowest)
/// are translated.
fn translate_sort(spec: &SortSpec<'_>, ctx: &TranslateContext) -> Option<NativeFragment> {
    let mut stages = Vec::new();
    if !spec.collation.is_empty() {
        let mut keys = Map::new();
        for c in &spec.collation.0 {
            let direction = match (c.direction, c.nulls) {
                (Direction::Ascending, NullOrder::First) => 1,
                (Direction::Descending, NullOrder::Last) => -1,
                _ => return None,
            };
            keys.insert(ctx.field_name(c.field)?.to_string(), json!(direction));
        }
        stages.push(json!({ "$sort": keys }));
    }
    if let Some(offset) = spec.offset {
        stages.push(json!({ "$skip": offset }));
    }
    if let Some(fetch) = spec.fetch {
        stages.push(json!({ "$limit": fetch }));
    }
    Some(fragment(BackendKind::Document, Clause::Sort, NativeBody::Json(Json::Array(stages))))
}

#[cfg(test)]
mod tests {
    use federa_core::{BitSet, DataType, Field, RowType};
    use federa_logical::{Collation, FieldCollation, field, lit, param};

    use super::*;

    fn ctx() -> TranslateContext {
        TranslateContext::new(["name", "age", "city"]).with_location(Some("app".into()), "people")
    }

    fn translate(condition: Expr) -> Translation {
        translate_filter(&Arc::new(condition), &ctx())
    }

    #[test]
    fn test_conjunction_document() {
        let age = field(1, DataType::Int64);
        let t = translate(
            field(0, DataType::String)
                .eq(lit("bob"))
                .and(age.clone().gt(lit(20i64)))
                .and(lit(65i64).gt_eq(age)),
        );
        let Translation::Full(native) = t else {
            panic!("expected full translation, got {t:?}");
        };
        assert_eq!(
            native.as_json().unwrap(),
            &json!({"name": "bob", "age": {"$gt": 20, "$lte": 65}})
        );
    }

    #[test]
    fn test_or_and_not_equal() {
        let city = field(2, DataType::String);
        let t = translate(
            city.clone()
                .not_eq(lit("Oslo"))
                .and(city.clone().not_eq(lit("Rome")))
                .or(city.is_null()),
        );
        assert_eq!(
            t.native().unwrap().as_json().unwrap(),
            &json!({"$or": [{"city": {"$nin": ["Oslo", "Rome", null]}}, {"city": {"$eq": null}}]})
        );
    }

    #[test]
    fn test_not_equal_rejects_missing_and_null() {
        let age = field(1, DataType::Int64);
        let t = translate(age.clone().not_eq(lit(5i64)));
        assert_eq!(t.native().unwrap().as_json().unwrap(), &json!({"age": {"$nin": [5, null]}}));

        let t = translate(age.clone().not_eq(lit(5i64)).and(age.is_not_null()));
        assert_eq!(t.native().unwrap().as_json().unwrap(), &json!({"age": {"$nin": [null, 5]}}));
    }

    #[test]
    fn test_narrowing_cast_is_not_pushed() {
        let t = translate(field(1, DataType::Float64).cast(DataType::Int64).eq(lit(3i64)));
        assert!(!matches!(t, Translation::Full(_)), "got {t:?}");

        let t = translate(field(1, DataType::Int64).cast(DataType::Float64).gt_eq(lit(3.0)));
        let Translation::Full(native) = t else {
            panic!("expected full translation, got {t:?}");
        };
        assert_eq!(native.as_json().unwrap(), &json!({"age": {"$gte": 3}}));
    }

    #[test]
    fn test_dynamic_param_placeholder() {
        let t = translate(field(1, DataType::Int64).eq(param(3, DataType::Int64)));
        let native = t.native().unwrap();
        assert_eq!(native.as_json().unwrap(), &json!({"age": {"$eq": {"$param": 3}}}));
        assert_eq!(native.params.to_vec(), vec![3]);
    }

    #[test]
    fn test_partial_pushdown() {
        let age = field(1, DataType::Int64);
        let t = translate(
            age.clone()
                .gt(lit(3i64))
                .and(age.multiply(lit(2i64)).lt(lit(90i64))),
        );
        let Translation::Partial { native, residual, .. } = t else {
            panic!("expected partial translation");
        };
        assert_eq!(native.as_json().unwrap(), &json!({"age": {"$gt": 3}}));
        assert_eq!(residual.to_string(), "<(*($1, 2), 90)");
    }

    #[test]
    fn test_aggregate_pipeline() {
        let input = RowType::new(vec![
            Field::new("name", DataType::String),
            Field::new("age", DataType::Int64),
            Field::new("city", DataType::String),
        ]);
        let calls = vec![
            AggCall::create(AggKind::Count, vec![], false, None, &input, Some("n".into())).unwrap(),
            AggCall::create(AggKind::Sum, vec![1], false, None, &input, Some("total".into())).unwrap(),
        ];
        let group_set = BitSet::of([2]);
        let names = vec!["city".to_string(), "n".to_string(), "total".to_string()];
        let spec = AggregateSpec {
            group_set: &group_set,
            group_sets: &[BitSet::of([2])],
            agg_calls: &calls,
            output_names: &names,
        };
        let native = translate_aggregate(&spec, &ctx()).unwrap();
        let present = json!({"$sum": {"$cond": [{"$eq": [{"$ifNull": ["$age", null]}, null]}, 0, 1]}});
        assert_eq!(
            native.as_json().unwrap(),
            &json!([
                {"$group": {
                    "_id": "$city",
                    "n": {"$sum": 1},
                    "total__nonnull": present,
                    "total": {"$sum": "$age"}
                }},
                {"$project": {
                    "city": "$_id",
                    "n": "$n",
                    "total": {"$cond": [{"$gt": ["$total__nonnull", 0]}, "$total", null]},
                    "_id": 0
                }}
            ])
        );

        let rollup = [BitSet::of([2]), BitSet::empty()];
        let spec = AggregateSpec {
            group_sets: &rollup,
            ..spec
        };
        assert!(translate_aggregate(&spec, &ctx()).is_none());
    }

    #[test]
    fn test_aggregate_refuses_global_and_clashing_names() {
        let input = RowType::new(vec![
            Field::new("name", DataType::String),
            Field::new("age", DataType::Int64),
            Field::new("city", DataType::String),
        ]);
        let calls = vec![
            AggCall::create(AggKind::Count, vec![1], false, None, &input, Some("n".into())).unwrap(),
        ];
        let global = BitSet::empty();
        let names = vec!["n".to_string()];
        let spec = AggregateSpec {
            group_set: &global,
            group_sets: &[BitSet::empty()],
            agg_calls: &calls,
            output_names: &names,
        };
        assert!(translate_aggregate(&spec, &ctx()).is_none());

        let calls = vec![
            AggCall::create(AggKind::Sum, vec![1], false, None, &input, Some("s".into())).unwrap(),
            AggCall::create(AggKind::Count, vec![1], false, None, &input, Some("s__nonnull".into())).unwrap(),
        ];
        let keys = BitSet::of([2]);
        let names = vec!["city".to_string(), "s".to_string(), "s__nonnull".to_string()];
        let spec = AggregateSpec {
            group_set: &keys,
            group_sets: &[BitSet::of([2])],
            agg_calls: &calls,
            output_names: &names,
        };
        assert!(translate_aggregate(&spec, &ctx()).is_none());
    }

    #[test]
    fn test_sort_requires_matching_null_order() {
        let compatible = Collation(vec![FieldCollation {
            nulls: NullOrder::Last,
            ..FieldCollation::desc(1)
        }]);
        let spec = SortSpec {
            collation: &compatible,
            offset: None,
            fetch: Some(10),
        };
        assert_eq!(
            translate_sort(&spec, &ctx()).unwrap().as_json().unwrap(),
            &json!([{"$sort": {"age": -1}}, {"$limit": 10}])
        );

        let default_asc = Collation(vec![FieldCollation::asc(1)]);
        let spec = SortSpec {
            collation: &default_asc,
            ..spec
        };
        assert!(translate_sort(&spec, &ctx()).is_none());
    }
}
