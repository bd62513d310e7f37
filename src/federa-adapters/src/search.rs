//! Search index translator (bool queries).

use std::sync::Arc;

use federa_core::BackendKind;
use federa_logical::{AggKind, Clause, Expr, NativeBody, NativeFragment};
use serde_json::{Map, Value as Json, json};

use crate::capability::{AggregateSpec, Capabilities};
use crate::render::{json_value, like_to_wildcard};
use crate::translation::{TranslateContext, Term, Translation, translate_with};

pub(crate) static CAPABILITIES: Capabilities = Capabilities {
    backend: BackendKind::Search,
    supports_or: true,
    supports_partial: true,
    supports_params: true,
    requires_key_coverage: false,
    translate_scan,
    translate_filter,
    translate_project: Some(translate_project),
    translate_aggregate: Some(translate_aggregate),
    translate_sort: None,
};

fn translate_scan(ctx: &TranslateContext) -> NativeFragment {
    NativeFragment::json(
        BackendKind::Search,
        Clause::Scan,
        json!({ "index": ctx.table().unwrap_or_default() }),
    )
}

fn translate_filter(condition: &Arc<Expr>, ctx: &TranslateContext) -> Translation {
    translate_with(condition, ctx, &CAPABILITIES, &|_| true, &render_filter)
}

fn render_filter(branches: &[Vec<Term>], ctx: &TranslateContext) -> NativeBody {
    let mut queries: Vec<Json> = branches.iter().map(|terms| bool_query(terms, ctx)).collect();
    let query = if queries.len() == 1 {
        queries.remove(0)
    } else {
        json!({ "bool": { "should": queries, "minimum_should_match": 1 } })
    };
    NativeBody::Json(query)
}

fn bool_query(terms: &[Term], ctx: &TranslateContext) -> Json {
    let mut must = Vec::new();
    let mut must_not = Vec::new();
    for term in terms {
        let name = ctx.name(term.field());
        match term {
            Term::Eq { value, .. } => must.push(json!({ "term": { name: json_value(value) } })),
            // `must_not` alone keeps documents without the field, which `<>` rejects.
            Term::NotEq { value, .. } => {
                must_not.push(json!({ "term": { name: json_value(value) } }));
                let exists = json!({ "exists": { "field": name } });
                if !must.contains(&exists) {
                    must.push(exists);
                }
            }
            Term::Range { lower, upper, .. } => {
                let mut range = Map::new();
                if let Some(b) = lower {
                    range.insert(if b.inclusive { "gte" } else { "gt" }.to_string(), json_value(&b.value));
                }
                if let Some(b) = upper {
                    range.insert(if b.inclusive { "lte" } else { "lt" }.to_string(), json_value(&b.value));
                }
                must.push(json!({ "range": { name: range } }));
            }
            Term::IsNull { .. } => must_not.push(json!({ "exists": { "field": name } })),
            Term::IsNotNull { .. } => {
                let exists = json!({ "exists": { "field": name } });
                if !must.contains(&exists) {
                    must.push(exists);
                }
            }
            Term::Like { pattern, .. } => {
                must.push(json!({ "wildcard": { name: { "value": like_to_wildcard(pattern) } } }));
            }
        }
    }
    let mut clauses = Map::new();
    if !must.is_empty() {
        clauses.insert("must".to_string(), Json::Array(must));
    }
    if !must_not.is_empty() {
        clauses.insert("must_not".to_string(), Json::Array(must_not));
    }
    json!({ "bool": clauses })
}

/// Source filtering cannot rename, so every output must keep its field name.
fn translate_project(exprs: &[Arc<Expr>], names: &[String], ctx: &TranslateContext) -> Option<NativeFragment> {
    let mut source = Vec::with_capacity(exprs.len());
    for (expr, name) in exprs.iter().zip(names) {
        let field = ctx.field_name(expr.as_field()?)?;
        if field != name {
            return None;
        }
        source.push(json!(field));
    }
    Some(NativeFragment::json(
        BackendKind::Search,
        Clause::Project,
        json!({ "_source": source }),
    ))
}

fn translate_aggregate(spec: &AggregateSpec<'_>, ctx: &TranslateContext) -> Option<NativeFragment> {
    if spec.group_sets.len() != 1 || spec.group_sets[0] != *spec.group_set {
        return None;
    }
    let keys = spec.group_set.to_vec();
    // Without a bucket there is no doc count, and metrics on no input differ
    // from SQL.
    if keys.is_empty() {
        return None;
    }
    let key_names = spec.output_names.get(..keys.len())?;
    let call_names = spec.output_names.get(keys.len()..)?;
    if call_names.len() != spec.agg_calls.len() {
        return None;
    }

    let mut metrics = Map::new();
    let mut doc_count = Vec::new();
    for (call, name) in spec.agg_calls.iter().zip(call_names) {
        if call.distinct || call.filter_arg.is_some() {
            return None;
        }
        let metric = match (call.kind, call.args.as_slice()) {
            // Bucket document counts answer COUNT(*) directly.
            (AggKind::Count, []) => {
                doc_count.push(json!(name));
                continue;
            }
            (AggKind::Count, [_]) => "value_count",
            // A `sum` over no values is 0, not NULL.
            (AggKind::Sum, [_]) => return None,
            (AggKind::Min, [_]) => "min",
            (AggKind::Max, [_]) => "max",
            (AggKind::Avg, [_]) => "avg",
            _ => return None,
        };
        let arg = ctx.field_name(*call.args.first()?)?;
        metrics.insert(name.clone(), json!({ metric: { "field": arg } }));
    }

    let mut body = Map::new();
    body.insert("size".to_string(), json!(0));
    let mut sources = Vec::with_capacity(keys.len());
    for (k, name) in keys.iter().zip(key_names) {
        sources.push(json!({ name: { "terms": { "field": ctx.field_name(*k)? } } }));
    }
    let mut groups = Map::new();
    groups.insert("composite".to_string(), json!({ "sources": sources }));
    if !metrics.is_empty() {
        groups.insert("aggs".to_string(), Json::Object(metrics));
    }
    body.insert("aggs".to_string(), json!({ "groups": groups }));
    if !doc_count.is_empty() {
        body.insert("_meta".to_string(), json!({ "doc_count": doc_count }));
    }
    Some(NativeFragment::json(BackendKind::Search, Clause::Aggregate, Json::Object(body)))
}

#[cfg(test)]
mod tests {
    use federa_core::{BitSet, DataType, Field, RowType};
    use federa_logical::{AggCall, field, lit};

    use super::*;

    fn ctx() -> TranslateContext {
        TranslateContext::new(["title", "year", "tags"]).with_location(None, "books")
    }

    fn translate(condition: Expr) -> Translation {
        translate_filter(&Arc::new(condition), &ctx())
    }

    #[test]
    fn test_single_branch_bool_query() {
        let year = field(1, DataType::Int64);
        let t = translate(
            year.clone()
                .gt_eq(lit(1990i64))
                .and(year.lt(lit(2000i64)))
                .and(field(0, DataType::String).like(lit("Dune%")))
                .and(field(2, DataType::String).is_null()),
        );
        assert_eq!(
            t.native().unwrap().as_json().unwrap(),
            &json!({"bool": {
                "must": [
                    {"wildcard": {"title": {"value": "Dune*"}}},
                    {"range": {"year": {"gte": 1990, "lt": 2000}}}
                ],
                "must_not": [{"exists": {"field": "tags"}}]
            }})
        );
    }

    #[test]
    fn test_disjunction_uses_should() {
        let year = field(1, DataType::Int64);
        let t = translate(year.clone().eq(lit(1965i64)).or(year.not_eq(lit(2000i64))));
        assert_eq!(
            t.native().unwrap().as_json().unwrap(),
            &json!({"bool": {
                "should": [
                    {"bool": {"must": [{"term": {"year": 1965}}]}},
                    {"bool": {
                        "must": [{"exists": {"field": "year"}}],
                        "must_not": [{"term": {"year": 2000}}]
                    }}
                ],
                "minimum_should_match": 1
            }})
        );
    }

    #[test]
    fn test_not_equal_requires_field() {
        let year = field(1, DataType::Int64);
        let t = translate(year.clone().not_eq(lit(5i64)).and(year.is_not_null()));
        assert_eq!(
            t.native().unwrap().as_json().unwrap(),
            &json!({"bool": {
                "must": [{"exists": {"field": "year"}}],
                "must_not": [{"term": {"year": 5}}]
            }})
        );
    }

    #[test]
    fn test_project_cannot_rename() {
        let exprs = vec![Arc::new(field(0, DataType::String))];
        assert!(translate_project(&exprs, &["title".to_string()], &ctx()).is_some());
        assert!(translate_project(&exprs, &["name".to_string()], &ctx()).is_none());
    }

    #[test]
    fn test_composite_aggregate() {
        let input = RowType::new(vec![
            Field::new("title", DataType::String),
            Field::new("year", DataType::Int64),
            Field::new("tags", DataType::String),
        ]);
        let calls = vec![
            AggCall::create(AggKind::Count, vec![], false, None, &input, Some("n".into())).unwrap(),
            AggCall::create(AggKind::Max, vec![1], false, None, &input, Some("latest".into())).unwrap(),
        ];
        let group_set = BitSet::of([2]);
        let names = vec!["tags".to_string(), "n".to_string(), "latest".to_string()];
        let spec = AggregateSpec {
            group_set: &group_set,
            group_sets: &[BitSet::of([2])],
            agg_calls: &calls,
            output_names: &names,
        };
        let native = translate_aggregate(&spec, &ctx()).unwrap();
        assert_eq!(
            native.as_json().unwrap(),
            &json!({
                "size": 0,
                "aggs": {"groups": {
                    "composite": {"sources": [{"tags": {"terms": {"field": "tags"}}}]},
                    "aggs": {"latest": {"max": {"field": "year"}}}
                }},
                "_meta": {"doc_count": ["n"]}
            })
        );
    }
    #[test]
    fn test_aggregate_refuses_global_and_sum() {
        let input = RowType::new(vec![
            Field::new("title", DataType::String),
            Field::new("year", DataType::Int64),
            Field::new("tags", DataType::String),
        ]);
        let max = vec![AggCall::create(AggKind::Max, vec![1], false, None, &input, Some("m".into())).unwrap()];
        let global = BitSet::empty();
        let names = vec!["m".to_string()];
        let spec = AggregateSpec {
            group_set: &global,
            group_sets: &[BitSet::empty()],
            agg_calls: &max,
            output_names: &names,
        };
        assert!(translate_aggregate(&spec, &ctx()).is_none());

        let sum = vec![AggCall::create(AggKind::Sum, vec![1], false, None, &input, Some("s".into())).unwrap()];
        let keys = BitSet::of([2]);
        let names = vec!["tags".to_string(), "s".to_string()];
        let spec = AggregateSpec {
            group_set: &keys,
            group_sets: &[BitSet::of([2])],
            agg_calls: &sum,
            output_names: &names,
        };
        assert!(translate_aggregate(&spec, &ctx()).is_none());
    }
}
