//! Wide-column store translator (CQL text).
//!
//! The store can only locate rows through the primary key: the partition
//! key must be pinned by equality and clustering columns may then be
//! restricted by equality or range. Everything else is evaluated locally.

use std::sync::Arc;

use federa_core::{BackendKind, BitSet};
use federa_logical::expr::decompose;
use federa_logical::{Clause, Expr, NativeBody, NativeFragment};

use crate::capability::Capabilities;
use crate::render::{quote_ident, text_value};
use crate::translation::{TranslateContext, Term, Translation, translate_with};

pub(crate) static CAPABILITIES: Capabilities = Capabilities {
    backend: BackendKind::WideColumn,
    supports_or: false,
    supports_partial: true,
    supports_params: true,
    requires_key_coverage: true,
    translate_scan,
    translate_filter,
    translate_project: Some(translate_project),
    translate_aggregate: None,
    translate_sort: None,
};

fn translate_scan(ctx: &TranslateContext) -> NativeFragment {
    let table = quote_ident(ctx.table().unwrap_or_default());
    let from = match ctx.schema() {
        Some(keyspace) => format!("FROM {}.{table}", quote_ident(keyspace)),
        None => format!("FROM {table}"),
    };
    NativeFragment::text(BackendKind::WideColumn, Clause::Scan, from)
}

/// Whether every partition-key column is equal to a literal in `condition`.
fn partition_key_pinned(condition: &Arc<Expr>, ctx: &TranslateContext) -> bool {
    let branches = decompose(condition);
    let [conjuncts] = branches.as_slice() else {
        return false;
    };
    let pinned: BitSet = conjuncts
        .iter()
        .filter_map(|c| Term::from_expr(c))
        .filter(Term::is_literal_equality)
        .map(|t| t.field())
        .collect();
    ctx.partition_key().iter().all(|k| pinned.contains(*k))
}

fn translate_filter(condition: &Arc<Expr>, ctx: &TranslateContext) -> Translation {
    let pinned = partition_key_pinned(condition, ctx);
    let accept = |term: &Term| {
        let field = term.field();
        if ctx.is_partition_key(field) {
            matches!(term, Term::Eq { .. })
        } else if ctx.is_clustering_key(field) {
            pinned && matches!(term, Term::Eq { .. } | Term::Range { .. })
        } else {
            false
        }
    };
    translate_with(condition, ctx, &CAPABILITIES, &accept, &render_filter)
}

fn render_filter(branches: &[Vec<Term>], ctx: &TranslateContext) -> NativeBody {
    let mut parts = Vec::new();
    for term in branches.iter().flatten() {
        let column = quote_ident(ctx.name(term.field()));
        match term {
            Term::Eq { value, .. } => parts.push(format!("{column} = {}", text_value(value))),
            Term::Range { lower, upper, .. } => {
                if let Some(b) = lower {
                    let op = if b.inclusive { ">=" } else { ">" };
                    parts.push(format!("{column} {op} {}", text_value(&b.value)));
                }
                if let Some(b) = upper {
                    let op = if b.inclusive { "<=" } else { "<" };
                    parts.push(format!("{column} {op} {}", text_value(&b.value)));
                }
            }
            // Vetoed before rendering.
            _ => {}
        }
    }
    NativeBody::Text(parts.join(" AND "))
}

fn translate_project(exprs: &[Arc<Expr>], names: &[String], ctx: &TranslateContext) -> Option<NativeFragment> {
    let mut columns = Vec::with_capacity(exprs.len());
    for (expr, name) in exprs.iter().zip(names) {
        let source = ctx.field_name(expr.as_field()?)?;
        if source == name {
            columns.push(quote_ident(source));
        } else {
            columns.push(format!("{} AS {}", quote_ident(source), quote_ident(name)));
        }
    }
    Some(NativeFragment::text(
        BackendKind::WideColumn,
        Clause::Project,
        format!("SELECT {}", columns.join(", ")),
    ))
}
