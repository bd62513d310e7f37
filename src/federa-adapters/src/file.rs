//! File store translator.
//!
//! Files are laid out by primary key, so the store can only select rows by
//! equality on key columns. Parameters are not supported: the file path is
//! fixed when the plan is built.

use std::sync::Arc;

use federa_core::BackendKind;
use federa_logical::{Clause, Expr, NativeBody, NativeFragment};

use crate::capability::Capabilities;
use crate::render::text_value;
use crate::translation::{TranslateContext, Term, Translation, translate_with};

pub(crate) static CAPABILITIES: Capabilities = Capabilities {
    backend: BackendKind::File,
    supports_or: false,
    supports_partial: true,
    supports_params: false,
    requires_key_coverage: false,
    translate_scan,
    translate_filter,
    translate_project: None,
    translate_aggregate: None,
    translate_sort: None,
};

fn translate_scan(ctx: &TranslateContext) -> NativeFragment {
    let table = ctx.table().unwrap_or_default();
    let path = match ctx.schema() {
        Some(dir) => format!("{dir}/{table}"),
        None => table.to_string(),
    };
    NativeFragment::text(BackendKind::File, Clause::Scan, path)
}

fn translate_filter(condition: &Arc<Expr>, ctx: &TranslateContext) -> Translation {
    let accept = |term: &Term| ctx.is_primary_key(term.field()) && matches!(term, Term::Eq { .. });
    translate_with(condition, ctx, &CAPABILITIES, &accept, &render_filter)
}

fn render_filter(branches: &[Vec<Term>], ctx: &TranslateContext) -> NativeBody {
    let parts: Vec<String> = branches
        .iter()
        .flatten()
        .filter_map(|term| match term {
            Term::Eq { field, value } => Some(format!("{}={}", ctx.name(*field), text_value(value))),
            _ => None,
        })
        .collect();
    NativeBody::Text(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use federa_core::DataType;
    use federa_logical::{field, lit, param};

    use super::*;

    fn ctx() -> TranslateContext {
        TranslateContext::new(["day", "host", "bytes"])
            .with_partition_key(vec![0])
            .with_clustering_key(vec![1])
            .with_location(Some("logs".into()), "access")
    }

    fn translate(condition: Expr) -> Translation {
        translate_filter(&Arc::new(condition), &ctx())
    }

    #[test]
    fn test_key_equalities_become_path() {
        let t = translate(
            field(1, DataType::String)
                .eq(lit("web1"))
                .and(field(0, DataType::Int64).eq(lit(20i64))),
        );
        let Translation::Full(native) = t else {
            panic!("expected full translation, got {t:?}");
        };
        assert_eq!(native.as_text(), Some("day=20/host='web1'"));
        assert_eq!(translate_scan(&ctx()).as_text(), Some("logs/access"));
    }

    #[test]
    fn test_non_key_and_range_stay_local() {
        let t = translate(
            field(0, DataType::Int64)
                .eq(lit(20i64))
                .and(field(1, DataType::String).gt(lit("a")))
                .and(field(2, DataType::Int64).gt(lit(100i64))),
        );
        let Translation::Partial { native, residual, .. } = t else {
            panic!("expected partial translation");
        };
        assert_eq!(native.as_text(), Some("day=20"));
        assert_eq!(residual.to_string(), "AND(>($1, 'a'), >($2, 100))");
    }

    #[test]
    fn test_params_are_not_pushed() {
        let t = translate(field(0, DataType::Int64).eq(param(1, DataType::Int64)));
        assert!(t.is_untranslatable());
    }
}
