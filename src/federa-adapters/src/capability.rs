//! Per-backend capability table.
//!
//! Each backend kind is described by one static [`Capabilities`] value: a
//! few flags plus the translator functions it provides. Rules dispatch on
//! the table instead of on backend-specific types.

use std::sync::Arc;

use federa_core::{BackendKind, BitSet};
use federa_logical::{AggCall, Collation, Expr, NativeFragment};

use crate::translation::{TranslateContext, Translation};
use crate::{document, file, search, wide_column};

/// Aggregate to translate, with the names of its output fields.
#[derive(Debug, Clone, Copy)]
pub struct AggregateSpec<'a> {
    pub group_set: &'a BitSet,
    pub group_sets: &'a [BitSet],
    pub agg_calls: &'a [AggCall],
    pub output_names: &'a [String],
}

/// Sort to translate.
#[derive(Debug, Clone, Copy)]
pub struct SortSpec<'a> {
    pub collation: &'a Collation,
    pub offset: Option<u64>,
    pub fetch: Option<u64>,
}

pub type ScanFn = fn(&TranslateContext) -> NativeFragment;
pub type FilterFn = fn(&Arc<Expr>, &TranslateContext) -> Translation;
pub type ProjectFn = fn(&[Arc<Expr>], &[String], &TranslateContext) -> Option<NativeFragment>;
pub type AggregateFn = fn(&AggregateSpec<'_>, &TranslateContext) -> Option<NativeFragment>;
pub type SortFn = fn(&SortSpec<'_>, &TranslateContext) -> Option<NativeFragment>;

/// What one backend kind can evaluate natively.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub backend: BackendKind,
    /// Disjunctions can be pushed.
    pub supports_or: bool,
    /// A native filter can be combined with a local residual filter.
    pub supports_partial: bool,
    /// Dynamic parameters can be bound as native placeholders.
    pub supports_params: bool,
    /// Partition-key columns must be fully restricted by equality, or not
    /// restricted at all.
    pub requires_key_coverage: bool,
    pub translate_scan: ScanFn,
    pub translate_filter: FilterFn,
    pub translate_project: Option<ProjectFn>,
    pub translate_aggregate: Option<AggregateFn>,
    pub translate_sort: Option<SortFn>,
}

/// Capability table entry for `backend`.
pub fn capabilities(backend: BackendKind) -> &'static Capabilities {
    match backend {
        BackendKind::Document => &document::CAPABILITIES,
        BackendKind::WideColumn => &wide_column::CAPABILITIES,
        BackendKind::Search => &search::CAPABILITIES,
        BackendKind::File => &file::CAPABILITIES,
    }
}

/// Translate `condition` for `backend`.
pub fn translate(backend: BackendKind, condition: &Arc<Expr>, ctx: &TranslateContext) -> Translation {
    (capabilities(backend).translate_filter)(condition, ctx)
}
