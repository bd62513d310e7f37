//! Backend-neutral half of predicate translation.
//!
//! A condition is split into OR-branches of AND-conjuncts. Each conjunct is
//! recognized as a [`Term`] (a comparison of one field against a literal or a
//! dynamic parameter, a null test or a LIKE) or left for local evaluation.
//! Terms on the same field are then merged so that a backend sees at most
//! one equality and one bound per direction for each field.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use federa_core::{BackendKind, BitSet, Value};
use federa_logical::expr::{and_all, decompose, or_all};
use federa_logical::{Clause, Expr, FieldComparison, NativeBody, NativeFragment, Operator};
use log::debug;

use crate::capability::Capabilities;

/// Outcome of translating a condition for one backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// The backend evaluates the whole condition.
    Full(NativeFragment),
    /// The backend evaluates `pushed`; `residual` must still be applied to
    /// the rows it returns.
    Partial {
        native: NativeFragment,
        pushed: Arc<Expr>,
        residual: Arc<Expr>,
    },
    /// Nothing can be pushed; the reason is for logs and tests.
    Untranslatable(String),
}

impl Translation {
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    pub fn is_untranslatable(&self) -> bool {
        matches!(self, Self::Untranslatable(_))
    }

    /// The native fragment, unless nothing was translated.
    pub fn native(&self) -> Option<&NativeFragment> {
        match self {
            Self::Full(native) | Self::Partial { native, .. } => Some(native),
            Self::Untranslatable(_) => None,
        }
    }

    /// Part of the condition left for local evaluation.
    pub fn residual(&self) -> Option<&Arc<Expr>> {
        match self {
            Self::Partial { residual, .. } => Some(residual),
            _ => None,
        }
    }
}

/// What a translator knows about the input rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslateContext {
    field_names: Vec<String>,
    partition_key: Vec<usize>,
    clustering_key: Vec<usize>,
    schema: Option<String>,
    table: Option<String>,
}

impl TranslateContext {
    /// Context for input rows whose fields are called `field_names` by the
    /// backend.
    pub fn new<I, S>(field_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field_names: field_names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Field ordinals that together pick the storage partition.
    #[must_use]
    pub fn with_partition_key(mut self, fields: Vec<usize>) -> Self {
        self.partition_key = fields;
        self
    }

    /// Field ordinals ordering rows within a storage partition.
    #[must_use]
    pub fn with_clustering_key(mut self, fields: Vec<usize>) -> Self {
        self.clustering_key = fields;
        self
    }

    /// Physical schema and table (keyspace, database, index, directory).
    #[must_use]
    pub fn with_location(mut self, schema: Option<String>, table: impl Into<String>) -> Self {
        self.schema = schema;
        self.table = Some(table.into());
        self
    }

    /// Same location with the fields renamed, as seen above a native
    /// projection. Key positions no longer apply and are cleared.
    #[must_use]
    pub fn with_field_names(self, field_names: Vec<String>) -> Self {
        Self {
            field_names,
            partition_key: Vec::new(),
            clustering_key: Vec::new(),
            ..self
        }
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn field_name(&self, field: usize) -> Option<&str> {
        self.field_names.get(field).map(String::as_str)
    }

    pub fn partition_key(&self) -> &[usize] {
        &self.partition_key
    }

    pub fn clustering_key(&self) -> &[usize] {
        &self.clustering_key
    }

    pub fn is_partition_key(&self, field: usize) -> bool {
        self.partition_key.contains(&field)
    }

    pub fn is_clustering_key(&self, field: usize) -> bool {
        self.clustering_key.contains(&field)
    }

    /// Partition key followed by clustering key.
    pub fn is_primary_key(&self, field: usize) -> bool {
        self.is_partition_key(field) || self.is_clustering_key(field)
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Name of `field`. Callers only render fields that passed
    /// [`plan_filter`], which checks the ordinal.
    pub(crate) fn name(&self, field: usize) -> &str {
        self.field_name(field).unwrap_or("?")
    }
}

/// Right-hand side of a native comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    /// Known at plan time.
    Literal(Value),
    /// Bound at execution time to the parameter with this index.
    Param(usize),
}

impl NativeValue {
    fn from_expr(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Literal { value, .. } if !value.is_null() => Some(Self::Literal(value.clone())),
            Expr::DynamicParam { index, .. } => Some(Self::Param(*index)),
            _ => None,
        }
    }

    pub fn param(&self) -> Option<usize> {
        match self {
            Self::Param(i) => Some(*i),
            Self::Literal(_) => None,
        }
    }

    /// Plan-time order of two values; `None` if either is a parameter or
    /// the types are not comparable.
    fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a.compare(b),
            _ => None,
        }
    }
}

impl fmt::Display for NativeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => write!(f, "{v}"),
            Self::Param(i) => write!(f, "?{i}"),
        }
    }
}

/// One side of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    pub value: NativeValue,
    pub inclusive: bool,
}

/// A conjunct in a form backends can render.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Eq { field: usize, value: NativeValue },
    NotEq { field: usize, value: NativeValue },
    /// At least one side is set.
    Range {
        field: usize,
        lower: Option<Bound>,
        upper: Option<Bound>,
    },
    IsNull { field: usize },
    IsNotNull { field: usize },
    Like { field: usize, pattern: String },
}

impl Term {
    /// Recognize a single conjunct. A literal on the left is moved to the
    /// right with the comparison reversed.
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        if let Some(cmp) = FieldComparison::extract(expr) {
            let value = NativeValue::from_expr(&cmp.operand)?;
            let field = cmp.field;
            let bound = |inclusive| Bound {
                value: value.clone(),
                inclusive,
            };
            return match cmp.op {
                Operator::Eq => Some(Self::Eq { field, value }),
                Operator::NotEq => Some(Self::NotEq { field, value }),
                Operator::Gt | Operator::GtEq => Some(Self::Range {
                    field,
                    lower: Some(bound(cmp.op == Operator::GtEq)),
                    upper: None,
                }),
                Operator::Lt | Operator::LtEq => Some(Self::Range {
                    field,
                    lower: None,
                    upper: Some(bound(cmp.op == Operator::LtEq)),
                }),
                _ => None,
            };
        }
        match expr.as_call()? {
            (Operator::IsNull, [operand]) => Some(Self::IsNull {
                field: operand.as_field()?,
            }),
            (Operator::IsNotNull, [operand]) => Some(Self::IsNotNull {
                field: operand.as_field()?,
            }),
            (Operator::Like, [operand, pattern]) => Some(Self::Like {
                field: operand.as_field()?,
                pattern: pattern.as_literal()?.as_str()?.to_string(),
            }),
            _ => None,
        }
    }

    pub fn field(&self) -> usize {
        match self {
            Self::Eq { field, .. }
            | Self::NotEq { field, .. }
            | Self::Range { field, .. }
            | Self::IsNull { field }
            | Self::IsNotNull { field }
            | Self::Like { field, .. } => *field,
        }
    }

    /// Dynamic parameters this term reads.
    pub fn params(&self) -> Vec<usize> {
        match self {
            Self::Eq { value, .. } | Self::NotEq { value, .. } => value.param().into_iter().collect(),
            Self::Range { lower, upper, .. } => lower
                .iter()
                .chain(upper)
                .filter_map(|b| b.value.param())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether this is `field = <literal>`.
    pub fn is_literal_equality(&self) -> bool {
        matches!(
            self,
            Self::Eq {
                value: NativeValue::Literal(_),
                ..
            }
        )
    }
}

/// Translatable part of a condition, ready to render.
#[derive(Debug, Clone)]
pub struct FilterPlan {
    /// OR-branches of merged terms.
    pub branches: Vec<Vec<Term>>,
    /// The condition the terms express.
    pub pushed: Arc<Expr>,
    /// What must still be evaluated locally.
    pub residual: Option<Arc<Expr>>,
    /// Dynamic parameters referenced by the terms.
    pub params: BitSet,
}

#[derive(Default)]
struct FieldTerms {
    eq: Option<(NativeValue, Arc<Expr>)>,
    lower: Option<(Bound, Arc<Expr>)>,
    upper: Option<(Bound, Arc<Expr>)>,
    not_eq: Vec<(NativeValue, Arc<Expr>)>,
    nullness: Option<(bool, Arc<Expr>)>,
    like: Option<(String, Arc<Expr>)>,
}

/// Whether `new` is a tighter bound than `old`, or `None` if the two cannot
/// be ordered at plan time.
fn is_stronger(old: &Bound, new: &Bound, lower: bool) -> Option<bool> {
    Some(match new.value.compare(&old.value)? {
        Ordering::Equal => !new.inclusive && old.inclusive,
        Ordering::Greater => lower,
        Ordering::Less => !lower,
    })
}

/// Whether `field = value` already implies the bound.
fn implies(value: &NativeValue, bound: &Bound, lower: bool) -> bool {
    match value.compare(&bound.value) {
        Some(Ordering::Equal) => bound.inclusive,
        Some(Ordering::Greater) => lower,
        Some(Ordering::Less) => !lower,
        None => false,
    }
}

fn merge_bound(
    slot: &mut Option<(Bound, Arc<Expr>)>,
    new: Bound,
    expr: Arc<Expr>,
    lower: bool,
    residual: &mut Vec<Arc<Expr>>,
) {
    let Some((old, _)) = slot else {
        *slot = Some((new, expr));
        return;
    };
    match is_stronger(old, &new, lower) {
        Some(true) => *slot = Some((new, expr)),
        Some(false) => {}
        None => residual.push(expr),
    }
}

impl FieldTerms {
    fn add(&mut self, term: Term, expr: Arc<Expr>, residual: &mut Vec<Arc<Expr>>) {
        match term {
            Term::Eq { value, .. } => match &self.eq {
                None => self.eq = Some((value, expr)),
                Some((existing, _)) if *existing == value => {}
                Some(_) => residual.push(expr),
            },
            Term::NotEq { value, .. } => {
                if !self.not_eq.iter().any(|(v, _)| *v == value) {
                    self.not_eq.push((value, expr));
                }
            }
            Term::Range { lower, upper, .. } => {
                if let Some(b) = lower {
                    merge_bound(&mut self.lower, b, Arc::clone(&expr), true, residual);
                }
                if let Some(b) = upper {
                    merge_bound(&mut self.upper, b, expr, false, residual);
                }
            }
            Term::IsNull { .. } => self.add_null_test(true, expr, residual),
            Term::IsNotNull { .. } => self.add_null_test(false, expr, residual),
            Term::Like { pattern, .. } => match &self.like {
                None => self.like = Some((pattern, expr)),
                Some((existing, _)) if *existing == pattern => {}
                Some(_) => residual.push(expr),
            },
        }
    }

    fn add_null_test(&mut self, is_null: bool, expr: Arc<Expr>, residual: &mut Vec<Arc<Expr>>) {
        match &self.nullness {
            None => self.nullness = Some((is_null, expr)),
            Some((existing, _)) if *existing == is_null => {}
            Some(_) => residual.push(expr),
        }
    }

    /// Emit the merged terms of `field`; an equality supersedes the range
    /// and the null test on the same field.
    fn finish(
        self,
        field: usize,
        terms: &mut Vec<Term>,
        kept: &mut Vec<Arc<Expr>>,
        residual: &mut Vec<Arc<Expr>>,
    ) {
        if let Some((value, expr)) = self.eq {
            for (bound, bound_expr, lower) in self
                .lower
                .into_iter()
                .map(|(b, e)| (b, e, true))
                .chain(self.upper.into_iter().map(|(b, e)| (b, e, false)))
            {
                if !implies(&value, &bound, lower) {
                    residual.push(bound_expr);
                }
            }
            if let Some((true, null_expr)) = self.nullness {
                residual.push(null_expr);
            }
            terms.push(Term::Eq { field, value });
            kept.push(expr);
        } else {
            if self.lower.is_some() || self.upper.is_some() {
                let (lower, lower_expr) = self.lower.map(|(b, e)| (Some(b), Some(e))).unwrap_or_default();
                let (upper, upper_expr) = self.upper.map(|(b, e)| (Some(b), Some(e))).unwrap_or_default();
                terms.push(Term::Range { field, lower, upper });
                kept.extend(lower_expr.into_iter().chain(upper_expr));
            }
            if let Some((is_null, expr)) = self.nullness {
                terms.push(if is_null {
                    Term::IsNull { field }
                } else {
                    Term::IsNotNull { field }
                });
                kept.push(expr);
            }
        }
        for (value, expr) in self.not_eq {
            terms.push(Term::NotEq { field, value });
            kept.push(expr);
        }
        if let Some((pattern, expr)) = self.like {
            terms.push(Term::Like { field, pattern });
            kept.push(expr);
        }
    }
}

struct Branch {
    terms: Vec<Term>,
    kept: Vec<Arc<Expr>>,
    residual: Vec<Arc<Expr>>,
}

fn analyze_branch(
    conjuncts: &[Arc<Expr>],
    ctx: &TranslateContext,
    caps: &Capabilities,
    accept: &dyn Fn(&Term) -> bool,
) -> Branch {
    let mut residual = Vec::new();
    let mut fields: BTreeMap<usize, FieldTerms> = BTreeMap::new();
    for conjunct in conjuncts {
        let usable = Term::from_expr(conjunct).filter(|term| {
            (caps.supports_params || term.params().is_empty())
                && ctx.field_name(term.field()).is_some()
                && accept(term)
        });
        match usable {
            Some(term) => {
                fields
                    .entry(term.field())
                    .or_default()
                    .add(term, Arc::clone(conjunct), &mut residual);
            }
            None => residual.push(Arc::clone(conjunct)),
        }
    }
    let mut terms = Vec::new();
    let mut kept = Vec::new();
    for (field, state) in fields {
        state.finish(field, &mut terms, &mut kept, &mut residual);
    }
    Branch {
        terms,
        kept,
        residual,
    }
}

/// Reject the whole condition when it restricts some but not all
/// partition-key columns by equality with a literal.
fn check_key_coverage(
    condition: &Expr,
    branches: &[Vec<Arc<Expr>>],
    ctx: &TranslateContext,
) -> Result<(), String> {
    let key = ctx.partition_key();
    let referenced = condition.input_refs();
    if !key.iter().any(|k| referenced.contains(*k)) {
        return Ok(());
    }
    for conjuncts in branches {
        let covered: BitSet = conjuncts
            .iter()
            .filter_map(|c| Term::from_expr(c))
            .filter(Term::is_literal_equality)
            .map(|t| t.field())
            .collect();
        let missing: Vec<&str> = key
            .iter()
            .filter(|k| !covered.contains(**k))
            .map(|k| ctx.name(*k))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "partition key only partially restricted; missing equality on {}",
                missing.join(", ")
            ));
        }
    }
    Ok(())
}

/// Split `condition` into the part `caps.backend` can evaluate natively and
/// the residual. `accept` is the backend's per-term veto.
pub fn plan_filter(
    condition: &Arc<Expr>,
    ctx: &TranslateContext,
    caps: &Capabilities,
    accept: &dyn Fn(&Term) -> bool,
) -> Result<FilterPlan, String> {
    let disjuncts = decompose(condition);
    if disjuncts.is_empty() {
        return Err("condition is always false".to_string());
    }
    if disjuncts.len() > 1 && !caps.supports_or {
        return Err("backend does not support OR".to_string());
    }
    if caps.requires_key_coverage {
        check_key_coverage(condition, &disjuncts, ctx)?;
    }

    let single = disjuncts.len() == 1;
    let mut branches = Vec::with_capacity(disjuncts.len());
    let mut pushed = Vec::with_capacity(disjuncts.len());
    let mut residuals = Vec::new();
    let mut params = BitSet::empty();
    for (i, conjuncts) in disjuncts.iter().enumerate() {
        let branch = analyze_branch(conjuncts, ctx, caps, accept);
        if branch.terms.is_empty() {
            return Err(if single {
                "no conjunct can be evaluated natively".to_string()
            } else {
                format!("OR branch {i} has no conjunct the backend can evaluate")
            });
        }
        for term in &branch.terms {
            for p in term.params() {
                params = params.with(p);
            }
        }
        pushed.push(and_all(branch.kept));
        residuals.push(branch.residual);
        branches.push(branch.terms);
    }

    let residual = if single {
        residuals
            .pop()
            .filter(|r| !r.is_empty())
            .map(and_all)
    } else if residuals.iter().any(|r| !r.is_empty()) {
        // Each branch was relaxed, so the pushed disjunction is a superset.
        Some(Arc::clone(condition))
    } else {
        None
    };
    if residual.is_some() && !caps.supports_partial {
        return Err("backend cannot combine a native filter with a residual".to_string());
    }
    Ok(FilterPlan {
        branches,
        pushed: or_all(pushed),
        residual,
        params,
    })
}

/// Run [`plan_filter`] and render the result with `render`.
pub(crate) fn translate_with(
    condition: &Arc<Expr>,
    ctx: &TranslateContext,
    caps: &Capabilities,
    accept: &dyn Fn(&Term) -> bool,
    render: &dyn Fn(&[Vec<Term>], &TranslateContext) -> NativeBody,
) -> Translation {
    let plan = match plan_filter(condition, ctx, caps, accept) {
        Ok(plan) => plan,
        Err(reason) => {
            debug!("{} cannot evaluate {condition}: {reason}", caps.backend);
            return Translation::Untranslatable(reason);
        }
    };
    let native = fragment(caps.backend, Clause::Filter, render(&plan.branches, ctx)).with_params(plan.params);
    match plan.residual {
        None => Translation::Full(native),
        Some(residual) => {
            debug!("{} evaluates {} natively, {residual} locally", caps.backend, plan.pushed);
            Translation::Partial {
                native,
                pushed: plan.pushed,
                residual,
            }
        }
    }
}

pub(crate) fn fragment(backend: BackendKind, clause: Clause, body: NativeBody) -> NativeFragment {
    match body {
        NativeBody::Json(v) => NativeFragment::json(backend, clause, v),
        NativeBody::Text(s) => NativeFragment::text(backend, clause, s),
    }
}
