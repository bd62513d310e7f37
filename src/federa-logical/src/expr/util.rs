//! Boolean decomposition helpers and expression validation.

use std::sync::Arc;

use common_error::{FederaError, FederaResult};
use federa_core::{DataType, RowType, Value};

use super::{Expr, Operator, lit};

/// Flatten nested `AND`s into their conjuncts. `TRUE` has no conjuncts.
pub fn conjunctions(expr: &Arc<Expr>) -> Vec<Arc<Expr>> {
    let mut out = Vec::new();
    flatten(expr, Operator::And, &mut out);
    out.retain(|e| !e.is_always_true());
    out
}

/// Flatten nested `OR`s into their disjuncts. `FALSE` has no disjuncts.
pub fn disjunctions(expr: &Arc<Expr>) -> Vec<Arc<Expr>> {
    let mut out = Vec::new();
    flatten(expr, Operator::Or, &mut out);
    out.retain(|e| !e.is_always_false());
    out
}

fn flatten(expr: &Arc<Expr>, connective: Operator, out: &mut Vec<Arc<Expr>>) {
    match expr.as_call() {
        Some((op, operands)) if op == connective => {
            for operand in operands {
                flatten(operand, connective, out);
            }
        }
        _ => out.push(Arc::clone(expr)),
    }
}

/// Combine conjuncts with `AND`; no conjuncts yields `TRUE`.
pub fn and_all(conjuncts: Vec<Arc<Expr>>) -> Arc<Expr> {
    combine(conjuncts, Operator::And, Expr::true_literal)
}

/// Combine disjuncts with `OR`; no disjuncts yields `FALSE`.
pub fn or_all(disjuncts: Vec<Arc<Expr>>) -> Arc<Expr> {
    combine(disjuncts, Operator::Or, Expr::false_literal)
}

fn combine(mut items: Vec<Arc<Expr>>, op: Operator, unit: fn() -> Expr) -> Arc<Expr> {
    match items.len() {
        0 => Arc::new(unit()),
        1 => items.remove(0),
        _ => Arc::new(Expr::call(op, items)),
    }
}

/// Split a condition into OR-branches, each split into its AND-conjuncts.
///
/// Only the top-level connectives are flattened; no distribution is applied,
/// so [`recompose`] of the result is equivalent to the input.
pub fn decompose(condition: &Arc<Expr>) -> Vec<Vec<Arc<Expr>>> {
    disjunctions(condition).iter().map(conjunctions).collect()
}

/// Inverse of [`decompose`].
pub fn recompose(branches: Vec<Vec<Arc<Expr>>>) -> Arc<Expr> {
    or_all(branches.into_iter().map(and_all).collect())
}

/// A comparison between a field and a literal or dynamic parameter, with the
/// field normalized to the left-hand side.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldComparison {
    pub field: usize,
    pub op: Operator,
    /// Either a literal or a dynamic parameter.
    pub operand: Arc<Expr>,
}

impl FieldComparison {
    /// Recognize `field op operand` or `operand op field`. The latter is
    /// returned with the operator reversed.
    pub fn extract(expr: &Expr) -> Option<Self> {
        let (op, operands) = expr.as_call()?;
        if !op.is_comparison() {
            return None;
        }
        let [left, right] = operands else {
            return None;
        };
        let is_value = |e: &Expr| matches!(e, Expr::Literal { .. } | Expr::DynamicParam { .. });
        if is_value(right.as_ref()) {
            if let Some((field, operand)) = uncast(left, right) {
                return Some(Self { field, op, operand });
            }
        }
        if is_value(left.as_ref()) {
            if let Some((field, operand)) = uncast(right, left) {
                return Some(Self {
                    field,
                    op: op.reverse()?,
                    operand,
                });
            }
        }
        None
    }

    /// Whether the operand is a dynamic parameter.
    pub fn is_dynamic(&self) -> bool {
        matches!(*self.operand, Expr::DynamicParam { .. })
    }
}

/// The field compared by `side`, with `operand` expressed in the field's
/// own type.
///
/// A cast is looked through only when comparing the uncast field gives the
/// same answer: the cast does not change the type, or it widens `Int64` to
/// `Float64` and the operand is a literal holding an exact integer. Any other
/// cast (narrowing, or to text) is not a field comparison.
fn uncast(side: &Expr, operand: &Arc<Expr>) -> Option<(usize, Arc<Expr>)> {
    if let Some(index) = side.as_field() {
        return Some((index, Arc::clone(operand)));
    }
    let (Operator::Cast, [inner]) = side.as_call()? else {
        return None;
    };
    let index = inner.as_field()?;
    let (from, to) = (inner.data_type(), side.data_type());
    if from == to {
        return Some((index, Arc::clone(operand)));
    }
    if !(*from == DataType::Int64 && *to == DataType::Float64) {
        return None;
    }
    let exact = match operand.as_literal()? {
        Value::Int64(i) => *i,
        Value::Float64(f) if f.fract() == 0.0 && f.abs() < MAX_EXACT_F64_INT => *f as i64,
        _ => return None,
    };
    Some((index, Arc::new(lit(exact))))
}

/// Integers below this magnitude survive a round trip through `f64`.
const MAX_EXACT_F64_INT: f64 = 9_007_199_254_740_992.0;

impl Expr {
    /// Check that every field reference is in bounds for `row` with a
    /// compatible type and that every call is well typed.
    pub fn validate(&self, row: &RowType) -> FederaResult<()> {
        match self {
            Self::Literal { .. } | Self::DynamicParam { .. } => Ok(()),
            Self::FieldRef { index, data_type } => {
                let field = row.field(*index)?;
                if field.data_type.can_coerce_to(data_type) || data_type.can_coerce_to(&field.data_type) {
                    Ok(())
                } else {
                    Err(FederaError::type_error(format!(
                        "${index} is declared {data_type} but the input field '{}' is {}",
                        field.name, field.data_type
                    )))
                }
            }
            Self::Call {
                op,
                operands,
                data_type,
            } => {
                for operand in operands {
                    operand.validate(row)?;
                }
                if *op == Operator::Cast {
                    return Ok(());
                }
                let types: Vec<DataType> =
                    operands.iter().map(|e| e.data_type().clone()).collect();
                match op.result_type(&types) {
                    Some(t) if t == *data_type || t.can_coerce_to(data_type) => Ok(()),
                    _ => Err(FederaError::type_error(format!(
                        "operator {op} cannot be applied to ({})",
                        types
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field, lit, param};

    fn b(i: usize) -> Expr {
        field(i, DataType::Bool)
    }

    #[test]
    fn test_conjunctions_flatten_nested_and() {
        let e = Arc::new(b(0).and(b(1).and(b(2))).and(Expr::true_literal()));
        let parts = conjunctions(&e);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].to_string(), "$2");
    }

    #[test]
    fn test_and_all_units() {
        assert!(and_all(vec![]).is_always_true());
        assert!(or_all(vec![]).is_always_false());
        let single = Arc::new(b(3));
        assert_eq!(and_all(vec![Arc::clone(&single)]), single);
    }

    #[test]
    fn test_decompose_keeps_nested_structure() {
        let e = Arc::new(b(0).and(b(1)).or(b(2)).or(b(3).and(b(4).or(b(5)))));
        let branches = decompose(&e);
        assert_eq!(branches.len(), 3);
        assert_eq!(branches[0].len(), 2);
        assert_eq!(branches[1].len(), 1);
        assert_eq!(branches[2][1].to_string(), "OR($4, $5)");
    }

    #[test]
    fn test_extract_reverses_literal_on_left() {
        let e = lit(5i64).lt(field(2, DataType::Int64));
        let cmp = FieldComparison::extract(&e).unwrap();
        assert_eq!(cmp.field, 2);
        assert_eq!(cmp.op, Operator::Gt);
        assert_eq!(cmp.operand.to_string(), "5");

        let p = field(1, DataType::Int64).eq(param(0, DataType::Int64));
        assert!(FieldComparison::extract(&p).unwrap().is_dynamic());

        let two_fields = field(1, DataType::Int64).eq(field(2, DataType::Int64));
        assert!(FieldComparison::extract(&two_fields).is_none());
    }

    #[test]
    fn test_extract_only_looks_through_exact_casts() {
        // 3.7 casts to 3, so the uncast field cannot stand in for the cast.
        let narrowing = field(0, DataType::Float64).cast(DataType::Int64).eq(lit(3i64));
        assert!(FieldComparison::extract(&narrowing).is_none());

        let to_text = field(0, DataType::Int64).cast(DataType::String).eq(lit("05"));
        assert!(FieldComparison::extract(&to_text).is_none());

        let widening = field(0, DataType::Int64).cast(DataType::Float64).gt_eq(lit(3.0));
        let cmp = FieldComparison::extract(&widening).unwrap();
        assert_eq!(cmp.field, 0);
        assert_eq!(cmp.operand.as_literal(), Some(&Value::Int64(3)));

        let fractional = field(0, DataType::Int64).cast(DataType::Float64).gt(lit(3.5));
        assert!(FieldComparison::extract(&fractional).is_none());

        let widened_param = field(0, DataType::Int64)
            .cast(DataType::Float64)
            .eq(param(0, DataType::Float64));
        assert!(FieldComparison::extract(&widened_param).is_none());

        let reversed = lit(2.0).lt(field(1, DataType::Int64).cast(DataType::Float64));
        let cmp = FieldComparison::extract(&reversed).unwrap();
        assert_eq!((cmp.field, cmp.op), (1, Operator::Gt));
    }

    #[test]
    fn test_validate() {
        let row = RowType::new(vec![
            federa_core::Field::new("id", DataType::Int64),
            federa_core::Field::nullable("name", DataType::String),
        ]);
        assert!(field(0, DataType::Int64).gt(lit(1i64)).validate(&row).is_ok());
        assert!(field(2, DataType::Int64).gt(lit(1i64)).validate(&row).is_err());
        assert!(field(1, DataType::String).gt(lit(1i64)).validate(&row).is_err());
    }
}
