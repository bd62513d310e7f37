//! Row-at-a-time evaluation with SQL three-valued logic.

use std::cmp::Ordering;

use common_error::{FederaError, FederaResult};
use federa_core::{DataType, Value, like_match};

use super::{Expr, Operator};

impl Expr {
    /// Evaluate against `row`, binding dynamic parameters from `params`.
    ///
    /// Boolean connectives follow SQL semantics: `NULL AND FALSE` is `FALSE`,
    /// `NULL OR TRUE` is `TRUE`, and any other combination involving `NULL`
    /// is `NULL`.
    pub fn eval(&self, row: &[Value], params: &[Value]) -> FederaResult<Value> {
        match self {
            Self::Literal { value, .. } => Ok(value.clone()),
            Self::FieldRef { index, .. } => row.get(*index).cloned().ok_or_else(|| {
                FederaError::schema_error(format!(
                    "field ${index} out of bounds for row of arity {}",
                    row.len()
                ))
            }),
            Self::DynamicParam { index, .. } => params.get(*index).cloned().ok_or_else(|| {
                FederaError::invalid_parameter(format!("dynamic parameter ?{index} is not bound"))
            }),
            Self::Call {
                op,
                operands,
                data_type,
            } => {
                let values = operands
                    .iter()
                    .map(|e| e.eval(row, params))
                    .collect::<FederaResult<Vec<_>>>()?;
                apply(*op, &values, data_type)
            }
        }
    }
}

fn truth(value: &Value) -> FederaResult<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(*b)),
        other => Err(FederaError::type_error(format!(
            "expected a boolean, got {}",
            other.type_name()
        ))),
    }
}

fn from_truth(t: Option<bool>) -> Value {
    t.map_or(Value::Null, Value::Bool)
}

fn apply(op: Operator, values: &[Value], result_type: &DataType) -> FederaResult<Value> {
    match op {
        Operator::And => {
            let mut saw_null = false;
            for v in values {
                match truth(v)? {
                    Some(false) => return Ok(Value::Bool(false)),
                    None => saw_null = true,
                    Some(true) => {}
                }
            }
            Ok(if saw_null { Value::Null } else { Value::Bool(true) })
        }
        Operator::Or => {
            let mut saw_null = false;
            for v in values {
                match truth(v)? {
                    Some(true) => return Ok(Value::Bool(true)),
                    None => saw_null = true,
                    Some(false) => {}
                }
            }
            Ok(if saw_null { Value::Null } else { Value::Bool(false) })
        }
        Operator::Not => Ok(from_truth(truth(single(op, values)?)?.map(|b| !b))),
        Operator::IsNull => Ok(Value::Bool(single(op, values)?.is_null())),
        Operator::IsNotNull => Ok(Value::Bool(!single(op, values)?.is_null())),
        Operator::Eq
        | Operator::NotEq
        | Operator::Lt
        | Operator::LtEq
        | Operator::Gt
        | Operator::GtEq => {
            let (l, r) = pair(op, values)?;
            if l.is_null() || r.is_null() {
                return Ok(Value::Null);
            }
            let ord = l.compare(r).ok_or_else(|| {
                FederaError::type_error(format!(
                    "cannot compare {} with {}",
                    l.type_name(),
                    r.type_name()
                ))
            })?;
            let holds = match op {
                Operator::Eq => ord == Ordering::Equal,
                Operator::NotEq => ord != Ordering::Equal,
                Operator::Lt => ord == Ordering::Less,
                Operator::LtEq => ord != Ordering::Greater,
                Operator::Gt => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Ok(Value::Bool(holds))
        }
        Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Divide => {
            let (l, r) = pair(op, values)?;
            arithmetic(op, l, r)
        }
        Operator::Like => {
            let (l, r) = pair(op, values)?;
            match (l, r) {
                (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
                (Value::String(text), Value::String(pattern)) => {
                    Ok(Value::Bool(like_match(text, pattern)))
                }
                _ => Err(FederaError::type_error(format!(
                    "LIKE expects strings, got {} and {}",
                    l.type_name(),
                    r.type_name()
                ))),
            }
        }
        Operator::Cast => cast(single(op, values)?, result_type),
    }
}

fn single(op: Operator, values: &[Value]) -> FederaResult<&Value> {
    match values {
        [v] => Ok(v),
        _ => Err(FederaError::internal(format!(
            "{op} expects one operand, got {}",
            values.len()
        ))),
    }
}

fn pair(op: Operator, values: &[Value]) -> FederaResult<(&Value, &Value)> {
    match values {
        [l, r] => Ok((l, r)),
        _ => Err(FederaError::internal(format!(
            "{op} expects two operands, got {}",
            values.len()
        ))),
    }
}

fn arithmetic(op: Operator, l: &Value, r: &Value) -> FederaResult<Value> {
    match (l, r) {
        (Value::Null, _) | (_, Value::Null) => Ok(Value::Null),
        (Value::Int64(a), Value::Int64(b)) => {
            let result = match op {
                Operator::Plus => a.checked_add(*b),
                Operator::Minus => a.checked_sub(*b),
                Operator::Multiply => a.checked_mul(*b),
                _ if *b == 0 => return Err(FederaError::value_error("division by zero")),
                _ => a.checked_div(*b),
            };
            result
                .map(Value::Int64)
                .ok_or_else(|| FederaError::value_error(format!("BIGINT overflow in {a} {op} {b}")))
        }
        _ => {
            let (Some(a), Some(b)) = (l.as_float64(), r.as_float64()) else {
                return Err(FederaError::type_error(format!(
                    "cannot apply {op} to {} and {}",
                    l.type_name(),
                    r.type_name()
                )));
            };
            Ok(Value::Float64(match op {
                Operator::Plus => a + b,
                Operator::Minus => a - b,
                Operator::Multiply => a * b,
                _ => a / b,
            }))
        }
    }
}

fn cast(value: &Value, target: &DataType) -> FederaResult<Value> {
    match (value, target) {
        (Value::Null, _) => Ok(Value::Null),
        (_, DataType::Any) => Ok(value.clone()),
        (v, t) if v.data_type() == *t => Ok(v.clone()),
        (Value::Int64(i), DataType::Float64) => Ok(Value::Float64(*i as f64)),
        (Value::Float64(f), DataType::Int64) if f.is_finite() => Ok(Value::Int64(f.trunc() as i64)),
        (v, DataType::String) => Ok(Value::String(v.canonical_text())),
        (Value::String(s), t) => Value::parse(s, t),
        (v, t) => Err(FederaError::type_error(format!(
            "cannot cast {} to {t}",
            v.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{field, lit, param};

    fn eval(e: &Expr, row: &[Value]) -> Value {
        e.eval(row, &[]).unwrap()
    }

    #[test]
    fn test_three_valued_connectives() {
        let a = field(0, DataType::Bool);
        let b = field(1, DataType::Bool);
        let row = [Value::Null, Value::Bool(false)];
        assert_eq!(eval(&a.clone().and(b.clone()), &row), Value::Bool(false));
        assert_eq!(eval(&a.clone().or(b.clone()), &row), Value::Null);
        assert_eq!(eval(&a.clone().not(), &row), Value::Null);
        assert_eq!(eval(&a.is_null(), &row), Value::Bool(true));
    }

    #[test]
    fn test_comparisons_with_null() {
        let e = field(0, DataType::Int64).gt(lit(3i64));
        assert_eq!(eval(&e, &[Value::Int64(4)]), Value::Bool(true));
        assert_eq!(eval(&e, &[Value::Null]), Value::Null);
        assert!(e.eval(&[Value::from("x")], &[]).is_err());
    }

    #[test]
    fn test_arithmetic() {
        let e = field(0, DataType::Int64).multiply(lit(2i64)).plus(lit(0.5));
        assert_eq!(eval(&e, &[Value::Int64(3)]), Value::Float64(6.5));
        let div = field(0, DataType::Int64).divide(lit(0i64));
        assert!(div.eval(&[Value::Int64(1)], &[]).is_err());
        let overflow = lit(i64::MAX).plus(lit(1i64));
        assert!(overflow.eval(&[], &[]).is_err());
    }

    #[test]
    fn test_params_and_cast() {
        let e = field(0, DataType::Int64).eq(param(0, DataType::Int64));
        assert_eq!(
            e.eval(&[Value::Int64(7)], &[Value::Int64(7)]).unwrap(),
            Value::Bool(true)
        );
        assert!(e.eval(&[Value::Int64(7)], &[]).is_err());
        let c = lit("42").cast(DataType::Int64);
        assert_eq!(eval(&c, &[]), Value::Int64(42));
    }

    #[test]
    fn test_like() {
        let e = field(0, DataType::String).like(lit("a_c%"));
        assert_eq!(eval(&e, &[Value::from("abcd")]), Value::Bool(true));
        assert_eq!(eval(&e, &[Value::from("ac")]), Value::Bool(false));
    }
}
