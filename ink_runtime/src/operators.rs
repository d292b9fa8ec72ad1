//! Operator dispatch over runtime values.
//!
//! An operator pops its operands (right-hand side first), picks an
//! implementation from the operand types and pushes one result. Numeric
//! operands promote: if either side is a float the float implementation runs,
//! otherwise the integer one does. Booleans count as integers.

use ink_model::{Arity, ListCatalog, ListValue, Operator};
use rand::Rng;

use crate::error::StoryError;
use crate::stack::EvaluationStack;
use crate::value::Value;

/// Pop the operands of `operator`, apply it and push the result.
pub fn evaluate<R: Rng + ?Sized>(
    operator: Operator,
    stack: &mut EvaluationStack,
    lists: &ListCatalog,
    rng: &mut R,
) -> Result<(), StoryError> {
    let result = match operator.arity() {
        Arity::Unary => {
            let operand = stack.pop()?;
            unary(operator, operand, lists, rng)?
        }
        Arity::Binary => {
            let right = stack.pop()?;
            let left = stack.pop()?;
            binary(operator, left, right, lists, rng)?
        }
        Arity::Ternary => {
            let max = stack.pop()?;
            let min = stack.pop()?;
            let list = stack.pop_list()?;
            list_range(list, &min, &max)?
        }
    };
    stack.push(result);
    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(value) => Some(Number::Int(*value)),
            Value::Float(value) => Some(Number::Float(*value)),
            Value::Bool(value) => Some(Number::Int(i64::from(*value))),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Number::Int(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    fn as_i64(self) -> i64 {
        match self {
            Number::Int(value) => value,
            Number::Float(value) => value as i64,
        }
    }

    fn is_float(self) -> bool {
        matches!(self, Number::Float(_))
    }
}

fn unimplemented(operator: Operator, operands: &[&Value]) -> StoryError {
    let operands = operands
        .iter()
        .map(|value| value.type_name())
        .collect::<Vec<_>>()
        .join(" and ");
    StoryError::UnimplementedOperator { operator, operands }
}

fn unary<R: Rng + ?Sized>(
    operator: Operator,
    operand: Value,
    lists: &ListCatalog,
    rng: &mut R,
) -> Result<Value, StoryError> {
    if let Value::Bool(value) = operand {
        if operator == Operator::Not {
            return Ok(Value::Bool(!value));
        }
    }

    if let Some(number) = Number::of(&operand) {
        return match (operator, number) {
            (Operator::Negate, Number::Int(value)) => Ok(Value::Int(value.wrapping_neg())),
            (Operator::Negate, Number::Float(value)) => Ok(Value::Float(-value)),
            (Operator::Not, Number::Int(value)) => Ok(Value::Int(i64::from(value == 0))),
            (Operator::Not, Number::Float(value)) => {
                Ok(Value::Float(if value == 0.0 { 1.0 } else { 0.0 }))
            }
            (Operator::Int, number) => Ok(Value::Int(number.as_i64())),
            (Operator::Float, number) => Ok(Value::Float(number.as_f64())),
            (Operator::Floor, Number::Int(value)) => Ok(Value::Int(value)),
            (Operator::Floor, Number::Float(value)) => Ok(Value::Int(value.floor() as i64)),
            (Operator::SeedRandom, _) => {
                tracing::warn!("SEED_RANDOM is not supported; ignoring");
                Ok(Value::Void)
            }
            _ => Err(unimplemented(operator, &[&operand])),
        };
    }

    let list = match operand {
        Value::List(list) => list,
        Value::ListItem(item) => ListValue::single(item),
        other => return Err(unimplemented(operator, &[&other])),
    };

    let result = match operator {
        Operator::Not => Value::Bool(list.is_empty()),
        Operator::ListMin => Value::List(list.min()),
        Operator::ListMax => Value::List(list.max()),
        Operator::ListCount => Value::Int(list.count() as i64),
        Operator::ListRandom => Value::List(list.random(rng)),
        Operator::ListAll => Value::List(list.all(lists)?),
        Operator::ListInvert => Value::List(list.invert(lists)?),
        Operator::ListValue => Value::Int(list.value()),
        _ => return Err(unimplemented(operator, &[&Value::List(list)])),
    };
    Ok(result)
}

fn binary<R: Rng + ?Sized>(
    operator: Operator,
    left: Value,
    right: Value,
    lists: &ListCatalog,
    rng: &mut R,
) -> Result<Value, StoryError> {
    if let (Some(lhs), Some(rhs)) = (Number::of(&left), Number::of(&right)) {
        if let Some(result) = numeric(operator, lhs, rhs, rng)? {
            return Ok(result);
        }
    }

    let result = match (operator, &left, &right) {
        (Operator::ListInt, Value::String(origin), Value::Int(rank)) => {
            let list = match lists.item_with_rank(origin, *rank)? {
                Some(item) => ListValue::single(item.clone()),
                None => ListValue::new(),
            };
            Some(Value::List(list))
        }
        (_, Value::String(lhs), Value::String(rhs)) => strings(operator, lhs, rhs),
        (_, Value::ListItem(lhs), Value::ListItem(rhs)) => match operator {
            Operator::Equal => Some(Value::Bool(lhs == rhs)),
            Operator::NotEqual => Some(Value::Bool(lhs != rhs)),
            Operator::GreaterThan => Some(Value::Bool(lhs.rank > rhs.rank)),
            Operator::LessThan => Some(Value::Bool(lhs.rank < rhs.rank)),
            Operator::GreaterThanOrEqual => Some(Value::Bool(lhs.rank >= rhs.rank)),
            Operator::LessThanOrEqual => Some(Value::Bool(lhs.rank <= rhs.rank)),
            _ => None,
        },
        (Operator::Add | Operator::Subtract, Value::List(list), _) if right.is_numeric() => {
            let steps = Number::of(&right).map(Number::as_i64).unwrap_or_default();
            let steps = if operator == Operator::Subtract {
                steps.saturating_neg()
            } else {
                steps
            };
            Some(Value::List(list.advance(lists, steps)?))
        }
        (_, Value::List(lhs), Value::List(rhs)) => match operator {
            Operator::Add => Some(Value::List(lhs.union(rhs))),
            Operator::Subtract => Some(Value::List(lhs.difference(rhs))),
            Operator::ListIntersect => Some(Value::List(lhs.intersection(rhs))),
            Operator::Contains => Some(Value::Bool(lhs.is_superset(rhs))),
            Operator::NotContains => Some(Value::Bool(!lhs.is_superset(rhs))),
            Operator::Equal => Some(Value::Bool(lhs == rhs)),
            Operator::NotEqual => Some(Value::Bool(lhs != rhs)),
            _ => None,
        },
        _ => None,
    };
    if let Some(result) = result {
        return Ok(result);
    }

    if matches!(operator, Operator::And | Operator::Or) {
        if let (Some(lhs), Some(rhs)) = (left.truthiness(), right.truthiness()) {
            let result = if operator == Operator::And {
                lhs && rhs
            } else {
                lhs || rhs
            };
            return Ok(Value::Bool(result));
        }
    }

    Err(unimplemented(operator, &[&left, &right]))
}

/// Numeric binary operators. `None` means the operator has no numeric form.
fn numeric<R: Rng + ?Sized>(
    operator: Operator,
    lhs: Number,
    rhs: Number,
    rng: &mut R,
) -> Result<Option<Value>, StoryError> {
    let float = lhs.is_float() || rhs.is_float();
    let promote = |result: f64| {
        if float {
            Value::Float(result)
        } else {
            Value::Int(result as i64)
        }
    };

    let result = match operator {
        Operator::Add if float => Value::Float(lhs.as_f64() + rhs.as_f64()),
        Operator::Add => Value::Int(lhs.as_i64().wrapping_add(rhs.as_i64())),
        Operator::Subtract if float => Value::Float(lhs.as_f64() - rhs.as_f64()),
        Operator::Subtract => Value::Int(lhs.as_i64().wrapping_sub(rhs.as_i64())),
        Operator::Multiply if float => Value::Float(lhs.as_f64() * rhs.as_f64()),
        Operator::Multiply => Value::Int(lhs.as_i64().wrapping_mul(rhs.as_i64())),
        Operator::Divide => {
            if !float && rhs.as_i64() == 0 {
                return Err(StoryError::DivideByZero);
            }
            promote(lhs.as_f64() / rhs.as_f64())
        }
        Operator::Modulus => {
            let divisor = rhs.as_i64();
            if divisor == 0 {
                return Err(StoryError::DivideByZero);
            }
            let remainder = lhs.as_i64().wrapping_rem(divisor);
            if float {
                Value::Float(remainder as f64)
            } else {
                Value::Int(remainder)
            }
        }
        Operator::Equal => Value::Bool(compare(lhs, rhs, float, |a, b| a == b, |a, b| a == b)),
        Operator::NotEqual => Value::Bool(compare(lhs, rhs, float, |a, b| a != b, |a, b| a != b)),
        Operator::GreaterThan => Value::Bool(compare(lhs, rhs, float, |a, b| a > b, |a, b| a > b)),
        Operator::LessThan => Value::Bool(compare(lhs, rhs, float, |a, b| a < b, |a, b| a < b)),
        Operator::GreaterThanOrEqual => {
            Value::Bool(compare(lhs, rhs, float, |a, b| a >= b, |a, b| a >= b))
        }
        Operator::LessThanOrEqual => {
            Value::Bool(compare(lhs, rhs, float, |a, b| a <= b, |a, b| a <= b))
        }
        Operator::Min if float => Value::Float(lhs.as_f64().min(rhs.as_f64())),
        Operator::Min => Value::Int(lhs.as_i64().min(rhs.as_i64())),
        Operator::Max if float => Value::Float(lhs.as_f64().max(rhs.as_f64())),
        Operator::Max => Value::Int(lhs.as_i64().max(rhs.as_i64())),
        Operator::And => Value::Bool(lhs.as_f64() != 0.0 && rhs.as_f64() != 0.0),
        Operator::Or => Value::Bool(lhs.as_f64() != 0.0 || rhs.as_f64() != 0.0),
        Operator::Random => {
            let (min, max) = (lhs.as_i64(), rhs.as_i64());
            if max < min {
                return Err(StoryError::InvalidRandomRange { min, max });
            }
            Value::Int(rng.gen_range(min..=max))
        }
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn compare(
    lhs: Number,
    rhs: Number,
    float: bool,
    floats: impl Fn(f64, f64) -> bool,
    ints: impl Fn(i64, i64) -> bool,
) -> bool {
    if float {
        floats(lhs.as_f64(), rhs.as_f64())
    } else {
        ints(lhs.as_i64(), rhs.as_i64())
    }
}

fn strings(operator: Operator, lhs: &str, rhs: &str) -> Option<Value> {
    let result = match operator {
        Operator::Add => Value::String(format!("{lhs}{rhs}")),
        Operator::Equal => Value::Bool(lhs == rhs),
        Operator::NotEqual => Value::Bool(lhs != rhs),
        Operator::Contains => Value::Bool(lhs.contains(rhs)),
        Operator::NotContains => Value::Bool(!lhs.contains(rhs)),
        _ => return None,
    };
    Some(result)
}

/// Bound of a list range: an integer, or a list holding one item.
fn range_bound(value: &Value) -> Result<i64, StoryError> {
    match value {
        Value::List(list) => Ok(list.as_int()?),
        Value::ListItem(item) => Ok(item.rank),
        other => Number::of(other)
            .map(Number::as_i64)
            .ok_or(StoryError::StackType {
                expected: "range bound",
                found: other.type_name(),
            }),
    }
}

fn list_range(list: ListValue, min: &Value, max: &Value) -> Result<Value, StoryError> {
    let min = range_bound(min)?;
    let max = range_bound(max)?.min(list.count() as i64);
    Ok(Value::List(list.range(min, max)))
}
