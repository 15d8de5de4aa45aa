//! Predicate construction from conditions
//!
//! Each condition compiles to one column predicate chosen by operand type.
//! `Operator::None` compiles to no predicate at all (scan everything);
//! operand/operator combinations that cannot be served are plan-time
//! validation errors.

use parquetquery::{
    new_float_predicate, new_int_predicate, BoolPredicate, GenericPredicate, IntPredicate,
    PredicateBox, RegexInPredicate, StringInPredicate,
};
use traceql::{Error, Operator, Result, Static, StaticType};

/// The shared operand type of a condition, `Nil` when there are none.
pub(crate) fn operand_type(operands: &[Static]) -> StaticType {
    operands
        .first()
        .map(Static::static_type)
        .unwrap_or(StaticType::Nil)
}

/// Dispatches on operand type.
pub(crate) fn create_predicate(op: Operator, operands: &[Static]) -> Result<Option<PredicateBox>> {
    if op == Operator::None {
        return Ok(None);
    }

    match operand_type(operands) {
        StaticType::String => create_string_predicate(op, operands),
        StaticType::Int => Ok(create_int_predicate(op, operands)?
            .map(|p| Box::new(p) as PredicateBox)),
        StaticType::Float => create_float_predicate(op, operands),
        StaticType::Boolean => create_bool_predicate(op, operands),
        other => Err(Error::Validation(format!(
            "cannot create predicate for operand type {}",
            other
        ))),
    }
}

pub(crate) fn create_string_predicate(
    op: Operator,
    operands: &[Static],
) -> Result<Option<PredicateBox>> {
    if op == Operator::None {
        return Ok(None);
    }

    for operand in operands {
        if operand.static_type() != StaticType::String {
            return Err(Error::Validation(format!(
                "operand is not string: {}",
                operand
            )));
        }
    }

    let s = operands[0]
        .as_str()
        .expect("type checked above")
        .to_string();

    match op {
        Operator::Equal => Ok(Some(Box::new(StringInPredicate::new(&[s])))),

        Operator::NotEqual => {
            let want = s.clone();
            let range_want = s;
            Ok(Some(Box::new(GenericPredicate::new(
                move |v: &String| *v != want,
                move |min: &String, max: &String| *min != range_want || *max != range_want,
                |v| v.as_str().map(str::to_string),
            ))))
        }

        Operator::Regex => {
            let pred = RegexInPredicate::new(&[s.as_str()])
                .map_err(|e| Error::Validation(e.to_string()))?;
            Ok(Some(Box::new(pred)))
        }

        _ => Err(Error::Validation(format!(
            "operator not supported for strings: {}",
            op
        ))),
    }
}

/// Int predicates are returned concretely so duration filters can be
/// evaluated post-hoc against computed values.
pub(crate) fn create_int_predicate(op: Operator, operands: &[Static]) -> Result<Option<IntPredicate>> {
    if op == Operator::None {
        return Ok(None);
    }

    let i = match operands[0].static_type() {
        StaticType::Int => operands[0].as_int().expect("type checked"),
        StaticType::Duration => operands[0].as_duration_nanos().expect("type checked"),
        _ => {
            return Err(Error::Validation(format!(
                "operand is not int or duration: {}",
                operands[0]
            )))
        }
    };

    int_comparison_predicate(op, i).map(Some)
}

/// Status predicates compare the column's OTLP ordinal; enum-named operands
/// are mapped to their ordinal first.
pub(crate) fn create_status_predicate(
    op: Operator,
    operands: &[Static],
) -> Result<Option<IntPredicate>> {
    if op == Operator::None {
        return Ok(None);
    }

    let i = match operands[0].static_type() {
        StaticType::Int => operands[0].as_int().expect("type checked"),
        StaticType::Status => operands[0].as_status().expect("type checked").as_code(),
        _ => {
            return Err(Error::Validation(format!(
                "operand is not int or status: {}",
                operands[0]
            )))
        }
    };

    int_comparison_predicate(op, i).map(Some)
}

fn int_comparison_predicate(op: Operator, i: i64) -> Result<IntPredicate> {
    let pred = match op {
        Operator::Equal => new_int_predicate(move |v| *v == i, move |min, max| *min <= i && i <= *max),
        Operator::NotEqual => {
            new_int_predicate(move |v| *v != i, move |min, max| *min != i || *max != i)
        }
        Operator::Greater => new_int_predicate(move |v| *v > i, move |_min, max| *max > i),
        Operator::GreaterEqual => new_int_predicate(move |v| *v >= i, move |_min, max| *max >= i),
        Operator::Less => new_int_predicate(move |v| *v < i, move |min, _max| *min < i),
        Operator::LessEqual => new_int_predicate(move |v| *v <= i, move |min, _max| *min <= i),
        _ => {
            return Err(Error::Validation(format!(
                "operator not supported for integers: {}",
                op
            )))
        }
    };
    Ok(pred)
}

pub(crate) fn create_float_predicate(
    op: Operator,
    operands: &[Static],
) -> Result<Option<PredicateBox>> {
    if op == Operator::None {
        return Ok(None);
    }

    let f = match operands[0].as_float() {
        Some(f) => f,
        None => {
            return Err(Error::Validation(format!(
                "operand is not float: {}",
                operands[0]
            )))
        }
    };

    let pred = match op {
        Operator::Equal => new_float_predicate(move |v| *v == f, move |min, max| *min <= f && f <= *max),
        Operator::NotEqual => {
            new_float_predicate(move |v| *v != f, move |min, max| *min != f || *max != f)
        }
        Operator::Greater => new_float_predicate(move |v| *v > f, move |_min, max| *max > f),
        Operator::GreaterEqual => new_float_predicate(move |v| *v >= f, move |_min, max| *max >= f),
        Operator::Less => new_float_predicate(move |v| *v < f, move |min, _max| *min < f),
        Operator::LessEqual => new_float_predicate(move |v| *v <= f, move |min, _max| *min <= f),
        _ => {
            return Err(Error::Validation(format!(
                "operator not supported for floats: {}",
                op
            )))
        }
    };
    Ok(Some(Box::new(pred)))
}

pub(crate) fn create_bool_predicate(
    op: Operator,
    operands: &[Static],
) -> Result<Option<PredicateBox>> {
    if op == Operator::None {
        return Ok(None);
    }

    let b = match operands[0].as_bool() {
        Some(b) => b,
        None => {
            return Err(Error::Validation(format!(
                "operand is not bool: {}",
                operands[0]
            )))
        }
    };

    match op {
        Operator::Equal => Ok(Some(Box::new(BoolPredicate::new(b)))),
        Operator::NotEqual => Ok(Some(Box::new(BoolPredicate::new(!b)))),
        _ => Err(Error::Validation(format!(
            "operator not supported for booleans: {}",
            op
        ))),
    }
}
