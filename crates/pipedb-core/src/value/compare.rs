use crate::value::Value;
use std::cmp::Ordering;

// Every integer we compare against a float lies in [-2^63, 2^64).
const INT_DOMAIN_LOW: f64 = -9_223_372_036_854_775_808.0;
const INT_DOMAIN_HIGH: f64 = 18_446_744_073_709_551_616.0;

/// Strict ordering between two values of the same family.
///
/// Returns `None` when either side is null or the families differ; callers
/// turn that into a type-mismatch error. Numbers never go through
/// subtraction: integers widen to i128, and integer/float pairs are compared
/// exactly on the truncated float.
#[must_use]
pub(crate) fn strict_order_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Float64(a), Value::Float64(b)) => Some(a.cmp(b)),

        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Uint(a), Value::Uint(b)) => Some(a.cmp(b)),
        (Value::Int(a), Value::Uint(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),
        (Value::Uint(a), Value::Int(b)) => Some(i128::from(*a).cmp(&i128::from(*b))),

        (Value::Int(a), Value::Float64(b)) => Some(cmp_int_float(i128::from(*a), b.get())),
        (Value::Uint(a), Value::Float64(b)) => Some(cmp_int_float(i128::from(*a), b.get())),
        (Value::Float64(a), Value::Int(b)) => {
            Some(cmp_int_float(i128::from(*b), a.get()).reverse())
        }
        (Value::Float64(a), Value::Uint(b)) => {
            Some(cmp_int_float(i128::from(*b), a.get()).reverse())
        }

        _ => None,
    }
}

// NaN sorts above every number, matching `total_cmp` for canonical NaN.
#[expect(clippy::cast_possible_truncation)]
fn cmp_int_float(int: i128, float: f64) -> Ordering {
    if float.is_nan() || float >= INT_DOMAIN_HIGH {
        return Ordering::Less;
    }
    if float < INT_DOMAIN_LOW {
        return Ordering::Greater;
    }

    let whole = float.trunc();
    match int.cmp(&(whole as i128)) {
        Ordering::Equal => {
            if float > whole {
                Ordering::Less
            } else if float < whole {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }
        other => other,
    }
}
