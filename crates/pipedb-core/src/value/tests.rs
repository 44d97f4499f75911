use crate::value::{Float64, Value, ValueFamily, strict_order_cmp};
use proptest::prelude::*;
use std::cmp::Ordering;

#[test]
fn cross_numeric_ordering_does_not_overflow() {
    let cases = [
        (Value::Int(i64::MIN), Value::Uint(u64::MAX), Ordering::Less),
        (Value::Uint(u64::MAX), Value::Int(i64::MAX), Ordering::Greater),
        (Value::Int(-1), Value::Uint(0), Ordering::Less),
        (Value::Int(7), Value::Uint(7), Ordering::Equal),
    ];

    for (left, right, expected) in cases {
        assert_eq!(
            strict_order_cmp(&left, &right),
            Some(expected),
            "{left} vs {right}"
        );
    }
}

#[test]
fn integer_float_comparison_is_exact() {
    // 2^53 + 1 is not representable as f64; a lossy cast would call these equal.
    let big = Value::Int(9_007_199_254_740_993);
    let float = Value::from(9_007_199_254_740_992.0);
    assert_eq!(strict_order_cmp(&big, &float), Some(Ordering::Greater));

    assert_eq!(
        strict_order_cmp(&Value::Int(2), &Value::from(2.5)),
        Some(Ordering::Less)
    );
    assert_eq!(
        strict_order_cmp(&Value::Int(-2), &Value::from(-2.5)),
        Some(Ordering::Greater)
    );
    assert_eq!(
        strict_order_cmp(&Value::from(3.0), &Value::Uint(3)),
        Some(Ordering::Equal)
    );
    assert_eq!(
        strict_order_cmp(&Value::Uint(u64::MAX), &Value::from(f64::INFINITY)),
        Some(Ordering::Less)
    );
    assert_eq!(
        strict_order_cmp(&Value::Int(i64::MIN), &Value::from(f64::NEG_INFINITY)),
        Some(Ordering::Greater)
    );
}

#[test]
fn incompatible_families_do_not_order() {
    assert_eq!(strict_order_cmp(&Value::from("a"), &Value::Int(1)), None);
    assert_eq!(strict_order_cmp(&Value::Bool(true), &Value::Int(1)), None);
    assert_eq!(strict_order_cmp(&Value::Null, &Value::Null), None);
}

#[test]
fn float_wrapper_canonicalizes_nan_and_zero() {
    assert_eq!(Float64::new(f64::NAN), Float64::new(-f64::NAN));
    assert_eq!(Float64::new(-0.0), Float64::new(0.0));
    assert!(Float64::new(f64::NAN) > Float64::new(f64::INFINITY));
    assert_eq!(*Float64::new(1.5), 1.5);
}

#[test]
fn option_conversion_maps_none_to_null() {
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some(4_i32)), Value::Int(4));
    assert_eq!(Value::from(Some("x")).family(), Some(ValueFamily::Text));
}

proptest! {
    #[test]
    fn int_float_ordering_matches_exact_reference(
        int in any::<i32>(),
        float in -1.0e10_f64..1.0e10,
    ) {
        // i32 and the float range both embed exactly in f64 arithmetic here.
        let expected = f64::from(int).total_cmp(&Float64::new(float).get());
        prop_assert_eq!(
            strict_order_cmp(&Value::Int(int.into()), &Value::from(float)),
            Some(expected)
        );
        prop_assert_eq!(
            strict_order_cmp(&Value::from(float), &Value::Int(int.into())),
            Some(expected.reverse())
        );
    }

    #[test]
    fn mixed_integer_ordering_is_antisymmetric(a in any::<i64>(), b in any::<u64>()) {
        let forward = strict_order_cmp(&Value::Int(a), &Value::Uint(b));
        let backward = strict_order_cmp(&Value::Uint(b), &Value::Int(a));
        prop_assert_eq!(forward.map(Ordering::reverse), backward);
    }
}
