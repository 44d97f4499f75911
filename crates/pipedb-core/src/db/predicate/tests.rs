use crate::{
    db::predicate::{Arity, FieldPredicate, PredicateKind, StagePredicate},
    error::ErrorClass,
    model::Field,
    test_fixtures::{Person, person, person_fields, person_model},
    value::Value,
};
use proptest::prelude::*;

fn age_field() -> Field<Person> {
    person_fields(&person_model()).age
}

fn name_field() -> Field<Person> {
    person_fields(&person_model()).name
}

fn check(predicate: &FieldPredicate<Person>, row: &Person) -> bool {
    predicate.test(row).expect("predicate should evaluate")
}

#[test]
fn complement_table_is_an_involution() {
    for kind in PredicateKind::ALL {
        assert_ne!(kind.complement(), kind, "{kind} must not be its own complement");
        assert_eq!(kind.complement().complement(), kind);
        assert_eq!(kind.complement().arity(), kind.arity());
    }

    let tags: std::collections::BTreeSet<_> = PredicateKind::ALL.iter().map(|k| k.tag()).collect();
    assert_eq!(tags.len(), PredicateKind::ALL.len());
}

#[test]
fn between_is_inclusive_on_both_ends() {
    let between = age_field().between(20, 30);

    assert!(check(&between, &person(1, Some(20), "a")));
    assert!(check(&between, &person(1, Some(30), "a")));
    assert!(!check(&between, &person(1, Some(31), "a")));
    assert!(check(&between.negate(), &person(1, Some(31), "a")));
}

#[test]
fn null_fails_value_kinds_and_their_complements() {
    let row = person(2, None, "bob");
    let age = age_field();

    for predicate in [
        age.equal(3),
        age.greater_than(3),
        age.between(1, 9),
        age.in_([1, 2]),
    ] {
        assert!(!check(&predicate, &row), "{predicate}");
        assert!(!check(&predicate.negate(), &row), "{}", predicate.negate());
        assert!(!predicate.is_exact_complement());
    }

    assert!(check(&age.is_null(), &row));
    assert!(!check(&age.is_not_null(), &row));
    assert!(age.is_null().is_exact_complement());
}

#[test]
fn non_nullable_fields_have_exact_complements() {
    let name = name_field();

    assert!(name.starts_with("a").is_exact_complement());
    assert!(name.equal("x").negate().is_exact_complement());
}

#[test]
fn text_matchers_evaluate() {
    let row = person(1, Some(1), "alberta");
    let name = name_field();

    assert!(check(&name.starts_with("alb"), &row));
    assert!(check(&name.ends_with("rta"), &row));
    assert!(check(&name.contains("ber"), &row));
    assert!(!check(&name.contains("zz"), &row));
    assert!(check(&name.contains("zz").negate(), &row));
}

#[test]
fn in_list_uses_cross_numeric_equality() {
    let row = person(1, Some(7), "a");

    assert!(check(&age_field().in_([Value::Uint(7), Value::from(8.5)]), &row));
    assert!(!check(&age_field().in_(Vec::<i64>::new()), &row));
    assert!(check(&age_field().not_in(Vec::<i64>::new()), &row));
}

#[test]
fn check_operands_rejects_mismatched_types_and_arity() {
    let age = age_field();

    let err = age.equal("seven").check_operands().expect_err("text operand on int field");
    assert_eq!(err.class, ErrorClass::TypeMismatch);

    let err = FieldPredicate::new(age, PredicateKind::Between, vec![Value::Int(1)])
        .check_operands()
        .expect_err("between needs two operands");
    assert_eq!(err.class, ErrorClass::TypeMismatch);

    let err = FieldPredicate::new(age, PredicateKind::StartsWith, vec![Value::from("1")])
        .check_operands()
        .expect_err("text match on int field");
    assert_eq!(err.class, ErrorClass::TypeMismatch);

    assert!(age.greater_than(Value::Uint(3)).check_operands().is_ok());
    assert!(age.greater_than(2.5).check_operands().is_ok());
}

#[test]
fn mismatched_operand_fails_evaluation() {
    let err = age_field()
        .equal("seven")
        .test(&person(1, Some(7), "a"))
        .expect_err("comparing int with text should fail");

    assert_eq!(err.class, ErrorClass::TypeMismatch);
}

#[test]
fn display_is_readable() {
    assert_eq!(age_field().greater_or_equal(26).to_string(), "person.age >= 26");
    assert_eq!(
        age_field().between(1, 2).negate().to_string(),
        "person.age not between 1 and 2"
    );
    assert_eq!(name_field().in_(["a", "b"]).to_string(), "person.name in ('a', 'b')");
    assert_eq!(
        name_field().starts_with("x").to_string(),
        "person.name starts_with ('x')"
    );
}

#[test]
fn custom_predicates_compare_by_name_and_body() {
    let positive = StagePredicate::<Person>::custom("positive", |p| p.age.unwrap_or(0) > 0);
    let same_body = positive.clone();
    let other_body = StagePredicate::<Person>::custom("positive", |p| p.age.unwrap_or(0) > 0);

    assert_eq!(positive, same_body);
    assert_ne!(positive, other_body);
    assert!(positive.as_field().is_none());
    assert!(positive.test(&person(1, Some(3), "a")).expect("custom never fails"));
}

///
/// Properties
///

fn arb_value_kind() -> impl Strategy<Value = PredicateKind> {
    prop::sample::select(
        PredicateKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_text_match())
            .collect::<Vec<_>>(),
    )
}

fn arb_text_kind() -> impl Strategy<Value = PredicateKind> {
    prop::sample::select(
        PredicateKind::ALL
            .into_iter()
            .filter(|kind| kind.is_text_match())
            .collect::<Vec<_>>(),
    )
}

fn operands_for(kind: PredicateKind, pool: Vec<Value>) -> Vec<Value> {
    match kind.arity() {
        Arity::Nullary => Vec::new(),
        Arity::Unary => pool.into_iter().take(1).collect(),
        Arity::Binary => pool.into_iter().take(2).collect(),
        Arity::Variadic => pool,
    }
}

fn arb_age_predicate() -> impl Strategy<Value = FieldPredicate<Person>> {
    (
        arb_value_kind(),
        prop::collection::vec((-5_i64..5).prop_map(Value::Int), 2..4),
    )
        .prop_map(|(kind, pool)| FieldPredicate::new(age_field(), kind, operands_for(kind, pool)))
}

fn arb_name_predicate() -> impl Strategy<Value = FieldPredicate<Person>> {
    (arb_text_kind(), "[ab]{0,2}").prop_map(|(kind, needle)| {
        FieldPredicate::new(name_field(), kind, vec![Value::Text(needle)])
    })
}

proptest! {
    #[test]
    fn negate_is_structurally_involutive(
        predicate in prop_oneof![arb_age_predicate(), arb_name_predicate()],
    ) {
        prop_assert_eq!(predicate.negate().negate(), predicate);
    }

    #[test]
    fn negate_complements_non_null_values(predicate in arb_age_predicate(), age in -6_i64..6) {
        let row = person(1, Some(age), "a");
        prop_assert_eq!(check(&predicate.negate(), &row), !check(&predicate, &row));
    }

    #[test]
    fn negate_complements_text_matches(predicate in arb_name_predicate(), name in "[ab]{0,4}") {
        let row = person(1, Some(1), &name);
        prop_assert_eq!(check(&predicate.negate(), &row), !check(&predicate, &row));
    }

    #[test]
    fn exact_complements_hold_on_null(predicate in arb_age_predicate()) {
        let row = person(1, None, "a");
        let direct = check(&predicate, &row);
        let negated = check(&predicate.negate(), &row);

        if predicate.is_exact_complement() {
            prop_assert_eq!(negated, !direct);
        } else {
            prop_assert!(!direct && !negated);
        }
    }
}
