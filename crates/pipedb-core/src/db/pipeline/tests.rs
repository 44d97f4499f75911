use crate::{
    db::pipeline::{Pipeline, Stage, TerminalKind, TerminalOutput},
    test_fixtures::{Person, person_fields, person_model},
};

#[test]
fn append_leaves_the_original_untouched() {
    let base = Pipeline::<Person>::new().distinct();
    let extended = base.append(Stage::Limit(3));

    assert_eq!(base.len(), 1);
    assert_eq!(extended.len(), 2);
    assert_eq!(extended.stages()[1], Stage::Limit(3));
    assert_eq!(&extended.stages()[..1], base.stages());
}

#[test]
fn builder_keeps_declaration_order() {
    let fields = person_fields(&person_model());
    let pipeline = Pipeline::new()
        .limit(5)
        .filter(fields.age.greater_than(3))
        .sorted(fields.age.comparator())
        .skip(1);

    let labels: Vec<_> = pipeline.stages().iter().map(Stage::label).collect();
    assert_eq!(labels, ["limit", "filter", "sorted", "skip"]);
    assert_eq!(
        pipeline.to_string(),
        "stream().limit(5).filter(person.age > 3).sorted((order by person.age ascending)).skip(1)"
    );
}

#[test]
fn terminals_report_their_kind() {
    let fields = person_fields(&person_model());
    let base = Pipeline::<Person>::new();

    let cases = [
        (base.clone().count(), TerminalKind::Count),
        (base.clone().any_match(fields.age.is_null()), TerminalKind::AnyMatch),
        (base.clone().all_match(fields.age.is_null()), TerminalKind::AllMatch),
        (base.clone().none_match(fields.age.is_null()), TerminalKind::NoneMatch),
        (base.clone().find_first(), TerminalKind::FindFirst),
        (base.clone().find_any(), TerminalKind::FindAny),
        (base.clone().min(fields.age.comparator()), TerminalKind::Min),
        (base.clone().max(fields.age.comparator()), TerminalKind::Max),
        (base.collect(), TerminalKind::Collect),
    ];

    for (query, kind) in cases {
        assert_eq!(query.terminal(), kind);
        assert_eq!(query.terminal_op().kind(), kind);
    }
    assert!(!TerminalKind::Count.is_order_sensitive());
    assert!(TerminalKind::FindFirst.is_order_sensitive());
}

#[test]
fn closures_compare_by_identity() {
    let mapped = Pipeline::<Person>::new().map("older", |mut p| {
        p.age = p.age.map(|a| a + 1);
        p
    });

    assert_eq!(mapped, mapped.clone());
    assert_ne!(
        mapped,
        Pipeline::<Person>::new().map("older", |mut p| {
            p.age = p.age.map(|a| a + 1);
            p
        })
    );
}

#[test]
fn terminal_output_accessors() {
    let count = TerminalOutput::<Person>::Count(3);
    assert_eq!(count.as_count(), Some(3));
    assert_eq!(count.as_match(), None);
    assert_eq!(TerminalOutput::<u8>::Entity(Some(4)).into_entity(), Some(4));
    assert_eq!(TerminalOutput::<u8>::Rows(vec![1]).into_rows(), Some(vec![1]));
}
