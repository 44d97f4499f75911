//! Shared entity fixture for unit tests.

use crate::{
    db::capability::{Capabilities, StoreCapabilities},
    model::{ColumnSpec, EntityModel, Field, FieldKind},
    value::Value,
};

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Person {
    pub id: u64,
    pub age: Option<i64>,
    pub name: String,
    pub score: f64,
}

pub(crate) fn person(id: u64, age: Option<i64>, name: &str) -> Person {
    Person {
        id,
        age,
        name: name.to_string(),
        score: 0.0,
    }
}

pub(crate) const PERSON_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::new("id", FieldKind::Uint),
    ColumnSpec::nullable("age", FieldKind::Int),
    ColumnSpec::new("name", FieldKind::Text),
    ColumnSpec::new("score", FieldKind::Float),
];

pub(crate) fn person_model() -> EntityModel<Person> {
    EntityModel::build(
        "person",
        &PERSON_COLUMNS,
        &[
            ("id", |p: &Person| Value::from(p.id)),
            ("age", |p: &Person| Value::from(p.age)),
            ("name", |p: &Person| Value::from(&p.name)),
            ("score", |p: &Person| Value::from(p.score)),
        ],
        "id",
    )
    .expect("person model should build")
}

///
/// PersonFields
///

pub(crate) struct PersonFields {
    pub id: Field<Person>,
    pub age: Field<Person>,
    pub name: Field<Person>,
    pub score: Field<Person>,
}

pub(crate) fn person_fields(model: &EntityModel<Person>) -> PersonFields {
    let get = |name| model.field(name).expect("person field should exist");

    PersonFields {
        id: get("id"),
        age: get("age"),
        name: get("name"),
        score: get("score"),
    }
}

/// Capabilities that let every stage and shortcut reach the store.
pub(crate) fn full_capabilities(model: &EntityModel<Person>) -> Capabilities {
    StoreCapabilities::everything(model)
        .resolve(model)
        .expect("full capabilities should resolve")
}

/// Capabilities that push nothing at all.
pub(crate) fn no_capabilities(model: &EntityModel<Person>) -> Capabilities {
    StoreCapabilities::default()
        .resolve(model)
        .expect("empty capabilities should resolve")
}

pub(crate) fn sample_people() -> Vec<Person> {
    vec![
        person(1, Some(30), "ada"),
        person(2, None, "bob"),
        person(3, Some(25), "cy"),
    ]
}
