#![allow(dead_code)]

use pipedb::prelude::*;

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub id: u64,
    pub customer: String,
    pub total: Option<i64>,
    pub rating: f64,
    pub express: bool,
}

pub fn order(id: u64, customer: &str, total: Option<i64>, rating: f64, express: bool) -> Order {
    Order {
        id,
        customer: customer.to_string(),
        total,
        rating,
        express,
    }
}

pub const ORDER_COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec::new("id", FieldKind::Uint),
    ColumnSpec::new("customer", FieldKind::Text),
    ColumnSpec::nullable("total", FieldKind::Int),
    ColumnSpec::new("rating", FieldKind::Float),
    ColumnSpec::new("express", FieldKind::Bool),
];

pub fn order_model() -> EntityModel<Order> {
    EntityModel::build(
        "order",
        &ORDER_COLUMNS,
        &[
            ("id", |o: &Order| Value::from(o.id)),
            ("customer", |o: &Order| Value::from(&o.customer)),
            ("total", |o: &Order| Value::from(o.total)),
            ("rating", |o: &Order| Value::from(o.rating)),
            ("express", |o: &Order| Value::from(o.express)),
        ],
        "id",
    )
    .expect("order model should build")
}

pub struct OrderFields {
    pub id: Field<Order>,
    pub customer: Field<Order>,
    pub total: Field<Order>,
    pub rating: Field<Order>,
    pub express: Field<Order>,
}

pub fn order_fields(model: &EntityModel<Order>) -> OrderFields {
    let get = |name| model.field(name).expect("order field should exist");

    OrderFields {
        id: get("id"),
        customer: get("customer"),
        total: get("total"),
        rating: get("rating"),
        express: get("express"),
    }
}

pub fn sample_orders() -> Vec<Order> {
    vec![
        order(1, "ann", Some(120), 4.5, true),
        order(2, "bea", None, 3.0, false),
        order(3, "cal", Some(40), 4.5, false),
        order(4, "ann", Some(75), 2.0, true),
        order(5, "dov", Some(300), 5.0, false),
    ]
}

pub fn full_capabilities(model: &EntityModel<Order>) -> Capabilities {
    StoreCapabilities::everything(model)
        .resolve(model)
        .expect("full capabilities should resolve")
}

pub fn no_capabilities(model: &EntityModel<Order>) -> Capabilities {
    StoreCapabilities::default()
        .resolve(model)
        .expect("empty capabilities should resolve")
}
