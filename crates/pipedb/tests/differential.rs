//! Random pipelines run three ways: pushed down to a store enforcing the
//! same capabilities, entirely in process, and through the rejection
//! fallback. All three must agree.

mod common;

use common::{
    Order, OrderFields, full_capabilities, no_capabilities, order, order_fields, order_model,
};
use pipedb::{
    core::db::{
        comparator::SortKey,
        pipeline::Terminal,
        plan::{OptimizerOptions, optimize},
    },
    prelude::*,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const CUSTOMERS: [&str; 4] = ["ann", "bea", "cal", "dov"];
const NEEDLES: [&str; 6] = ["a", "an", "e", "l", "ov", "x"];

///
/// Descriptors
///
/// Plain data the strategies generate; turned into stages once the model's
/// fields are at hand.
///

#[derive(Clone, Debug)]
enum PredSpec {
    Id(u8, u64),
    IdBetween(u64, u64, bool),
    IdIn(Vec<u64>, bool),
    Customer(u8, usize, bool),
    Total(u8, i64),
    TotalNull(bool),
    Rating(u8, u8),
    Express(bool, bool),
    Custom(u64),
}

#[derive(Clone, Debug)]
struct KeySpec {
    field: u8,
    reversed: bool,
    nulls_first: bool,
}

#[derive(Clone, Debug)]
enum StageSpec {
    Filter(PredSpec),
    Map(u8),
    Sorted(Vec<KeySpec>, bool),
    Distinct,
    Skip(u64),
    Limit(u64),
}

#[derive(Clone, Debug)]
enum TermSpec {
    Count,
    AnyMatch(PredSpec),
    AllMatch(PredSpec),
    NoneMatch(PredSpec),
    FindFirst,
    FindAny,
    Min(KeySpec),
    Max(KeySpec),
    Collect,
}

#[derive(Clone, Debug)]
struct CapSpec {
    predicates: Vec<bool>,
    orderable: Vec<bool>,
    nulls_first: bool,
    nulls_last: bool,
    offset: bool,
    limit: bool,
    count: bool,
    exists: bool,
}

///
/// Strategies
///

fn rows() -> impl Strategy<Value = Vec<Order>> {
    prop::collection::vec(
        (0..CUSTOMERS.len(), prop::option::of(-3i64..6), 0u8..6, any::<bool>()),
        0..10,
    )
    .prop_map(|cells| {
        (1u64..)
            .zip(cells)
            .map(|(id, (customer, total, rating, express))| {
                order(id, CUSTOMERS[customer], total, f64::from(rating) / 2.0, express)
            })
            .collect()
    })
}

fn pred_spec() -> impl Strategy<Value = PredSpec> {
    prop_oneof![
        (0u8..6, 0u64..8).prop_map(|(op, v)| PredSpec::Id(op, v)),
        (0u64..8, 0u64..8, any::<bool>())
            .prop_map(|(lo, hi, neg)| PredSpec::IdBetween(lo, hi, neg)),
        (prop::collection::vec(0u64..8, 0..4), any::<bool>())
            .prop_map(|(ids, neg)| PredSpec::IdIn(ids, neg)),
        (0u8..3, 0..NEEDLES.len(), any::<bool>())
            .prop_map(|(op, needle, neg)| PredSpec::Customer(op, needle, neg)),
        (0u8..6, -3i64..6).prop_map(|(op, v)| PredSpec::Total(op, v)),
        any::<bool>().prop_map(PredSpec::TotalNull),
        (0u8..6, 0u8..6).prop_map(|(op, v)| PredSpec::Rating(op, v)),
        (any::<bool>(), any::<bool>()).prop_map(|(value, neg)| PredSpec::Express(value, neg)),
        (2u64..4).prop_map(PredSpec::Custom),
    ]
}

fn key_spec() -> impl Strategy<Value = KeySpec> {
    (0u8..5, any::<bool>(), any::<bool>()).prop_map(|(field, reversed, nulls_first)| KeySpec {
        field,
        reversed,
        nulls_first,
    })
}

fn stage_spec() -> impl Strategy<Value = StageSpec> {
    prop_oneof![
        4 => pred_spec().prop_map(StageSpec::Filter),
        1 => (0u8..3).prop_map(StageSpec::Map),
        2 => (prop::collection::vec(key_spec(), 0..3), any::<bool>())
            .prop_map(|(keys, custom)| StageSpec::Sorted(keys, custom)),
        1 => Just(StageSpec::Distinct),
        1 => (0u64..4).prop_map(StageSpec::Skip),
        2 => (0u64..6).prop_map(StageSpec::Limit),
    ]
}

fn term_spec() -> impl Strategy<Value = TermSpec> {
    prop_oneof![
        Just(TermSpec::Count),
        pred_spec().prop_map(TermSpec::AnyMatch),
        pred_spec().prop_map(TermSpec::AllMatch),
        pred_spec().prop_map(TermSpec::NoneMatch),
        Just(TermSpec::FindFirst),
        Just(TermSpec::FindAny),
        key_spec().prop_map(TermSpec::Min),
        key_spec().prop_map(TermSpec::Max),
        Just(TermSpec::Collect),
    ]
}

fn cap_spec() -> impl Strategy<Value = CapSpec> {
    (
        prop::collection::vec(any::<bool>(), PredicateKind::ALL.len()),
        prop::collection::vec(any::<bool>(), 5),
        any::<(bool, bool)>(),
        any::<(bool, bool, bool, bool)>(),
    )
        .prop_map(
            |(predicates, orderable, (nulls_first, nulls_last), (offset, limit, count, exists))| {
                CapSpec {
                    predicates,
                    orderable,
                    nulls_first,
                    nulls_last,
                    offset,
                    limit,
                    count,
                    exists,
                }
            },
        )
}

///
/// Builders
///

fn field_by_index(fields: &OrderFields, index: u8) -> Field<Order> {
    match index % 5 {
        0 => fields.id,
        1 => fields.customer,
        2 => fields.total,
        3 => fields.rating,
        _ => fields.express,
    }
}

fn compare(field: Field<Order>, op: u8, value: Value) -> FieldPredicate<Order> {
    match op % 6 {
        0 => field.equal(value),
        1 => field.not_equal(value),
        2 => field.greater_than(value),
        3 => field.greater_or_equal(value),
        4 => field.less_than(value),
        _ => field.less_or_equal(value),
    }
}

fn negated_if(predicate: FieldPredicate<Order>, negated: bool) -> FieldPredicate<Order> {
    if negated { predicate.negate() } else { predicate }
}

fn predicate(fields: &OrderFields, spec: &PredSpec) -> StagePredicate<Order> {
    let field = match spec {
        PredSpec::Id(op, v) => compare(fields.id, *op, Value::from(*v)),
        PredSpec::IdBetween(lo, hi, neg) => negated_if(fields.id.between(*lo, *hi), *neg),
        PredSpec::IdIn(ids, neg) => negated_if(fields.id.in_(ids.iter().copied()), *neg),
        PredSpec::Customer(op, needle, neg) => {
            let needle = NEEDLES[*needle];
            let predicate = match op % 3 {
                0 => fields.customer.starts_with(needle),
                1 => fields.customer.ends_with(needle),
                _ => fields.customer.contains(needle),
            };
            negated_if(predicate, *neg)
        }
        PredSpec::Total(op, v) => compare(fields.total, *op, Value::from(*v)),
        PredSpec::TotalNull(null) => {
            if *null {
                fields.total.is_null()
            } else {
                fields.total.is_not_null()
            }
        }
        PredSpec::Rating(op, v) => compare(fields.rating, *op, Value::from(f64::from(*v) / 2.0)),
        PredSpec::Express(value, neg) => negated_if(fields.express.equal(*value), *neg),
        PredSpec::Custom(modulus) => {
            let modulus = *modulus;
            return StagePredicate::custom("id_modulus", move |o: &Order| o.id % modulus == 0);
        }
    };

    field.into()
}

fn comparator(fields: &OrderFields, spec: &KeySpec) -> FieldComparator<Order> {
    let field = field_by_index(fields, spec.field);
    let comparator = if field.is_nullable() && spec.nulls_first {
        field.comparator_nulls_first()
    } else {
        field.comparator()
    };

    if spec.reversed {
        comparator.reversed()
    } else {
        comparator
    }
}

fn sort_spec(fields: &OrderFields, keys: &[KeySpec], custom: bool) -> SortSpec<Order> {
    let by_name_length = || {
        SortKey::custom("name_length", |a: &Order, b: &Order| {
            a.customer.len().cmp(&b.customer.len())
        })
    };

    let mut keys = keys.iter().map(|key| comparator(fields, key));
    let mut spec = match keys.next() {
        Some(first) => SortSpec::from(first),
        None => SortSpec::from(by_name_length()),
    };
    for key in keys {
        spec = spec.then_comparing(key);
    }
    if custom {
        spec = spec.then_comparing(by_name_length());
    }

    spec
}

fn query(fields: &OrderFields, stages: &[StageSpec], terminal: &TermSpec) -> Query<Order> {
    let mut pipeline = Pipeline::new();
    for stage in stages {
        pipeline = match stage {
            StageSpec::Filter(spec) => pipeline.filter(predicate(fields, spec)),
            StageSpec::Map(0) => pipeline.map("bump_rating", |mut o: Order| {
                o.rating += 0.5;
                o
            }),
            StageSpec::Map(1) => pipeline.map("drop_total", |mut o: Order| {
                o.total = None;
                o
            }),
            StageSpec::Map(_) => pipeline.map("shout", |mut o: Order| {
                o.customer = o.customer.to_uppercase();
                o
            }),
            StageSpec::Sorted(keys, custom) => pipeline.sorted(sort_spec(fields, keys, *custom)),
            StageSpec::Distinct => pipeline.distinct(),
            StageSpec::Skip(n) => pipeline.skip(*n),
            StageSpec::Limit(n) => pipeline.limit(*n),
        };
    }

    match terminal {
        TermSpec::Count => pipeline.count(),
        TermSpec::AnyMatch(spec) => pipeline.any_match(predicate(fields, spec)),
        TermSpec::AllMatch(spec) => pipeline.all_match(predicate(fields, spec)),
        TermSpec::NoneMatch(spec) => pipeline.none_match(predicate(fields, spec)),
        TermSpec::FindFirst => pipeline.find_first(),
        TermSpec::FindAny => pipeline.find_any(),
        TermSpec::Min(key) => pipeline.min(comparator(fields, key)),
        TermSpec::Max(key) => pipeline.max(comparator(fields, key)),
        TermSpec::Collect => pipeline.collect(),
    }
}

fn capabilities(model: &EntityModel<Order>, spec: &CapSpec) -> Capabilities {
    let predicates = PredicateKind::ALL
        .into_iter()
        .zip(&spec.predicates)
        .filter_map(|(kind, on)| on.then_some(kind))
        .collect();
    let orderable_fields = model
        .fields()
        .iter()
        .zip(&spec.orderable)
        .filter_map(|(field, on)| on.then(|| field.name().to_string()))
        .collect();
    let mut null_orders = BTreeSet::new();
    if spec.nulls_first {
        null_orders.insert(NullOrder::First);
    }
    if spec.nulls_last {
        null_orders.insert(NullOrder::Last);
    }

    StoreCapabilities {
        predicates,
        filterable_fields: None,
        orderable_fields,
        null_orders,
        offset: spec.offset,
        limit: spec.limit,
        count: spec.count,
        exists: spec.exists,
        deterministic_default_order: true,
    }
    .resolve(model)
    .expect("generated capabilities should resolve")
}

/// `findAny` may return any qualifying row, so only presence is compared.
fn normalize(query: &Query<Order>, output: TerminalOutput<Order>) -> TerminalOutput<Order> {
    match (query.terminal_op(), output) {
        (Terminal::FindAny, TerminalOutput::Entity(found)) => {
            TerminalOutput::Match(found.is_some())
        }
        (_, output) => output,
    }
}

//
// Properties
//

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pushdown_matches_in_process_evaluation(
        rows in rows(),
        stages in prop::collection::vec(stage_spec(), 0..6),
        terminal in term_spec(),
        caps in cap_spec(),
    ) {
        let model = order_model();
        let fields = order_fields(&model);
        let query = query(&fields, &stages, &terminal);
        let caps = capabilities(&model, &caps);

        let baseline_caps = no_capabilities(&model);
        let baseline_store = MemoryStore::new(rows.clone());
        let baseline = PipelineExecutor::new(&model, &baseline_caps, &baseline_store)
            .execute(&query)
            .map(|output| normalize(&query, output));

        let store = MemoryStore::new(rows).with_capabilities(caps.clone());
        let pushed = PipelineExecutor::new(&model, &caps, &store)
            .execute(&query)
            .map(|output| normalize(&query, output));

        prop_assert_eq!(pushed, baseline);
        prop_assert_eq!(store.stats().rejections, 0);
    }

    #[test]
    fn rejection_fallback_matches_in_process_evaluation(
        rows in rows(),
        stages in prop::collection::vec(stage_spec(), 0..6),
        terminal in term_spec(),
        narrowed in cap_spec(),
        rejecting in any::<bool>(),
    ) {
        let model = order_model();
        let fields = order_fields(&model);
        let query = query(&fields, &stages, &terminal);
        let full = full_capabilities(&model);

        let baseline_caps = no_capabilities(&model);
        let baseline_store = MemoryStore::new(rows.clone());
        let baseline = PipelineExecutor::new(&model, &baseline_caps, &baseline_store)
            .execute(&query)
            .map(|output| normalize(&query, output));

        let store = if rejecting {
            MemoryStore::new(rows).rejecting()
        } else {
            MemoryStore::new(rows).with_capabilities(capabilities(&model, &narrowed))
        };
        let fallen_back = PipelineExecutor::new(&model, &full, &store)
            .execute(&query)
            .map(|output| normalize(&query, output));

        prop_assert_eq!(fallen_back, baseline);
    }

    #[test]
    fn optimization_is_deterministic_and_bounded(
        stages in prop::collection::vec(stage_spec(), 0..6),
        terminal in term_spec(),
        caps in cap_spec(),
        shortcuts in any::<bool>(),
    ) {
        let model = order_model();
        let fields = order_fields(&model);
        let query = query(&fields, &stages, &terminal);
        let caps = capabilities(&model, &caps);
        let options = OptimizerOptions { shortcuts };

        let first = optimize(&query, &model, &caps, options)
            .expect("well-typed query should optimize");
        let second = optimize(&query, &model, &caps, options)
            .expect("well-typed query should optimize");

        prop_assert!(first.split() <= query.stages().len());
        prop_assert_eq!(first.residual(&query).len(), query.stages().len() - first.split());
        if !shortcuts {
            prop_assert_eq!(first.shortcut(), None);
        }
        prop_assert_eq!(first, second);

        let none = no_capabilities(&model);
        let in_process = optimize(&query, &model, &none, options)
            .expect("well-typed query should optimize");
        prop_assert_eq!(in_process.split(), 0);
        prop_assert_eq!(in_process.shortcut(), None);
    }
}
