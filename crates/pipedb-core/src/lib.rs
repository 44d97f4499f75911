//! Core runtime for pipedb: typed fields and values, predicate and
//! comparator models, the pushdown optimizer, and the pipeline executor.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Vocabulary for describing entities and building pipelines.
/// Executors, stores, and configuration stay one module level down.
///

pub mod prelude {
    pub use crate::{
        db::{
            comparator::{FieldComparator, NullOrder, SortSpec},
            pipeline::{Pipeline, Query, TerminalOutput},
            predicate::{FieldPredicate, PredicateKind, StagePredicate},
        },
        model::{ColumnSpec, EntityModel, Field, FieldKind},
        value::Value,
    };
}
