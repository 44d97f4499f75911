//! ## Crate layout
//! - `core`: values, fields, predicates, comparators, the optimizer, the
//!   executor, the store seam, configuration, and observability.
//! - `session`: one entity bound to its configured capabilities.
//!
//! The `prelude` carries the vocabulary needed to describe entities, build
//! pipelines and run them.

pub use pipedb_core as core;

pub mod session;

pub use crate::core::error::{ConfigError, ErrorClass, ErrorOrigin, InternalError};
pub use session::Session;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install a stderr `tracing` subscriber. `RUST_LOG` wins over `default`.
pub fn init_tracing(default: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    } else {
        EnvFilter::new(default)
    };

    Registry::default()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init()
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Session,
        core::{
            config::PipeConfig,
            db::{
                MemoryStore, PipelineExecutor, StoreExecutor, TerminalOverrides,
                capability::{Capabilities, StoreCapabilities},
                comparator::{FieldComparator, NullOrder, SortSpec},
                pipeline::{Pipeline, Query, TerminalOutput},
                predicate::{FieldPredicate, PredicateKind, StagePredicate},
            },
            model::{ColumnSpec, EntityModel, Field, FieldKind},
            value::Value,
        },
    };
}
