//! Pipeline model, pushdown planning, store seam, and execution.

pub mod capability;
pub mod comparator;
pub mod executor;
pub mod pipeline;
pub mod plan;
pub mod predicate;
pub mod store;

// re-exports
pub use capability::{Capabilities, StoreCapabilities};
pub use executor::{ExecutionPhase, PipelineExecutor, TerminalHandler, TerminalOverrides};
pub use pipeline::{Pipeline, Query, Stage, Terminal, TerminalKind, TerminalOutput, Transform};
pub use store::{MemoryStore, RowSource, StoreError, StoreExecutor};
