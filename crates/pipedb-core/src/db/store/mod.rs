//! Store seam: the executor hands a `StoreFragment` to a `StoreExecutor`
//! and gets rows, a count, or an existence answer back.

mod memory;


use crate::db::plan::StoreFragment;
use thiserror::Error as ThisError;

// re-exports
pub use memory::{MemoryStore, StoreStats};

///
/// StoreError
///
/// `Rejected` means the store refused the fragment before producing
/// anything and the caller may retry unrestricted. `Fault` is terminal.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum StoreError {
    #[error("store rejected fragment: {reason}")]
    Rejected { reason: String },

    #[error("store fault: {message}")]
    Fault { message: String },
}

impl StoreError {
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

/// Lazily pulled store rows. Dropping the iterator stops the pull.
pub type RowSource<'a, E> = Box<dyn Iterator<Item = Result<E, StoreError>> + 'a>;

///
/// StoreExecutor
///
/// Runs one fragment against a concrete store. `fetch` serves the `Rows`
/// shape, `count` the `Count` shape and `exists` both existence shapes
/// (`NotExists` answers `true` when no row matches).
///

pub trait StoreExecutor<E> {
    fn fetch<'a>(&'a self, fragment: &StoreFragment<E>) -> Result<RowSource<'a, E>, StoreError>;

    fn count(&self, fragment: &StoreFragment<E>) -> Result<u64, StoreError>;

    fn exists(&self, fragment: &StoreFragment<E>) -> Result<bool, StoreError>;
}
