use crate::{
    db::{
        pipeline::{Query, TerminalKind, TerminalOutput},
        plan::OptimizerInfo,
    },
    error::InternalError,
};
use std::{collections::HashMap, fmt, sync::Arc};

/// Replacement for one terminal's built-in handler. It receives the plan
/// the optimizer produced, the query, and the store, and owns everything
/// from issuing the fragment to reducing the result.
pub type TerminalHandler<E, S> = Arc<
    dyn Fn(&OptimizerInfo<E>, &Query<E>, &S) -> Result<TerminalOutput<E>, InternalError>
        + Send
        + Sync,
>;

///
/// TerminalOverrides
///
/// At most one custom handler per terminal kind. Kinds without an entry
/// run the executor's built-in handler.
///

pub struct TerminalOverrides<E, S> {
    handlers: HashMap<TerminalKind, TerminalHandler<E, S>>,
}

impl<E, S> TerminalOverrides<E, S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Install `handler` for `kind`, replacing any earlier one.
    #[must_use]
    pub fn with<F>(mut self, kind: TerminalKind, handler: F) -> Self
    where
        F: Fn(&OptimizerInfo<E>, &Query<E>, &S) -> Result<TerminalOutput<E>, InternalError>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    /// Drop the override for `kind`, restoring the built-in handler.
    #[must_use]
    pub fn without(mut self, kind: TerminalKind) -> Self {
        self.handlers.remove(&kind);
        self
    }

    #[must_use]
    pub fn get(&self, kind: TerminalKind) -> Option<&TerminalHandler<E, S>> {
        self.handlers.get(&kind)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl<E, S> Default for TerminalOverrides<E, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, S> Clone for TerminalOverrides<E, S> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<E, S> fmt::Debug for TerminalOverrides<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().map(|kind| kind.label()).collect();
        kinds.sort_unstable();

        f.debug_struct("TerminalOverrides")
            .field("kinds", &kinds)
            .finish()
    }
}
