use crate::{
    db::pipeline::TerminalKind,
    error::InternalError,
    obs::sink::Span,
};
use std::{cell::Cell, fmt};

///
/// ExecutionPhase
///
/// Single-pass lifecycle of one execution:
/// `Built -> Optimized -> StoreExecuting -> (ResidualApplying |
/// FallbackApplying) -> Done`.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ExecutionPhase {
    Built,
    Optimized,
    StoreExecuting,
    ResidualApplying,
    FallbackApplying,
    Done,
}

impl ExecutionPhase {
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Built, Self::Optimized)
                | (Self::Optimized, Self::StoreExecuting)
                | (
                    Self::StoreExecuting,
                    Self::ResidualApplying | Self::FallbackApplying
                )
                | (Self::ResidualApplying | Self::FallbackApplying, Self::Done)
        )
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Built => "built",
            Self::Optimized => "optimized",
            Self::StoreExecuting => "store_executing",
            Self::ResidualApplying => "residual_applying",
            Self::FallbackApplying => "fallback_applying",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// Execution
///
/// Per-call bookkeeping: current phase, rows pulled from the store, and
/// the metrics span closed on drop.
///

pub(crate) struct Execution {
    entity: &'static str,
    phase: Cell<ExecutionPhase>,
    rows: Cell<u64>,
    span: Span,
}

impl Execution {
    pub(crate) fn start(entity: &'static str, terminal: TerminalKind) -> Self {
        Self {
            entity,
            phase: Cell::new(ExecutionPhase::Built),
            rows: Cell::new(0),
            span: Span::new(entity, terminal),
        }
    }

    pub(crate) const fn entity(&self) -> &'static str {
        self.entity
    }

    pub(crate) fn phase(&self) -> ExecutionPhase {
        self.phase.get()
    }

    pub(crate) fn advance(&self, next: ExecutionPhase) -> Result<(), InternalError> {
        let current = self.phase.get();
        if !current.can_advance_to(next) {
            return Err(InternalError::executor_invariant(format!(
                "illegal execution phase transition {current} -> {next}"
            )));
        }

        self.phase.set(next);
        Ok(())
    }

    pub(crate) fn count_row(&self) {
        self.rows.set(self.rows.get().saturating_add(1));
    }

    pub(crate) fn rows(&self) -> u64 {
        self.rows.get()
    }
}

impl Drop for Execution {
    fn drop(&mut self) {
        self.span.add_rows(self.rows.get());
    }
}
