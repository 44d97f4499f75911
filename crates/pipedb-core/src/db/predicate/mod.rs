//! Typed field predicates and the stage-level predicate wrapper.

mod field;
mod kind;
mod stage;

#[cfg(test)]
mod tests;

pub use field::FieldPredicate;
pub use kind::{Arity, PredicateKind};
pub use stage::{PredicateFn, StagePredicate};
