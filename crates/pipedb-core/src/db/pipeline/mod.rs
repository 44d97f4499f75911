//! Immutable pipeline of lazy stages plus the terminal that consumes it.

mod terminal;

#[cfg(test)]
mod tests;

use crate::db::{
    comparator::{SortKey, SortSpec},
    predicate::StagePredicate,
};
use std::{cmp::Ordering, fmt, sync::Arc};

pub use terminal::{Query, Terminal, TerminalKind, TerminalOutput};

/// Element transform body. Maps stay endomorphic so later stages keep
/// addressing typed fields.
pub type TransformFn<E> = Arc<dyn Fn(E) -> E + Send + Sync>;

///
/// Transform
///

pub struct Transform<E> {
    name: &'static str,
    apply: TransformFn<E>,
}

impl<E> Transform<E> {
    #[must_use]
    pub fn new(name: &'static str, apply: impl Fn(E) -> E + Send + Sync + 'static) -> Self {
        Self {
            name,
            apply: Arc::new(apply),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn apply(&self, entity: E) -> E {
        (self.apply)(entity)
    }
}

impl<E> Clone for Transform<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            apply: Arc::clone(&self.apply),
        }
    }
}

impl<E> PartialEq for Transform<E> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && std::ptr::addr_eq(Arc::as_ptr(&self.apply), Arc::as_ptr(&other.apply))
    }
}

impl<E> fmt::Debug for Transform<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

///
/// Stage
///
/// One lazy intermediate operation.
///

pub enum Stage<E> {
    Filter(StagePredicate<E>),
    Map(Transform<E>),
    Sorted(SortSpec<E>),
    Distinct,
    Skip(u64),
    Limit(u64),
}

impl<E> Stage<E> {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Map(_) => "map",
            Self::Sorted(_) => "sorted",
            Self::Distinct => "distinct",
            Self::Skip(_) => "skip",
            Self::Limit(_) => "limit",
        }
    }
}

impl<E> Clone for Stage<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Filter(predicate) => Self::Filter(predicate.clone()),
            Self::Map(transform) => Self::Map(transform.clone()),
            Self::Sorted(spec) => Self::Sorted(spec.clone()),
            Self::Distinct => Self::Distinct,
            Self::Skip(n) => Self::Skip(*n),
            Self::Limit(n) => Self::Limit(*n),
        }
    }
}

impl<E> PartialEq for Stage<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Filter(a), Self::Filter(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            (Self::Sorted(a), Self::Sorted(b)) => a == b,
            (Self::Distinct, Self::Distinct) => true,
            (Self::Skip(a), Self::Skip(b)) | (Self::Limit(a), Self::Limit(b)) => a == b,
            _ => false,
        }
    }
}

impl<E> fmt::Debug for Stage<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(predicate) => f.debug_tuple("Filter").field(predicate).finish(),
            Self::Map(transform) => f.debug_tuple("Map").field(transform).finish(),
            Self::Sorted(spec) => f.debug_tuple("Sorted").field(spec).finish(),
            Self::Distinct => f.write_str("Distinct"),
            Self::Skip(n) => f.debug_tuple("Skip").field(n).finish(),
            Self::Limit(n) => f.debug_tuple("Limit").field(n).finish(),
        }
    }
}

impl<E> fmt::Display for Stage<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(predicate) => write!(f, "filter({predicate})"),
            Self::Map(transform) => write!(f, "map({})", transform.name),
            Self::Sorted(spec) => write!(f, "sorted({spec})"),
            Self::Distinct => write!(f, "distinct()"),
            Self::Skip(n) => write!(f, "skip({n})"),
            Self::Limit(n) => write!(f, "limit({n})"),
        }
    }
}

///
/// Pipeline
///
/// Ordered, immutable stage list. `append` returns a new pipeline; the
/// builder helpers consume `self` and never reorder stages.
///

pub struct Pipeline<E> {
    stages: Vec<Stage<E>>,
}

impl<E> Pipeline<E> {
    #[must_use]
    pub const fn new() -> Self {
        Self { stages: Vec::new() }
    }

    #[must_use]
    pub fn append(&self, stage: Stage<E>) -> Self {
        let mut stages = self.stages.clone();
        stages.push(stage);

        Self { stages }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage<E>] {
        &self.stages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    fn push(mut self, stage: Stage<E>) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub fn filter(self, predicate: impl Into<StagePredicate<E>>) -> Self {
        self.push(Stage::Filter(predicate.into()))
    }

    #[must_use]
    pub fn filter_with(
        self,
        name: &'static str,
        test: impl Fn(&E) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.push(Stage::Filter(StagePredicate::custom(name, test)))
    }

    #[must_use]
    pub fn map(self, name: &'static str, apply: impl Fn(E) -> E + Send + Sync + 'static) -> Self {
        self.push(Stage::Map(Transform::new(name, apply)))
    }

    #[must_use]
    pub fn sorted(self, spec: impl Into<SortSpec<E>>) -> Self {
        self.push(Stage::Sorted(spec.into()))
    }

    #[must_use]
    pub fn sorted_with(
        self,
        name: &'static str,
        compare: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        self.push(Stage::Sorted(SortKey::custom(name, compare).into()))
    }

    #[must_use]
    pub fn distinct(self) -> Self {
        self.push(Stage::Distinct)
    }

    #[must_use]
    pub fn skip(self, n: u64) -> Self {
        self.push(Stage::Skip(n))
    }

    #[must_use]
    pub fn limit(self, n: u64) -> Self {
        self.push(Stage::Limit(n))
    }

    // terminals

    #[must_use]
    pub fn count(self) -> Query<E> {
        Query::new(self, Terminal::Count)
    }

    #[must_use]
    pub fn any_match(self, predicate: impl Into<StagePredicate<E>>) -> Query<E> {
        Query::new(self, Terminal::AnyMatch(predicate.into()))
    }

    #[must_use]
    pub fn all_match(self, predicate: impl Into<StagePredicate<E>>) -> Query<E> {
        Query::new(self, Terminal::AllMatch(predicate.into()))
    }

    #[must_use]
    pub fn none_match(self, predicate: impl Into<StagePredicate<E>>) -> Query<E> {
        Query::new(self, Terminal::NoneMatch(predicate.into()))
    }

    #[must_use]
    pub fn find_first(self) -> Query<E> {
        Query::new(self, Terminal::FindFirst)
    }

    #[must_use]
    pub fn find_any(self) -> Query<E> {
        Query::new(self, Terminal::FindAny)
    }

    #[must_use]
    pub fn min(self, spec: impl Into<SortSpec<E>>) -> Query<E> {
        Query::new(self, Terminal::Min(spec.into()))
    }

    #[must_use]
    pub fn max(self, spec: impl Into<SortSpec<E>>) -> Query<E> {
        Query::new(self, Terminal::Max(spec.into()))
    }

    #[must_use]
    pub fn collect(self) -> Query<E> {
        Query::new(self, Terminal::Collect)
    }
}

impl<E> Default for Pipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Pipeline<E> {
    fn clone(&self) -> Self {
        Self {
            stages: self.stages.clone(),
        }
    }
}

impl<E> PartialEq for Pipeline<E> {
    fn eq(&self, other: &Self) -> bool {
        self.stages == other.stages
    }
}

impl<E> fmt::Debug for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.stages).finish()
    }
}

impl<E> fmt::Display for Pipeline<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("stream()")?;
        for stage in &self.stages {
            write!(f, ".{stage}")?;
        }
        Ok(())
    }
}
