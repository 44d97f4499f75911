use crate::db::{
    comparator::SortSpec,
    pipeline::{Pipeline, Stage},
    predicate::StagePredicate,
};
use std::fmt;

///
/// TerminalKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TerminalKind {
    Count,
    AnyMatch,
    AllMatch,
    NoneMatch,
    FindFirst,
    FindAny,
    Min,
    Max,
    Collect,
}

impl TerminalKind {
    /// Whether the result depends on which rows a window selects.
    #[must_use]
    pub const fn is_order_sensitive(self) -> bool {
        !matches!(self, Self::Count)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::AnyMatch => "any_match",
            Self::AllMatch => "all_match",
            Self::NoneMatch => "none_match",
            Self::FindFirst => "find_first",
            Self::FindAny => "find_any",
            Self::Min => "min",
            Self::Max => "max",
            Self::Collect => "collect",
        }
    }
}

impl fmt::Display for TerminalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

///
/// Terminal
///
/// Result-producing operation; closed set dispatched by exhaustive match.
///

pub enum Terminal<E> {
    Count,
    AnyMatch(StagePredicate<E>),
    AllMatch(StagePredicate<E>),
    NoneMatch(StagePredicate<E>),
    FindFirst,
    FindAny,
    Min(SortSpec<E>),
    Max(SortSpec<E>),
    Collect,
}

impl<E> Terminal<E> {
    #[must_use]
    pub const fn kind(&self) -> TerminalKind {
        match self {
            Self::Count => TerminalKind::Count,
            Self::AnyMatch(_) => TerminalKind::AnyMatch,
            Self::AllMatch(_) => TerminalKind::AllMatch,
            Self::NoneMatch(_) => TerminalKind::NoneMatch,
            Self::FindFirst => TerminalKind::FindFirst,
            Self::FindAny => TerminalKind::FindAny,
            Self::Min(_) => TerminalKind::Min,
            Self::Max(_) => TerminalKind::Max,
            Self::Collect => TerminalKind::Collect,
        }
    }

    /// Predicate of a match terminal.
    #[must_use]
    pub const fn predicate(&self) -> Option<&StagePredicate<E>> {
        match self {
            Self::AnyMatch(p) | Self::AllMatch(p) | Self::NoneMatch(p) => Some(p),
            _ => None,
        }
    }
}

impl<E> Clone for Terminal<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Count => Self::Count,
            Self::AnyMatch(p) => Self::AnyMatch(p.clone()),
            Self::AllMatch(p) => Self::AllMatch(p.clone()),
            Self::NoneMatch(p) => Self::NoneMatch(p.clone()),
            Self::FindFirst => Self::FindFirst,
            Self::FindAny => Self::FindAny,
            Self::Min(spec) => Self::Min(spec.clone()),
            Self::Max(spec) => Self::Max(spec.clone()),
            Self::Collect => Self::Collect,
        }
    }
}

impl<E> PartialEq for Terminal<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::AnyMatch(a), Self::AnyMatch(b))
            | (Self::AllMatch(a), Self::AllMatch(b))
            | (Self::NoneMatch(a), Self::NoneMatch(b)) => a == b,
            (Self::Min(a), Self::Min(b)) | (Self::Max(a), Self::Max(b)) => a == b,
            (Self::Count, Self::Count)
            | (Self::FindFirst, Self::FindFirst)
            | (Self::FindAny, Self::FindAny)
            | (Self::Collect, Self::Collect) => true,
            _ => false,
        }
    }
}

impl<E> fmt::Debug for Terminal<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AnyMatch(p) | Self::AllMatch(p) | Self::NoneMatch(p) => {
                f.debug_tuple(self.kind().label()).field(p).finish()
            }
            Self::Min(spec) | Self::Max(spec) => {
                f.debug_tuple(self.kind().label()).field(spec).finish()
            }
            _ => f.write_str(self.kind().label()),
        }
    }
}

///
/// Query
///
/// A pipeline together with exactly one terminal.
///

pub struct Query<E> {
    pipeline: Pipeline<E>,
    terminal: Terminal<E>,
}

impl<E> Query<E> {
    #[must_use]
    pub const fn new(pipeline: Pipeline<E>, terminal: Terminal<E>) -> Self {
        Self { pipeline, terminal }
    }

    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline<E> {
        &self.pipeline
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage<E>] {
        self.pipeline.stages()
    }

    #[must_use]
    pub const fn terminal(&self) -> TerminalKind {
        self.terminal.kind()
    }

    #[must_use]
    pub const fn terminal_op(&self) -> &Terminal<E> {
        &self.terminal
    }
}

impl<E> Clone for Query<E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            terminal: self.terminal.clone(),
        }
    }
}

impl<E> PartialEq for Query<E> {
    fn eq(&self, other: &Self) -> bool {
        self.pipeline == other.pipeline && self.terminal == other.terminal
    }
}

impl<E> fmt::Debug for Query<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("pipeline", &self.pipeline)
            .field("terminal", &self.terminal)
            .finish()
    }
}

///
/// TerminalOutput
///

#[derive(Clone, Debug, PartialEq)]
pub enum TerminalOutput<E> {
    Count(u64),
    Match(bool),
    Entity(Option<E>),
    Rows(Vec<E>),
}

impl<E> TerminalOutput<E> {
    #[must_use]
    pub const fn as_count(&self) -> Option<u64> {
        match self {
            Self::Count(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_match(&self) -> Option<bool> {
        match self {
            Self::Match(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_entity(self) -> Option<E> {
        match self {
            Self::Entity(entity) => entity,
            _ => None,
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<Vec<E>> {
        match self {
            Self::Rows(rows) => Some(rows),
            _ => None,
        }
    }
}
