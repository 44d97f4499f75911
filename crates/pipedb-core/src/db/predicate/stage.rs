use crate::{db::predicate::field::FieldPredicate, error::InternalError};
use std::{fmt, sync::Arc};

/// Opaque in-process predicate body.
pub type PredicateFn<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

///
/// StagePredicate
///
/// Predicate carried by a filter stage or a match terminal. Only the
/// `Field` form is ever translated for a store; `Custom` always runs in
/// process.
///

pub enum StagePredicate<E> {
    Field(FieldPredicate<E>),
    Custom { name: &'static str, test: PredicateFn<E> },
}

impl<E> StagePredicate<E> {
    #[must_use]
    pub fn custom(name: &'static str, test: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom {
            name,
            test: Arc::new(test),
        }
    }

    #[must_use]
    pub const fn as_field(&self) -> Option<&FieldPredicate<E>> {
        match self {
            Self::Field(predicate) => Some(predicate),
            Self::Custom { .. } => None,
        }
    }

    pub fn test(&self, entity: &E) -> Result<bool, InternalError> {
        match self {
            Self::Field(predicate) => predicate.test(entity),
            Self::Custom { test, .. } => Ok(test(entity)),
        }
    }
}

impl<E> From<FieldPredicate<E>> for StagePredicate<E> {
    fn from(predicate: FieldPredicate<E>) -> Self {
        Self::Field(predicate)
    }
}

impl<E> Clone for StagePredicate<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(predicate) => Self::Field(predicate.clone()),
            Self::Custom { name, test } => Self::Custom {
                name: *name,
                test: Arc::clone(test),
            },
        }
    }
}

impl<E> PartialEq for StagePredicate<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Field(a), Self::Field(b)) => a == b,
            (
                Self::Custom { name: a, test: f },
                Self::Custom { name: b, test: g },
            ) => a == b && std::ptr::addr_eq(Arc::as_ptr(f), Arc::as_ptr(g)),
            _ => false,
        }
    }
}

impl<E> fmt::Debug for StagePredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(predicate) => f.debug_tuple("Field").field(predicate).finish(),
            Self::Custom { name, .. } => f.debug_struct("Custom").field("name", name).finish(),
        }
    }
}

impl<E> fmt::Display for StagePredicate<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(predicate) => write!(f, "{predicate}"),
            Self::Custom { name, .. } => write!(f, "{name}(..)"),
        }
    }
}
