//! Field comparators, null ordering, and comparator chains.


use crate::{
    error::{ErrorOrigin, InternalError},
    model::Field,
    value::strict_order_cmp,
};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

///
/// NullOrder
///
/// Placement of null values relative to non-null ones. `None` asserts the
/// field never holds null while sorting; meeting one is a precondition
/// error.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
pub enum NullOrder {
    First,
    Last,
    None,
}

///
/// FieldComparator
///
/// Ordering over one field. `reversed` flips the non-null ordering only;
/// nulls keep their declared placement in both directions.
///

pub struct FieldComparator<E> {
    field: Field<E>,
    reversed: bool,
    null_order: NullOrder,
}

impl<E> FieldComparator<E> {
    #[must_use]
    pub const fn new(field: Field<E>, null_order: NullOrder) -> Self {
        Self {
            field,
            reversed: false,
            null_order,
        }
    }

    #[must_use]
    pub const fn field(&self) -> Field<E> {
        self.field
    }

    #[must_use]
    pub const fn is_reversed(&self) -> bool {
        self.reversed
    }

    #[must_use]
    pub const fn null_order(&self) -> NullOrder {
        self.null_order
    }

    /// Same comparator with the direction flipped.
    #[must_use]
    pub const fn reversed(&self) -> Self {
        Self {
            field: self.field,
            reversed: !self.reversed,
            null_order: self.null_order,
        }
    }

    #[must_use]
    pub const fn with_null_order(self, null_order: NullOrder) -> Self {
        Self { null_order, ..self }
    }

    #[must_use]
    pub fn then_comparing(self, next: impl Into<SortKey<E>>) -> SortSpec<E> {
        SortSpec::from(self).then_comparing(next)
    }

    pub fn compare(&self, left: &E, right: &E) -> Result<Ordering, InternalError> {
        let a = self.field.read(left)?;
        let b = self.field.read(right)?;

        match (a.is_null(), b.is_null()) {
            (false, false) => {
                let ordering = strict_order_cmp(&a, &b).ok_or_else(|| {
                    InternalError::type_mismatch(
                        ErrorOrigin::Comparator,
                        format!(
                            "cannot order {} against {} in {self}",
                            a.label(),
                            b.label()
                        ),
                    )
                })?;

                Ok(if self.reversed {
                    ordering.reverse()
                } else {
                    ordering
                })
            }
            (left_null, right_null) => {
                let null_first = match self.null_order {
                    NullOrder::First => true,
                    NullOrder::Last => false,
                    NullOrder::None => {
                        return Err(InternalError::precondition(
                            ErrorOrigin::Comparator,
                            format!("null value met by {self}, which declares no null order"),
                        ));
                    }
                };

                Ok(match (left_null, right_null, null_first) {
                    (true, true, _) => Ordering::Equal,
                    (true, false, true) | (false, true, false) => Ordering::Less,
                    _ => Ordering::Greater,
                })
            }
        }
    }
}

impl<E> Clone for FieldComparator<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for FieldComparator<E> {}

impl<E> PartialEq for FieldComparator<E> {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.reversed == other.reversed
            && self.null_order == other.null_order
    }
}

impl<E> Eq for FieldComparator<E> {}

impl<E> Hash for FieldComparator<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.field.hash(state);
        self.reversed.hash(state);
        self.null_order.hash(state);
    }
}

impl<E> fmt::Debug for FieldComparator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldComparator")
            .field("field", &self.field.identifier())
            .field("reversed", &self.reversed)
            .field("null_order", &self.null_order)
            .finish()
    }
}

impl<E> fmt::Display for FieldComparator<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = if self.reversed {
            "descending"
        } else {
            "ascending"
        };
        write!(f, "(order by {} {direction})", self.field.identifier())
    }
}

impl<E> Field<E> {
    /// Ascending comparator; nullable fields sort nulls last.
    #[must_use]
    pub const fn comparator(self) -> FieldComparator<E> {
        let null_order = if self.is_nullable() {
            NullOrder::Last
        } else {
            NullOrder::None
        };
        FieldComparator::new(self, null_order)
    }

    #[must_use]
    pub const fn comparator_nulls_first(self) -> FieldComparator<E> {
        FieldComparator::new(self, NullOrder::First)
    }

    #[must_use]
    pub const fn comparator_nulls_last(self) -> FieldComparator<E> {
        FieldComparator::new(self, NullOrder::Last)
    }
}

/// Opaque in-process comparator body.
pub type CompareFn<E> = Arc<dyn Fn(&E, &E) -> Ordering + Send + Sync>;

///
/// SortKey
///

pub enum SortKey<E> {
    Field(FieldComparator<E>),
    Custom {
        name: &'static str,
        compare: CompareFn<E>,
        reversed: bool,
    },
}

impl<E> SortKey<E> {
    #[must_use]
    pub fn custom(
        name: &'static str,
        compare: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        Self::Custom {
            name,
            compare: Arc::new(compare),
            reversed: false,
        }
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        match self {
            Self::Field(comparator) => Self::Field(comparator.reversed()),
            Self::Custom {
                name,
                compare,
                reversed,
            } => Self::Custom {
                name: *name,
                compare: Arc::clone(compare),
                reversed: !*reversed,
            },
        }
    }

    pub fn compare(&self, left: &E, right: &E) -> Result<Ordering, InternalError> {
        match self {
            Self::Field(comparator) => comparator.compare(left, right),
            Self::Custom {
                compare, reversed, ..
            } => {
                let ordering = compare(left, right);
                Ok(if *reversed { ordering.reverse() } else { ordering })
            }
        }
    }

    #[must_use]
    pub const fn as_field(&self) -> Option<&FieldComparator<E>> {
        match self {
            Self::Field(comparator) => Some(comparator),
            Self::Custom { .. } => None,
        }
    }
}

impl<E> From<FieldComparator<E>> for SortKey<E> {
    fn from(comparator: FieldComparator<E>) -> Self {
        Self::Field(comparator)
    }
}

impl<E> Clone for SortKey<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(comparator) => Self::Field(*comparator),
            Self::Custom {
                name,
                compare,
                reversed,
            } => Self::Custom {
                name: *name,
                compare: Arc::clone(compare),
                reversed: *reversed,
            },
        }
    }
}

impl<E> PartialEq for SortKey<E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Field(a), Self::Field(b)) => a == b,
            (
                Self::Custom {
                    name: a,
                    compare: f,
                    reversed: x,
                },
                Self::Custom {
                    name: b,
                    compare: g,
                    reversed: y,
                },
            ) => a == b && x == y && std::ptr::addr_eq(Arc::as_ptr(f), Arc::as_ptr(g)),
            _ => false,
        }
    }
}

impl<E> fmt::Debug for SortKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(comparator) => f.debug_tuple("Field").field(comparator).finish(),
            Self::Custom { name, reversed, .. } => f
                .debug_struct("Custom")
                .field("name", name)
                .field("reversed", reversed)
                .finish_non_exhaustive(),
        }
    }
}

impl<E> fmt::Display for SortKey<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(comparator) => write!(f, "{comparator}"),
            Self::Custom { name, reversed, .. } => {
                let direction = if *reversed { "descending" } else { "ascending" };
                write!(f, "(order by {name}(..) {direction})")
            }
        }
    }
}

///
/// SortSpec
///
/// Lexicographic comparator chain: later keys only break ties left by
/// earlier ones.
///

pub struct SortSpec<E> {
    keys: Vec<SortKey<E>>,
}

impl<E> SortSpec<E> {
    #[must_use]
    pub fn custom(
        name: &'static str,
        compare: impl Fn(&E, &E) -> Ordering + Send + Sync + 'static,
    ) -> Self {
        Self {
            keys: vec![SortKey::custom(name, compare)],
        }
    }

    #[must_use]
    pub fn then_comparing(mut self, next: impl Into<SortKey<E>>) -> Self {
        self.keys.push(next.into());
        self
    }

    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            keys: self.keys.iter().map(SortKey::reversed).collect(),
        }
    }

    #[must_use]
    pub fn keys(&self) -> &[SortKey<E>] {
        &self.keys
    }

    /// Field comparators of the chain, `None` if any key is opaque.
    #[must_use]
    pub fn field_keys(&self) -> Option<Vec<FieldComparator<E>>> {
        self.keys
            .iter()
            .map(|key| key.as_field().copied())
            .collect()
    }

    pub fn compare(&self, left: &E, right: &E) -> Result<Ordering, InternalError> {
        for key in &self.keys {
            let ordering = key.compare(left, right)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }

        Ok(Ordering::Equal)
    }
}

impl<E> From<FieldComparator<E>> for SortSpec<E> {
    fn from(comparator: FieldComparator<E>) -> Self {
        Self {
            keys: vec![SortKey::Field(comparator)],
        }
    }
}

impl<E> From<SortKey<E>> for SortSpec<E> {
    fn from(key: SortKey<E>) -> Self {
        Self { keys: vec![key] }
    }
}

impl<E> Clone for SortSpec<E> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
        }
    }
}

impl<E> PartialEq for SortSpec<E> {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl<E> fmt::Debug for SortSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.keys).finish()
    }
}

impl<E> fmt::Display for SortSpec<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, key) in self.keys.iter().enumerate() {
            if index > 0 {
                f.write_str(" then ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

/// Stable sort with a fallible comparator; the first error wins and the
/// slice order is unspecified when one occurs.
pub(crate) fn sort_stable_by<T>(
    items: &mut [T],
    mut compare: impl FnMut(&T, &T) -> Result<Ordering, InternalError>,
) -> Result<(), InternalError> {
    let mut failure = None;

    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        compare(a, b).unwrap_or_else(|err| {
            failure = Some(err);
            Ordering::Equal
        })
    });

    failure.map_or(Ok(()), Err)
}
