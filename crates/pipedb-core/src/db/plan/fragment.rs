use crate::{
    db::{
        comparator::{FieldComparator, sort_stable_by},
        predicate::FieldPredicate,
    },
    error::InternalError,
    model::{FieldId, FieldKind},
    value::Value,
};
use std::{cmp::Ordering, fmt};

///
/// Window
///
/// Folded skip/limit pair. Skips applied after a limit shrink it; limits
/// never grow an existing one.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Window {
    pub offset: u64,
    pub limit: Option<u64>,
}

impl Window {
    pub const UNBOUNDED: Self = Self {
        offset: 0,
        limit: None,
    };

    #[must_use]
    pub const fn skip(self, n: u64) -> Self {
        let limit = match self.limit {
            Some(limit) => Some(limit.saturating_sub(n)),
            None => None,
        };

        Self {
            offset: self.offset.saturating_add(n),
            limit,
        }
    }

    #[must_use]
    pub const fn limit(self, n: u64) -> Self {
        let limit = match self.limit {
            Some(limit) if limit < n => limit,
            _ => n,
        };

        Self {
            offset: self.offset,
            limit: Some(limit),
        }
    }

    #[must_use]
    pub const fn is_unbounded(&self) -> bool {
        self.offset == 0 && self.limit.is_none()
    }

    /// Apply the window to an in-memory row sequence.
    pub fn apply<I: Iterator>(&self, rows: I) -> impl Iterator<Item = I::Item> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = self
            .limit
            .map_or(usize::MAX, |n| usize::try_from(n).unwrap_or(usize::MAX));

        rows.skip(offset).take(limit)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.limit {
            Some(limit) => write!(f, "offset {} limit {limit}", self.offset),
            None => write!(f, "offset {}", self.offset),
        }
    }
}

///
/// FragmentShape
///
/// What the store returns for a fragment: rows, a count, or an existence
/// answer (`NotExists` is the negated existence check).
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FragmentShape {
    Rows,
    Count,
    Exists,
    NotExists,
}

///
/// BoundParam
///
/// One operand bound for the store, tagged with its target field and kind.
///

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BoundParam {
    pub field: FieldId,
    pub kind: FieldKind,
    pub value: Value,
}

///
/// StoreFragment
///
/// Store-side part of a plan: a predicate conjunction, an ordering chain,
/// an optional window, and the result shape.
///

pub struct StoreFragment<E> {
    entity: &'static str,
    predicates: Vec<FieldPredicate<E>>,
    order: Vec<FieldComparator<E>>,
    window: Option<Window>,
    shape: FragmentShape,
}

impl<E> StoreFragment<E> {
    /// Full scan in the store's default order.
    #[must_use]
    pub const fn unrestricted(entity: &'static str) -> Self {
        Self {
            entity,
            predicates: Vec::new(),
            order: Vec::new(),
            window: None,
            shape: FragmentShape::Rows,
        }
    }

    pub(crate) const fn new(
        entity: &'static str,
        predicates: Vec<FieldPredicate<E>>,
        order: Vec<FieldComparator<E>>,
        window: Option<Window>,
        shape: FragmentShape,
    ) -> Self {
        Self {
            entity,
            predicates,
            order,
            window,
            shape,
        }
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.entity
    }

    #[must_use]
    pub fn predicates(&self) -> &[FieldPredicate<E>] {
        &self.predicates
    }

    #[must_use]
    pub fn order(&self) -> &[FieldComparator<E>] {
        &self.order
    }

    #[must_use]
    pub const fn window(&self) -> Option<Window> {
        self.window
    }

    #[must_use]
    pub const fn shape(&self) -> FragmentShape {
        self.shape
    }

    /// Whether the fragment restricts nothing: plain rows, no predicate, no
    /// order, no window.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        matches!(self.shape, FragmentShape::Rows)
            && self.predicates.is_empty()
            && self.order.is_empty()
            && self.window.is_none_or(|window| window.is_unbounded())
    }

    /// Conjunction of all predicates.
    pub fn matches(&self, entity: &E) -> Result<bool, InternalError> {
        for predicate in &self.predicates {
            if !predicate.test(entity)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Lexicographic comparison over the ordering chain.
    pub fn compare(&self, left: &E, right: &E) -> Result<Ordering, InternalError> {
        for comparator in &self.order {
            let ordering = comparator.compare(left, right)?;
            if ordering != Ordering::Equal {
                return Ok(ordering);
            }
        }

        Ok(Ordering::Equal)
    }

    /// Evaluate the row part of the fragment over an in-memory slice:
    /// filter, stable sort, then window. Shape is ignored.
    pub fn select<'a>(&self, rows: &'a [E]) -> Result<Vec<&'a E>, InternalError> {
        let mut selected = Vec::new();
        for row in rows {
            if self.matches(row)? {
                selected.push(row);
            }
        }

        if !self.order.is_empty() {
            sort_stable_by(&mut selected, |a, b| self.compare(a, b))?;
        }

        Ok(match self.window {
            Some(window) => window.apply(selected.into_iter()).collect(),
            None => selected,
        })
    }

    /// Raw predicate operands tagged with their field, in conjunct order.
    /// Use `render` for the statement's actual binding list.
    #[must_use]
    pub fn params(&self) -> Vec<BoundParam> {
        self.predicates
            .iter()
            .flat_map(|predicate| {
                let field = predicate.field();
                predicate.operands().iter().map(move |value| BoundParam {
                    field: field.identifier(),
                    kind: field.kind(),
                    value: value.clone(),
                })
            })
            .collect()
    }
}

impl<E> Clone for StoreFragment<E> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            predicates: self.predicates.clone(),
            order: self.order.clone(),
            window: self.window,
            shape: self.shape,
        }
    }
}

impl<E> PartialEq for StoreFragment<E> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
            && self.predicates == other.predicates
            && self.order == other.order
            && self.window == other.window
            && self.shape == other.shape
    }
}

impl<E> fmt::Debug for StoreFragment<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreFragment")
            .field("entity", &self.entity)
            .field("predicates", &self.predicates)
            .field("order", &self.order)
            .field("window", &self.window)
            .field("shape", &self.shape)
            .finish()
    }
}
