use crate::{
    db::{
        capability::Capabilities,
        comparator::{FieldComparator, SortSpec},
        pipeline::{Query, Stage, Terminal, TerminalKind},
        plan::fragment::{BoundParam, FragmentShape, StoreFragment, Window},
        predicate::{FieldPredicate, StagePredicate},
    },
    error::{ErrorOrigin, InternalError},
    model::{EntityModel, Field},
};
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// OptimizerOptions
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerOptions {
    /// Allow terminal-specific store shapes (COUNT, EXISTS, LIMIT 1).
    pub shortcuts: bool,
}

impl Default for OptimizerOptions {
    fn default() -> Self {
        Self { shortcuts: true }
    }
}

///
/// Shortcut
///
/// Terminal-specific store shape chosen instead of streaming rows.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Shortcut {
    Count,
    Exists,
    NotExists,
    FirstRow,
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Count => "count",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
            Self::FirstRow => "first_row",
        };
        f.write_str(label)
    }
}

///
/// OptimizerInfo
///
/// Result of optimizing one query: what the store runs, where the
/// in-process residual starts, and the type-checked parameters to bind.
/// Computed fresh for every execution.
///

pub struct OptimizerInfo<E> {
    fragment: StoreFragment<E>,
    split: usize,
    shortcut: Option<Shortcut>,
    params: Vec<BoundParam>,
}

impl<E> OptimizerInfo<E> {
    #[must_use]
    pub const fn fragment(&self) -> &StoreFragment<E> {
        &self.fragment
    }

    #[must_use]
    pub const fn entity(&self) -> &'static str {
        self.fragment.entity()
    }

    /// Index of the first stage evaluated in process.
    #[must_use]
    pub const fn split(&self) -> usize {
        self.split
    }

    #[must_use]
    pub const fn shortcut(&self) -> Option<Shortcut> {
        self.shortcut
    }

    /// Typed predicate operands in conjunct order. These are the values the
    /// optimizer type-checked, not the rendered binding list: LIKE patterns
    /// and window bounds only appear in `StoreFragment::render`'s params.
    #[must_use]
    pub fn params(&self) -> &[BoundParam] {
        &self.params
    }

    /// Residual stages of `query`, in original order.
    #[must_use]
    pub fn residual<'q>(&self, query: &'q Query<E>) -> &'q [Stage<E>] {
        query.stages().get(self.split..).unwrap_or_default()
    }
}

impl<E> Clone for OptimizerInfo<E> {
    fn clone(&self) -> Self {
        Self {
            fragment: self.fragment.clone(),
            split: self.split,
            shortcut: self.shortcut,
            params: self.params.clone(),
        }
    }
}

impl<E> PartialEq for OptimizerInfo<E> {
    fn eq(&self, other: &Self) -> bool {
        self.fragment == other.fragment
            && self.split == other.split
            && self.shortcut == other.shortcut
            && self.params == other.params
    }
}

impl<E> fmt::Debug for OptimizerInfo<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptimizerInfo")
            .field("fragment", &self.fragment)
            .field("split", &self.split)
            .field("shortcut", &self.shortcut)
            .field("params", &self.params)
            .finish()
    }
}

///
/// PrefixBuilder
///
/// Accumulates the pushable head of a pipeline.
///

struct PrefixBuilder<'a, E> {
    model: &'a EntityModel<E>,
    capabilities: &'a Capabilities,
    terminal: TerminalKind,
    predicates: Vec<FieldPredicate<E>>,
    order: Vec<FieldComparator<E>>,
    window: Option<Window>,
}

impl<'a, E> PrefixBuilder<'a, E> {
    const fn new(
        model: &'a EntityModel<E>,
        capabilities: &'a Capabilities,
        terminal: TerminalKind,
    ) -> Self {
        Self {
            model,
            capabilities,
            terminal,
            predicates: Vec::new(),
            order: Vec::new(),
            window: None,
        }
    }

    /// Try to absorb one stage; `false` closes the prefix. `tail` holds the
    /// stages after it.
    fn absorb(&mut self, stage: &Stage<E>, tail: &[Stage<E>]) -> bool {
        match stage {
            Stage::Filter(predicate) if self.window.is_none() => self.absorb_filter(predicate),
            Stage::Sorted(spec) if self.window.is_none() => self.absorb_sort(spec),
            // A leading no-op skip needs no window, so later stages stay pushable.
            Stage::Skip(0) if self.window.is_none() => self.capabilities.supports_offset(),
            Stage::Skip(n) if self.capabilities.supports_offset() => {
                self.absorb_window(self.current_window().skip(*n), tail)
            }
            Stage::Limit(n) if self.capabilities.supports_limit() => {
                self.absorb_window(self.current_window().limit(*n), tail)
            }
            _ => false,
        }
    }

    fn absorb_filter(&mut self, predicate: &StagePredicate<E>) -> bool {
        match predicate.as_field() {
            Some(field_predicate) if self.capabilities.supports_filter(field_predicate) => {
                self.predicates.push(field_predicate.clone());
                true
            }
            _ => false,
        }
    }

    // The later sort becomes the primary key; earlier keys on the same
    // field can no longer break ties and are dropped.
    fn absorb_sort(&mut self, spec: &SortSpec<E>) -> bool {
        let Some(keys) = spec.field_keys() else {
            return false;
        };
        if !keys.iter().all(|key| self.capabilities.supports_order(key)) {
            return false;
        }

        let mut order = Vec::with_capacity(keys.len() + self.order.len());
        for key in keys {
            if !order.iter().any(|k: &FieldComparator<E>| k.field() == key.field()) {
                order.push(key);
            }
        }
        for key in self.order.drain(..) {
            if !order.iter().any(|k| k.field() == key.field()) {
                order.push(key);
            }
        }
        self.order = order;

        true
    }

    fn absorb_window(&mut self, window: Window, tail: &[Stage<E>]) -> bool {
        if !self.capabilities.supports_window(&window) || !self.order_is_sound(tail) {
            return false;
        }

        self.window = Some(window);
        true
    }

    fn current_window(&self) -> Window {
        self.window.unwrap_or_default()
    }

    /// Whether a store-side window selects the same rows as in-process
    /// skip/limit would. Which rows a window keeps is irrelevant only when
    /// nothing but further windows and an order-insensitive terminal
    /// follow it.
    fn order_is_sound(&self, tail: &[Stage<E>]) -> bool {
        let key = self.model.primary_key();
        let rows_irrelevant = !self.terminal.is_order_sensitive()
            && tail
                .iter()
                .all(|stage| matches!(stage, Stage::Skip(_) | Stage::Limit(_)));

        rows_irrelevant
            || self.capabilities.has_deterministic_default_order()
            || self.order.iter().any(|comparator| comparator.field() == key)
    }

    fn conjoin(&mut self, predicate: &StagePredicate<E>, negate: bool) -> bool {
        let Some(field_predicate) = predicate.as_field() else {
            return false;
        };
        if negate && !field_predicate.is_exact_complement() {
            return false;
        }

        let pushed = if negate {
            field_predicate.negate()
        } else {
            field_predicate.clone()
        };
        if !self.capabilities.supports_filter(&pushed) {
            return false;
        }

        self.predicates.push(pushed);
        true
    }

    /// Pick a terminal shortcut once the prefix is final.
    fn shortcut(&mut self, terminal: &Terminal<E>, residual_empty: bool) -> Option<Shortcut> {
        if !residual_empty {
            return None;
        }
        let caps = self.capabilities;

        match terminal {
            Terminal::Count if caps.supports_count() => Some(Shortcut::Count),
            Terminal::AnyMatch(p) if self.window.is_none() && caps.supports_exists() => {
                self.conjoin(p, false).then_some(Shortcut::Exists)
            }
            Terminal::NoneMatch(p) if self.window.is_none() && caps.supports_exists() => {
                self.conjoin(p, false).then_some(Shortcut::NotExists)
            }
            Terminal::AllMatch(p) if self.window.is_none() && caps.supports_exists() => {
                self.conjoin(p, true).then_some(Shortcut::NotExists)
            }
            Terminal::FindFirst if self.order_is_sound(&[]) => self.first_row(),
            Terminal::FindAny => self.first_row(),
            _ => None,
        }
    }

    fn first_row(&mut self) -> Option<Shortcut> {
        let window = self.current_window().limit(1);
        if !self.capabilities.supports_limit() || !self.capabilities.supports_window(&window) {
            return None;
        }

        self.window = Some(window);
        Some(Shortcut::FirstRow)
    }

    fn finish(self, shortcut: Option<Shortcut>) -> StoreFragment<E> {
        let shape = match shortcut {
            Some(Shortcut::Count) => FragmentShape::Count,
            Some(Shortcut::Exists) => FragmentShape::Exists,
            Some(Shortcut::NotExists) => FragmentShape::NotExists,
            Some(Shortcut::FirstRow) | None => FragmentShape::Rows,
        };

        StoreFragment::new(
            self.model.entity(),
            self.predicates,
            self.order,
            self.window,
            shape,
        )
    }
}

/// Split a query into a store fragment and an in-process residual.
///
/// Pure and deterministic: equal inputs give structurally equal results.
/// Failing to push something is never an error; operand type mismatches
/// and fields from a foreign entity are.
pub fn optimize<E>(
    query: &Query<E>,
    model: &EntityModel<E>,
    capabilities: &Capabilities,
    options: OptimizerOptions,
) -> Result<OptimizerInfo<E>, InternalError> {
    validate_query(query, model)?;

    if capabilities.entity() != model.entity() {
        return Err(InternalError::planner_invariant(format!(
            "capabilities for '{}' used with entity '{}'",
            capabilities.entity(),
            model.entity()
        )));
    }

    let stages = query.stages();
    let mut prefix = PrefixBuilder::new(model, capabilities, query.terminal());
    let split = stages
        .iter()
        .enumerate()
        .position(|(index, stage)| !prefix.absorb(stage, &stages[index + 1..]))
        .unwrap_or(stages.len());

    let shortcut = if options.shortcuts {
        prefix.shortcut(query.terminal_op(), split == stages.len())
    } else {
        None
    };

    let fragment = prefix.finish(shortcut);
    let params = fragment.params();

    tracing::debug!(
        entity = model.entity(),
        terminal = %query.terminal(),
        stages = stages.len(),
        split,
        shortcut = ?shortcut,
        "optimized pipeline"
    );

    Ok(OptimizerInfo {
        fragment,
        split,
        shortcut,
        params,
    })
}

// Every field reference must belong to the model and every operand must
// bind to its field's kind, pushed or not.
fn validate_query<E>(query: &Query<E>, model: &EntityModel<E>) -> Result<(), InternalError> {
    let check_field = |field: Field<E>| {
        if model.contains(field.identifier()) {
            Ok(())
        } else {
            Err(InternalError::precondition(
                ErrorOrigin::Planner,
                format!(
                    "field {} does not belong to entity '{}'",
                    field.identifier(),
                    model.entity()
                ),
            ))
        }
    };
    let check_predicate = |predicate: &StagePredicate<E>| match predicate.as_field() {
        Some(p) => check_field(p.field()).and_then(|()| p.check_operands()),
        None => Ok(()),
    };
    let check_sort = |spec: &SortSpec<E>| {
        spec.keys()
            .iter()
            .filter_map(|key| key.as_field())
            .try_for_each(|comparator| check_field(comparator.field()))
    };

    for stage in query.stages() {
        match stage {
            Stage::Filter(predicate) => check_predicate(predicate)?,
            Stage::Sorted(spec) => check_sort(spec)?,
            Stage::Map(_) | Stage::Distinct | Stage::Skip(_) | Stage::Limit(_) => {}
        }
    }

    match query.terminal_op() {
        Terminal::AnyMatch(p) | Terminal::AllMatch(p) | Terminal::NoneMatch(p) => {
            check_predicate(p)
        }
        Terminal::Min(spec) | Terminal::Max(spec) => check_sort(spec),
        Terminal::Count | Terminal::FindFirst | Terminal::FindAny | Terminal::Collect => Ok(()),
    }
}
