//! In-process stage evaluation over a fallible row stream.
//!
//! Filters and maps stream row by row; sort and distinct buffer or
//! remember what they need. Errors travel through the stream as items and
//! are never counted by skip/limit.

use crate::{
    db::{
        comparator::{SortSpec, sort_stable_by},
        pipeline::Stage,
        predicate::StagePredicate,
    },
    error::InternalError,
    model::EntityModel,
};
use std::{collections::HashSet, iter, vec};

pub(crate) type Rows<'a, E> = Box<dyn Iterator<Item = Result<E, InternalError>> + 'a>;

/// Apply `stages` in order on top of `rows`.
pub(crate) fn apply<'a, E: 'a>(
    rows: Rows<'a, E>,
    stages: &'a [Stage<E>],
    model: &'a EntityModel<E>,
) -> Rows<'a, E> {
    stages
        .iter()
        .fold(rows, |rows, stage| apply_stage(rows, stage, model))
}

fn apply_stage<'a, E: 'a>(
    rows: Rows<'a, E>,
    stage: &'a Stage<E>,
    model: &'a EntityModel<E>,
) -> Rows<'a, E> {
    match stage {
        Stage::Filter(predicate) => filter(rows, predicate),
        Stage::Map(transform) => Box::new(rows.map(move |row| row.map(|e| transform.apply(e)))),
        Stage::Sorted(spec) => sorted(rows, spec),
        Stage::Distinct => distinct(rows, model),
        Stage::Skip(n) => skip(rows, *n),
        Stage::Limit(n) => limit(rows, *n),
    }
}

fn filter<'a, E: 'a>(rows: Rows<'a, E>, predicate: &'a StagePredicate<E>) -> Rows<'a, E> {
    Box::new(rows.filter_map(move |row| match row {
        Ok(entity) => match predicate.test(&entity) {
            Ok(true) => Some(Ok(entity)),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        },
        Err(err) => Some(Err(err)),
    }))
}

// Buffers on the first pull so nothing upstream runs until a consumer asks.
fn sorted<'a, E: 'a>(mut rows: Rows<'a, E>, spec: &'a SortSpec<E>) -> Rows<'a, E> {
    let mut buffered: Option<vec::IntoIter<E>> = None;

    Box::new(iter::from_fn(move || {
        if buffered.is_none() {
            let sorted = rows
                .by_ref()
                .collect::<Result<Vec<E>, _>>()
                .and_then(|mut all| {
                    sort_stable_by(&mut all, |a, b| spec.compare(a, b))?;
                    Ok(all)
                });

            match sorted {
                Ok(all) => buffered = Some(all.into_iter()),
                Err(err) => {
                    buffered = Some(Vec::new().into_iter());
                    return Some(Err(err));
                }
            }
        }

        buffered.as_mut()?.next().map(Ok)
    }))
}

fn distinct<'a, E: 'a>(rows: Rows<'a, E>, model: &'a EntityModel<E>) -> Rows<'a, E> {
    let mut seen = HashSet::new();

    Box::new(rows.filter_map(move |row| {
        let keyed = row.and_then(|entity| Ok((model.row_key(&entity)?, entity)));
        match keyed {
            Ok((key, entity)) => seen.insert(key).then_some(Ok(entity)),
            Err(err) => Some(Err(err)),
        }
    }))
}

fn skip<'a, E: 'a>(rows: Rows<'a, E>, n: u64) -> Rows<'a, E> {
    let mut remaining = n;

    Box::new(rows.filter(move |row| {
        if row.is_ok() && remaining > 0 {
            remaining -= 1;
            false
        } else {
            true
        }
    }))
}

// Stops pulling upstream as soon as `n` rows went out.
fn limit<'a, E: 'a>(mut rows: Rows<'a, E>, n: u64) -> Rows<'a, E> {
    let mut remaining = n;

    Box::new(iter::from_fn(move || {
        if remaining == 0 {
            return None;
        }

        let row = rows.next()?;
        if row.is_ok() {
            remaining -= 1;
        }

        Some(row)
    }))
}
