//! Terminal dispatch: run the store fragment, apply the residual in
//! process, and reduce with the terminal's handler.

mod overrides;
mod phase;
mod residual;


pub use overrides::{TerminalHandler, TerminalOverrides};
pub use phase::ExecutionPhase;

use crate::{
    db::{
        capability::Capabilities,
        comparator::SortSpec,
        pipeline::{Pipeline, Query, Terminal, TerminalKind, TerminalOutput},
        plan::{FragmentShape, OptimizerInfo, OptimizerOptions, StoreFragment, optimize},
        predicate::StagePredicate,
        store::{RowSource, StoreError, StoreExecutor},
    },
    error::InternalError,
    model::EntityModel,
    obs::sink::{self, MetricsEvent},
};
use phase::Execution;
use residual::Rows;
use std::cmp::Ordering;

///
/// Opened
///
/// What the store handed back before reduction.
///

enum Opened<'a, E> {
    Count(u64),
    Match(bool),
    Rows(Rows<'a, E>),
}

///
/// PipelineExecutor
///
/// Executes queries for one entity against one store. Every call
/// re-optimizes; nothing is cached between executions. Terminal kinds with
/// an entry in `overrides` skip the built-in handler.
///

pub struct PipelineExecutor<'a, E, S> {
    model: &'a EntityModel<E>,
    capabilities: &'a Capabilities,
    store: &'a S,
    options: OptimizerOptions,
    overrides: TerminalOverrides<E, S>,
}

impl<'a, E, S> PipelineExecutor<'a, E, S>
where
    S: StoreExecutor<E>,
{
    #[must_use]
    pub fn new(model: &'a EntityModel<E>, capabilities: &'a Capabilities, store: &'a S) -> Self {
        Self {
            model,
            capabilities,
            store,
            options: OptimizerOptions::default(),
            overrides: TerminalOverrides::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: OptimizerOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_overrides(mut self, overrides: TerminalOverrides<E, S>) -> Self {
        self.overrides = overrides;
        self
    }

    /// The plan `execute` would run, without touching the store.
    pub fn explain(&self, query: &Query<E>) -> Result<OptimizerInfo<E>, InternalError> {
        optimize(query, self.model, self.capabilities, self.options)
    }

    /// Run `query` and return its terminal result.
    pub fn execute(&self, query: &Query<E>) -> Result<TerminalOutput<E>, InternalError> {
        let execution = Execution::start(self.model.entity(), query.terminal());

        let output = if let Some(handler) = self.overrides.get(query.terminal()) {
            self.run_override(handler, query, &execution)?
        } else {
            match self.open(query, &execution)? {
                Opened::Count(n) => TerminalOutput::Count(n),
                Opened::Match(found) => TerminalOutput::Match(found),
                Opened::Rows(rows) => reduce(rows, query.terminal_op())?,
            }
        };
        self.finish(&execution)?;

        Ok(output)
    }

    ///
    /// Typed terminals
    ///

    pub fn count(&self, pipeline: &Pipeline<E>) -> Result<u64, InternalError> {
        let output = self.execute(&pipeline.clone().count())?;

        output.as_count().ok_or_else(|| mismatch("count", &output))
    }

    pub fn any_match(
        &self,
        pipeline: &Pipeline<E>,
        predicate: impl Into<StagePredicate<E>>,
    ) -> Result<bool, InternalError> {
        let output = self.execute(&pipeline.clone().any_match(predicate))?;

        output.as_match().ok_or_else(|| mismatch("any_match", &output))
    }

    pub fn all_match(
        &self,
        pipeline: &Pipeline<E>,
        predicate: impl Into<StagePredicate<E>>,
    ) -> Result<bool, InternalError> {
        let output = self.execute(&pipeline.clone().all_match(predicate))?;

        output.as_match().ok_or_else(|| mismatch("all_match", &output))
    }

    pub fn none_match(
        &self,
        pipeline: &Pipeline<E>,
        predicate: impl Into<StagePredicate<E>>,
    ) -> Result<bool, InternalError> {
        let output = self.execute(&pipeline.clone().none_match(predicate))?;

        output.as_match().ok_or_else(|| mismatch("none_match", &output))
    }

    pub fn find_first(&self, pipeline: &Pipeline<E>) -> Result<Option<E>, InternalError> {
        self.entity_of(&pipeline.clone().find_first())
    }

    pub fn find_any(&self, pipeline: &Pipeline<E>) -> Result<Option<E>, InternalError> {
        self.entity_of(&pipeline.clone().find_any())
    }

    pub fn min(
        &self,
        pipeline: &Pipeline<E>,
        spec: impl Into<SortSpec<E>>,
    ) -> Result<Option<E>, InternalError> {
        self.entity_of(&pipeline.clone().min(spec))
    }

    pub fn max(
        &self,
        pipeline: &Pipeline<E>,
        spec: impl Into<SortSpec<E>>,
    ) -> Result<Option<E>, InternalError> {
        self.entity_of(&pipeline.clone().max(spec))
    }

    pub fn collect(&self, pipeline: &Pipeline<E>) -> Result<Vec<E>, InternalError> {
        self.collect_into(pipeline)
    }

    /// Stream the collected rows into any `FromIterator` container.
    pub fn collect_into<C: FromIterator<E>>(
        &self,
        pipeline: &Pipeline<E>,
    ) -> Result<C, InternalError> {
        self.stream(pipeline, |rows| rows.collect())
    }

    /// Hand each result row to `f` as it arrives.
    pub fn for_each(
        &self,
        pipeline: &Pipeline<E>,
        mut f: impl FnMut(E),
    ) -> Result<(), InternalError> {
        self.stream(pipeline, |rows| {
            for row in rows {
                f(row?);
            }
            Ok(())
        })
    }

    fn entity_of(&self, query: &Query<E>) -> Result<Option<E>, InternalError> {
        match self.execute(query)? {
            TerminalOutput::Entity(entity) => Ok(entity),
            other => Err(mismatch(query.terminal().label(), &other)),
        }
    }

    // Shares the `Collect` plan but leaves consumption to the caller.
    fn stream<T>(
        &self,
        pipeline: &Pipeline<E>,
        consume: impl FnOnce(Rows<'_, E>) -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let query = pipeline.clone().collect();
        let execution = Execution::start(self.model.entity(), query.terminal());

        let value = if let Some(handler) = self.overrides.get(TerminalKind::Collect) {
            match self.run_override(handler, &query, &execution)? {
                TerminalOutput::Rows(rows) => consume(Box::new(rows.into_iter().map(Ok)))?,
                other => return Err(mismatch("collect", &other)),
            }
        } else {
            match self.open(&query, &execution)? {
                Opened::Rows(rows) => consume(rows)?,
                Opened::Count(_) | Opened::Match(_) => {
                    return Err(InternalError::executor_invariant(
                        "collect plan produced a non-row store shape",
                    ));
                }
            }
        };
        self.finish(&execution)?;

        Ok(value)
    }

    ///
    /// Execution steps
    ///

    fn plan(
        &self,
        query: &Query<E>,
        execution: &Execution,
    ) -> Result<OptimizerInfo<E>, InternalError> {
        let info = optimize(query, self.model, self.capabilities, self.options)?;
        execution.advance(ExecutionPhase::Optimized)?;
        sink::record(MetricsEvent::Plan {
            entity: execution.entity(),
            pushed_stages: info.split(),
            residual_stages: info.residual(query).len(),
            shortcut: info.shortcut().is_some(),
        });

        Ok(info)
    }

    fn run_override(
        &self,
        handler: &TerminalHandler<E, S>,
        query: &Query<E>,
        execution: &Execution,
    ) -> Result<TerminalOutput<E>, InternalError> {
        let info = self.plan(query, execution)?;
        execution.advance(ExecutionPhase::StoreExecuting)?;
        tracing::debug!(
            entity = execution.entity(),
            terminal = %query.terminal(),
            "running terminal override"
        );

        let output = handler(&info, query, self.store)?;
        execution.advance(ExecutionPhase::ResidualApplying)?;

        Ok(output)
    }

    fn open<'q>(
        &'q self,
        query: &'q Query<E>,
        execution: &'q Execution,
    ) -> Result<Opened<'q, E>, InternalError> {
        let info = self.plan(query, execution)?;

        execution.advance(ExecutionPhase::StoreExecuting)?;
        let fragment = info.fragment();
        let attempt = match fragment.shape() {
            FragmentShape::Count => self.store.count(fragment).map(Opened::Count),
            FragmentShape::Exists | FragmentShape::NotExists => {
                self.store.exists(fragment).map(Opened::Match)
            }
            FragmentShape::Rows => self
                .store
                .fetch(fragment)
                .map(|rows| Opened::Rows(pulled(rows, execution))),
        };

        match attempt {
            Ok(opened) => {
                execution.advance(ExecutionPhase::ResidualApplying)?;
                Ok(match opened {
                    Opened::Rows(rows) => Opened::Rows(residual::apply(
                        rows,
                        info.residual(query),
                        self.model,
                    )),
                    shaped => shaped,
                })
            }
            Err(StoreError::Rejected { reason }) if !fragment.is_unrestricted() => {
                self.fall_back(query, execution, &reason)
            }
            Err(err) => Err(fault(execution, &err)),
        }
    }

    // Rejected before any row flowed: rerun as a plain scan with the whole
    // pipeline in process. A rejection of the scan itself is a fault.
    fn fall_back<'q>(
        &'q self,
        query: &'q Query<E>,
        execution: &'q Execution,
        reason: &str,
    ) -> Result<Opened<'q, E>, InternalError> {
        let entity = execution.entity();
        tracing::warn!(
            entity,
            reason,
            terminal = %query.terminal(),
            "store rejected fragment, evaluating in process"
        );
        sink::record(MetricsEvent::StoreRejected { entity });
        sink::record(MetricsEvent::Fallback { entity });

        execution.advance(ExecutionPhase::FallbackApplying)?;
        let rows = self
            .store
            .fetch(&StoreFragment::unrestricted(entity))
            .map_err(|err| fault(execution, &err))?;
        let rows = pulled(rows, execution);

        Ok(Opened::Rows(residual::apply(
            rows,
            query.stages(),
            self.model,
        )))
    }

    fn finish(&self, execution: &Execution) -> Result<(), InternalError> {
        execution.advance(ExecutionPhase::Done)?;
        tracing::debug!(
            entity = self.model.entity(),
            rows_fetched = execution.rows(),
            phase = %execution.phase(),
            "execution finished"
        );

        Ok(())
    }
}

// Counts pulled rows; any error after the first row is a fault.
fn pulled<'q, E: 'q>(rows: RowSource<'q, E>, execution: &'q Execution) -> Rows<'q, E> {
    Box::new(rows.map(move |row| match row {
        Ok(entity) => {
            execution.count_row();
            Ok(entity)
        }
        Err(err) => Err(fault(execution, &err)),
    }))
}

fn fault(execution: &Execution, err: &StoreError) -> InternalError {
    let entity = execution.entity();
    tracing::warn!(entity, error = %err, "store fault");
    sink::record(MetricsEvent::StoreFault { entity });

    InternalError::from(err.clone())
}

fn mismatch<E>(terminal: &str, output: &TerminalOutput<E>) -> InternalError {
    let got = match output {
        TerminalOutput::Count(_) => "count",
        TerminalOutput::Match(_) => "match",
        TerminalOutput::Entity(_) => "entity",
        TerminalOutput::Rows(_) => "rows",
    };

    InternalError::executor_invariant(format!("{terminal} terminal produced a {got} output"))
}

///
/// Reduction
///

fn reduce<E>(
    mut rows: Rows<'_, E>,
    terminal: &Terminal<E>,
) -> Result<TerminalOutput<E>, InternalError> {
    Ok(match terminal {
        Terminal::Count => {
            let mut count = 0_u64;
            for row in rows {
                row?;
                count = count.saturating_add(1);
            }
            TerminalOutput::Count(count)
        }
        Terminal::AnyMatch(predicate) => TerminalOutput::Match(any(rows, predicate, true)?),
        Terminal::AllMatch(predicate) => TerminalOutput::Match(!any(rows, predicate, false)?),
        Terminal::NoneMatch(predicate) => TerminalOutput::Match(!any(rows, predicate, true)?),
        Terminal::FindFirst | Terminal::FindAny => TerminalOutput::Entity(rows.next().transpose()?),
        Terminal::Min(spec) => TerminalOutput::Entity(extreme(rows, spec, Ordering::Less)?),
        Terminal::Max(spec) => TerminalOutput::Entity(extreme(rows, spec, Ordering::Greater)?),
        Terminal::Collect => TerminalOutput::Rows(rows.collect::<Result<_, _>>()?),
    })
}

/// Whether some row tests `wanted`; stops at the first one.
fn any<E>(
    rows: Rows<'_, E>,
    predicate: &StagePredicate<E>,
    wanted: bool,
) -> Result<bool, InternalError> {
    for row in rows {
        if predicate.test(&row?)? == wanted {
            return Ok(true);
        }
    }

    Ok(false)
}

/// First row that no later row beats; ties keep the earlier row.
fn extreme<E>(
    rows: Rows<'_, E>,
    spec: &SortSpec<E>,
    wanted: Ordering,
) -> Result<Option<E>, InternalError> {
    let mut best: Option<E> = None;
    for row in rows {
        let row = row?;
        let replace = match &best {
            Some(current) => spec.compare(&row, current)? == wanted,
            None => true,
        };
        if replace {
            best = Some(row);
        }
    }

    Ok(best)
}
