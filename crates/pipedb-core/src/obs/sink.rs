//! Metrics sink boundary.
//!
//! Planner and executor code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the global metrics state.
use crate::{db::pipeline::TerminalKind, obs::metrics};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        entity: &'static str,
        terminal: TerminalKind,
    },
    ExecFinish {
        entity: &'static str,
        terminal: TerminalKind,
        rows_fetched: u64,
    },
    Plan {
        entity: &'static str,
        pushed_stages: usize,
        residual_stages: usize,
        shortcut: bool,
    },
    StoreRejected {
        entity: &'static str,
    },
    Fallback {
        entity: &'static str,
    },
    StoreFault {
        entity: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { entity, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.executions = m.ops.executions.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.executions = entry.executions.saturating_add(1);
                });
            }

            MetricsEvent::ExecFinish {
                entity,
                rows_fetched,
                ..
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_fetched = m.ops.rows_fetched.saturating_add(rows_fetched);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.rows_fetched = entry.rows_fetched.saturating_add(rows_fetched);
                });
            }

            MetricsEvent::Plan {
                entity,
                pushed_stages,
                residual_stages,
                shortcut,
            } => {
                let pushed = u64::try_from(pushed_stages).unwrap_or(u64::MAX);
                let residual = u64::try_from(residual_stages).unwrap_or(u64::MAX);
                let shortcuts = u64::from(shortcut);

                metrics::with_state_mut(|m| {
                    m.ops.plans = m.ops.plans.saturating_add(1);
                    m.ops.stages_pushed = m.ops.stages_pushed.saturating_add(pushed);
                    m.ops.stages_residual = m.ops.stages_residual.saturating_add(residual);
                    m.ops.shortcuts = m.ops.shortcuts.saturating_add(shortcuts);

                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.plans = entry.plans.saturating_add(1);
                    entry.stages_pushed = entry.stages_pushed.saturating_add(pushed);
                    entry.stages_residual = entry.stages_residual.saturating_add(residual);
                    entry.shortcuts = entry.shortcuts.saturating_add(shortcuts);
                });
            }

            MetricsEvent::StoreRejected { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.store_rejections = m.ops.store_rejections.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.store_rejections = entry.store_rejections.saturating_add(1);
                });
            }

            MetricsEvent::Fallback { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.fallbacks = m.ops.fallbacks.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.fallbacks = entry.fallbacks.saturating_add(1);
                });
            }

            MetricsEvent::StoreFault { entity } => {
                metrics::with_state_mut(|m| {
                    m.ops.store_faults = m.ops.store_faults.saturating_add(1);
                    let entry = m.entities.entry(entity.to_string()).or_default();
                    entry.store_faults = entry.store_faults.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    // Clone out of the slot so a sink may itself install overrides.
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
///
/// Counters are thread-local: the report covers executions that ran on the
/// calling thread only. Callers running pipelines on several threads must
/// collect a report on each of them, or install a forwarding `MetricsSink`
/// with `with_metrics_sink` on every worker.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset the calling thread's metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
///
/// The previous sink is restored on every exit, including unwinding.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// Span
/// RAII guard that emits start/finish events for one execution.
/// Finish accounting happens even on unwind.
///

pub(crate) struct Span {
    entity: &'static str,
    terminal: TerminalKind,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(entity: &'static str, terminal: TerminalKind) -> Self {
        record(MetricsEvent::ExecStart { entity, terminal });

        Self {
            entity,
            terminal,
            rows: 0,
        }
    }

    pub(crate) const fn add_rows(&mut self, rows: u64) {
        self.rows = self.rows.saturating_add(rows);
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            entity: self.entity,
            terminal: self.terminal,
            rows_fetched: self.rows,
        });
    }
}

///
/// TESTS
///
