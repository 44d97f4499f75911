use serde::{Deserialize, Serialize};
use std::{cell::RefCell, cmp::Ordering, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for planning and execution.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub entities: BTreeMap<String, EntityCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Executor entrypoints
    pub executions: u64,
    pub fallbacks: u64,

    // Planner decisions
    pub plans: u64,
    pub stages_pushed: u64,
    pub stages_residual: u64,
    pub shortcuts: u64,

    // Store traffic
    pub rows_fetched: u64,
    pub store_rejections: u64,
    pub store_faults: u64,
}

///
/// EntityCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntityCounters {
    pub executions: u64,
    pub fallbacks: u64,
    pub plans: u64,
    pub stages_pushed: u64,
    pub stages_residual: u64,
    pub shortcuts: u64,
    pub rows_fetched: u64,
    pub store_rejections: u64,
    pub store_faults: u64,
}

// One state per thread; reports never aggregate across threads.
thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Raw counters since the last reset.
    pub counters: Option<EventState>,
    /// Per-entity counters with derived ratios.
    pub entity_counters: Vec<EntitySummary>,
}

///
/// EntitySummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EntitySummary {
    pub entity: String,
    pub executions: u64,
    pub fallbacks: u64,
    pub rows_fetched: u64,
    pub avg_rows_per_execution: f64,
    /// Share of pipeline stages evaluated by the store.
    pub pushdown_ratio: f64,
    pub shortcuts: u64,
    pub store_rejections: u64,
    pub store_faults: u64,
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Build a metrics report from the in-memory counters.
///
/// Entities are ordered by rows fetched per execution, heaviest first.
#[must_use]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut entity_counters: Vec<EntitySummary> = snap
        .entities
        .iter()
        .map(|(entity, c)| EntitySummary {
            entity: entity.clone(),
            executions: c.executions,
            fallbacks: c.fallbacks,
            rows_fetched: c.rows_fetched,
            avg_rows_per_execution: ratio(c.rows_fetched, c.executions),
            pushdown_ratio: ratio(
                c.stages_pushed,
                c.stages_pushed.saturating_add(c.stages_residual),
            ),
            shortcuts: c.shortcuts,
            store_rejections: c.store_rejections,
            store_faults: c.store_faults,
        })
        .collect();

    entity_counters.sort_by(|a, b| {
        b.avg_rows_per_execution
            .partial_cmp(&a.avg_rows_per_execution)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.rows_fetched.cmp(&a.rows_fetched))
            .then_with(|| a.entity.cmp(&b.entity))
    });

    EventReport {
        counters: Some(snap),
        entity_counters,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.executions = 3;
            m.ops.rows_fetched = 2;
            m.entities.insert(
                "alpha".to_string(),
                EntityCounters {
                    executions: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.executions, 0);
            assert_eq!(m.ops.rows_fetched, 0);
            assert!(m.entities.is_empty());
        });
    }

    #[test]
    fn report_sorts_entities_by_average_rows() {
        reset_all();
        with_state_mut(|m| {
            m.entities.insert(
                "alpha".to_string(),
                EntityCounters {
                    executions: 2,
                    rows_fetched: 6,
                    ..Default::default()
                },
            );
            m.entities.insert(
                "beta".to_string(),
                EntityCounters {
                    executions: 1,
                    rows_fetched: 5,
                    ..Default::default()
                },
            );
            m.entities.insert(
                "gamma".to_string(),
                EntityCounters {
                    executions: 2,
                    rows_fetched: 6,
                    ..Default::default()
                },
            );
        });

        let report = report();
        let order: Vec<_> = report
            .entity_counters
            .iter()
            .map(|summary| summary.entity.as_str())
            .collect();

        assert_eq!(order, ["beta", "alpha", "gamma"]);
        assert_eq!(report.entity_counters[0].avg_rows_per_execution, 5.0);
        assert_eq!(report.entity_counters[1].avg_rows_per_execution, 3.0);
    }

    #[test]
    fn pushdown_ratio_handles_empty_plans() {
        reset_all();
        with_state_mut(|m| {
            m.entities
                .insert("idle".to_string(), EntityCounters::default());
            m.entities.insert(
                "busy".to_string(),
                EntityCounters {
                    stages_pushed: 3,
                    stages_residual: 1,
                    ..Default::default()
                },
            );
        });

        let report = report();
        let ratio_of = |name: &str| {
            report
                .entity_counters
                .iter()
                .find(|summary| summary.entity == name)
                .map(|summary| summary.pushdown_ratio)
                .expect("entity summary should be present")
        };

        assert_eq!(ratio_of("idle"), 0.0);
        assert_eq!(ratio_of("busy"), 0.75);
    }
}
