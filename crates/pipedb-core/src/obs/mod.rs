//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Planner and executor code never touch `obs::metrics` directly; every
//! counter update flows through `MetricsEvent` and `MetricsSink`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
