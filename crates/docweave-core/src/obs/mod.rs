//! Observability: normalize / compile / tree counters and the sink they
//! flow through. Structured events go out through `tracing` at the call
//! sites; this module only keeps counts.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{DocumentCounters, DocumentSummary, EventOps, EventReport, EventState};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
