//! Metrics sink boundary.
//!
//! Builders, the compiler and the composition tree never touch
//! `obs::metrics` directly; every count flows through `MetricsEvent`.

use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, sync::Arc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Arc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    Normalized {
        document_path: &'static str,
        ok: bool,
    },
    Compiled {
        document_path: &'static str,
        ok: bool,
    },
    TreeBuilt {
        root_path: &'static str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counters.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::Normalized { document_path, ok } => {
                metrics::with_state_mut(|m| {
                    let entry = m.documents.entry(document_path.to_string()).or_default();
                    if ok {
                        m.ops.normalized = m.ops.normalized.saturating_add(1);
                        entry.normalized = entry.normalized.saturating_add(1);
                    } else {
                        m.ops.normalize_failed = m.ops.normalize_failed.saturating_add(1);
                        entry.normalize_failed = entry.normalize_failed.saturating_add(1);
                    }
                });
            }

            MetricsEvent::Compiled { document_path, ok } => {
                metrics::with_state_mut(|m| {
                    let entry = m.documents.entry(document_path.to_string()).or_default();
                    if ok {
                        m.ops.compiled = m.ops.compiled.saturating_add(1);
                        entry.compiled = entry.compiled.saturating_add(1);
                    } else {
                        m.ops.compile_failed = m.ops.compile_failed.saturating_add(1);
                        entry.compile_failed = entry.compile_failed.saturating_add(1);
                    }
                });
            }

            MetricsEvent::TreeBuilt { root_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.trees_built = m.ops.trees_built.saturating_add(1);
                    let entry = m.documents.entry(root_path.to_string()).or_default();
                    entry.trees_built = entry.trees_built.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current thread's counters.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all counters on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Route events to `sink` for the duration of `f`, on this thread only.
pub fn with_metrics_sink<T>(sink: Arc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Arc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let previous = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(previous);

    f()
}

///
/// TESTS
///
