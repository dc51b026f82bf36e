use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters since `since_ms`.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub documents: BTreeMap<String, DocumentCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            documents: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Builders
    pub normalized: u64,
    pub normalize_failed: u64,

    // Compiler
    pub compiled: u64,
    pub compile_failed: u64,

    // Composition trees
    pub trees_built: u64,
}

///
/// DocumentCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DocumentCounters {
    pub normalized: u64,
    pub normalize_failed: u64,
    pub compiled: u64,
    pub compile_failed: u64,
    pub trees_built: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
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
    pub counters: Option<EventState>,
    pub document_counters: Vec<DocumentSummary>,
}

///
/// DocumentSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct DocumentSummary {
    pub path: String,
    pub normalized: u64,
    pub normalize_failed: u64,
    pub compiled: u64,
    pub compile_failed: u64,
    pub trees_built: u64,
}

/// Build a report; documents with the most compiles come first.
#[must_use]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut document_counters: Vec<DocumentSummary> = snap
        .documents
        .iter()
        .map(|(path, c)| DocumentSummary {
            path: path.clone(),
            normalized: c.normalized,
            normalize_failed: c.normalize_failed,
            compiled: c.compiled,
            compile_failed: c.compile_failed,
            trees_built: c.trees_built,
        })
        .collect();
    document_counters.sort_by(|a, b| b.compiled.cmp(&a.compiled).then_with(|| a.path.cmp(&b.path)));

    EventReport {
        counters: Some(snap),
        document_counters,
    }
}
