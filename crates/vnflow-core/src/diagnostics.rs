//! Diagnostic events raised at the numeric decision points.
//!
//! Computations take a `&dyn DiagnosticSink` so callers decide whether events
//! go to `tracing`, into a test recorder, or nowhere.

use crate::domain::DetectorPair;
use serde::Serialize;
use std::cell::RefCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnisotropyFailure {
    ZeroTotalYield,
    NegativeVariance,
    NonPositiveResolution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// Resolution product was not positive; the call site returns its sentinel.
    DegenerateResolution {
        subevents: usize,
        product: f64,
        sentinel: f64,
    },
    /// Reference correlation `BC` was exactly zero.
    ZeroReferenceCorrelation { sentinel: f64 },
    InvalidSubeventCount { count: usize },
    RecordNotFound { name: String },
    CombinationRejected { pairs: [DetectorPair; 3] },
    NoValidTriplets { candidates: usize },
    UnparseableRecordName { name: String },
    UndefinedAnisotropy { reason: AnisotropyFailure },
    MissingResource { name: String, feature: String },
}

pub trait DiagnosticSink {
    fn report(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing` with a level per event kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::DegenerateResolution {
                subevents,
                product,
                sentinel,
            } => tracing::info!(
                subevents,
                product,
                sentinel,
                "non-positive resolution product, returning sentinel"
            ),
            DiagnosticEvent::ZeroReferenceCorrelation { sentinel } => {
                tracing::info!(sentinel, "reference correlation is zero, returning sentinel")
            }
            DiagnosticEvent::InvalidSubeventCount { count } => {
                tracing::error!(count, "resolution needs 1 or 3 subevents")
            }
            DiagnosticEvent::RecordNotFound { name } => {
                tracing::error!(record = %name, "correlation record not found")
            }
            DiagnosticEvent::CombinationRejected { pairs } => tracing::debug!(
                first = %pairs[0],
                second = %pairs[1],
                third = %pairs[2],
                "record combination is not a subevent triplet"
            ),
            DiagnosticEvent::NoValidTriplets { candidates } => {
                tracing::warn!(candidates, "no valid subevent triplets found")
            }
            DiagnosticEvent::UnparseableRecordName { name } => {
                tracing::debug!(record = %name, "skipping record without a detector-pair tag")
            }
            DiagnosticEvent::UndefinedAnisotropy { reason } => {
                tracing::warn!(?reason, "anisotropy is not estimable, returning (0, 0)")
            }
            DiagnosticEvent::MissingResource { name, feature } => {
                tracing::warn!(resource = %name, %feature, "resource missing, feature disabled")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&self, _event: DiagnosticEvent) {}
}

/// Keeps every reported event in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn count_matching(&self, predicate: impl Fn(&DiagnosticEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|event| predicate(event)).count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, event: DiagnosticEvent) {
        self.events.borrow_mut().push(event);
    }
}
