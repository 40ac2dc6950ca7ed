//! Binned dataset accessor contract and the in-memory histogram that backs it.

mod axis;
mod histogram;

pub use axis::Axis;
pub use histogram::Histogram;

use crate::domain::FlowResult;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BinningError {
    #[error("axis needs at least one bin")]
    EmptyAxis,
    #[error("axis limits must be finite with low < high, got [{low}, {high}]")]
    InvalidLimits { low: f64, high: f64 },
    #[error("axis edges must be finite and strictly increasing, index {index} has {current} after {previous}")]
    NonIncreasingEdges {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("histogram needs at least one axis")]
    NoAxes,
    #[error("histogram content length mismatch: expected {expected}, got {actual}")]
    ContentLength { expected: usize, actual: usize },
}

/// Read access to a multi-dimensional binned dataset.
///
/// Projections never mutate the source; range restriction mutates only the
/// receiver, so callers clone before restricting a shared dataset.
pub trait BinnedDataset: Clone {
    fn dimensions(&self) -> usize;

    fn axis(&self, index: usize) -> FlowResult<&Axis>;

    fn find_bin(&self, axis: usize, value: f64) -> FlowResult<usize> {
        Ok(self.axis(axis)?.find_bin(value))
    }

    /// Restricts `axis` to native bins `first..=last`.
    fn restrict_range(&mut self, axis: usize, first: usize, last: usize) -> FlowResult<()>;

    fn project(&self, axes: &[usize]) -> FlowResult<Histogram>;

    fn mean(&self, axis: usize) -> FlowResult<f64>;

    fn mean_error(&self, axis: usize) -> FlowResult<f64>;

    fn entries(&self) -> f64;
}
