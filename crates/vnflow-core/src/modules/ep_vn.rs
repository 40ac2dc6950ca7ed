use super::fit::PeakFitAccessor;
use crate::diagnostics::{AnisotropyFailure, DiagnosticEvent, DiagnosticSink};
use crate::domain::{FlowError, FlowResult, Measurement, VnEstimate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// In-plane and out-of-plane yields with the correlation of their errors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPlaneYields {
    pub in_plane: Measurement,
    pub out_of_plane: Measurement,
    #[serde(default)]
    pub correlation: f64,
}

impl EventPlaneYields {
    pub fn new(in_plane: Measurement, out_of_plane: Measurement) -> Self {
        Self {
            in_plane,
            out_of_plane,
            correlation: 0.0,
        }
    }

    /// Raw yields of an in-plane and an out-of-plane mass fit.
    pub fn from_fits<I, O>(in_plane: &I, out_of_plane: &O) -> Self
    where
        I: PeakFitAccessor + ?Sized,
        O: PeakFitAccessor + ?Sized,
    {
        Self::new(in_plane.raw_yield(), out_of_plane.raw_yield())
    }

    pub fn with_correlation(mut self, correlation: f64) -> Self {
        self.correlation = correlation;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpVnInput {
    pub harmonic: u32,
    pub yields: EventPlaneYields,
    pub resolution: f64,
}

impl EpVnInput {
    pub fn new(harmonic: u32, yields: EventPlaneYields) -> Self {
        Self {
            harmonic,
            yields,
            resolution: 1.0,
        }
    }

    pub fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }
}

/// `vn = pi * A / (n^2 R)` with `A = (N_in - N_out) / (N_in + N_out)`.
///
/// Zero total yield, a negative propagated variance or a non-positive
/// resolution give [`VnEstimate::UNDEFINED`].
pub fn get_ep_vn(input: &EpVnInput, sink: &dyn DiagnosticSink) -> FlowResult<VnEstimate> {
    if input.harmonic == 0 {
        return Err(FlowError::input_validation(
            "INPUT.HARMONIC",
            "harmonic order must be at least 1",
        ));
    }
    let undefined = |reason: AnisotropyFailure| -> FlowResult<VnEstimate> {
        sink.report(DiagnosticEvent::UndefinedAnisotropy { reason });
        Ok(VnEstimate::UNDEFINED)
    };

    let EventPlaneYields {
        in_plane,
        out_of_plane,
        correlation,
    } = input.yields;
    let total = in_plane.value + out_of_plane.value;
    if total == 0.0 {
        return undefined(AnisotropyFailure::ZeroTotalYield);
    }

    let anisotropy = (in_plane.value - out_of_plane.value) / total;
    let d_in = 2.0 * out_of_plane.value / (total * total);
    let d_out = -2.0 * in_plane.value / (total * total);
    let variance = d_in * d_in * in_plane.uncertainty * in_plane.uncertainty
        + d_out * d_out * out_of_plane.uncertainty * out_of_plane.uncertainty
        + 2.0 * d_in * d_out * in_plane.uncertainty * out_of_plane.uncertainty * correlation;
    if variance < 0.0 {
        return undefined(AnisotropyFailure::NegativeVariance);
    }
    if input.resolution.is_nan() || input.resolution <= 0.0 {
        return undefined(AnisotropyFailure::NonPositiveResolution);
    }

    let scale = PI / (f64::from(input.harmonic).powi(2) * input.resolution);
    Ok(VnEstimate::new(
        scale * anisotropy,
        scale * variance.sqrt(),
    ))
}
