//! Read-only access to an external vn-versus-mass peak fit and extraction of
//! its results into a fixed record.

use crate::domain::{FlowError, FlowResult, Measurement};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BACKGROUND_SIGMAS: f64 = 3.0;

/// A fitted function's parameters, addressable by index or by name.
pub trait FitFunction {
    fn parameter_count(&self) -> usize;

    fn parameter_name(&self, index: usize) -> Option<&str>;

    fn parameter(&self, index: usize) -> Option<f64>;

    fn parameter_error(&self, index: usize) -> Option<f64>;

    fn parameter_index(&self, name: &str) -> Option<usize> {
        (0..self.parameter_count()).find(|index| self.parameter_name(*index) == Some(name))
    }

    fn parameter_by_name(&self, name: &str) -> Option<FitParameter> {
        let index = self.parameter_index(name)?;
        Some(FitParameter {
            name: name.to_string(),
            value: self.parameter(index)?,
            error: self.parameter_error(index)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParameter {
    pub name: String,
    pub value: f64,
    pub error: f64,
}

impl FitParameter {
    pub fn new(name: impl Into<String>, value: f64, error: f64) -> Self {
        Self {
            name: name.into(),
            value,
            error,
        }
    }

    pub fn measurement(&self) -> Measurement {
        Measurement::new(self.value, self.error)
    }
}

/// Owned parameter snapshot of a fit function.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParametricFunction {
    pub name: String,
    pub parameters: Vec<FitParameter>,
}

impl ParametricFunction {
    pub fn new(name: impl Into<String>, parameters: Vec<FitParameter>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    pub fn snapshot(name: impl Into<String>, function: &dyn FitFunction) -> Self {
        let parameters = (0..function.parameter_count())
            .map(|index| FitParameter {
                name: function
                    .parameter_name(index)
                    .map_or_else(|| format!("p{index}"), str::to_string),
                value: function.parameter(index).unwrap_or(f64::NAN),
                error: function.parameter_error(index).unwrap_or(f64::NAN),
            })
            .collect();
        Self::new(name, parameters)
    }
}

impl FitFunction for ParametricFunction {
    fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    fn parameter_name(&self, index: usize) -> Option<&str> {
        self.parameters
            .get(index)
            .map(|parameter| parameter.name.as_str())
    }

    fn parameter(&self, index: usize) -> Option<f64> {
        self.parameters.get(index).map(|parameter| parameter.value)
    }

    fn parameter_error(&self, index: usize) -> Option<f64> {
        self.parameters.get(index).map(|parameter| parameter.error)
    }
}

/// Accessor over a simultaneous mass / vn-versus-mass fit.
pub trait PeakFitAccessor {
    fn vn(&self) -> Measurement;
    fn mean(&self) -> Measurement;
    fn sigma(&self) -> Measurement;
    fn raw_yield(&self) -> Measurement;
    fn reduced_chi_square(&self) -> f64;
    fn fit_probability(&self) -> f64;

    fn mass_total_function(&self) -> &dyn FitFunction;
    fn vn_total_function(&self) -> &dyn FitFunction;
    fn mass_background_function(&self) -> &dyn FitFunction;
    fn vn_background_function(&self) -> &dyn FitFunction;
    fn mass_signal_function(&self) -> &dyn FitFunction;

    /// Background yield within `n_sigma` of the peak mean.
    fn background(&self, n_sigma: f64) -> Measurement;
    fn significance(&self, n_sigma: f64) -> Measurement;
}

/// Names of the secondary-peak parameters in the total fit functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryPeakNames {
    pub mass_mean: String,
    pub mass_sigma: String,
    pub mass_amplitude: String,
    pub vn_mean: String,
    pub vn_sigma: String,
    pub vn: String,
}

impl Default for SecondaryPeakNames {
    fn default() -> Self {
        Self {
            mass_mean: "SecPeakMean".to_string(),
            mass_sigma: "SecPeakSigma".to_string(),
            mass_amplitude: "SecPeakInt".to_string(),
            vn_mean: "SecPeakMean".to_string(),
            vn_sigma: "SecPeakSigma".to_string(),
            vn: "v2SecPeak".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitExtractionOptions {
    pub secondary_peak: Option<SecondaryPeakNames>,
    pub n_sigma: f64,
}

impl Default for FitExtractionOptions {
    fn default() -> Self {
        Self {
            secondary_peak: None,
            n_sigma: DEFAULT_BACKGROUND_SIGMAS,
        }
    }
}

impl FitExtractionOptions {
    pub fn with_secondary_peak(mut self, names: SecondaryPeakNames) -> Self {
        self.secondary_peak = Some(names);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryPeakParameters {
    pub mass_mean: Measurement,
    pub mass_sigma: Measurement,
    pub mass_amplitude: Measurement,
    pub vn_mean: Measurement,
    pub vn_sigma: Measurement,
    pub vn: Measurement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnFitResult {
    pub vn: Measurement,
    pub mean: Measurement,
    pub sigma: Measurement,
    pub raw_yield: Measurement,
    pub reduced_chi_square: f64,
    pub fit_probability: f64,
    pub mass_total_function: ParametricFunction,
    pub vn_total_function: ParametricFunction,
    pub mass_background_function: ParametricFunction,
    pub vn_background_function: ParametricFunction,
    pub mass_signal_function: ParametricFunction,
    pub n_sigma: f64,
    pub background: Measurement,
    pub significance: Measurement,
    pub secondary_peak: Option<SecondaryPeakParameters>,
}

pub fn extract_vn_fit_results<F: PeakFitAccessor + ?Sized>(
    fitter: &F,
    options: &FitExtractionOptions,
) -> FlowResult<VnFitResult> {
    let mass_total = fitter.mass_total_function();
    let vn_total = fitter.vn_total_function();

    let secondary_peak = match &options.secondary_peak {
        Some(names) => Some(SecondaryPeakParameters {
            mass_mean: named_parameter(mass_total, "mass", &names.mass_mean)?,
            mass_sigma: named_parameter(mass_total, "mass", &names.mass_sigma)?,
            mass_amplitude: named_parameter(mass_total, "mass", &names.mass_amplitude)?,
            vn_mean: named_parameter(vn_total, "vn", &names.vn_mean)?,
            vn_sigma: named_parameter(vn_total, "vn", &names.vn_sigma)?,
            vn: named_parameter(vn_total, "vn", &names.vn)?,
        }),
        None => None,
    };

    Ok(VnFitResult {
        vn: fitter.vn(),
        mean: fitter.mean(),
        sigma: fitter.sigma(),
        raw_yield: fitter.raw_yield(),
        reduced_chi_square: fitter.reduced_chi_square(),
        fit_probability: fitter.fit_probability(),
        mass_total_function: ParametricFunction::snapshot("fTotFuncMass", mass_total),
        vn_total_function: ParametricFunction::snapshot("fTotFuncVn", vn_total),
        mass_background_function: ParametricFunction::snapshot(
            "fBkgFuncMass",
            fitter.mass_background_function(),
        ),
        vn_background_function: ParametricFunction::snapshot(
            "fBkgFuncVn",
            fitter.vn_background_function(),
        ),
        mass_signal_function: ParametricFunction::snapshot(
            "fSgnFuncMass",
            fitter.mass_signal_function(),
        ),
        n_sigma: options.n_sigma,
        background: fitter.background(options.n_sigma),
        significance: fitter.significance(options.n_sigma),
        secondary_peak,
    })
}

fn named_parameter(
    function: &dyn FitFunction,
    dimension: &str,
    name: &str,
) -> FlowResult<Measurement> {
    function
        .parameter_by_name(name)
        .map(|parameter| parameter.measurement())
        .ok_or_else(|| {
            FlowError::computation(
                "FIT.SECONDARY_PEAK_PARAMETER",
                format!("{dimension} fit function has no parameter named '{name}'"),
            )
        })
}
