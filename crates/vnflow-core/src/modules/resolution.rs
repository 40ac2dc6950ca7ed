//! Event-plane / scalar-product resolution from subevent correlations.
//!
//! Two undefined-value conventions coexist: the calculator proper returns
//! [`RESOLUTION_UNDEFINED`], while the by-name cross-check [`compute_r2`]
//! returns [`R2_UNDEFINED`]. Downstream consumers rely on both.

use super::records::{
    CorrelationRecord, RecordLookup, ResolutionSource, correlation_record_for_pair,
};
use super::triplet::SubeventTriplet;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::domain::{
    CentralityBin, DetectorLabel, DetectorPair, FlowError, FlowResult, Measurement,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const RESOLUTION_UNDEFINED: f64 = 0.0;
pub const R2_UNDEFINED: f64 = -999.0;

/// Resolution from one (`sqrt(m)`) or three (`sqrt(AB * AC / BC)`) subevent
/// means. Any other count is an input-validation error.
pub fn compute_resolution(means: &[f64], sink: &dyn DiagnosticSink) -> FlowResult<f64> {
    let product = match means {
        [single] => *single,
        [ab, ac, bc] => {
            if *bc == 0.0 {
                0.0
            } else {
                ab * ac / bc
            }
        }
        _ => {
            sink.report(DiagnosticEvent::InvalidSubeventCount { count: means.len() });
            return Err(FlowError::input_validation(
                "INPUT.RESOLUTION_SUBEVENTS",
                format!(
                    "resolution needs 1 or 3 subevent means, got {}",
                    means.len()
                ),
            ));
        }
    };

    if product > 0.0 {
        Ok(product.sqrt())
    } else {
        sink.report(DiagnosticEvent::DegenerateResolution {
            subevents: means.len(),
            product,
            sentinel: RESOLUTION_UNDEFINED,
        });
        Ok(RESOLUTION_UNDEFINED)
    }
}

/// Subevent configuration feeding the resolution calculator.
#[derive(Debug, Clone, PartialEq)]
pub enum Subevents {
    Single(CorrelationRecord),
    Triplet(SubeventTriplet),
}

impl Subevents {
    /// Records in the order the calculator expects them.
    pub fn records(&self) -> Vec<&CorrelationRecord> {
        match self {
            Self::Single(record) => vec![record],
            Self::Triplet(triplet) => triplet.records().iter().collect(),
        }
    }

    pub fn labels(&self) -> Vec<DetectorLabel> {
        match self {
            Self::Single(record) => vec![record.pair().first(), record.pair().second()],
            Self::Triplet(triplet) => triplet.labels().to_vec(),
        }
    }

    pub fn tag(&self) -> String {
        match self {
            Self::Single(record) => record.pair().tag(),
            Self::Triplet(triplet) => triplet.tag(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileMean {
    pub percentile: u32,
    pub mean: Measurement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PercentileResolution {
    pub percentile: u32,
    pub resolution: f64,
}

/// Resolution over a centrality window, per 1% bin and integrated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionResult {
    subevents: String,
    labels: Vec<DetectorLabel>,
    window: CentralityBin,
    mean_profiles: BTreeMap<DetectorPair, Vec<PercentileMean>>,
    window_means: BTreeMap<DetectorPair, Measurement>,
    resolution_profile: Vec<PercentileResolution>,
    integrated_resolution: f64,
}

impl ResolutionResult {
    pub fn subevents(&self) -> &str {
        &self.subevents
    }

    pub fn labels(&self) -> &[DetectorLabel] {
        &self.labels
    }

    pub fn window(&self) -> CentralityBin {
        self.window
    }

    pub fn pairs(&self) -> impl Iterator<Item = DetectorPair> + '_ {
        self.window_means.keys().copied()
    }

    pub fn mean_profile(&self, pair: DetectorPair) -> Option<&[PercentileMean]> {
        self.mean_profiles.get(&pair).map(Vec::as_slice)
    }

    pub fn window_mean(&self, pair: DetectorPair) -> Option<Measurement> {
        self.window_means.get(&pair).copied()
    }

    pub fn resolution_profile(&self) -> &[PercentileResolution] {
        &self.resolution_profile
    }

    pub fn integrated_resolution(&self) -> f64 {
        self.integrated_resolution
    }
}

/// Fine-grained (per percentile) and integrated resolution over `window`.
pub fn get_resolution(
    subevents: &Subevents,
    window: CentralityBin,
    sink: &dyn DiagnosticSink,
) -> FlowResult<ResolutionResult> {
    let records = subevents.records();

    let mut mean_profiles = BTreeMap::new();
    let mut window_means = BTreeMap::new();
    let mut percentile_means: Vec<Vec<f64>> =
        vec![Vec::with_capacity(records.len()); window.width() as usize];
    let mut integrated_means = Vec::with_capacity(records.len());

    for record in &records {
        let mut profile = Vec::with_capacity(window.width() as usize);
        for (slot, percentile) in window.percentiles().enumerate() {
            let mean = record.percentile_mean(percentile)?;
            percentile_means[slot].push(mean.value);
            profile.push(PercentileMean { percentile, mean });
        }
        let window_mean = record.window_mean(window)?;
        integrated_means.push(window_mean.value);

        tracing::debug!(
            record = record.name(),
            window = %window,
            mean = window_mean.value,
            "subevent window mean"
        );
        mean_profiles.insert(record.pair(), profile);
        window_means.insert(record.pair(), window_mean);
    }

    let mut resolution_profile = Vec::with_capacity(window.width() as usize);
    for (percentile, means) in window.percentiles().zip(&percentile_means) {
        resolution_profile.push(PercentileResolution {
            percentile,
            resolution: compute_resolution(means, sink)?,
        });
    }
    let integrated_resolution = compute_resolution(&integrated_means, sink)?;

    Ok(ResolutionResult {
        subevents: subevents.tag(),
        labels: subevents.labels(),
        window,
        mean_profiles,
        window_means,
        resolution_profile,
        integrated_resolution,
    })
}

/// Integrated three-subevent resolution read by record name.
///
/// Returns [`R2_UNDEFINED`] when `BC` is zero or the product is not positive.
pub fn compute_r2(
    lookup: &impl RecordLookup,
    source: &ResolutionSource,
    window: CentralityBin,
    detectors: [DetectorLabel; 3],
    sink: &dyn DiagnosticSink,
) -> FlowResult<f64> {
    let [a, b, c] = detectors;
    let mut means = [0.0; 3];
    for (slot, (x, y)) in [(a, b), (a, c), (b, c)].into_iter().enumerate() {
        let pair = DetectorPair::new(x, y)?;
        let record = correlation_record_for_pair(lookup, source, pair, sink)?;
        means[slot] = record.window_mean(window)?.value;
    }
    let [ab, ac, bc] = means;

    if bc == 0.0 {
        sink.report(DiagnosticEvent::ZeroReferenceCorrelation {
            sentinel: R2_UNDEFINED,
        });
        return Ok(R2_UNDEFINED);
    }
    let product = ab * ac / bc;
    if product > 0.0 {
        Ok(product.sqrt())
    } else {
        sink.report(DiagnosticEvent::DegenerateResolution {
            subevents: 3,
            product,
            sentinel: R2_UNDEFINED,
        });
        Ok(R2_UNDEFINED)
    }
}

#[cfg(test)]
mod tests {
    use super::{R2_UNDEFINED, RESOLUTION_UNDEFINED, compute_resolution};
    use crate::diagnostics::{DiagnosticEvent, RecordingSink};
    use crate::domain::FlowErrorCategory;

    #[test]
    fn single_subevent_is_square_root_or_zero() {
        let sink = RecordingSink::new();
        assert_eq!(compute_resolution(&[0.25], &sink).expect("single"), 0.5);
        assert_eq!(
            compute_resolution(&[-0.1], &sink).expect("negative"),
            RESOLUTION_UNDEFINED
        );
        assert_eq!(compute_resolution(&[0.0], &sink).expect("zero"), 0.0);
        assert_eq!(
            sink.count_matching(|event| matches!(event, DiagnosticEvent::DegenerateResolution { .. })),
            2
        );
    }

    #[test]
    fn three_subevents_use_ab_ac_over_bc() {
        let sink = RecordingSink::new();
        let resolution = compute_resolution(&[0.2, 0.3, 0.15], &sink).expect("triplet");
        assert!((resolution - 0.4_f64.sqrt()).abs() < 1.0e-12);
        assert!(sink.is_empty());
    }

    #[test]
    fn zero_reference_correlation_yields_zero() {
        let sink = RecordingSink::new();
        assert_eq!(
            compute_resolution(&[0.2, 0.3, 0.0], &sink).expect("bc zero"),
            0.0
        );
        assert_eq!(
            compute_resolution(&[-0.2, 0.3, 0.1], &sink).expect("negative"),
            0.0
        );
    }

    #[test]
    fn other_cardinalities_are_fatal() {
        let sink = RecordingSink::new();
        for means in [&[][..], &[0.1, 0.2][..], &[0.1, 0.2, 0.3, 0.4][..]] {
            let error = compute_resolution(means, &sink).expect_err("bad count");
            assert_eq!(error.category(), FlowErrorCategory::InputValidationError);
            assert_eq!(error.exit_code(), 2);
            assert_eq!(error.placeholder(), "INPUT.RESOLUTION_SUBEVENTS");
        }
        assert_eq!(
            sink.events()[1],
            DiagnosticEvent::InvalidSubeventCount { count: 2 }
        );
    }

    #[test]
    fn sentinels_differ_between_calculator_and_cross_check() {
        assert_eq!(RESOLUTION_UNDEFINED, 0.0);
        assert_eq!(R2_UNDEFINED, -999.0);
    }
}
