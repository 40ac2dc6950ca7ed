//! Projections of a multi-dimensional binned dataset onto the mass axis.

use crate::binned::{BinnedDataset, Histogram};
use crate::domain::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MassProfileBin {
    pub low: f64,
    pub high: f64,
    pub mean: f64,
    pub mean_error: f64,
}

/// Mean of a secondary observable per requested mass interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassProfile {
    bins: Vec<MassProfileBin>,
}

impl MassProfile {
    pub fn bins(&self) -> &[MassProfileBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn edges(&self) -> Vec<f64> {
        let mut edges: Vec<f64> = self.bins.iter().map(|bin| bin.low).collect();
        if let Some(last) = self.bins.last() {
            edges.push(last.high);
        }
        edges
    }
}

/// For each `[edges[i], edges[i + 1])` take the mean and its standard error
/// of the `vn_axis` marginal restricted to that mass interval.
pub fn vn_versus_mass<D: BinnedDataset>(
    dataset: &D,
    mass_bin_edges: &[f64],
    mass_axis: usize,
    vn_axis: usize,
) -> FlowResult<MassProfile> {
    validate_mass_edges(mass_bin_edges)?;
    let plane = dataset.project(&[mass_axis, vn_axis])?;
    let mass = plane.axis(0)?;

    let mut bins = Vec::with_capacity(mass_bin_edges.len() - 1);
    for interval in mass_bin_edges.windows(2) {
        let (low, high) = (interval[0], interval[1]);
        let (first, last) = mass.snapped_range(low, high);

        let mut slice = plane.clone();
        slice.restrict_range(0, first, last)?;
        let vn = slice.project(&[1])?;
        bins.push(MassProfileBin {
            low,
            high,
            mean: vn.mean(0)?,
            mean_error: vn.mean_error(0)?,
        });
    }

    tracing::debug!(bins = bins.len(), "projected vn versus mass");
    Ok(MassProfile { bins })
}

/// Where the secondary axis is cut into out-of-plane `[lower, split)` and
/// in-plane `[split, upper]` halves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSplit {
    pub lower: f64,
    pub split: f64,
    pub upper: f64,
}

impl Default for PlaneSplit {
    fn default() -> Self {
        Self {
            lower: -1.0,
            split: 0.0,
            upper: 1.0,
        }
    }
}

impl PlaneSplit {
    pub fn new(lower: f64, split: f64, upper: f64) -> FlowResult<Self> {
        let ordered = lower.is_finite() && upper.is_finite() && lower < split && split < upper;
        if !ordered {
            return Err(FlowError::input_validation(
                "INPUT.PLANE_SPLIT",
                format!("plane split needs lower < split < upper, got {lower}, {split}, {upper}"),
            ));
        }
        Ok(Self {
            lower,
            split,
            upper,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InOutMass {
    pub in_plane: Histogram,
    pub out_of_plane: Histogram,
}

/// In-plane and out-of-plane invariant-mass distributions.
pub fn invariant_mass_vs_deltaphi<D: BinnedDataset>(
    dataset: &D,
    deltaphi_axis: usize,
    mass_axis: usize,
    split: PlaneSplit,
) -> FlowResult<InOutMass> {
    let plane = dataset.project(&[mass_axis, deltaphi_axis])?;
    let deltaphi = plane.axis(1)?;
    // Closed upper edge: the in-plane half keeps values sitting on `upper`.
    let (in_first, _) = deltaphi.snapped_range(split.split, split.upper);
    let in_last = match deltaphi.find_bin(split.upper) {
        0 => 0,
        bin => bin.min(deltaphi.bin_count()),
    };
    // The bin holding an off-edge split belongs to the in-plane half only.
    let (out_first, _) = deltaphi.snapped_range(split.lower, split.split);
    let out_last = in_first.saturating_sub(1);

    let mut in_plane = plane.clone();
    in_plane.restrict_range(1, in_first, in_last)?;
    let mut in_plane = in_plane.project(&[0])?;
    in_plane.set_name("hist_invmass_in");

    let mut out_of_plane = plane;
    out_of_plane.restrict_range(1, out_first, out_last)?;
    let mut out_of_plane = out_of_plane.project(&[0])?;
    out_of_plane.set_name("hist_invmass_out");

    Ok(InOutMass {
        in_plane,
        out_of_plane,
    })
}

fn validate_mass_edges(edges: &[f64]) -> FlowResult<()> {
    if edges.len() < 2 {
        return Err(FlowError::input_validation(
            "INPUT.MASS_EDGES",
            format!("mass binning needs at least two edges, got {}", edges.len()),
        ));
    }
    for pair in edges.windows(2) {
        if !pair[0].is_finite() || !pair[1].is_finite() || pair[1] <= pair[0] {
            return Err(FlowError::input_validation(
                "INPUT.MASS_EDGES",
                format!(
                    "mass edges must be finite and strictly increasing, got {} then {}",
                    pair[0], pair[1]
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{PlaneSplit, invariant_mass_vs_deltaphi, vn_versus_mass};
    use crate::binned::{Axis, BinnedDataset, Histogram};

    fn mass_vn_pt() -> Histogram {
        let mut histogram = Histogram::new(
            "hSparseFlowCharm",
            vec![
                Axis::uniform(5, 0.0, 10.0).expect("pt"),
                Axis::uniform(40, 1.6, 2.2).expect("mass"),
                Axis::uniform(20, -1.0, 1.0).expect("vn"),
            ],
        )
        .expect("histogram");
        histogram.fill(&[3.0, 1.70, 0.15], 1.0);
        histogram.fill(&[3.0, 1.71, 0.35], 1.0);
        histogram.fill(&[5.0, 1.86, -0.45], 2.0);
        histogram.fill(&[5.0, 1.87, -0.25], 2.0);
        histogram.fill(&[7.0, 2.05, 0.85], 1.0);
        histogram
    }

    #[test]
    fn profile_bin_count_and_edges_follow_request() {
        let profile =
            vn_versus_mass(&mass_vn_pt(), &[1.6, 1.8, 1.95, 2.2], 1, 2).expect("profile");
        assert_eq!(profile.len(), 3);
        assert_eq!(profile.edges(), vec![1.6, 1.8, 1.95, 2.2]);
        assert!((profile.bins()[0].mean - 0.25).abs() < 1.0e-9);
        assert!((profile.bins()[1].mean + 0.35).abs() < 1.0e-9);
        assert!((profile.bins()[2].mean - 0.85).abs() < 1.0e-9);
        assert!(profile.bins()[0].mean_error > 0.0);
    }

    #[test]
    fn empty_mass_intervals_report_zero_mean_and_error() {
        let profile = vn_versus_mass(&mass_vn_pt(), &[1.6, 1.65, 2.2], 1, 2).expect("profile");
        assert_eq!(profile.bins()[0].mean, 0.0);
        assert_eq!(profile.bins()[0].mean_error, 0.0);
    }

    #[test]
    fn profile_is_deterministic_and_leaves_source_untouched() {
        let dataset = mass_vn_pt();
        let first = vn_versus_mass(&dataset, &[1.6, 1.9, 2.2], 1, 2).expect("first");
        let second = vn_versus_mass(&dataset, &[1.6, 1.9, 2.2], 1, 2).expect("second");
        assert_eq!(first, second);
        assert!(dataset.axes().iter().all(|axis| !axis.is_restricted()));
    }

    #[test]
    fn profile_rejects_bad_edges_and_axes() {
        let dataset = mass_vn_pt();
        let error = vn_versus_mass(&dataset, &[1.8], 1, 2).expect_err("one edge");
        assert_eq!(error.placeholder(), "INPUT.MASS_EDGES");
        let error = vn_versus_mass(&dataset, &[1.8, 1.7], 1, 2).expect_err("decreasing");
        assert_eq!(error.placeholder(), "INPUT.MASS_EDGES");
        let error = vn_versus_mass(&dataset, &[1.6, 1.8], 1, 5).expect_err("axis");
        assert_eq!(error.placeholder(), "INPUT.AXIS_INDEX");
    }

    #[test]
    fn plane_split_partitions_secondary_axis() {
        let mut dataset = Histogram::new(
            "hMassCosDeltaPhi",
            vec![
                Axis::uniform(10, 1.6, 2.2).expect("mass"),
                Axis::uniform(10, -1.0, 1.0).expect("cos deltaphi"),
            ],
        )
        .expect("histogram");
        dataset.fill(&[1.85, 0.5], 3.0);
        dataset.fill(&[1.85, 0.0], 1.0);
        dataset.fill(&[1.85, -0.5], 2.0);

        let split = invariant_mass_vs_deltaphi(&dataset, 1, 0, PlaneSplit::default())
            .expect("split");
        assert_eq!(split.in_plane.integral(), 4.0);
        assert_eq!(split.out_of_plane.integral(), 2.0);
        assert_eq!(split.in_plane.dimensions(), 1);
        assert_eq!(split.in_plane.name(), "hist_invmass_in");
        assert!(!dataset.axes()[1].is_restricted());
    }

    #[test]
    fn off_edge_split_assigns_each_bin_to_one_half() {
        let mut dataset = Histogram::new(
            "hMassCosDeltaPhi",
            vec![
                Axis::uniform(10, 1.6, 2.2).expect("mass"),
                Axis::uniform(10, -1.0, 1.0).expect("cos deltaphi"),
            ],
        )
        .expect("histogram");
        dataset.fill(&[1.85, 0.15], 1.0);
        dataset.fill(&[1.85, 0.05], 2.0);
        dataset.fill(&[1.85, -0.05], 4.0);

        let split = PlaneSplit::new(-1.0, 0.1, 1.0).expect("split");
        let halves = invariant_mass_vs_deltaphi(&dataset, 1, 0, split).expect("halves");

        assert_eq!(halves.in_plane.integral(), 3.0);
        assert_eq!(halves.out_of_plane.integral(), 4.0);
        assert_eq!(
            halves.in_plane.integral() + halves.out_of_plane.integral(),
            dataset.integral()
        );
    }

    #[test]
    fn plane_split_requires_ordered_bounds() {
        let error = PlaneSplit::new(-1.0, 1.5, 1.0).expect_err("split above upper");
        assert_eq!(error.placeholder(), "INPUT.PLANE_SPLIT");
        assert!(PlaneSplit::new(-1.0, 0.2, 1.0).is_ok());
    }
}
