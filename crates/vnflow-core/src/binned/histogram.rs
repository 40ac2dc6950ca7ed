use super::{Axis, BinnedDataset, BinningError};
use crate::domain::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

/// Dense N-dimensional weighted histogram.
///
/// Only native bins are stored; fills outside every axis range are dropped.
/// Contents are laid out with the last axis varying fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HistogramSpec", into = "HistogramSpec")]
pub struct Histogram {
    name: String,
    axes: Vec<Axis>,
    contents: Vec<f64>,
    sumw2: Vec<f64>,
    entries: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistogramSpec {
    name: String,
    axes: Vec<Axis>,
    contents: Vec<f64>,
    #[serde(default)]
    sumw2: Option<Vec<f64>>,
    #[serde(default)]
    entries: Option<f64>,
}

impl TryFrom<HistogramSpec> for Histogram {
    type Error = BinningError;

    fn try_from(spec: HistogramSpec) -> Result<Self, Self::Error> {
        if spec.axes.is_empty() {
            return Err(BinningError::NoAxes);
        }
        let expected = bin_volume(&spec.axes);
        if spec.contents.len() != expected {
            return Err(BinningError::ContentLength {
                expected,
                actual: spec.contents.len(),
            });
        }
        // Without stored squared weights every bin is treated as unit-weight counts.
        let sumw2 = match spec.sumw2 {
            Some(sumw2) if sumw2.len() != expected => {
                return Err(BinningError::ContentLength {
                    expected,
                    actual: sumw2.len(),
                });
            }
            Some(sumw2) => sumw2,
            None => spec.contents.iter().map(|content| content.abs()).collect(),
        };
        let entries = spec
            .entries
            .unwrap_or_else(|| spec.contents.iter().sum::<f64>());
        Ok(Self {
            name: spec.name,
            axes: spec.axes,
            contents: spec.contents,
            sumw2,
            entries,
        })
    }
}

impl From<Histogram> for HistogramSpec {
    fn from(histogram: Histogram) -> Self {
        Self {
            name: histogram.name,
            axes: histogram.axes,
            contents: histogram.contents,
            sumw2: Some(histogram.sumw2),
            entries: Some(histogram.entries),
        }
    }
}

impl Histogram {
    pub fn new(name: impl Into<String>, axes: Vec<Axis>) -> Result<Self, BinningError> {
        if axes.is_empty() {
            return Err(BinningError::NoAxes);
        }
        let volume = bin_volume(&axes);
        Ok(Self {
            name: name.into(),
            axes,
            contents: vec![0.0; volume],
            sumw2: vec![0.0; volume],
            entries: 0.0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn axis_mut(&mut self, index: usize) -> FlowResult<&mut Axis> {
        let dimensions = self.axes.len();
        self.axes
            .get_mut(index)
            .ok_or_else(|| axis_out_of_range(index, dimensions))
    }

    /// Adds `weight` at `coordinates`; returns `false` when the point lies
    /// outside the native bins of any axis.
    pub fn fill(&mut self, coordinates: &[f64], weight: f64) -> bool {
        if coordinates.len() != self.axes.len() {
            return false;
        }
        let bins: Vec<usize> = self
            .axes
            .iter()
            .zip(coordinates)
            .map(|(axis, value)| axis.find_bin(*value))
            .collect();
        self.entries += 1.0;
        match self.flat_index(&bins) {
            Some(flat) => {
                self.contents[flat] += weight;
                self.sumw2[flat] += weight * weight;
                true
            }
            None => false,
        }
    }

    pub fn bin_content(&self, bins: &[usize]) -> Option<f64> {
        self.flat_index(bins).map(|flat| self.contents[flat])
    }

    pub fn bin_error(&self, bins: &[usize]) -> Option<f64> {
        self.flat_index(bins).map(|flat| self.sumw2[flat].sqrt())
    }

    pub fn set_bin_content(&mut self, bins: &[usize], content: f64, error: f64) -> FlowResult<()> {
        let flat = self.flat_index(bins).ok_or_else(|| {
            FlowError::input_validation(
                "INPUT.HISTOGRAM_BIN",
                format!("bin {:?} is outside histogram '{}'", bins, self.name),
            )
        })?;
        self.contents[flat] = content;
        self.sumw2[flat] = error * error;
        Ok(())
    }

    pub fn set_entries(&mut self, entries: f64) {
        self.entries = entries;
    }

    /// Sum of weights inside the active ranges.
    pub fn integral(&self) -> f64 {
        let mut total = 0.0;
        self.visit_in_range(|_, flat| total += self.contents[flat]);
        total
    }

    /// `(sum w)^2 / sum w^2` inside the active ranges.
    pub fn effective_entries(&self) -> f64 {
        let mut sumw = 0.0;
        let mut sumw2 = 0.0;
        self.visit_in_range(|_, flat| {
            sumw += self.contents[flat];
            sumw2 += self.sumw2[flat];
        });
        if sumw2 > 0.0 { sumw * sumw / sumw2 } else { 0.0 }
    }

    pub fn std_dev(&self, axis: usize) -> FlowResult<f64> {
        Ok(self.moments(axis)?.variance.sqrt())
    }

    /// Bin-by-bin sum with another histogram of identical binning.
    pub fn add(&mut self, other: &Histogram) -> FlowResult<()> {
        let compatible = self.axes.len() == other.axes.len()
            && self
                .axes
                .iter()
                .zip(&other.axes)
                .all(|(left, right)| left.same_binning(right));
        if !compatible {
            return Err(FlowError::input_validation(
                "INPUT.HISTOGRAM_BINNING",
                format!(
                    "cannot add '{}' to '{}': binning differs",
                    other.name, self.name
                ),
            ));
        }
        for (content, added) in self.contents.iter_mut().zip(&other.contents) {
            *content += added;
        }
        for (sumw2, added) in self.sumw2.iter_mut().zip(&other.sumw2) {
            *sumw2 += added;
        }
        self.entries += other.entries;
        Ok(())
    }

    fn moments(&self, axis: usize) -> FlowResult<Moments> {
        let target = self.checked_axis(axis)?;
        let mut sumw = 0.0;
        let mut sumw2 = 0.0;
        let mut sumwx = 0.0;
        let mut sumwx2 = 0.0;
        self.visit_in_range(|bins, flat| {
            let weight = self.contents[flat];
            let center = target.bin_center(bins[axis]);
            sumw += weight;
            sumw2 += self.sumw2[flat];
            sumwx += weight * center;
            sumwx2 += weight * center * center;
        });

        if sumw == 0.0 {
            return Ok(Moments {
                mean: 0.0,
                variance: 0.0,
                effective_entries: 0.0,
            });
        }
        let mean = sumwx / sumw;
        let variance = (sumwx2 / sumw - mean * mean).max(0.0);
        let effective_entries = if sumw2 > 0.0 { sumw * sumw / sumw2 } else { 0.0 };
        Ok(Moments {
            mean,
            variance,
            effective_entries,
        })
    }

    fn checked_axis(&self, index: usize) -> FlowResult<&Axis> {
        self.axes
            .get(index)
            .ok_or_else(|| axis_out_of_range(index, self.axes.len()))
    }

    fn flat_index(&self, bins: &[usize]) -> Option<usize> {
        if bins.len() != self.axes.len() {
            return None;
        }
        let mut flat = 0;
        for (axis, bin) in self.axes.iter().zip(bins) {
            if *bin == 0 || *bin > axis.bin_count() {
                return None;
            }
            flat = flat * axis.bin_count() + (bin - 1);
        }
        Some(flat)
    }

    /// Calls `visit(bins, flat_index)` for every bin inside all active ranges.
    fn visit_in_range(&self, mut visit: impl FnMut(&[usize], usize)) {
        let ranges: Vec<(usize, usize)> = self.axes.iter().map(Axis::range).collect();
        if ranges.iter().any(|(first, last)| last < first) {
            return;
        }
        let mut bins: Vec<usize> = ranges.iter().map(|(first, _)| *first).collect();
        loop {
            if let Some(flat) = self.flat_index(&bins) {
                visit(&bins, flat);
            }

            let mut dimension = bins.len();
            loop {
                if dimension == 0 {
                    return;
                }
                dimension -= 1;
                if bins[dimension] < ranges[dimension].1 {
                    bins[dimension] += 1;
                    break;
                }
                bins[dimension] = ranges[dimension].0;
            }
        }
    }
}

impl BinnedDataset for Histogram {
    fn dimensions(&self) -> usize {
        self.axes.len()
    }

    fn axis(&self, index: usize) -> FlowResult<&Axis> {
        self.checked_axis(index)
    }

    fn restrict_range(&mut self, axis: usize, first: usize, last: usize) -> FlowResult<()> {
        self.axis_mut(axis)?.set_range(first, last);
        Ok(())
    }

    fn project(&self, axes: &[usize]) -> FlowResult<Histogram> {
        if axes.is_empty() {
            return Err(FlowError::input_validation(
                "INPUT.PROJECTION_AXES",
                format!("projection of '{}' needs at least one axis", self.name),
            ));
        }
        for (position, axis) in axes.iter().enumerate() {
            self.checked_axis(*axis)?;
            if axes[..position].contains(axis) {
                return Err(FlowError::input_validation(
                    "INPUT.PROJECTION_AXES",
                    format!("projection of '{}' repeats axis {}", self.name, axis),
                ));
            }
        }

        let projected_axes: Vec<Axis> = axes
            .iter()
            .map(|axis| {
                let mut copy = self.axes[*axis].clone();
                copy.reset_range();
                copy
            })
            .collect();
        let mut projection = Histogram::new(
            format!("{}_proj_{}", self.name, join_axes(axes)),
            projected_axes,
        )
        .map_err(|source| {
            FlowError::internal("SYS.PROJECTION_AXES", source.to_string())
        })?;

        let mut target_bins = vec![0; axes.len()];
        let mut entries = 0.0;
        self.visit_in_range(|bins, flat| {
            for (slot, axis) in target_bins.iter_mut().zip(axes) {
                *slot = bins[*axis];
            }
            if let Some(target) = projection.flat_index(&target_bins) {
                projection.contents[target] += self.contents[flat];
                projection.sumw2[target] += self.sumw2[flat];
                entries += self.contents[flat];
            }
        });
        projection.entries = entries;
        Ok(projection)
    }

    fn mean(&self, axis: usize) -> FlowResult<f64> {
        Ok(self.moments(axis)?.mean)
    }

    fn mean_error(&self, axis: usize) -> FlowResult<f64> {
        let moments = self.moments(axis)?;
        if moments.effective_entries > 0.0 {
            Ok((moments.variance / moments.effective_entries).sqrt())
        } else {
            Ok(0.0)
        }
    }

    fn entries(&self) -> f64 {
        self.entries
    }
}

struct Moments {
    mean: f64,
    variance: f64,
    effective_entries: f64,
}

fn bin_volume(axes: &[Axis]) -> usize {
    axes.iter().map(Axis::bin_count).product()
}

fn join_axes(axes: &[usize]) -> String {
    axes.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("_")
}

fn axis_out_of_range(index: usize, dimensions: usize) -> FlowError {
    FlowError::input_validation(
        "INPUT.AXIS_INDEX",
        format!("axis index {index} is outside a {dimensions}-dimensional dataset"),
    )
}

#[cfg(test)]
mod tests {
    use super::Histogram;
    use crate::binned::{Axis, BinnedDataset, BinningError};

    fn mass_vn_histogram() -> Histogram {
        let mut histogram = Histogram::new(
            "hMassVn",
            vec![
                Axis::uniform(4, 1.0, 2.0).expect("mass axis"),
                Axis::uniform(4, -1.0, 1.0).expect("vn axis"),
            ],
        )
        .expect("histogram");
        histogram.fill(&[1.1, -0.75], 2.0);
        histogram.fill(&[1.1, 0.25], 1.0);
        histogram.fill(&[1.6, 0.75], 3.0);
        histogram.fill(&[1.9, 0.25], 1.0);
        histogram
    }

    #[test]
    fn fill_drops_points_outside_native_bins() {
        let mut histogram = mass_vn_histogram();
        assert!(!histogram.fill(&[3.0, 0.0], 1.0));
        assert!(!histogram.fill(&[1.5], 1.0));
        assert_eq!(histogram.integral(), 7.0);
        assert_eq!(histogram.bin_content(&[1, 1]), Some(2.0));
        assert_eq!(histogram.bin_content(&[0, 1]), None);
    }

    #[test]
    fn projection_sums_over_dropped_axes() {
        let histogram = mass_vn_histogram();
        let vn = histogram.project(&[1]).expect("projection");
        assert_eq!(vn.dimensions(), 1);
        assert_eq!(vn.bin_content(&[1]), Some(2.0));
        assert_eq!(vn.bin_content(&[3]), Some(2.0));
        assert_eq!(vn.bin_content(&[4]), Some(3.0));
        assert_eq!(vn.entries(), 7.0);

        let swapped = histogram.project(&[1, 0]).expect("projection");
        assert_eq!(swapped.bin_content(&[4, 3]), Some(3.0));
    }

    #[test]
    fn projection_honours_ranges_without_mutating_source() {
        let histogram = mass_vn_histogram();
        let mut restricted = histogram.clone();
        restricted.restrict_range(0, 1, 1).expect("range");
        let vn = restricted.project(&[1]).expect("projection");

        assert_eq!(vn.integral(), 3.0);
        assert!(!histogram.axes()[0].is_restricted());
        assert_eq!(histogram.integral(), 7.0);
    }

    #[test]
    fn projection_rejects_bad_axes() {
        let histogram = mass_vn_histogram();
        assert_eq!(
            histogram.project(&[2]).expect_err("axis 2").placeholder(),
            "INPUT.AXIS_INDEX"
        );
        assert_eq!(
            histogram.project(&[1, 1]).expect_err("repeat").placeholder(),
            "INPUT.PROJECTION_AXES"
        );
        assert!(histogram.project(&[]).is_err());
    }

    #[test]
    fn mean_and_mean_error_follow_weighted_bin_centres() {
        let mut histogram = Histogram::new("h", vec![Axis::uniform(2, 0.0, 2.0).expect("axis")])
            .expect("histogram");
        for _ in 0..3 {
            histogram.fill(&[0.5], 1.0);
        }
        histogram.fill(&[1.5], 1.0);

        let mean = histogram.mean(0).expect("mean");
        assert!((mean - 0.75).abs() < 1.0e-12);
        let variance: f64 = (3.0 * 0.25 + 2.25) / 4.0 - 0.75 * 0.75;
        let expected_error = (variance / 4.0).sqrt();
        let error = histogram.mean_error(0).expect("mean error");
        assert!((error - expected_error).abs() < 1.0e-12);
        assert!((histogram.std_dev(0).expect("std") - variance.sqrt()).abs() < 1.0e-12);
    }

    #[test]
    fn empty_histogram_statistics_are_zero() {
        let histogram = Histogram::new("h", vec![Axis::uniform(2, 0.0, 2.0).expect("axis")])
            .expect("histogram");
        assert_eq!(histogram.mean(0).expect("mean"), 0.0);
        assert_eq!(histogram.mean_error(0).expect("error"), 0.0);
        assert_eq!(histogram.effective_entries(), 0.0);
    }

    #[test]
    fn add_requires_matching_binning() {
        let mut first = mass_vn_histogram();
        let second = mass_vn_histogram();
        first.add(&second).expect("compatible add");
        assert_eq!(first.integral(), 14.0);

        let other = Histogram::new("other", vec![Axis::uniform(4, 1.0, 2.0).expect("axis")])
            .expect("histogram");
        let error = first.add(&other).expect_err("dimension mismatch");
        assert_eq!(error.placeholder(), "INPUT.HISTOGRAM_BINNING");
    }

    #[test]
    fn json_spec_validates_content_length() {
        let json = r#"{"name":"h","axes":[{"edges":[0.0,1.0,2.0]}],"contents":[1.0]}"#;
        let error = serde_json::from_str::<Histogram>(json).expect_err("short contents");
        assert!(error.to_string().contains("expected 2"));

        let json = r#"{"name":"h","axes":[{"edges":[0.0,1.0,2.0]}],"contents":[1.0,3.0]}"#;
        let histogram: Histogram = serde_json::from_str(json).expect("valid histogram");
        assert_eq!(histogram.entries(), 4.0);
        assert_eq!(histogram.bin_error(&[2]), Some(3.0_f64.sqrt()));
        assert_eq!(
            Histogram::new("empty", Vec::new()).expect_err("no axes"),
            BinningError::NoAxes
        );
    }
}
