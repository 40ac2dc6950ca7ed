use super::BinningError;
use serde::{Deserialize, Serialize};

const EDGE_MATCH_TOLERANCE: f64 = 1.0e-9;

/// One histogram axis with native bins numbered `1..=bin_count()`.
///
/// `find_bin` follows the usual convention of bin `0` for underflow and
/// `bin_count() + 1` for overflow. An optional range restricts later
/// projections and statistics to a contiguous block of native bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AxisSpec", into = "AxisSpec")]
pub struct Axis {
    title: String,
    edges: Vec<f64>,
    range: Option<(usize, usize)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AxisSpec {
    #[serde(default)]
    title: String,
    edges: Vec<f64>,
}

impl TryFrom<AxisSpec> for Axis {
    type Error = BinningError;

    fn try_from(spec: AxisSpec) -> Result<Self, Self::Error> {
        Ok(Self::variable(spec.edges)?.with_title(spec.title))
    }
}

impl From<Axis> for AxisSpec {
    fn from(axis: Axis) -> Self {
        Self {
            title: axis.title,
            edges: axis.edges,
        }
    }
}

impl Axis {
    pub fn uniform(bin_count: usize, low: f64, high: f64) -> Result<Self, BinningError> {
        if bin_count == 0 {
            return Err(BinningError::EmptyAxis);
        }
        if !low.is_finite() || !high.is_finite() || low >= high {
            return Err(BinningError::InvalidLimits { low, high });
        }
        let width = (high - low) / bin_count as f64;
        let mut edges: Vec<f64> = (0..bin_count)
            .map(|index| low + width * index as f64)
            .collect();
        edges.push(high);
        Ok(Self {
            title: String::new(),
            edges,
            range: None,
        })
    }

    pub fn variable(edges: Vec<f64>) -> Result<Self, BinningError> {
        if edges.len() < 2 {
            return Err(BinningError::EmptyAxis);
        }
        for (index, pair) in edges.windows(2).enumerate() {
            if !pair[0].is_finite() || !pair[1].is_finite() || pair[1] <= pair[0] {
                return Err(BinningError::NonIncreasingEdges {
                    index: index + 1,
                    previous: pair[0],
                    current: pair[1],
                });
            }
        }
        Ok(Self {
            title: String::new(),
            edges,
            range: None,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn bin_count(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn low(&self) -> f64 {
        self.edges[0]
    }

    pub fn high(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Lower edge of native bin `bin` (1-based). Panics outside `1..=bin_count()`.
    pub fn bin_low_edge(&self, bin: usize) -> f64 {
        self.edges[bin - 1]
    }

    pub fn bin_up_edge(&self, bin: usize) -> f64 {
        self.edges[bin]
    }

    pub fn bin_center(&self, bin: usize) -> f64 {
        0.5 * (self.edges[bin - 1] + self.edges[bin])
    }

    pub fn find_bin(&self, value: f64) -> usize {
        if value.is_nan() || value < self.low() {
            return 0;
        }
        if value >= self.high() {
            return self.bin_count() + 1;
        }
        self.edges.partition_point(|edge| *edge <= value)
    }

    /// Native bin block covering `[low, high)` by nearest-bin lookup.
    ///
    /// A requested edge that coincides with a native edge does not pull in the
    /// neighbouring bin. The result may be empty (`last < first`).
    pub fn snapped_range(&self, low: f64, high: f64) -> (usize, usize) {
        let bin_count = self.bin_count();

        let mut first = self.find_bin(low).max(1);
        if first <= bin_count && edges_match(self.bin_up_edge(first), low) {
            first += 1;
        }

        let mut last = self.find_bin(high).min(bin_count + 1);
        if last == bin_count + 1 {
            last = bin_count;
        } else if last >= 1 && edges_match(self.bin_low_edge(last), high) {
            last -= 1;
        } else if last == 0 {
            return (1, 0);
        }

        (first, last)
    }

    /// Restricts to native bins `first..=last`, clipped to the axis. An empty
    /// block (`last < first`) selects nothing.
    pub fn set_range(&mut self, first: usize, last: usize) {
        self.range = Some((first.max(1), last.min(self.bin_count())));
    }

    pub fn set_range_user(&mut self, low: f64, high: f64) {
        let (first, last) = self.snapped_range(low, high);
        self.range = Some((first, last));
    }

    pub fn reset_range(&mut self) {
        self.range = None;
    }

    /// Active native bin block, `(1, bin_count())` when unrestricted.
    pub fn range(&self) -> (usize, usize) {
        self.range.unwrap_or((1, self.bin_count()))
    }

    pub fn is_restricted(&self) -> bool {
        self.range.is_some()
    }

    pub fn in_range(&self, bin: usize) -> bool {
        let (first, last) = self.range();
        bin >= first && bin <= last
    }

    pub(crate) fn same_binning(&self, other: &Axis) -> bool {
        self.edges.len() == other.edges.len()
            && self
                .edges
                .iter()
                .zip(&other.edges)
                .all(|(left, right)| edges_match(*left, *right))
    }
}

fn edges_match(left: f64, right: f64) -> bool {
    (left - right).abs() <= EDGE_MATCH_TOLERANCE * left.abs().max(right.abs()).max(1.0)
}
