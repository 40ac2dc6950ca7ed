pub mod errors;

pub use errors::{FlowError, FlowErrorCategory, FlowResult};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Detection subsystem providing one subevent flow vector.
///
/// Declaration order is the canonical priority order used when a subevent
/// triplet picks its reference detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetectorLabel {
    #[serde(rename = "FT0c")]
    Ft0c,
    #[serde(rename = "FT0a")]
    Ft0a,
    #[serde(rename = "FV0a")]
    Fv0a,
    #[serde(rename = "TPCpos")]
    TpcPos,
    #[serde(rename = "FT0m")]
    Ft0m,
    #[serde(rename = "TPCneg")]
    TpcNeg,
}

pub const CANONICAL_DETECTORS: [DetectorLabel; 6] = [
    DetectorLabel::Ft0c,
    DetectorLabel::Ft0a,
    DetectorLabel::Fv0a,
    DetectorLabel::TpcPos,
    DetectorLabel::Ft0m,
    DetectorLabel::TpcNeg,
];

impl DetectorLabel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ft0c => "FT0c",
            Self::Ft0a => "FT0a",
            Self::Fv0a => "FV0a",
            Self::TpcPos => "TPCpos",
            Self::Ft0m => "FT0m",
            Self::TpcNeg => "TPCneg",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        CANONICAL_DETECTORS
            .iter()
            .copied()
            .find(|label| label.as_str() == tag)
    }
}

impl Display for DetectorLabel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for DetectorLabel {
    type Err = FlowError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Self::from_tag(tag.trim()).ok_or_else(|| {
            FlowError::input_validation(
                "INPUT.DETECTOR_LABEL",
                format!(
                    "unknown detector label '{}'; expected one of {}",
                    tag,
                    CANONICAL_DETECTORS.map(DetectorLabel::as_str).join(", ")
                ),
            )
        })
    }
}

/// Unordered pair of two distinct detectors.
///
/// Equality, ordering and hashing ignore which label was named first; the
/// as-named order is kept only to render record names.
#[derive(Debug, Clone, Copy)]
pub struct DetectorPair {
    first: DetectorLabel,
    second: DetectorLabel,
}

impl DetectorPair {
    pub fn new(first: DetectorLabel, second: DetectorLabel) -> FlowResult<Self> {
        if first == second {
            return Err(FlowError::input_validation(
                "INPUT.DETECTOR_PAIR",
                format!("detector pair needs two distinct labels, got {first}{second}"),
            ));
        }
        Ok(Self { first, second })
    }

    /// Splits a concatenated tag such as `FT0cTPCpos` into its two labels.
    pub fn from_tag(tag: &str) -> Option<Self> {
        CANONICAL_DETECTORS.iter().copied().find_map(|first| {
            let rest = tag.strip_prefix(first.as_str())?;
            let second = DetectorLabel::from_tag(rest)?;
            Self::new(first, second).ok()
        })
    }

    pub const fn first(&self) -> DetectorLabel {
        self.first
    }

    pub const fn second(&self) -> DetectorLabel {
        self.second
    }

    pub fn contains(&self, label: DetectorLabel) -> bool {
        self.first == label || self.second == label
    }

    /// The partner of `label`, or `None` when `label` is not in the pair.
    pub fn partner(&self, label: DetectorLabel) -> Option<DetectorLabel> {
        if self.first == label {
            Some(self.second)
        } else if self.second == label {
            Some(self.first)
        } else {
            None
        }
    }

    pub fn tag(&self) -> String {
        format!("{}{}", self.first, self.second)
    }

    fn sorted(&self) -> (DetectorLabel, DetectorLabel) {
        if self.first <= self.second {
            (self.first, self.second)
        } else {
            (self.second, self.first)
        }
    }
}

impl PartialEq for DetectorPair {
    fn eq(&self, other: &Self) -> bool {
        self.sorted() == other.sorted()
    }
}

impl Eq for DetectorPair {}

impl Hash for DetectorPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sorted().hash(state);
    }
}

impl PartialOrd for DetectorPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DetectorPair {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sorted().cmp(&other.sorted())
    }
}

impl Display for DetectorPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.first, self.second)
    }
}

impl Serialize for DetectorPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.tag())
    }
}

impl<'de> Deserialize<'de> for DetectorPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Self::from_tag(&tag)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid detector pair '{tag}'")))
    }
}

/// Half-open percentile interval `[min, max)` on the centrality axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CentralityBin {
    min: u32,
    max: u32,
}

impl CentralityBin {
    pub fn new(min: u32, max: u32) -> FlowResult<Self> {
        if min >= max {
            return Err(FlowError::input_validation(
                "INPUT.CENTRALITY_BIN",
                format!("centrality bin requires min < max, got [{min}, {max})"),
            ));
        }
        Ok(Self { min, max })
    }

    pub const fn min(&self) -> u32 {
        self.min
    }

    pub const fn max(&self) -> u32 {
        self.max
    }

    pub const fn width(&self) -> u32 {
        self.max - self.min
    }

    pub fn percentiles(&self) -> std::ops::Range<u32> {
        self.min..self.max
    }

    pub fn label(&self) -> String {
        format!("{}_{}", self.min, self.max)
    }
}

impl Display for CentralityBin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

const CENTRALITY_CLASSES: [(&str, u32, u32); 12] = [
    ("k010", 0, 10),
    ("k020", 0, 20),
    ("k2030", 20, 30),
    ("k3040", 30, 40),
    ("k3050", 30, 50),
    ("k4050", 40, 50),
    ("k2060", 20, 60),
    ("k4060", 40, 60),
    ("k6070", 60, 70),
    ("k6080", 60, 80),
    ("k7080", 70, 80),
    ("k0100", 0, 100),
];

/// Named analysis centrality window such as `k3050`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CentralityClass {
    tag: &'static str,
    bin: CentralityBin,
}

impl CentralityClass {
    pub fn from_tag(tag: &str) -> FlowResult<Self> {
        CENTRALITY_CLASSES
            .iter()
            .find(|(candidate, _, _)| *candidate == tag)
            .map(|(candidate, min, max)| Self {
                tag: candidate,
                bin: CentralityBin {
                    min: *min,
                    max: *max,
                },
            })
            .ok_or_else(|| {
                FlowError::input_validation(
                    "INPUT.CENTRALITY_CLASS",
                    format!("centrality class '{tag}' is not supported"),
                )
            })
    }

    pub const fn tag(&self) -> &'static str {
        self.tag
    }

    pub const fn bin(&self) -> CentralityBin {
        self.bin
    }

    pub fn label(&self) -> String {
        self.bin.label()
    }
}

/// Flow method whose resolution records are being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResolutionMethod {
    #[default]
    #[serde(rename = "sp")]
    ScalarProduct,
    #[serde(rename = "ep")]
    EventPlane,
}

impl ResolutionMethod {
    pub fn from_token(token: &str) -> FlowResult<Self> {
        match token.to_ascii_lowercase().as_str() {
            "sp" => Ok(Self::ScalarProduct),
            "ep" => Ok(Self::EventPlane),
            other => Err(FlowError::input_validation(
                "INPUT.RESOLUTION_METHOD",
                format!("unknown resolution method '{other}'; expected 'sp' or 'ep'"),
            )),
        }
    }

    pub const fn directory(self) -> &'static str {
        match self {
            Self::ScalarProduct => "spReso",
            Self::EventPlane => "epReso",
        }
    }

    pub const fn record_prefix(self) -> &'static str {
        match self {
            Self::ScalarProduct => "hSpReso",
            Self::EventPlane => "hEpReso",
        }
    }
}

/// A value with its one-sigma uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    pub uncertainty: f64,
}

impl Measurement {
    pub const fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }
}

/// Flow coefficient at fixed harmonic, mass bin and centrality bin.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VnEstimate {
    pub value: f64,
    pub uncertainty: f64,
}

impl VnEstimate {
    /// Returned when the anisotropy is not estimable.
    pub const UNDEFINED: Self = Self {
        value: 0.0,
        uncertainty: 0.0,
    };

    pub const fn new(value: f64, uncertainty: f64) -> Self {
        Self { value, uncertainty }
    }

    pub fn is_undefined(&self) -> bool {
        *self == Self::UNDEFINED
    }
}
