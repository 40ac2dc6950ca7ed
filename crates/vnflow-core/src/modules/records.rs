use crate::binned::{BinnedDataset, Histogram};
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::domain::{
    CentralityBin, DetectorPair, FlowError, FlowResult, Measurement, ResolutionMethod,
};
use globset::{GlobBuilder, escape};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_TASK_NAME: &str = "hf-task-flow-charm-hadrons";

const CENTRALITY_AXIS: usize = 0;
const CORRELATION_AXIS: usize = 1;

/// Name-addressed access to stored histograms.
pub trait RecordLookup {
    fn get(&self, name: &str) -> Option<&Histogram>;

    fn names(&self) -> Vec<&str>;

    fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Like `get`, but absence is a lookup failure.
    fn require(&self, name: &str, sink: &dyn DiagnosticSink) -> FlowResult<&Histogram> {
        self.get(name).ok_or_else(|| {
            sink.report(DiagnosticEvent::RecordNotFound {
                name: name.to_string(),
            });
            FlowError::io_system(
                "IO.RECORD_NOT_FOUND",
                format!("record '{name}' does not exist"),
            )
        })
    }

    fn names_matching(&self, pattern: &str) -> FlowResult<Vec<&str>> {
        let matcher = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| {
                FlowError::input_validation(
                    "INPUT.RECORD_PATTERN",
                    format!("invalid record pattern '{pattern}': {source}"),
                )
            })?
            .compile_matcher();
        Ok(self
            .names()
            .into_iter()
            .filter(|name| matcher.is_match(name))
            .collect())
    }
}

/// JSON-backed collection of histograms keyed by slash-separated path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramStore {
    records: BTreeMap<String, Histogram>,
}

impl HistogramStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, histogram: Histogram) {
        self.records.insert(path.into(), histogram);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordLookup for HistogramStore {
    fn get(&self, name: &str) -> Option<&Histogram> {
        self.records.get(name)
    }

    fn names(&self) -> Vec<&str> {
        self.records.keys().map(String::as_str).collect()
    }
}

pub fn load_store(path: impl AsRef<Path>) -> FlowResult<HistogramStore> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| {
        FlowError::io_system(
            "IO.STORE_READ",
            format!("failed to read record store '{}': {}", path.display(), source),
        )
    })?;
    serde_json::from_str(&source).map_err(|source| {
        FlowError::input_validation(
            "INPUT.STORE_PARSE",
            format!("failed to parse record store '{}': {}", path.display(), source),
        )
    })
}

pub fn check_file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_file()
}

/// `true` when `path` is a readable store holding a record called `name`.
pub fn check_record_exists(path: impl AsRef<Path>, name: &str) -> bool {
    let path = path.as_ref();
    if !check_file_exists(path) {
        return false;
    }
    load_store(path).is_ok_and(|store| store.contains(name))
}

/// Where the pairwise resolution records of one analysis live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionSource {
    pub task_name: String,
    pub wagon_id: Option<String>,
    pub method: ResolutionMethod,
}

impl Default for ResolutionSource {
    fn default() -> Self {
        Self {
            task_name: DEFAULT_TASK_NAME.to_string(),
            wagon_id: None,
            method: ResolutionMethod::ScalarProduct,
        }
    }
}

impl ResolutionSource {
    pub fn directory(&self) -> String {
        let task = match self.wagon_id.as_deref() {
            Some(wagon) if !wagon.is_empty() => format!("{}_id{}", self.task_name, wagon),
            _ => self.task_name.clone(),
        };
        format!("{}/{}", task, self.method.directory())
    }

    pub fn record_name(&self, pair: DetectorPair) -> String {
        format!(
            "{}/{}{}",
            self.directory(),
            self.method.record_prefix(),
            pair.tag()
        )
    }
}

/// Pairwise subevent correlation versus centrality for one detector pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationRecord {
    name: String,
    pair: DetectorPair,
    histogram: Histogram,
}

impl CorrelationRecord {
    pub fn new(name: impl Into<String>, pair: DetectorPair, histogram: Histogram) -> FlowResult<Self> {
        let name = name.into();
        if histogram.dimensions() != 2 {
            return Err(FlowError::input_validation(
                "INPUT.CORRELATION_RECORD",
                format!(
                    "correlation record '{}' must be 2-dimensional (centrality, correlation), got {} axes",
                    name,
                    histogram.dimensions()
                ),
            ));
        }
        Ok(Self {
            name,
            pair,
            histogram,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pair(&self) -> DetectorPair {
        self.pair
    }

    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Mean correlation in the one-percentile bin starting at `percentile`.
    pub fn percentile_mean(&self, percentile: u32) -> FlowResult<Measurement> {
        let low = f64::from(percentile);
        self.mean_over(low, low + 1.0)
    }

    /// Mean correlation over the whole centrality window.
    pub fn window_mean(&self, window: CentralityBin) -> FlowResult<Measurement> {
        self.mean_over(f64::from(window.min()), f64::from(window.max()))
    }

    fn mean_over(&self, low: f64, high: f64) -> FlowResult<Measurement> {
        let (first, last) = self
            .histogram
            .axis(CENTRALITY_AXIS)?
            .snapped_range(low, high);
        let mut restricted = self.histogram.clone();
        restricted.restrict_range(CENTRALITY_AXIS, first, last)?;
        let correlation = restricted.project(&[CORRELATION_AXIS])?;
        Ok(Measurement::new(
            correlation.mean(0)?,
            correlation.mean_error(0)?,
        ))
    }
}

/// Every record in the resolution directory of `source` that names a
/// detector pair, in lookup order.
pub fn correlation_records(
    lookup: &impl RecordLookup,
    source: &ResolutionSource,
    sink: &dyn DiagnosticSink,
) -> FlowResult<Vec<CorrelationRecord>> {
    let directory = source.directory();
    let prefix = format!("{}/{}", directory, source.method.record_prefix());
    let mut records = Vec::new();

    // Task and wagon names are literal; only the pair tag is a wildcard.
    for name in lookup.names_matching(&format!("{}*", escape(&prefix)))? {
        let Some(pair) = name.strip_prefix(&prefix).and_then(DetectorPair::from_tag) else {
            sink.report(DiagnosticEvent::UnparseableRecordName {
                name: name.to_string(),
            });
            continue;
        };
        let histogram = lookup.require(name, sink)?.clone();
        records.push(CorrelationRecord::new(name, pair, histogram)?);
    }

    Ok(records)
}

/// Looks up the record for `pair`, trying both detector orders.
pub fn correlation_record_for_pair(
    lookup: &impl RecordLookup,
    source: &ResolutionSource,
    pair: DetectorPair,
    sink: &dyn DiagnosticSink,
) -> FlowResult<CorrelationRecord> {
    let named = source.record_name(pair);
    if let Some(histogram) = lookup.get(&named) {
        return CorrelationRecord::new(named, pair, histogram.clone());
    }
    let swapped = DetectorPair::new(pair.second(), pair.first())?;
    let swapped_name = source.record_name(swapped);
    let histogram = lookup.require(&swapped_name, sink).map_err(|_| {
        FlowError::io_system(
            "IO.RECORD_NOT_FOUND",
            format!("record '{named}' (or '{swapped_name}') does not exist"),
        )
    })?;
    CorrelationRecord::new(swapped_name, swapped, histogram.clone())
}
