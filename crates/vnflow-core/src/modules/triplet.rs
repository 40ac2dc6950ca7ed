//! Matching pairwise correlation records into independent subevent triplets.

use super::records::CorrelationRecord;
use crate::diagnostics::{DiagnosticEvent, DiagnosticSink};
use crate::domain::{CANONICAL_DETECTORS, DetectorLabel, DetectorPair};
use std::cmp::Ordering;

/// Three subevents `(A, B, C)` with records held in role order `(AB, AC, BC)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubeventTriplet {
    labels: [DetectorLabel; 3],
    records: [CorrelationRecord; 3],
}

impl SubeventTriplet {
    pub fn labels(&self) -> [DetectorLabel; 3] {
        self.labels
    }

    pub fn reference(&self) -> DetectorLabel {
        self.labels[0]
    }

    pub fn records(&self) -> &[CorrelationRecord; 3] {
        &self.records
    }

    pub fn pairs(&self) -> [DetectorPair; 3] {
        [
            self.records[0].pair(),
            self.records[1].pair(),
            self.records[2].pair(),
        ]
    }

    pub fn tag(&self) -> String {
        format!("{}{}{}", self.labels[0], self.labels[1], self.labels[2])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripletResolver {
    canonical: Vec<DetectorLabel>,
    reference: Option<DetectorLabel>,
}

impl Default for TripletResolver {
    fn default() -> Self {
        Self::new(CANONICAL_DETECTORS.to_vec())
    }
}

impl TripletResolver {
    /// `canonical` lists the labels allowed to act as reference, highest
    /// priority first.
    pub fn new(canonical: Vec<DetectorLabel>) -> Self {
        Self {
            canonical,
            reference: None,
        }
    }

    /// Accept only combinations containing `reference`, which always plays `A`.
    pub fn with_reference(mut self, reference: DetectorLabel) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn canonical(&self) -> &[DetectorLabel] {
        &self.canonical
    }

    pub fn reference(&self) -> Option<DetectorLabel> {
        self.reference
    }

    pub fn resolve(
        &self,
        records: &[CorrelationRecord],
        sink: &dyn DiagnosticSink,
    ) -> Vec<SubeventTriplet> {
        let mut triplets = Vec::new();
        let mut candidates = 0;

        for i in 0..records.len() {
            for j in (i + 1)..records.len() {
                for k in (j + 1)..records.len() {
                    candidates += 1;
                    let combination = [&records[i], &records[j], &records[k]];
                    match self.assign_roles(combination) {
                        Some(triplet) => triplets.push(triplet),
                        None => sink.report(DiagnosticEvent::CombinationRejected {
                            pairs: combination.map(CorrelationRecord::pair),
                        }),
                    }
                }
            }
        }

        if triplets.is_empty() {
            sink.report(DiagnosticEvent::NoValidTriplets { candidates });
        }
        triplets
    }

    fn assign_roles(&self, combination: [&CorrelationRecord; 3]) -> Option<SubeventTriplet> {
        let pairs = combination.map(CorrelationRecord::pair);
        if pairs[0] == pairs[1] || pairs[0] == pairs[2] || pairs[1] == pairs[2] {
            return None;
        }

        let mut labels: Vec<DetectorLabel> = pairs
            .iter()
            .flat_map(|pair| [pair.first(), pair.second()])
            .collect();
        labels.sort_by(|left, right| self.compare_labels(*left, *right));
        labels.dedup();
        // Three distinct pairs over three labels are exactly the three 2-subsets.
        if labels.len() != 3 {
            return None;
        }
        if !labels.iter().any(|label| self.canonical.contains(label)) {
            return None;
        }

        if let Some(reference) = self.reference {
            let position = labels.iter().position(|label| *label == reference)?;
            let pinned = labels.remove(position);
            labels.insert(0, pinned);
        }
        let [a, b, c] = [labels[0], labels[1], labels[2]];

        let find = |x: DetectorLabel, y: DetectorLabel| {
            let wanted = DetectorPair::new(x, y).ok()?;
            combination
                .iter()
                .find(|record| record.pair() == wanted)
                .map(|record| (*record).clone())
        };
        Some(SubeventTriplet {
            labels: [a, b, c],
            records: [find(a, b)?, find(a, c)?, find(b, c)?],
        })
    }

    /// Canonical labels by priority, then everything else by tag.
    fn compare_labels(&self, left: DetectorLabel, right: DetectorLabel) -> Ordering {
        let rank = |label: DetectorLabel| self.canonical.iter().position(|known| *known == label);
        match (rank(left), rank(right)) {
            (Some(left), Some(right)) => left.cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => left.as_str().cmp(right.as_str()),
        }
    }
}
