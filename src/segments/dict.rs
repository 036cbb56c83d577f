// src/segments/dict.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::segments::list::SegmentList;
use crate::segments::segment::Segment;
use crate::types::DetectorSet;

/// Detector name → coalesced segment list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentListDict {
    lists: BTreeMap<String, SegmentList>,
}

impl SegmentListDict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the list previously stored for `detector`, if any.
    pub fn insert(&mut self, detector: impl Into<String>, list: SegmentList) -> Option<SegmentList> {
        self.lists.insert(detector.into(), list)
    }

    pub fn get(&self, detector: &str) -> Option<&SegmentList> {
        self.lists.get(detector)
    }

    pub fn detectors(&self) -> DetectorSet {
        DetectorSet::new(self.lists.keys().cloned())
    }

    /// Detectors with at least some time.
    pub fn active_detectors(&self) -> DetectorSet {
        DetectorSet::new(
            self.lists
                .iter()
                .filter(|(_, list)| !list.is_empty())
                .map(|(d, _)| d.clone()),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SegmentList)> {
        self.lists.iter().map(|(d, l)| (d.as_str(), l))
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Per-detector union; detectors present in either side are kept.
    pub fn union(&self, other: &SegmentListDict) -> SegmentListDict {
        let mut out = self.clone();
        for (det, list) in &other.lists {
            let merged = match out.lists.get(det) {
                Some(existing) => existing.union(list),
                None => list.clone(),
            };
            out.lists.insert(det.clone(), merged);
        }
        out
    }

    /// Per-detector difference. Detectors missing from `other` are unchanged.
    pub fn difference(&self, other: &SegmentListDict) -> SegmentListDict {
        let lists = self
            .lists
            .iter()
            .map(|(det, list)| {
                let remaining = match other.lists.get(det) {
                    Some(sub) => list.difference(sub),
                    None => list.clone(),
                };
                (det.clone(), remaining)
            })
            .collect();
        SegmentListDict { lists }
    }

    /// Per-detector intersection over detectors present in both.
    pub fn intersection(&self, other: &SegmentListDict) -> SegmentListDict {
        let lists = self
            .lists
            .iter()
            .filter_map(|(det, list)| {
                other
                    .lists
                    .get(det)
                    .map(|o| (det.clone(), list.intersection(o)))
            })
            .collect();
        SegmentListDict { lists }
    }

    /// Every detector's time is covered by `other`'s time for that detector.
    pub fn is_subset_of(&self, other: &SegmentListDict) -> bool {
        self.lists.iter().all(|(det, list)| match other.lists.get(det) {
            Some(o) => list.is_subset_of(o),
            None => list.is_empty(),
        })
    }

    pub fn clip(&self, span: &Segment) -> SegmentListDict {
        let lists = self
            .lists
            .iter()
            .map(|(det, list)| (det.clone(), list.clip(span)))
            .collect();
        SegmentListDict { lists }
    }

    /// Hull over every detector's extent.
    pub fn extent(&self) -> Option<Segment> {
        self.lists
            .values()
            .filter_map(SegmentList::extent)
            .reduce(|a, b| a.hull(&b))
    }
}

impl FromIterator<(String, SegmentList)> for SegmentListDict {
    fn from_iter<T: IntoIterator<Item = (String, SegmentList)>>(iter: T) -> Self {
        SegmentListDict {
            lists: iter.into_iter().collect(),
        }
    }
}
