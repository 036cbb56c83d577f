// src/segments/list.rs

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::segments::segment::{GpsSeconds, Segment};

/// Ordered set of disjoint, non-adjacent, non-empty segments.
///
/// Every constructor coalesces, so a `SegmentList` handed to any consumer
/// is already in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Segment>", into = "Vec<Segment>")]
pub struct SegmentList {
    segments: Vec<Segment>,
}

/// Sort and merge overlapping or touching segments, dropping empty ones.
///
/// Idempotent: `coalesce(coalesce(x)) == coalesce(x)`.
pub fn coalesce<I>(segments: I) -> SegmentList
where
    I: IntoIterator<Item = Segment>,
{
    let mut sorted: Vec<Segment> = segments.into_iter().filter(|s| !s.is_empty()).collect();
    sorted.sort();

    let mut merged: Vec<Segment> = Vec::with_capacity(sorted.len());
    for seg in sorted {
        match merged.last_mut() {
            Some(last) if seg.start() <= last.end() => *last = last.hull(&seg),
            _ => merged.push(seg),
        }
    }

    SegmentList { segments: merged }
}

/// Remove exact-duplicate intervals, keeping the first occurrence order.
///
/// Split-bank siblings each report the same validity interval; this
/// collapses those before they are merged back together.
pub fn dedupe(segments: &[Segment]) -> Vec<Segment> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .filter(|seg| seen.insert(**seg))
        .copied()
        .collect()
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments<I>(segments: I) -> Self
    where
        I: IntoIterator<Item = Segment>,
    {
        coalesce(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total livetime in seconds.
    pub fn total_duration(&self) -> GpsSeconds {
        self.segments.iter().map(Segment::duration).sum()
    }

    /// Segment from the earliest start to the latest end.
    pub fn extent(&self) -> Option<Segment> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some(first.hull(last))
    }

    /// Re-coalesce. A no-op for a well-formed list.
    pub fn coalesce(&self) -> SegmentList {
        coalesce(self.segments.iter().copied())
    }

    pub fn union(&self, other: &SegmentList) -> SegmentList {
        coalesce(self.segments.iter().chain(other.segments.iter()).copied())
    }

    pub fn intersection(&self, other: &SegmentList) -> SegmentList {
        let (a, b) = (&self.segments, &other.segments);
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < a.len() && j < b.len() {
            let lo = a[i].start().max(b[j].start());
            let hi = a[i].end().min(b[j].end());
            if lo < hi {
                out.push(Segment::spanning(lo, hi));
            }
            if a[i].end() < b[j].end() {
                i += 1;
            } else {
                j += 1;
            }
        }

        coalesce(out)
    }

    /// Time in `self` that is not in `other`.
    pub fn difference(&self, other: &SegmentList) -> SegmentList {
        let sub = &other.segments;
        let mut out = Vec::new();
        let mut j = 0;

        for seg in &self.segments {
            let end = seg.end();
            let mut start = seg.start();

            // Both lists are sorted, so anything ending before this segment
            // can be skipped for every later segment too.
            while j < sub.len() && sub[j].end() <= start {
                j += 1;
            }

            let mut k = j;
            while k < sub.len() && sub[k].start() < end && start < end {
                if sub[k].start() > start {
                    out.push(Segment::spanning(start, sub[k].start()));
                }
                start = start.max(sub[k].end());
                k += 1;
            }

            if start < end {
                out.push(Segment::spanning(start, end));
            }
        }

        coalesce(out)
    }

    /// Restrict to the given span.
    pub fn clip(&self, span: &Segment) -> SegmentList {
        self.intersection(&SegmentList::from_segments([*span]))
    }

    pub fn is_subset_of(&self, other: &SegmentList) -> bool {
        self.difference(other).is_empty()
    }
}

impl From<Vec<Segment>> for SegmentList {
    fn from(segments: Vec<Segment>) -> Self {
        coalesce(segments)
    }
}

impl From<SegmentList> for Vec<Segment> {
    fn from(list: SegmentList) -> Self {
        list.segments
    }
}

impl FromIterator<Segment> for SegmentList {
    fn from_iter<T: IntoIterator<Item = Segment>>(iter: T) -> Self {
        coalesce(iter)
    }
}

impl fmt::Display for SegmentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
