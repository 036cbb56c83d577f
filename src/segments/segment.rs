// src/segments/segment.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{CoincflowError, Result};

/// Seconds since the GPS epoch.
pub type GpsSeconds = i64;

/// Largest magnitude accepted for a segment bound.
///
/// Any difference of two in-range bounds, and any sum of disjoint
/// durations between them, fits in a `GpsSeconds`.
pub const MAX_GPS_SECONDS: GpsSeconds = 1 << 61;

/// Half-open GPS time interval `[start, end)`.
///
/// Serialized as a two-element array `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "(GpsSeconds, GpsSeconds)", into = "(GpsSeconds, GpsSeconds)")]
pub struct Segment {
    start: GpsSeconds,
    end: GpsSeconds,
}

impl Segment {
    pub fn new(start: GpsSeconds, end: GpsSeconds) -> Result<Self> {
        for bound in [start, end] {
            if !(-MAX_GPS_SECONDS..=MAX_GPS_SECONDS).contains(&bound) {
                return Err(CoincflowError::SegmentAlgebra(format!(
                    "segment bound {bound} is outside +/-{MAX_GPS_SECONDS}"
                )));
            }
        }
        if end < start {
            return Err(CoincflowError::SegmentAlgebra(format!(
                "segment end {end} precedes start {start}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Internal constructor for bounds already known to be ordered.
    pub(crate) fn spanning(start: GpsSeconds, end: GpsSeconds) -> Self {
        debug_assert!(start <= end, "unordered segment bounds {start}..{end}");
        Self { start, end }
    }

    pub fn start(&self) -> GpsSeconds {
        self.start
    }

    pub fn end(&self) -> GpsSeconds {
        self.end
    }

    pub fn duration(&self) -> GpsSeconds {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if the two intervals share time of positive length.
    pub fn intersects(&self, other: &Segment) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, other: &Segment) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest segment covering both.
    pub fn hull(&self, other: &Segment) -> Segment {
        Segment::spanning(self.start.min(other.start), self.end.max(other.end))
    }
}

impl TryFrom<(GpsSeconds, GpsSeconds)> for Segment {
    type Error = String;

    fn try_from((start, end): (GpsSeconds, GpsSeconds)) -> std::result::Result<Self, Self::Error> {
        Segment::new(start, end).map_err(|e| e.to_string())
    }
}

impl From<Segment> for (GpsSeconds, GpsSeconds) {
    fn from(seg: Segment) -> Self {
        (seg.start, seg.end)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
