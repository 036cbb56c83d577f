use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical tag type used for variant axes (`full_data`, injection tags, bank splits).
pub type Tag = String;

/// A set of detector (ifo) names such as `H1`, `L1`, `V1`.
///
/// Always kept sorted and deduplicated so that two sets naming the same
/// detectors compare, hash and display identically. Displays as the
/// concatenated names (`H1L1`), which is the detector-set field of an
/// artifact name.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct DetectorSet {
    detectors: Vec<String>,
}

impl DetectorSet {
    pub fn new<I, S>(detectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut detectors: Vec<String> = detectors
            .into_iter()
            .map(|d| d.into().trim().to_uppercase())
            .filter(|d| !d.is_empty())
            .collect();
        detectors.sort();
        detectors.dedup();
        Self { detectors }
    }

    pub fn single(detector: &str) -> Self {
        Self::new([detector])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.detectors.iter().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    pub fn contains(&self, detector: &str) -> bool {
        self.detectors.iter().any(|d| d.eq_ignore_ascii_case(detector))
    }

    /// The detector name if this set holds exactly one.
    pub fn as_single(&self) -> Option<&str> {
        match self.detectors.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn union(&self, other: &DetectorSet) -> DetectorSet {
        DetectorSet::new(self.detectors.iter().chain(other.detectors.iter()).cloned())
    }
}

impl From<Vec<String>> for DetectorSet {
    fn from(detectors: Vec<String>) -> Self {
        DetectorSet::new(detectors)
    }
}

impl From<DetectorSet> for Vec<String> {
    fn from(set: DetectorSet) -> Self {
        set.detectors
    }
}

impl fmt::Display for DetectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.detectors {
            f.write_str(d)?;
        }
        Ok(())
    }
}
