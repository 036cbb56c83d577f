// src/artifact/naming.rs

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{CoincflowError, Result};
use crate::segments::{GpsSeconds, Segment};
use crate::types::DetectorSet;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z0-9]+)-([A-Z0-9_]+)-(\d+)-(\d+)\.([A-Za-z0-9_.]+)$")
        .expect("artifact name pattern is valid")
});

/// A file name of the form `{ifos}-{DESCRIPTION}-{gps-start}-{gps-duration}.{ext}`,
/// e.g. `H1L1-INSPIRAL_FULL_DATA_BANK0-1000-4000.hdf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub detectors: String,
    pub description: String,
    pub start: GpsSeconds,
    pub duration: GpsSeconds,
    pub extension: String,
}

impl ArtifactName {
    pub fn new(
        detectors: &DetectorSet,
        description: impl Into<String>,
        segment: &Segment,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            detectors: detectors.to_string(),
            description: description.into(),
            start: segment.start(),
            duration: segment.duration(),
            extension: extension.into(),
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        let caps = NAME_RE.captures(name).ok_or_else(|| {
            CoincflowError::ConfigError(format!(
                "'{name}' does not follow IFOS-DESCRIPTION-START-DURATION.EXT"
            ))
        })?;
        let number = |i: usize| -> Result<GpsSeconds> {
            caps[i].parse::<GpsSeconds>().map_err(|e| {
                CoincflowError::ConfigError(format!("bad GPS field in '{name}': {e}"))
            })
        };
        Ok(Self {
            detectors: caps[1].to_string(),
            description: caps[2].to_string(),
            start: number(3)?,
            duration: number(4)?,
            extension: caps[5].to_string(),
        })
    }

    pub fn segment(&self) -> Result<Segment> {
        let end = self.start.checked_add(self.duration).ok_or_else(|| {
            CoincflowError::ConfigError(format!(
                "'{self}' ends past the representable GPS range"
            ))
        })?;
        Segment::new(self.start, end)
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}.{}",
            self.detectors, self.description, self.start, self.duration, self.extension
        )
    }
}

/// Upper-cased `NAME_TAG1_TAG2` description field.
pub fn description_for(name: &str, tags: &[String]) -> String {
    std::iter::once(name)
        .chain(tags.iter().map(|t| t.as_str()))
        .map(|part| part.replace(['-', ' '], "_").to_uppercase())
        .collect::<Vec<_>>()
        .join("_")
}
