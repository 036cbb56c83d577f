// src/segments/document.rs

//! Named segment lists persisted as a JSON document.
//!
//! ```json
//! {
//!   "span": [1000, 5000],
//!   "segments": { "H1:SCIENCE": [[1000, 2000], [2500, 5000]] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{CoincflowError, Result};
use crate::fs::FileSystem;
use crate::segments::dict::SegmentListDict;
use crate::segments::list::SegmentList;
use crate::segments::segment::Segment;
use crate::types::DetectorSet;

/// Key of a named list in a [`SegmentDocument`].
pub fn segment_key(detector: &str, name: &str) -> String {
    format!("{detector}:{name}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDocument {
    span: Segment,
    #[serde(default)]
    segments: BTreeMap<String, SegmentList>,
}

impl SegmentDocument {
    pub fn new(span: Segment) -> Self {
        Self {
            span,
            segments: BTreeMap::new(),
        }
    }

    pub fn span(&self) -> Segment {
        self.span
    }

    /// Store a list, clipped to the document span.
    pub fn insert(&mut self, detector: &str, name: &str, list: &SegmentList) {
        self.segments
            .insert(segment_key(detector, name), list.clip(&self.span));
    }

    /// Store every detector of `dict` under `name`.
    pub fn insert_dict(&mut self, name: &str, dict: &SegmentListDict) {
        for (det, list) in dict.iter() {
            self.insert(det, name, list);
        }
    }

    pub fn get(&self, detector: &str, name: &str) -> Option<&SegmentList> {
        self.segments.get(&segment_key(detector, name))
    }

    /// Collect `name` for every detector; any missing key is a config error.
    pub fn dict_for(&self, name: &str, detectors: &DetectorSet) -> Result<SegmentListDict> {
        let mut dict = SegmentListDict::new();
        for det in detectors.iter() {
            let list = self.get(det, name).ok_or_else(|| {
                CoincflowError::ConfigError(format!(
                    "segment document has no '{}' list",
                    segment_key(det, name)
                ))
            })?;
            dict.insert(det, list.clone());
        }
        Ok(dict)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.segments.keys().map(|s| s.as_str())
    }

    pub fn from_json_str(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let contents = fs.read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        fs.write(path, self.to_json_string()?.as_bytes())?;
        Ok(())
    }
}
