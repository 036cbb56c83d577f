#![allow(dead_code)]

use std::collections::BTreeMap;

use coincflow::config::{ConfigFile, Section, tagged_section, validate_config};
use coincflow::config::settings::INJECTIONS_SECTION;
use coincflow::errors::Result;
use coincflow::pipeline::preflight::INJECTION_OPTIONS;
use coincflow::segments::{Segment, SegmentDocument, SegmentList, SegmentListDict};
use coincflow::stages::{CORE_STAGES, INJECTION_STAGES};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigBuilder {
    sections: BTreeMap<String, Section>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            sections: BTreeMap::new(),
        }
    }

    pub fn with_section(mut self, name: &str) -> Self {
        self.sections.entry(name.to_string()).or_default();
        self
    }

    pub fn with_option(mut self, section: &str, option: &str, value: &str) -> Self {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(option.to_string(), value.to_string());
        self
    }

    pub fn without_section(mut self, name: &str) -> Self {
        self.sections.remove(name);
        self
    }

    pub fn without_option(mut self, section: &str, option: &str) -> Self {
        if let Some(s) = self.sections.get_mut(section) {
            s.remove(option);
        }
        self
    }

    /// Add `[workflow-injections-{tag}]` with the given flag options, plus
    /// the stage sections the set needs.
    pub fn with_injection_set(mut self, tag: &str, flags: &[&str]) -> Self {
        self = self.with_section(&tagged_section(INJECTIONS_SECTION, tag));
        for flag in flags {
            self = self.with_option(&tagged_section(INJECTIONS_SECTION, tag), flag, "");
        }
        for stage in INJECTION_STAGES {
            self = self.with_section(stage);
        }
        for (option, stage) in INJECTION_OPTIONS {
            if flags.contains(option) {
                self = self.with_section(stage);
            }
        }
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::from_sections(self.sections)
    }

    pub fn build_validated(self) -> Result<ConfigFile> {
        let cfg = self.build();
        validate_config(&cfg)?;
        Ok(cfg)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// H1/L1 over `[1000, 5000)`, three veto categories with CAT1 applied to
/// science time, two sub-banks, and every core stage section present.
pub fn pipeline_config() -> ConfigBuilder {
    let mut builder = ConfigBuilder::new()
        .with_option("workflow", "start-time", "1000")
        .with_option("workflow", "end-time", "5000")
        .with_option("workflow", "ifos", "H1,L1")
        .with_option("workflow-segments", "segments-file", "segments.json")
        .with_option("workflow-segments", "segments-science", "DATA")
        .with_option("workflow-segments", "segments-veto-categories", "CAT1,CAT2,CAT3")
        .with_option("workflow-segments", "segments-science-veto", "CAT1")
        .with_option("workflow-splittable", "splittable-num-banks", "2");
    for stage in CORE_STAGES {
        builder = builder.with_section(stage);
    }
    builder
        .with_option("inspiral", "approximant", "SPAtmplt")
        .with_option("inspiral-h1", "channel-name", "H1:STRAIN")
        .with_option("inspiral-l1", "channel-name", "L1:STRAIN")
}

pub fn seg(start: i64, end: i64) -> Segment {
    Segment::new(start, end).expect("valid test segment")
}

pub fn seglist(bounds: &[(i64, i64)]) -> SegmentList {
    SegmentList::from_segments(bounds.iter().map(|&(s, e)| seg(s, e)))
}

pub fn segdict(entries: &[(&str, &[(i64, i64)])]) -> SegmentListDict {
    entries
        .iter()
        .map(|(det, bounds)| (det.to_string(), seglist(bounds)))
        .collect()
}

/// Segment document matching [`pipeline_config`].
///
/// H1 has science over the whole span; L1 has a gap at `[3000, 3500)`.
pub fn sample_segments() -> SegmentDocument {
    let mut doc = SegmentDocument::new(seg(1000, 5000));
    doc.insert("H1", "DATA", &seglist(&[(1000, 5000)]));
    doc.insert("L1", "DATA", &seglist(&[(1000, 3000), (3500, 5000)]));
    doc.insert("H1", "CAT1", &seglist(&[(1100, 1200)]));
    doc.insert("L1", "CAT1", &seglist(&[]));
    doc.insert("H1", "CAT2", &seglist(&[(2000, 2100)]));
    doc.insert("L1", "CAT2", &seglist(&[(4000, 4050)]));
    doc.insert("H1", "CAT3", &seglist(&[(2500, 2600)]));
    doc.insert("L1", "CAT3", &seglist(&[(1500, 1600)]));
    doc
}
