// src/stages/mod.rs

//! Stage factories for the coincident-search pipeline.
//!
//! The numerical work of each stage happens in external executables; these
//! factories only declare which jobs a stage needs, what they consume and
//! what they produce. The generic shapes live in [`factories`]; this module
//! names the concrete stages of the pipeline template.

pub mod factories;

pub use factories::{
    CombinedStage, MatchedFilterStage, MergeByDetectorStage, PerDetectorStage, SplitBankStage,
};

pub const DATAFIND: &str = "datafind";
pub const CALCULATE_PSD: &str = "calculate_psd";
pub const PLOT_SPECTRUM: &str = "plot_spectrum";
pub const TMPLTBANK: &str = "tmpltbank";
pub const SPLITBANK: &str = "splitbank";
pub const INSPIRAL: &str = "inspiral";
pub const TRIGGER_MERGE: &str = "hdf_trigger_merge";
pub const PLOT_SINGLES: &str = "plot_singles";
pub const PLOT_SEGMENTS: &str = "plot_segments";
pub const COINC: &str = "coinc";
pub const STATMAP: &str = "statmap";
pub const PAGE_FOREGROUND: &str = "page_foreground";
pub const INJECTIONS: &str = "injections";
pub const OPTIMAL_SNR: &str = "optimal_snr";
pub const INJ_CUT: &str = "inj_cut";
pub const STRIP_INJECTIONS: &str = "strip_injections";
pub const INJFIND: &str = "injfind";
pub const PLOT_SENSITIVITY: &str = "plot_sensitivity";
pub const RESULTS_PAGE: &str = "results_page";

/// Stages every analysis runs, in pipeline order.
pub const CORE_STAGES: &[&str] = &[
    DATAFIND,
    CALCULATE_PSD,
    PLOT_SPECTRUM,
    TMPLTBANK,
    SPLITBANK,
    INSPIRAL,
    TRIGGER_MERGE,
    PLOT_SINGLES,
    PLOT_SEGMENTS,
    COINC,
    STATMAP,
    PAGE_FOREGROUND,
    RESULTS_PAGE,
];

/// Stages needed once any injection set is configured.
pub const INJECTION_STAGES: &[&str] = &[INJECTIONS, INJFIND, PLOT_SENSITIVITY];

pub fn datafind() -> PerDetectorStage {
    PerDetectorStage::new(DATAFIND, "DATAFIND", "lcf")
}

pub fn calculate_psd() -> PerDetectorStage {
    PerDetectorStage::new(CALCULATE_PSD, "PSD", "hdf")
}

pub fn plot_spectrum() -> CombinedStage {
    CombinedStage::new(PLOT_SPECTRUM, "PLOT_SPECTRUM", "png")
}

pub fn tmpltbank() -> CombinedStage {
    CombinedStage::new(TMPLTBANK, "BANK", "hdf")
}

pub fn splitbank(num_banks: usize) -> SplitBankStage {
    SplitBankStage::new(SPLITBANK, num_banks)
}

pub fn inspiral() -> MatchedFilterStage {
    MatchedFilterStage::new(INSPIRAL, SPLITBANK, "INSPIRAL", "hdf")
}

pub fn trigger_merge() -> MergeByDetectorStage {
    MergeByDetectorStage::new(TRIGGER_MERGE, "INSPIRAL_MERGED", "hdf")
}

pub fn plot_singles() -> PerDetectorStage {
    PerDetectorStage::new(PLOT_SINGLES, "PLOT_SINGLES", "png")
}

pub fn plot_segments() -> CombinedStage {
    CombinedStage::new(PLOT_SEGMENTS, "PLOT_SEGMENTS", "html")
}

pub fn coinc() -> CombinedStage {
    CombinedStage::new(COINC, "COINC", "hdf")
}

pub fn statmap() -> CombinedStage {
    CombinedStage::new(STATMAP, "STATMAP", "hdf")
}

pub fn page_foreground() -> CombinedStage {
    CombinedStage::new(PAGE_FOREGROUND, "FOREGROUND", "html")
}

pub fn injections() -> CombinedStage {
    CombinedStage::new(INJECTIONS, "INJECTIONS", "hdf")
}

pub fn optimal_snr() -> CombinedStage {
    CombinedStage::new(OPTIMAL_SNR, "INJ_OPTIMAL_SNR", "hdf")
}

pub fn inj_cut() -> CombinedStage {
    CombinedStage::new(INJ_CUT, "INJ_CUT", "hdf")
}

pub fn strip_injections() -> CombinedStage {
    CombinedStage::new(STRIP_INJECTIONS, "INJ_STRIPPED", "hdf")
}

pub fn injfind() -> CombinedStage {
    CombinedStage::new(INJFIND, "INJFIND", "hdf")
}

pub fn plot_sensitivity() -> CombinedStage {
    CombinedStage::new(PLOT_SENSITIVITY, "PLOT_SENSITIVITY", "png")
}

pub fn results_page() -> CombinedStage {
    CombinedStage::new(RESULTS_PAGE, "RESULTS_PAGE", "html")
}
