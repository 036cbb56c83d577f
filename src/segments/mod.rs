// src/segments/mod.rs

//! Interval-set algebra over GPS time.
//!
//! - [`segment`] is the half-open `[start, end)` value type.
//! - [`list`] holds [`SegmentList`], which is always coalesced.
//! - [`dict`] maps detectors to segment lists.
//! - [`veto`] derives analyzable time and cumulative veto tiers.
//! - [`document`] persists named lists keyed by `"{detector}:{name}"`.

pub mod dict;
pub mod document;
pub mod list;
pub mod segment;
pub mod veto;

pub use dict::SegmentListDict;
pub use document::{SegmentDocument, segment_key};
pub use list::{SegmentList, coalesce, dedupe};
pub use segment::{GpsSeconds, MAX_GPS_SECONDS, Segment};
pub use veto::{
    CUMULATIVE_PREFIX, VetoSource, VetoTier, compute_analyzable, compute_cumulative_veto_groups,
    cumulative_tier_name, verify_veto_ladder,
};
