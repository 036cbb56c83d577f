// src/expand/mod.rs

//! Multiplicative expansion of stages across independent variant axes.
//!
//! - [`axes`] declares axes and their Cartesian product.
//! - [`conditional`] decides per-tag inclusion of optional stages.

pub mod axes;
pub mod conditional;

pub use axes::{Axis, CartesianProduct, Cell, cardinality, cartesian};
pub use conditional::{ChainOutcome, ConditionalStage, StepResolution, TagExpander};
