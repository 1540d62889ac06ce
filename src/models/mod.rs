//! Core data models for border processing.

pub mod feature;

pub use feature::{Feature, ImmutableFeature};
