//! OSM XML graph serialization.

pub mod builder;
pub mod tags;

pub use builder::{ElementKind, FeatureToOsm, TagMapper};
pub use tags::{BorderTagMapper, PrgTagMapper};
