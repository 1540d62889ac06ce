//! osm-borders - administrative border reconciliation and OSM export.
//!
//! Fetches municipality borders from EMUiA, reconciles their admin levels
//! against the TERYT/SIMC registry, cross-references Wikidata and exports
//! the result as an OSM XML boundary graph with deduplicated geometry.

pub mod emuia;
pub mod error;
pub mod geometry;
pub mod models;
pub mod osm;
pub mod pipeline;
pub mod registry;
pub mod wikidata;

pub use error::ExportError;
pub use models::Feature;
