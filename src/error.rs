//! Typed failures of the export core.
//!
//! Data-quality problems (missing SIMC entry, missing parent border,
//! ambiguous Wikidata match) never surface here - they become `fixme` tags.
//! These variants are contract violations that abort the current export.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    /// A geometry kind the OSM serializer cannot express as ways.
    #[error("unknown geometry kind reached the OSM writer: {0}")]
    UnknownGeometry(&'static str),

    /// A tag mapping asked for a tag the feature does not carry.
    #[error("tag mapping requires missing tag {key:?} (feature name: {name:?})")]
    MissingTag { key: String, name: Option<String> },

    #[error("XML write error: {0}")]
    Xml(#[from] std::io::Error),
}
