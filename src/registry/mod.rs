//! Read-only reference registries, loaded from versioned JSON cache files.

pub mod prg;
pub mod teryt;

pub use prg::MunicipalityIndex;
pub use teryt::{SimcDictionary, SimcEntry, TercDictionary, TercEntry};
