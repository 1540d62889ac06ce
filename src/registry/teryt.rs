//! TERYT registry lookups: TERC administrative units and SIMC places.
//!
//! Both dictionaries are maintained by the dictionary-update job and read
//! here from JSON cache files; the pipeline never writes to them.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// One TERC administrative unit. The code is hierarchical: a prefix names
/// the parent unit (province 2 digits, county 4, municipality 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TercEntry {
    pub terc: String,
    pub name: String,
    #[serde(default)]
    pub kind: String,
}

impl TercEntry {
    /// OSM admin_level implied by the code length.
    pub fn admin_level(&self) -> Option<u8> {
        match self.terc.len() {
            2 => Some(4),
            4 => Some(6),
            7 => Some(7),
            _ => None,
        }
    }

    pub fn parent_terc(&self) -> Option<&str> {
        match self.terc.len() {
            4 => Some(&self.terc[..2]),
            7 => Some(&self.terc[..4]),
            _ => None,
        }
    }
}

/// One SIMC place. `parent` points at the primary place this one belongs
/// to, when SIMC nests it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimcEntry {
    pub sym: String,
    pub terc: String,
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Default)]
pub struct TercDictionary {
    entries: HashMap<String, TercEntry>,
}

impl TercDictionary {
    pub fn from_entries(entries: Vec<TercEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.terc.clone(), e)).collect(),
        }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let entries: Vec<TercEntry> =
            serde_json::from_str(data).context("Failed to parse TERC cache")?;
        Ok(Self::from_entries(entries))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read TERC cache: {}", path.display()))?;
        Self::from_json(&data)
    }

    pub fn get(&self, terc: &str) -> Option<&TercEntry> {
        self.entries.get(terc)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct SimcDictionary {
    entries: HashMap<String, SimcEntry>,
}

impl SimcDictionary {
    pub fn from_entries(entries: Vec<SimcEntry>) -> Self {
        Self {
            entries: entries.into_iter().map(|e| (e.sym.clone(), e)).collect(),
        }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let entries: Vec<SimcEntry> =
            serde_json::from_str(data).context("Failed to parse SIMC cache")?;
        Ok(Self::from_entries(entries))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read SIMC cache: {}", path.display()))?;
        Self::from_json(&data)
    }

    pub fn get(&self, sym: &str) -> Option<&SimcEntry> {
        self.entries.get(sym)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simc_cache_roundtrip() {
        let data = r#"[
            {"sym": "0028702", "terc": "2010042", "name": "Krynki-Sobole"},
            {"sym": "0028719", "terc": "2010042", "name": "Stare Krynki", "parent": "0028702"}
        ]"#;
        let dict = SimcDictionary::from_json(data).unwrap();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get("0028702").unwrap().parent, None);
        assert_eq!(
            dict.get("0028719").unwrap().parent.as_deref(),
            Some("0028702")
        );
        assert!(dict.get("9999999").is_none());
    }

    #[test]
    fn test_terc_levels_and_parents() {
        let province = TercEntry {
            terc: "20".into(),
            name: "podlaskie".into(),
            kind: "województwo".into(),
        };
        let municipality = TercEntry {
            terc: "2010042".into(),
            name: "Grodzisk".into(),
            kind: "gmina wiejska".into(),
        };
        assert_eq!(province.admin_level(), Some(4));
        assert_eq!(province.parent_terc(), None);
        assert_eq!(municipality.admin_level(), Some(7));
        assert_eq!(municipality.parent_terc(), Some("2010"));
    }
}
