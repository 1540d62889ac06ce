//! PRG municipality outlines, cached as a GeoJSON feature collection
//! keyed by the `jpt_kod_je` TERC code.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use geo_types::{Geometry, MultiPolygon};
use geojson::{FeatureCollection, GeoJson};
use hashbrown::HashMap;
use tracing::debug;

use crate::geometry::convert;
use crate::models::Feature;

#[derive(Debug, Default)]
pub struct MunicipalityIndex {
    features: HashMap<String, Feature>,
}

impl MunicipalityIndex {
    pub fn from_geojson(data: &str) -> Result<Self> {
        let gj: GeoJson = data.parse().context("Failed to parse PRG cache")?;
        let collection =
            FeatureCollection::try_from(gj).context("PRG cache is not a feature collection")?;
        let mut features = HashMap::new();
        for entry in collection.features {
            let geometry = entry
                .geometry
                .as_ref()
                .context("PRG feature without geometry")?;
            let geometry = Geometry::<f64>::try_from(geometry)
                .context("PRG feature with unsupported geometry")?;
            let mut feature = Feature::new(geometry);
            for (key, value) in entry.properties.iter().flatten() {
                match value {
                    serde_json::Value::Null => {}
                    serde_json::Value::String(s) => feature.set_tag(key, s.clone()),
                    other => feature.set_tag(key, other.to_string()),
                }
            }
            let terc = feature
                .tag("jpt_kod_je")
                .context("PRG feature without jpt_kod_je")?
                .to_string();
            features.insert(terc, feature);
        }
        debug!("Loaded {} PRG municipality outlines", features.len());
        Ok(Self { features })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read PRG cache: {}", path.display()))?;
        Self::from_geojson(&data)
    }

    /// Outline of a single unit, as the polygon set boolean ops work with.
    pub fn outline(&self, terc: &str) -> Option<MultiPolygon<f64>> {
        self.features
            .get(terc)
            .and_then(|f| convert::as_multi_polygon(&f.geometry))
    }

    /// All units whose TERC code starts with `prefix`, ordered by code so
    /// repeated exports serialize identically.
    pub fn with_prefix(&self, prefix: &str) -> Vec<Feature> {
        let mut matched: Vec<(&String, &Feature)> = self
            .features
            .iter()
            .filter(|(terc, _)| terc.starts_with(prefix))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(b.0));
        matched.into_iter().map(|(_, f)| f.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
