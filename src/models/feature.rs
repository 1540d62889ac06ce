//! A tagged geometry as produced by the upstream fetchers.

use std::collections::BTreeMap;
use std::fmt;

use geo_types::Geometry;
use wkt::ToWkt;

/// One border record: a geometry plus the upstream registry fields as tags.
///
/// Tag keys stay in their upstream (EMUiA) spelling until the OSM tag
/// mapping renames them at serialization time. The geometry is replaced
/// wholesale by the pipeline stages, never edited vertex by vertex.
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub tags: BTreeMap<String, String>,
}

impl Feature {
    pub fn new(geometry: Geometry<f64>) -> Self {
        Self {
            geometry,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tags(geometry: Geometry<f64>, tags: BTreeMap<String, String>) -> Self {
        Self { geometry, tags }
    }

    pub fn set_tag(&mut self, key: &str, value: impl Into<String>) {
        self.tags.insert(key.to_string(), value.into());
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Display name from the upstream `NAZWA` field.
    pub fn name(&self) -> Option<&str> {
        self.tag("NAZWA")
    }

    /// Sorted `key: value` listing used by the log messages.
    pub fn tags_summary(&self) -> String {
        self.tags
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Feature({}, {{{}}})",
            self.name().unwrap_or("<unnamed>"),
            self.tags_summary()
        )
    }
}

/// Structural value view of a [`Feature`] used for set-based deduplication.
///
/// Two features are duplicates iff their canonical WKT and their full tag
/// set match exactly. Built only inside the dedup stage and converted back
/// right after; the original feature rides along so no WKT re-parse is
/// needed.
#[derive(Debug, Clone)]
pub struct ImmutableFeature {
    key: String,
    tags: Vec<(String, String)>,
    feature: Feature,
}

impl ImmutableFeature {
    pub fn new(feature: Feature) -> Self {
        let key = feature.geometry.wkt_string();
        let tags = feature
            .tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { key, tags, feature }
    }

    pub fn into_feature(self) -> Feature {
        self.feature
    }
}

impl PartialEq for ImmutableFeature {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.tags == other.tags
    }
}

impl Eq for ImmutableFeature {}

impl PartialOrd for ImmutableFeature {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Ordered by the same (WKT, tags) key equality uses; gives the dedup
/// stage a stable output order.
impl Ord for ImmutableFeature {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.tags.cmp(&other.tags))
    }
}

impl std::hash::Hash for ImmutableFeature {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.tags.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Geometry};
    use hashbrown::HashSet;

    fn square() -> Geometry<f64> {
        Geometry::LineString(LineString::from(vec![
            (0.0, 0.0),
            (0.0, 1.0),
            (1.0, 1.0),
            (1.0, 0.0),
            (0.0, 0.0),
        ]))
    }

    #[test]
    fn test_equal_features_collapse_in_set() {
        let mut a = Feature::new(square());
        a.set_tag("NAZWA", "Abc");
        let b = a.clone();

        let set: HashSet<ImmutableFeature> =
            [ImmutableFeature::new(a), ImmutableFeature::new(b)]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_tag_difference_keeps_both() {
        let mut a = Feature::new(square());
        a.set_tag("NAZWA", "Abc");
        let mut b = a.clone();
        b.set_tag("RODZAJ", "wieś");

        let set: HashSet<ImmutableFeature> =
            [ImmutableFeature::new(a), ImmutableFeature::new(b)]
                .into_iter()
                .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_roundtrip_preserves_feature() {
        let mut a = Feature::new(square());
        a.set_tag("NAZWA", "Abc");
        let back = ImmutableFeature::new(a.clone()).into_feature();
        assert_eq!(back.tags, a.tags);
    }
}
