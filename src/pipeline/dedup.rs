//! Drops invalid border records and collapses exact duplicates.

use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use tracing::{debug, warn};

use crate::geometry::WorkingArea;
use crate::models::{Feature, ImmutableFeature};

/// Epoch-millis expiry field on EMUiA records.
const EXPIRY_TAG: &str = "DO";

/// Keeps a feature iff it touches the buffered working area and its expiry
/// tag, when present, is still in the future. Survivors are deduplicated by
/// structural equality (canonical WKT + full tag set) and sorted by that
/// same key so reruns serialize identically.
pub fn filter_and_dedup(
    features: Vec<Feature>,
    area: &WorkingArea,
    now: DateTime<Utc>,
) -> Vec<Feature> {
    let now_millis = now.timestamp_millis();

    debug!("Borders before dedup: {}", features.len());
    let set: HashSet<ImmutableFeature> = features
        .into_iter()
        .filter(|f| is_valid(f, area, now_millis))
        .map(ImmutableFeature::new)
        .collect();
    let mut survivors: Vec<ImmutableFeature> = set.into_iter().collect();
    survivors.sort();
    let rv: Vec<Feature> = survivors
        .into_iter()
        .map(ImmutableFeature::into_feature)
        .collect();
    debug!("Borders after dedup: {}", rv.len());
    rv
}

fn is_valid(feature: &Feature, area: &WorkingArea, now_millis: i64) -> bool {
    if !area.intersects(&feature.geometry) {
        debug!(
            "Removing border as it is outside working set: {}",
            feature.tags_summary()
        );
        return false;
    }
    match feature.tag(EXPIRY_TAG) {
        None => true,
        Some(raw) => match raw.parse::<i64>() {
            Ok(expiry) if expiry > now_millis => true,
            Ok(_) => {
                debug!("Removing outdated border: {}", feature.tags_summary());
                false
            }
            Err(_) => {
                // unparsable expiry counts as absent
                warn!("Unparsable {} tag on border: {}", EXPIRY_TAG, feature.tags_summary());
                true
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, LineString, MultiPolygon, Polygon};

    fn area() -> WorkingArea {
        let outline = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0), (0.0, 0.0)]),
            vec![],
        )]);
        WorkingArea::new(outline, 0.005)
    }

    fn border(name: &str) -> Feature {
        let mut f = Feature::new(Geometry::Polygon(Polygon::new(
            LineString::from(vec![(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0), (1.0, 1.0)]),
            vec![],
        )));
        f.set_tag("NAZWA", name);
        f
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let a = border("Abc");
        let b = a.clone();
        let c = border("Def");
        let rv = filter_and_dedup(vec![a, b, c], &area(), Utc::now());
        assert_eq!(rv.len(), 2);
    }

    #[test]
    fn test_expired_border_is_dropped() {
        let mut expired = border("Old");
        expired.set_tag("DO", "1000"); // long in the past
        let rv = filter_and_dedup(vec![expired], &area(), Utc::now());
        assert!(rv.is_empty());
    }

    #[test]
    fn test_future_expiry_is_kept() {
        let mut current = border("New");
        let future = Utc::now().timestamp_millis() + 86_400_000;
        current.set_tag("DO", future.to_string());
        let rv = filter_and_dedup(vec![current], &area(), Utc::now());
        assert_eq!(rv.len(), 1);
    }

    #[test]
    fn test_border_outside_area_is_dropped() {
        let mut outside = border("Far");
        outside.geometry = Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (100.0, 100.0),
                (100.0, 101.0),
                (101.0, 101.0),
                (101.0, 100.0),
                (100.0, 100.0),
            ]),
            vec![],
        ));
        let rv = filter_and_dedup(vec![outside], &area(), Utc::now());
        assert!(rv.is_empty());
    }
}
