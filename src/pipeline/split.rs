//! Splits border linework into shared and unshared runs.
//!
//! After this stage any edge shared by two borders appears in both features
//! as a geometrically identical component, which is what lets the OSM
//! writer collapse it into a single way referenced by both relations.
//!
//! Geometries are rewritten in place and re-read by later pairs, so every
//! pair must intersect against the current geometry value, never a snapshot
//! taken before the loop.

use geo_types::{Geometry, LineString, MultiLineString};
use tracing::debug;

use crate::geometry::{convert, linework};
use crate::models::Feature;

pub fn split_by_common_ways(borders: &mut Vec<Feature>) {
    for i in 0..borders.len() {
        for j in 0..borders.len() {
            if i == j {
                continue;
            }
            debug!("Processing border pair ({}, {})", i, j);

            let lines_i = convert::as_linework(&borders[i].geometry);
            let lines_j = convert::as_linework(&borders[j].geometry);

            let shared = linework::intersection(&lines_i, &lines_j);
            if linework::is_empty(&shared) {
                continue;
            }
            let shared = refine_shared(shared, [&borders[i].geometry, &borders[j].geometry]);

            let rest_i = linework::difference(&lines_i, &shared);
            borders[i].geometry = Geometry::MultiLineString(concat(&shared, &rest_i));
            let rest_j = linework::difference(&lines_j, &shared);
            borders[j].geometry = Geometry::MultiLineString(concat(&shared, &rest_j));
        }
    }
}

/// Narrows the shared linework against each part of a multi-part sibling.
///
/// A shared edge that only partially overlaps one of several already-split
/// parts must be re-cut along that part, otherwise the rewrite would claim
/// more of the sibling than the part actually shares. Best effort: a part
/// whose re-cut would swallow the running shared geometry entirely leaves
/// it unchanged.
fn refine_shared(shared: MultiLineString<f64>, objs: [&Geometry<f64>; 2]) -> MultiLineString<f64> {
    let original = shared.clone();
    let mut rv = shared;
    for obj in objs {
        let Geometry::MultiLineString(mls) = obj else {
            continue;
        };
        for part in &mls.0 {
            let part_lines = MultiLineString::new(vec![part.clone()]);
            let small = linework::intersection(&part_lines, &original);
            if linework::is_empty(&small) {
                continue;
            }
            let rest = linework::difference(&rv, &small);
            if !linework::is_empty(&rest) {
                rv = concat(&small, &rest);
            }
        }
    }
    rv
}

/// Flat multi-line collection of both inputs; never re-merges across the
/// shared/unshared boundary.
fn concat(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> MultiLineString<f64> {
    let mut parts: Vec<LineString<f64>> = a.0.iter().filter(|ls| ls.0.len() >= 2).cloned().collect();
    parts.extend(b.0.iter().filter(|ls| ls.0.len() >= 2).cloned());
    MultiLineString::new(parts)
}
