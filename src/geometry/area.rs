//! The buffered working area one export operates in.

use geo::{Contains, CoordsIter, Intersects};
use geo_types::{Coord, Geometry, Line, MultiPolygon, Point};

use super::{convert, linework};

/// Outward buffer applied to the municipality outline, in degrees.
/// Roughly 500 m along a meridian; absorbs edge-snapping error between the
/// PRG outline and the EMUiA borders.
pub const BUFFER_TOLERANCE: f64 = 0.005;

/// Municipality outline plus an outward tolerance band. Owned by one export
/// run, never persisted. The buffer is realized as a distance predicate on
/// the outline instead of a widened polygon.
pub struct WorkingArea {
    outline: MultiPolygon<f64>,
    outline_segments: Vec<Line<f64>>,
    tolerance: f64,
}

impl WorkingArea {
    pub fn new(outline: MultiPolygon<f64>, tolerance: f64) -> Self {
        let outline_segments = convert::all_segments(&Geometry::MultiPolygon(outline.clone()));
        Self {
            outline,
            outline_segments,
            tolerance,
        }
    }

    /// Does the geometry touch the buffered area at all?
    pub fn intersects(&self, geom: &Geometry<f64>) -> bool {
        if self.outline.intersects(geom) {
            return true;
        }
        let segs = convert::all_segments(geom);
        segs.iter().any(|s| {
            self.outline_segments
                .iter()
                .any(|o| linework::segment_distance(s, o) <= self.tolerance)
        })
    }

    /// Is the geometry fully inside the buffered area? Checked per vertex
    /// and per segment midpoint: inside the outline, or within tolerance of
    /// its boundary. Midpoints catch a run that cuts across a concave notch
    /// between two inside vertices.
    pub fn contains(&self, geom: &Geometry<f64>) -> bool {
        let midpoints = convert::all_segments(geom).into_iter().map(|s| Coord {
            x: (s.start.x + s.end.x) / 2.0,
            y: (s.start.y + s.end.y) / 2.0,
        });
        geom.coords_iter()
            .chain(midpoints)
            .all(|c| self.near_or_inside(c))
    }

    fn near_or_inside(&self, c: Coord<f64>) -> bool {
        self.outline.contains(&Point::from(c))
            || self
                .outline_segments
                .iter()
                .any(|o| linework::point_segment_distance(c, o) <= self.tolerance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn area() -> WorkingArea {
        let outline = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]),
            vec![],
        )]);
        WorkingArea::new(outline, 0.005)
    }

    #[test]
    fn test_intersects_inside_and_near() {
        let area = area();
        let inside = Geometry::LineString(LineString::from(vec![(0.2, 0.2), (0.8, 0.8)]));
        assert!(area.intersects(&inside));

        // just outside the outline but within the tolerance band
        let near = Geometry::LineString(LineString::from(vec![(1.004, 0.2), (1.004, 0.8)]));
        assert!(area.intersects(&near));

        let far = Geometry::LineString(LineString::from(vec![(2.0, 2.0), (3.0, 3.0)]));
        assert!(!area.intersects(&far));
    }

    #[test]
    fn test_contains_respects_tolerance() {
        let area = area();
        let inside = Geometry::LineString(LineString::from(vec![(0.1, 0.1), (0.9, 0.9)]));
        assert!(area.contains(&inside));

        let sticking_out = Geometry::LineString(LineString::from(vec![(0.5, 0.5), (1.5, 0.5)]));
        assert!(!area.contains(&sticking_out));

        let on_edge = Geometry::LineString(LineString::from(vec![(0.0, 0.2), (1.003, 0.2)]));
        assert!(area.contains(&on_edge));
    }

    #[test]
    fn test_contains_rejects_cut_across_concave_notch() {
        // L-shaped outline: vertical arm x in [0,1], horizontal arm y in [0,1]
        let outline = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (0.0, 3.0),
                (1.0, 3.0),
                (1.0, 1.0),
                (3.0, 1.0),
                (3.0, 0.0),
                (0.0, 0.0),
            ]),
            vec![],
        )]);
        let area = WorkingArea::new(outline, 0.005);

        // both endpoints sit inside an arm, the middle crosses the notch
        let cut = Geometry::LineString(LineString::from(vec![(0.5, 2.5), (2.5, 0.5)]));
        assert!(!area.contains(&cut));

        let along_arm = Geometry::LineString(LineString::from(vec![(0.2, 0.2), (2.5, 0.5)]));
        assert!(area.contains(&along_arm));
    }
}
