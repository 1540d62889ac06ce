//! Shape conversions between the geometry kinds the pipeline moves through.

use geo_types::{Geometry, Line, LineString, MultiLineString, MultiPolygon, Polygon};

/// Polygonal view of a geometry, if it has one.
pub fn as_multi_polygon(geom: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geom {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        _ => None,
    }
}

/// Linework view of a line-typed geometry. Polygons are not decomposed here;
/// they go through [`boundary`] first.
pub fn as_linework(geom: &Geometry<f64>) -> MultiLineString<f64> {
    match geom {
        Geometry::LineString(ls) => MultiLineString::new(vec![ls.clone()]),
        Geometry::MultiLineString(mls) => mls.clone(),
        Geometry::Line(l) => MultiLineString::new(vec![LineString::new(vec![l.start, l.end])]),
        _ => MultiLineString::new(vec![]),
    }
}

fn rings(polygon: &Polygon<f64>) -> Vec<LineString<f64>> {
    let mut out = vec![polygon.exterior().clone()];
    out.extend(polygon.interiors().iter().cloned());
    out
}

/// Boundary of an area geometry: its rings as linework. A single ring stays
/// a plain `LineString`, mirroring how the splitter distinguishes single-part
/// from multi-part geometries. Line geometries pass through unchanged.
pub fn boundary(geom: &Geometry<f64>) -> Geometry<f64> {
    match geom {
        Geometry::Polygon(p) => {
            let mut r = rings(p);
            if r.len() == 1 {
                Geometry::LineString(r.remove(0))
            } else {
                Geometry::MultiLineString(MultiLineString::new(r))
            }
        }
        Geometry::MultiPolygon(mp) => {
            let all: Vec<LineString<f64>> = mp.0.iter().flat_map(|p| rings(p)).collect();
            Geometry::MultiLineString(MultiLineString::new(all))
        }
        other => other.clone(),
    }
}

/// Every segment of a geometry, for distance checks against the working
/// area. Points contribute nothing.
pub fn all_segments(geom: &Geometry<f64>) -> Vec<Line<f64>> {
    match geom {
        Geometry::Polygon(p) => rings(p).iter().flat_map(|r| r.lines()).collect(),
        Geometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .flat_map(|p| rings(p))
            .flat_map(|r| r.lines().collect::<Vec<_>>())
            .collect(),
        Geometry::LineString(ls) => ls.lines().collect(),
        Geometry::MultiLineString(mls) => mls.0.iter().flat_map(|ls| ls.lines()).collect(),
        Geometry::Line(l) => vec![*l],
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Coord;

    fn unit_square() -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]),
            vec![],
        )
    }

    #[test]
    fn test_boundary_of_simple_polygon_is_linestring() {
        let b = boundary(&Geometry::Polygon(unit_square()));
        match b {
            Geometry::LineString(ls) => {
                assert_eq!(ls.0.first(), ls.0.last());
                assert_eq!(ls.0.len(), 5);
            }
            other => panic!("expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_boundary_of_polygon_with_hole_is_multi() {
        let poly = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]),
            vec![LineString::from(vec![
                (1.0, 1.0),
                (1.0, 2.0),
                (2.0, 2.0),
                (2.0, 1.0),
                (1.0, 1.0),
            ])],
        );
        match boundary(&Geometry::Polygon(poly)) {
            Geometry::MultiLineString(mls) => assert_eq!(mls.0.len(), 2),
            other => panic!("expected MultiLineString, got {:?}", other),
        }
    }

    #[test]
    fn test_all_segments_of_square() {
        let segs = all_segments(&Geometry::Polygon(unit_square()));
        assert_eq!(segs.len(), 4);
        assert_eq!(segs[0].start, Coord { x: 0.0, y: 0.0 });
    }
}
