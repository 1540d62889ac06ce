//! Line-on-line overlay for border linework.
//!
//! Two borders share an edge exactly where their segments overlap while
//! collinear. Crossings contribute points, which are not shared edges, so
//! intersection and difference here are interval arithmetic over collinear
//! segment pairs. Overlap boundaries are always realized by an original
//! vertex of one of the inputs, which keeps emitted coordinates bit-identical
//! across both sides of a shared edge.

use geo::Intersects;
use geo_types::{Coord, Line, LineString, MultiLineString};
use hashbrown::HashMap;

use super::coord_key;

const EPS: f64 = 1e-9;

/// A covered stretch of a base segment, parameterized along it.
/// `c0`/`c1` are original input vertices, never interpolated points.
#[derive(Debug, Clone, Copy)]
struct Span {
    t0: f64,
    c0: Coord<f64>,
    t1: f64,
    c1: Coord<f64>,
}

pub fn segments(mls: &MultiLineString<f64>) -> Vec<Line<f64>> {
    mls.0.iter().flat_map(|ls| ls.lines()).collect()
}

pub fn is_empty(mls: &MultiLineString<f64>) -> bool {
    mls.0.iter().all(|ls| ls.0.len() < 2)
}

/// Overlap of `b` onto `a` if the two segments are collinear, longer than a
/// point. The returned endpoints are picked from the four input vertices.
fn collinear_overlap(a: &Line<f64>, b: &Line<f64>) -> Option<Span> {
    let d = Coord {
        x: a.end.x - a.start.x,
        y: a.end.y - a.start.y,
    };
    let len2 = d.x * d.x + d.y * d.y;
    if len2 < EPS * EPS {
        return None;
    }
    // cross(p) ~ distance-from-line * |d|, so scale the tolerance by |d|
    let tol = EPS * len2.sqrt();
    let cross = |p: Coord<f64>| (p.x - a.start.x) * d.y - (p.y - a.start.y) * d.x;
    if cross(b.start).abs() > tol || cross(b.end).abs() > tol {
        return None;
    }

    let t_of = |p: Coord<f64>| ((p.x - a.start.x) * d.x + (p.y - a.start.y) * d.y) / len2;
    let (mut tb0, mut cb0) = (t_of(b.start), b.start);
    let (mut tb1, mut cb1) = (t_of(b.end), b.end);
    if tb0 > tb1 {
        std::mem::swap(&mut tb0, &mut tb1);
        std::mem::swap(&mut cb0, &mut cb1);
    }

    let (t0, c0) = if tb0 > 0.0 { (tb0, cb0) } else { (0.0, a.start) };
    let (t1, c1) = if tb1 < 1.0 { (tb1, cb1) } else { (1.0, a.end) };
    if t1 - t0 > EPS {
        Some(Span { t0, c0, t1, c1 })
    } else {
        None
    }
}

/// All stretches of `a` covered by collinear segments of `others`, merged
/// into disjoint spans sorted along `a`.
fn covered(a: &Line<f64>, others: &[Line<f64>]) -> Vec<Span> {
    let mut spans: Vec<Span> = others
        .iter()
        .filter_map(|b| collinear_overlap(a, b))
        .collect();
    spans.sort_by(|x, y| x.t0.total_cmp(&y.t0));

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = merged.last_mut() {
            if span.t0 <= last.t1 + EPS {
                if span.t1 > last.t1 {
                    last.t1 = span.t1;
                    last.c1 = span.c1;
                }
                continue;
            }
        }
        merged.push(span);
    }
    merged
}

/// Shared linework of two geometries: every collinear overlap, merged into
/// maximal runs. Touch points are dropped by construction.
pub fn intersection(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> MultiLineString<f64> {
    let b_segs = segments(b);
    let mut pieces = Vec::new();
    for sa in segments(a) {
        for span in covered(&sa, &b_segs) {
            pieces.push(LineString::new(vec![span.c0, span.c1]));
        }
    }
    line_merge(pieces)
}

/// Linework of `a` with every part covered by `b` removed, merged into
/// maximal runs.
pub fn difference(a: &MultiLineString<f64>, b: &MultiLineString<f64>) -> MultiLineString<f64> {
    let b_segs = segments(b);
    let mut pieces = Vec::new();
    for sa in segments(a) {
        let mut t = 0.0;
        let mut c = sa.start;
        for span in covered(&sa, &b_segs) {
            if span.t0 - t > EPS {
                pieces.push(LineString::new(vec![c, span.c0]));
            }
            t = span.t1;
            c = span.c1;
        }
        if 1.0 - t > EPS {
            pieces.push(LineString::new(vec![c, sa.end]));
        }
    }
    line_merge(pieces)
}

/// Stitch lines into maximal runs wherever exactly two line ends meet,
/// following the usual line-merge contract: junctions of three or more ends
/// stay split, closed rings stay as they are.
pub fn line_merge(lines: Vec<LineString<f64>>) -> MultiLineString<f64> {
    let lines: Vec<LineString<f64>> = lines.into_iter().filter(|ls| ls.0.len() >= 2).collect();

    // endpoint -> incident (line, is_start) pairs
    let mut ends: HashMap<(u64, u64), Vec<(usize, bool)>> = HashMap::new();
    for (idx, ls) in lines.iter().enumerate() {
        ends.entry(coord_key(ls.0[0])).or_default().push((idx, true));
        ends.entry(coord_key(ls.0[ls.0.len() - 1]))
            .or_default()
            .push((idx, false));
    }

    let take_partner = |key: (u64, u64), used: &[bool], current: usize| -> Option<(usize, bool)> {
        let incident = ends.get(&key)?;
        if incident.len() != 2 {
            return None;
        }
        incident
            .iter()
            .find(|(idx, _)| *idx != current && !used[*idx])
            .copied()
    };

    let mut used = vec![false; lines.len()];
    let mut merged = Vec::new();

    for start in 0..lines.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain: Vec<Coord<f64>> = lines[start].0.clone();

        // grow at the tail, then at the head
        let mut current = start;
        while let Some((next, at_start)) =
            take_partner(coord_key(chain[chain.len() - 1]), &used, current)
        {
            used[next] = true;
            let mut coords = lines[next].0.clone();
            if !at_start {
                coords.reverse();
            }
            chain.extend(coords.into_iter().skip(1));
            current = next;
        }
        current = start;
        while let Some((next, at_start)) = take_partner(coord_key(chain[0]), &used, current) {
            used[next] = true;
            let mut coords = lines[next].0.clone();
            if at_start {
                coords.reverse();
            }
            coords.extend(chain.iter().copied().skip(1));
            chain = coords;
            current = next;
        }

        merged.push(LineString::new(chain));
    }

    MultiLineString::new(merged)
}

pub fn point_segment_distance(p: Coord<f64>, l: &Line<f64>) -> f64 {
    let d = Coord {
        x: l.end.x - l.start.x,
        y: l.end.y - l.start.y,
    };
    let len2 = d.x * d.x + d.y * d.y;
    let t = if len2 < EPS * EPS {
        0.0
    } else {
        (((p.x - l.start.x) * d.x + (p.y - l.start.y) * d.y) / len2).clamp(0.0, 1.0)
    };
    let nearest = Coord {
        x: l.start.x + t * d.x,
        y: l.start.y + t * d.y,
    };
    ((p.x - nearest.x).powi(2) + (p.y - nearest.y).powi(2)).sqrt()
}

pub fn segment_distance(a: &Line<f64>, b: &Line<f64>) -> f64 {
    if a.intersects(b) {
        return 0.0;
    }
    point_segment_distance(a.start, b)
        .min(point_segment_distance(a.end, b))
        .min(point_segment_distance(b.start, a))
        .min(point_segment_distance(b.end, a))
}
