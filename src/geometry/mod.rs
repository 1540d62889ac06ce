//! Geometry capabilities consumed by the pipeline.
//!
//! `geo`/`geo-types` cover predicates and polygon boolean ops. Line-on-line
//! overlay (shared border edges are collinear segment overlaps, crossings are
//! points and never shared edges) lives in [`linework`].

pub mod area;
pub mod convert;
pub mod linework;

pub use area::WorkingArea;

use geo_types::Coord;

/// Bit-exact hashable key for a coordinate. Identical coordinate tuples must
/// map to the same node id within one export, so no rounding happens here.
pub fn coord_key(c: Coord<f64>) -> (u64, u64) {
    (c.x.to_bits(), c.y.to_bits())
}
