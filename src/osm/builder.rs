//! Turns processed border features into an OSM XML document.
//!
//! One builder instance owns the whole identity graph of one export: a
//! single decreasing id counter shared by nodes, ways and relations, node
//! dedup by exact coordinate and way dedup by exact ordered coordinate
//! sequence. Both maps are discarded with the builder.

use std::collections::BTreeMap;
use std::mem;

use geo_types::{Geometry, LineString};
use hashbrown::HashMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::debug;

use crate::error::ExportError;
use crate::geometry::coord_key;
use crate::models::Feature;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Way,
    Relation,
}

/// Strategy deciding which tags each emitted element carries. The three
/// production call sites differ only in this.
pub trait TagMapper {
    fn map(
        &self,
        kind: ElementKind,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, ExportError>;
}

enum OsmElement {
    Node {
        id: i64,
        lon: f64,
        lat: f64,
        tags: Vec<(String, String)>,
    },
    Way {
        id: i64,
        nodes: Vec<i64>,
        tags: Vec<(String, String)>,
    },
    Relation {
        id: i64,
        members: Vec<(i64, &'static str)>,
        tags: Vec<(String, String)>,
    },
}

pub struct FeatureToOsm<'a> {
    borders: Vec<Feature>,
    tag_mapper: &'a dyn TagMapper,
    filter: Box<dyn Fn(&Feature) -> bool + 'a>,
    mapping: Box<dyn Fn(Vec<Feature>) -> Vec<Feature> + 'a>,
    next_id: i64,
    node_ids: HashMap<(u64, u64), i64>,
    way_ids: HashMap<Vec<(u64, u64)>, i64>,
}

impl<'a> FeatureToOsm<'a> {
    pub fn new(borders: Vec<Feature>, tag_mapper: &'a dyn TagMapper) -> Self {
        Self {
            borders,
            tag_mapper,
            filter: Box::new(|_| true),
            mapping: Box::new(|b| b),
            next_id: -1,
            node_ids: HashMap::new(),
            way_ids: HashMap::new(),
        }
    }

    /// Per-feature predicate deciding whether a relation is emitted at all.
    pub fn with_filter(mut self, filter: impl Fn(&Feature) -> bool + 'a) -> Self {
        self.filter = Box::new(filter);
        self
    }

    /// Batch mapping applied right before building; the splitter is passed
    /// here so callers can pick split vs. non-split export.
    pub fn with_mapping(mut self, mapping: impl Fn(Vec<Feature>) -> Vec<Feature> + 'a) -> Self {
        self.mapping = Box::new(mapping);
        self
    }

    pub fn to_xml(mut self) -> Result<Vec<u8>, ExportError> {
        let borders = (self.mapping)(mem::take(&mut self.borders));
        let mut elements = Vec::new();
        for border in &borders {
            if (self.filter)(border) {
                self.dump_relation(&mut elements, border)?;
            } else {
                debug!("Filter excluded border: {}", border);
            }
        }
        serialize(&elements)
    }

    fn alloc_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id -= 1;
        id
    }

    fn dump_relation(
        &mut self,
        elements: &mut Vec<OsmElement>,
        border: &Feature,
    ) -> Result<(), ExportError> {
        debug!("Dumping relation: {}", border);
        // the relation id is allocated before its ways
        let rel_id = self.alloc_id();
        let (outer, inner) = self.dump_ways(elements, border)?;
        let tags = self.tag_mapper.map(ElementKind::Relation, &border.tags)?;

        let mut members: Vec<(i64, &'static str)> =
            outer.into_iter().map(|id| (id, "outer")).collect();
        members.extend(inner.into_iter().map(|id| (id, "inner")));

        elements.push(OsmElement::Relation {
            id: rel_id,
            members,
            tags,
        });
        Ok(())
    }

    fn dump_ways(
        &mut self,
        elements: &mut Vec<OsmElement>,
        border: &Feature,
    ) -> Result<(Vec<i64>, Vec<i64>), ExportError> {
        let mut outer = Vec::new();
        let mut inner = Vec::new();

        match &border.geometry {
            Geometry::Polygon(p) => {
                outer.push(self.dump_way(elements, p.exterior(), &border.tags)?);
                for ring in p.interiors() {
                    inner.push(self.dump_way(elements, ring, &border.tags)?);
                }
            }
            Geometry::MultiPolygon(mp) => {
                for p in &mp.0 {
                    outer.push(self.dump_way(elements, p.exterior(), &border.tags)?);
                    for ring in p.interiors() {
                        inner.push(self.dump_way(elements, ring, &border.tags)?);
                    }
                }
            }
            Geometry::LineString(ls) => {
                outer.push(self.dump_way(elements, ls, &border.tags)?);
            }
            Geometry::MultiLineString(mls) => {
                for ls in &mls.0 {
                    outer.push(self.dump_way(elements, ls, &border.tags)?);
                }
            }
            other => return Err(ExportError::UnknownGeometry(geometry_kind(other))),
        }

        Ok((outer, inner))
    }

    fn dump_way(
        &mut self,
        elements: &mut Vec<OsmElement>,
        line: &LineString<f64>,
        tags: &BTreeMap<String, String>,
    ) -> Result<i64, ExportError> {
        // direction matters: a reversed run is a different key
        let key: Vec<(u64, u64)> = line.0.iter().copied().map(coord_key).collect();
        if let Some(id) = self.way_ids.get(&key) {
            return Ok(*id);
        }

        let nodes = self.dump_nodes(elements, line, tags)?;
        let id = self.alloc_id();
        self.way_ids.insert(key, id);
        elements.push(OsmElement::Way {
            id,
            nodes,
            tags: self.tag_mapper.map(ElementKind::Way, tags)?,
        });
        Ok(id)
    }

    fn dump_nodes(
        &mut self,
        elements: &mut Vec<OsmElement>,
        line: &LineString<f64>,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<i64>, ExportError> {
        let mut rv = Vec::with_capacity(line.0.len());
        for coord in &line.0 {
            let key = coord_key(*coord);
            let id = match self.node_ids.get(&key) {
                Some(id) => *id,
                None => {
                    let id = self.alloc_id();
                    self.node_ids.insert(key, id);
                    elements.push(OsmElement::Node {
                        id,
                        lon: coord.x,
                        lat: coord.y,
                        tags: self.tag_mapper.map(ElementKind::Node, tags)?,
                    });
                    id
                }
            };
            rv.push(id);
        }
        Ok(rv)
    }
}

fn geometry_kind(geom: &Geometry<f64>) -> &'static str {
    match geom {
        Geometry::Point(_) => "Point",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

fn write_tags<W: std::io::Write>(
    writer: &mut Writer<W>,
    tags: &[(String, String)],
) -> Result<(), ExportError> {
    for (k, v) in tags {
        let mut tag = BytesStart::new("tag");
        tag.push_attribute(("k", k.as_str()));
        tag.push_attribute(("v", v.as_str()));
        writer.write_event(Event::Empty(tag))?;
    }
    Ok(())
}

fn serialize(elements: &[OsmElement]) -> Result<Vec<u8>, ExportError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new("osm");
    root.push_attribute(("version", "0.6"));
    root.push_attribute(("generator", "osm-borders"));
    root.push_attribute(("upload", "false"));
    writer.write_event(Event::Start(root))?;

    for element in elements {
        match element {
            OsmElement::Node { id, lon, lat, tags } => {
                let mut node = BytesStart::new("node");
                node.push_attribute(("id", id.to_string().as_str()));
                node.push_attribute(("lon", lon.to_string().as_str()));
                node.push_attribute(("lat", lat.to_string().as_str()));
                if tags.is_empty() {
                    writer.write_event(Event::Empty(node))?;
                } else {
                    writer.write_event(Event::Start(node))?;
                    write_tags(&mut writer, tags)?;
                    writer.write_event(Event::End(BytesEnd::new("node")))?;
                }
            }
            OsmElement::Way { id, nodes, tags } => {
                let mut way = BytesStart::new("way");
                way.push_attribute(("id", id.to_string().as_str()));
                writer.write_event(Event::Start(way))?;
                write_tags(&mut writer, tags)?;
                for node in nodes {
                    let mut nd = BytesStart::new("nd");
                    nd.push_attribute(("ref", node.to_string().as_str()));
                    writer.write_event(Event::Empty(nd))?;
                }
                writer.write_event(Event::End(BytesEnd::new("way")))?;
            }
            OsmElement::Relation { id, members, tags } => {
                let mut rel = BytesStart::new("relation");
                rel.push_attribute(("id", id.to_string().as_str()));
                writer.write_event(Event::Start(rel))?;
                write_tags(&mut writer, tags)?;
                for (way_id, role) in members {
                    let mut member = BytesStart::new("member");
                    member.push_attribute(("ref", way_id.to_string().as_str()));
                    member.push_attribute(("role", *role));
                    member.push_attribute(("type", "way"));
                    writer.write_event(Event::Empty(member))?;
                }
                writer.write_event(Event::End(BytesEnd::new("relation")))?;
            }
        }
    }

    writer.write_event(Event::End(BytesEnd::new("osm")))?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{MultiLineString, Point, Polygon};

    struct PlainMapper;

    impl TagMapper for PlainMapper {
        fn map(
            &self,
            kind: ElementKind,
            tags: &BTreeMap<String, String>,
        ) -> Result<Vec<(String, String)>, ExportError> {
            Ok(match kind {
                ElementKind::Relation => tags
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
                _ => vec![],
            })
        }
    }

    fn line(coords: Vec<(f64, f64)>) -> LineString<f64> {
        LineString::from(coords)
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_shared_component_becomes_one_way() {
        let shared = line(vec![(1.0, 1.0), (1.0, 0.0)]);
        let a = Feature::new(Geometry::MultiLineString(MultiLineString::new(vec![
            shared.clone(),
            line(vec![(1.0, 0.0), (0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]),
        ])));
        let b = Feature::new(Geometry::MultiLineString(MultiLineString::new(vec![
            shared,
            line(vec![(1.0, 0.0), (2.0, 0.0), (2.0, 1.0), (1.0, 1.0)]),
        ])));

        let xml = FeatureToOsm::new(vec![a, b], &PlainMapper).to_xml().unwrap();
        let xml = String::from_utf8(xml).unwrap();

        assert_eq!(count(&xml, "<relation"), 2);
        // shared way emitted once, two remainder ways
        assert_eq!(count(&xml, "<way"), 3);
        // six distinct coordinates in total
        assert_eq!(count(&xml, "<node"), 6);
    }

    #[test]
    fn test_polygon_hole_gets_inner_role() {
        let poly = Polygon::new(
            line(vec![(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0), (0.0, 0.0)]),
            vec![line(vec![
                (1.0, 1.0),
                (1.0, 2.0),
                (2.0, 2.0),
                (2.0, 1.0),
                (1.0, 1.0),
            ])],
        );
        let f = Feature::new(Geometry::Polygon(poly));
        let xml = FeatureToOsm::new(vec![f], &PlainMapper).to_xml().unwrap();
        let xml = String::from_utf8(xml).unwrap();

        assert_eq!(count(&xml, r#"role="outer""#), 1);
        assert_eq!(count(&xml, r#"role="inner""#), 1);
    }

    #[test]
    fn test_ids_are_negative_and_relation_comes_first() {
        let f = Feature::new(Geometry::LineString(line(vec![
            (0.0, 0.0),
            (1.0, 0.0),
        ])));
        let xml = FeatureToOsm::new(vec![f], &PlainMapper).to_xml().unwrap();
        let xml = String::from_utf8(xml).unwrap();

        // the relation claims -1 before its ways and nodes
        assert!(xml.contains(r#"<relation id="-1""#));
        assert!(xml.contains(r#"<node id="-2""#));
        assert!(xml.contains(r#"<way id="-4""#));
    }

    #[test]
    fn test_unknown_geometry_is_fatal() {
        let f = Feature::new(Geometry::Point(Point::new(0.0, 0.0)));
        let err = FeatureToOsm::new(vec![f], &PlainMapper).to_xml().unwrap_err();
        assert!(matches!(err, ExportError::UnknownGeometry("Point")));
    }

    #[test]
    fn test_filter_excludes_relations() {
        let mut keep = Feature::new(Geometry::LineString(line(vec![(0.0, 0.0), (1.0, 0.0)])));
        keep.set_tag("NAZWA", "keep");
        let mut drop = Feature::new(Geometry::LineString(line(vec![(5.0, 5.0), (6.0, 5.0)])));
        drop.set_tag("NAZWA", "drop");

        let xml = FeatureToOsm::new(vec![keep, drop], &PlainMapper)
            .with_filter(|f| f.name() == Some("keep"))
            .to_xml()
            .unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert_eq!(count(&xml, "<relation"), 1);
    }

    #[test]
    fn test_way_direction_is_part_of_identity() {
        let a = Feature::new(Geometry::LineString(line(vec![(0.0, 0.0), (1.0, 0.0)])));
        let b = Feature::new(Geometry::LineString(line(vec![(1.0, 0.0), (0.0, 0.0)])));
        let xml = FeatureToOsm::new(vec![a, b], &PlainMapper).to_xml().unwrap();
        let xml = String::from_utf8(xml).unwrap();

        // reversed sequence is a new way, but the nodes are shared
        assert_eq!(count(&xml, "<way"), 2);
        assert_eq!(count(&xml, "<node"), 2);
    }
}
