//! Decoding of the KML documents served by the EMUiA WMS endpoint.
//!
//! Each Placemark carries a polygon (outer rings plus optional holes) and a
//! description blob with the attribute table rendered as HTML spans. Both
//! become one [`Feature`] with the attributes as tags.

use anyhow::{bail, Context, Result};
use geo::BooleanOps;
use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::models::Feature;

#[derive(Debug, Clone, Copy, PartialEq)]
enum TextTarget {
    Name,
    Description,
    OuterRing,
    InnerRing,
}

pub fn kml_to_features(data: &str) -> Result<Vec<Feature>> {
    let mut reader = Reader::from_str(data);
    reader.config_mut().trim_text(true);

    let mut features = Vec::new();
    let mut in_placemark = false;
    let mut name = String::new();
    let mut description = String::new();
    let mut outers: Vec<Polygon<f64>> = Vec::new();
    let mut inners: Vec<Polygon<f64>> = Vec::new();
    let mut buf = String::new();
    let mut target: Option<TextTarget> = None;
    let mut ring_role: Option<TextTarget> = None;

    loop {
        match reader.read_event().context("Malformed KML document")? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Placemark" => {
                    in_placemark = true;
                    name.clear();
                    description.clear();
                    outers.clear();
                    inners.clear();
                }
                b"name" if in_placemark => {
                    buf.clear();
                    target = Some(TextTarget::Name);
                }
                b"description" if in_placemark => {
                    buf.clear();
                    target = Some(TextTarget::Description);
                }
                b"outerBoundaryIs" => ring_role = Some(TextTarget::OuterRing),
                b"innerBoundaryIs" => ring_role = Some(TextTarget::InnerRing),
                b"coordinates" if in_placemark && ring_role.is_some() => {
                    buf.clear();
                    target = ring_role;
                }
                _ => {}
            },
            Event::Text(t) => {
                if target.is_some() {
                    buf.push_str(&t.unescape().context("Malformed KML text")?);
                }
            }
            Event::CData(t) => {
                if target.is_some() {
                    buf.push_str(&String::from_utf8_lossy(&t.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"name" if target == Some(TextTarget::Name) => {
                    name = buf.clone();
                    target = None;
                }
                b"description" if target == Some(TextTarget::Description) => {
                    description = buf.clone();
                    target = None;
                }
                b"coordinates" if target.is_some() => {
                    let ring = parse_ring(&buf)?;
                    match target {
                        Some(TextTarget::OuterRing) => outers.push(ring),
                        Some(TextTarget::InnerRing) => inners.push(ring),
                        _ => {}
                    }
                    target = None;
                }
                b"outerBoundaryIs" | b"innerBoundaryIs" => ring_role = None,
                b"Placemark" => {
                    features.push(build_feature(&name, &description, &outers, &inners));
                    in_placemark = false;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(features)
}

/// KML coordinates: whitespace-separated `lon,lat[,alt]` tuples forming a
/// closed ring.
fn parse_ring(text: &str) -> Result<Polygon<f64>> {
    let mut coords = Vec::new();
    for token in text.split_whitespace() {
        let mut parts = token.split(',');
        let x: f64 = parts
            .next()
            .context("Missing longitude in KML coordinates")?
            .parse()
            .context("Bad longitude in KML coordinates")?;
        let y: f64 = parts
            .next()
            .context("Missing latitude in KML coordinates")?
            .parse()
            .context("Bad latitude in KML coordinates")?;
        coords.push(Coord { x, y });
    }
    if coords.len() < 4 || coords.first() != coords.last() {
        bail!("KML ring is not a closed polygon");
    }
    Ok(Polygon::new(LineString::new(coords), vec![]))
}

fn build_feature(
    name: &str,
    description: &str,
    outers: &[Polygon<f64>],
    inners: &[Polygon<f64>],
) -> Feature {
    let outer = union_all(outers);
    let geometry = if inners.is_empty() {
        outer
    } else {
        outer.difference(&union_all(inners))
    };
    let mut feature = Feature::new(Geometry::MultiPolygon(geometry));
    feature.set_tag("name", name);
    for (key, value) in description_tags(description) {
        feature.set_tag(&key, value);
    }
    feature
}

fn union_all(polygons: &[Polygon<f64>]) -> MultiPolygon<f64> {
    let mut rv = MultiPolygon::new(vec![]);
    for polygon in polygons {
        rv = rv.union(&MultiPolygon::new(vec![polygon.clone()]));
    }
    rv
}

/// The description blob renders the attribute table as paired
/// `atr-name`/`atr-value` spans. Positional pairing matches the upstream
/// rendering order.
fn description_tags(description: &str) -> Vec<(String, String)> {
    let name_re = Regex::new(r#"<span class="atr-name">([^<]*)</span>"#).expect("static regex");
    let value_re = Regex::new(r#"<span class="atr-value">([^<]*)</span>"#).expect("static regex");
    let names = name_re
        .captures_iter(description)
        .map(|c| c[1].to_string());
    let values = value_re
        .captures_iter(description)
        .map(|c| c[1].to_string());
    names.zip(values).collect()
}
