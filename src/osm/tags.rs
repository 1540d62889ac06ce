//! Tag mapping strategies for the production export modes.

use std::collections::BTreeMap;

use crate::error::ExportError;
use crate::osm::{ElementKind, TagMapper};

fn required<'a>(
    tags: &'a BTreeMap<String, String>,
    key: &str,
) -> Result<&'a str, ExportError> {
    tags.get(key)
        .map(String::as_str)
        .ok_or_else(|| ExportError::MissingTag {
            key: key.to_string(),
            name: tags.get("NAZWA").cloned(),
        })
}

fn push(out: &mut Vec<(String, String)>, k: &str, v: impl Into<String>) {
    out.push((k.to_string(), v.into()));
}

fn push_optional(out: &mut Vec<(String, String)>, tags: &BTreeMap<String, String>) {
    for key in ["wikidata", "wikipedia", "fixme"] {
        if let Some(v) = tags.get(key) {
            push(out, key, v.clone());
        }
    }
}

/// Tags for the EMUiA border export: reconciled `admin_level`, name and
/// place code from the upstream fields, plus whatever the pipeline attached.
pub struct BorderTagMapper;

impl TagMapper for BorderTagMapper {
    fn map(
        &self,
        kind: ElementKind,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, ExportError> {
        let mut out = Vec::new();
        match kind {
            ElementKind::Relation => {
                push(&mut out, "boundary", "administrative");
                push(&mut out, "type", "boundary");
                push(&mut out, "source:generator", "osm-borders");
                push(&mut out, "admin_level", required(tags, "admin_level")?);
                push(&mut out, "name", required(tags, "NAZWA")?);
                push(&mut out, "teryt:simc", required(tags, "TERYT_MIEJSCOWOSCI")?);
                push(&mut out, "name:prefix", required(tags, "RODZAJ")?.to_lowercase());
                push_optional(&mut out, tags);
            }
            ElementKind::Way => {
                push(&mut out, "source:geometry", required(tags, "ZRODLO_GEOMETRII")?);
                push(&mut out, "boundary", "administrative");
            }
            ElementKind::Node => {}
        }
        Ok(out)
    }
}

/// Tags for the PRG municipality-outline export: every source field under a
/// `prg:` prefix, `admin_level` derived from the TERC code length.
pub struct PrgTagMapper;

impl TagMapper for PrgTagMapper {
    fn map(
        &self,
        kind: ElementKind,
        tags: &BTreeMap<String, String>,
    ) -> Result<Vec<(String, String)>, ExportError> {
        let mut out = Vec::new();
        match kind {
            ElementKind::Relation => {
                for (k, v) in tags {
                    if !v.is_empty() {
                        push(&mut out, &format!("prg:{}", k), v.clone());
                    }
                }
                push(&mut out, "boundary", "administrative");
                push(&mut out, "type", "boundary");
                push(&mut out, "source:generator", "osm-borders");
                let terc = required(tags, "jpt_kod_je")?;
                let level = match terc.len() {
                    2 => "4",
                    4 => "6",
                    7 => "7",
                    _ => "TODO",
                };
                push(&mut out, "admin_level", level);
                push(
                    &mut out,
                    "name",
                    tags.get("jpt_nazwa_").cloned().unwrap_or_default(),
                );
                push(&mut out, "teryt:simc", terc);
                push_optional(&mut out, tags);
            }
            ElementKind::Way => {
                push(&mut out, "source:geometry", "PRG");
                push(&mut out, "boundary", "administrative");
            }
            ElementKind::Node => {}
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn border_tags() -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("admin_level".to_string(), "8".to_string());
        tags.insert("NAZWA".to_string(), "Krynki".to_string());
        tags.insert("TERYT_MIEJSCOWOSCI".to_string(), "0028702".to_string());
        tags.insert("RODZAJ".to_string(), "Wieś".to_string());
        tags.insert("ZRODLO_GEOMETRII".to_string(), "EMUIA".to_string());
        tags
    }

    #[test]
    fn test_border_relation_tags() {
        let out = BorderTagMapper
            .map(ElementKind::Relation, &border_tags())
            .unwrap();
        assert!(out.contains(&("boundary".to_string(), "administrative".to_string())));
        assert!(out.contains(&("admin_level".to_string(), "8".to_string())));
        assert!(out.contains(&("name:prefix".to_string(), "wieś".to_string())));
        assert!(out.contains(&("teryt:simc".to_string(), "0028702".to_string())));
    }

    #[test]
    fn test_border_missing_required_tag_is_fatal() {
        let mut tags = border_tags();
        tags.remove("admin_level");
        let err = BorderTagMapper
            .map(ElementKind::Relation, &tags)
            .unwrap_err();
        assert!(matches!(err, ExportError::MissingTag { .. }));
    }

    #[test]
    fn test_border_node_tags_are_empty() {
        let out = BorderTagMapper.map(ElementKind::Node, &border_tags()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_optional_tags_pass_through() {
        let mut tags = border_tags();
        tags.insert("wikidata".to_string(), "Q100".to_string());
        tags.insert("fixme".to_string(), "check me".to_string());
        let out = BorderTagMapper
            .map(ElementKind::Relation, &tags)
            .unwrap();
        assert!(out.contains(&("wikidata".to_string(), "Q100".to_string())));
        assert!(out.contains(&("fixme".to_string(), "check me".to_string())));
    }

    #[test]
    fn test_prg_admin_level_from_code_length() {
        for (code, level) in [("20", "4"), ("2010", "6"), ("2010042", "7"), ("123", "TODO")] {
            let mut tags = BTreeMap::new();
            tags.insert("jpt_kod_je".to_string(), code.to_string());
            tags.insert("jpt_nazwa_".to_string(), "powiat".to_string());
            let out = PrgTagMapper.map(ElementKind::Relation, &tags).unwrap();
            assert!(
                out.contains(&("admin_level".to_string(), level.to_string())),
                "code {} should map to {}",
                code,
                level
            );
            assert!(out.contains(&("prg:jpt_kod_je".to_string(), code.to_string())));
        }
    }

    #[test]
    fn test_prg_way_source() {
        let out = PrgTagMapper.map(ElementKind::Way, &BTreeMap::new()).unwrap();
        assert!(out.contains(&("source:geometry".to_string(), "PRG".to_string())));
    }
}
