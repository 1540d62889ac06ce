//! Attaches wikidata/wikipedia tags via a cascading name/geometry match.
//!
//! Entries are single-use: once one is applied to a border it leaves the
//! pool, which can turn a previously ambiguous border unambiguous. The
//! worklist is cyclic with a fixed round budget of 100, a safety valve
//! rather than a correctness bound; whatever is left unmatched afterwards
//! simply stays untagged.

use geo::Contains;
use tracing::debug;

use crate::geometry::convert;
use crate::models::Feature;
use crate::wikidata::WikidataEntry;

const ROUND_BUDGET: usize = 100;

pub fn add_wikidata(entries: Vec<WikidataEntry>, borders: &mut [Feature]) {
    let mut rest = entries;
    let mut todo: Vec<usize> = (0..borders.len()).collect();
    let mut pos = 0usize;
    let mut budget = ROUND_BUDGET;

    while !todo.is_empty() && budget > 0 {
        budget -= 1;
        let b = todo[pos % todo.len()];

        let Some(name) = borders[b].name().map(str::to_string) else {
            // nothing to match against; drop it from the worklist
            debug!("Border without a name, skipping Wikidata matching");
            remove_from_worklist(&mut todo, &mut pos, b);
            continue;
        };

        // pass 1: exact name
        let candidates = matching(&rest, |e| e.name == name);
        if candidates.len() > 1 {
            pos += 1;
            continue;
        }
        if let [single] = candidates[..] {
            apply(&mut rest, single, &mut borders[b], &name);
            remove_from_worklist(&mut todo, &mut pos, b);
            continue;
        }

        // pass 2: point inside geometry, name substring
        let polygon = convert::as_multi_polygon(&borders[b].geometry);
        let candidates = matching(&rest, |e| {
            polygon
                .as_ref()
                .map(|mp| mp.contains(&e.point))
                .unwrap_or(false)
                && e.name.contains(&name)
        });
        if candidates.len() > 1 {
            pos += 1;
            continue;
        }
        if let [single] = candidates[..] {
            apply(&mut rest, single, &mut borders[b], &name);
            remove_from_worklist(&mut todo, &mut pos, b);
            continue;
        }

        // pass 3: name substring only; zero or one candidate settles the
        // border either way
        let candidates = matching(&rest, |e| e.name.contains(&name));
        if candidates.len() > 1 {
            pos += 1;
            continue;
        }
        if let [single] = candidates[..] {
            apply(&mut rest, single, &mut borders[b], &name);
        }
        remove_from_worklist(&mut todo, &mut pos, b);
    }
}

fn matching(rest: &[WikidataEntry], pred: impl Fn(&WikidataEntry) -> bool) -> Vec<usize> {
    rest.iter()
        .enumerate()
        .filter(|(_, e)| pred(e))
        .map(|(i, _)| i)
        .collect()
}

fn apply(rest: &mut Vec<WikidataEntry>, entry_idx: usize, border: &mut Feature, name: &str) {
    let entry = rest.remove(entry_idx);
    border.set_tag("wikidata", entry.wikidata.as_str());
    border.set_tag("wikipedia", entry.wikipedia.as_str());
    if !entry.name.contains(name) {
        border.set_tag(
            "fixme",
            format!(
                "Check Wikipedia/Wikidata tags. In Wikipedia name is: {}",
                entry.name
            ),
        );
    }
}

/// Removing an element rebuilds the cyclic iterator, which restarts it at
/// the head of the shortened list.
fn remove_from_worklist(todo: &mut Vec<usize>, pos: &mut usize, border_idx: usize) {
    todo.retain(|&i| i != border_idx);
    *pos = 0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{Geometry, LineString, Point, Polygon};

    fn border(name: &str, origin: f64) -> Feature {
        let mut f = Feature::new(Geometry::Polygon(Polygon::new(
            LineString::from(vec![
                (origin, 0.0),
                (origin, 1.0),
                (origin + 1.0, 1.0),
                (origin + 1.0, 0.0),
                (origin, 0.0),
            ]),
            vec![],
        )));
        f.set_tag("NAZWA", name);
        f
    }

    fn entry(name: &str, x: f64, y: f64, qid: &str) -> WikidataEntry {
        WikidataEntry {
            name: name.to_string(),
            point: Point::new(x, y),
            wikidata: qid.to_string(),
            wikipedia: format!("pl:{}", name),
        }
    }

    #[test]
    fn test_exact_name_match() {
        let mut borders = vec![border("Krynki", 0.0)];
        add_wikidata(vec![entry("Krynki", 0.5, 0.5, "Q100")], &mut borders);
        assert_eq!(borders[0].tag("wikidata"), Some("Q100"));
        assert_eq!(borders[0].tag("wikipedia"), Some("pl:Krynki"));
        assert_eq!(borders[0].tag("fixme"), None);
    }

    #[test]
    fn test_geometry_breaks_name_tie() {
        // two entries with the border name as a substring; only one point
        // falls inside each border
        let mut borders = vec![border("Krynki", 0.0), border("Krynki", 10.0)];
        add_wikidata(
            vec![
                entry("Krynki-Sobole", 0.5, 0.5, "Q1"),
                entry("Krynki-Białe", 10.5, 0.5, "Q2"),
            ],
            &mut borders,
        );
        assert_eq!(borders[0].tag("wikidata"), Some("Q1"));
        assert_eq!(borders[1].tag("wikidata"), Some("Q2"));
    }

    #[test]
    fn test_substring_match_applies_without_fixme() {
        let mut borders = vec![border("Sobole", 0.0)];
        add_wikidata(vec![entry("Krynki-Sobole", 0.5, 0.5, "Q1")], &mut borders);
        assert_eq!(borders[0].tag("wikidata"), Some("Q1"));
        // the matched name contains the border name, so no fixme
        assert_eq!(borders[0].tag("fixme"), None);
    }

    #[test]
    fn test_consumed_entry_unblocks_ambiguity() {
        // border "Lip" sees two substring candidates until "Lipka" is
        // claimed by the exact match of the other border in a later round
        let mut borders = vec![border("Lip", 0.0), border("Lipka", 10.0)];
        add_wikidata(
            vec![
                entry("Lipka", 100.0, 100.0, "Q1"),
                entry("Lipowa", 100.0, 100.0, "Q2"),
            ],
            &mut borders,
        );
        assert_eq!(borders[1].tag("wikidata"), Some("Q1"));
        assert_eq!(borders[0].tag("wikidata"), Some("Q2"));
    }

    #[test]
    fn test_unresolvable_ambiguity_leaves_untagged() {
        let mut borders = vec![border("Nowa", 0.0)];
        add_wikidata(
            vec![
                entry("Nowa Wieś", 100.0, 100.0, "Q1"),
                entry("Nowa Wola", 100.0, 100.0, "Q2"),
            ],
            &mut borders,
        );
        assert_eq!(borders[0].tag("wikidata"), None);
        assert_eq!(borders[0].tag("wikipedia"), None);
    }

    #[test]
    fn test_no_entries_is_a_noop() {
        let mut borders = vec![border("Krynki", 0.0)];
        add_wikidata(vec![], &mut borders);
        assert_eq!(borders[0].tag("wikidata"), None);
    }
}
