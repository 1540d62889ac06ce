//! Cross-checks EMUiA nesting against the TERYT/SIMC registry.
//!
//! EMUiA implies a level through its parent-place reference, SIMC through
//! its own parent pointer. The three disagreement cases are resolved here;
//! every unresolved detail becomes a `fixme` tag, never an error.

use geo::BooleanOps;
use geo_types::Geometry;
use tracing::{error, info};

use crate::geometry::convert;
use crate::models::Feature;
use crate::registry::SimcDictionary;

const SIMC_TAG: &str = "TERYT_MIEJSCOWOSCI";
const PLACE_ID_TAG: &str = "IDENTYFIKATOR_MIEJSCOWOSCI";
const PARENT_ID_TAG: &str = "IDENTYFIKATOR_NADRZEDNEJ";

/// Reconciles `admin_level` for every border in place, input order, adjusting
/// parent geometries inside the same batch where the registries disagree on
/// standalone-vs-nested.
pub fn clean_borders(borders: &mut [Feature], simc: &SimcDictionary) {
    for idx in 0..borders.len() {
        let simc_code = borders[idx].tag(SIMC_TAG).map(str::to_string);
        let parent_id = borders[idx].tag(PARENT_ID_TAG).map(str::to_string);
        let emuia_level: u8 = if parent_id.is_some() { 10 } else { 8 };

        let entry = match simc_code.as_deref().and_then(|code| simc.get(code)) {
            Some(e) => e.clone(),
            None => {
                error!(
                    "No entry in TERYT dictionary for SIMC: {}, name: {}",
                    simc_code.as_deref().unwrap_or("<none>"),
                    borders[idx].name().unwrap_or("<unnamed>")
                );
                borders[idx].set_tag("admin_level", "TODO");
                borders[idx].set_tag(
                    "fixme",
                    format!(
                        "No entry in TERYT for this teryt:simc. EMUiA admin_level={}",
                        emuia_level
                    ),
                );
                continue;
            }
        };
        let simc_level: u8 = if entry.parent.is_some() { 10 } else { 8 };

        let mut fixme: Vec<String> = Vec::new();
        let mut level = simc_level;

        if emuia_level == 10 && simc_level == 10 {
            // both registries nest it - they must name the same parent
            match find_border(borders, PLACE_ID_TAG, parent_id.as_deref()) {
                Some(pidx) => {
                    if entry.parent.as_deref() != borders[pidx].tag(SIMC_TAG) {
                        fixme.push(format!(
                            "Different parents. In EMUiA it is teryt:simc: {}, name: {}",
                            entry.parent.as_deref().unwrap_or(""),
                            parent_name(simc, entry.parent.as_deref())
                        ));
                    }
                }
                None => fixme.push(format!(
                    "Missing parent border: {}",
                    parent_id.as_deref().unwrap_or("")
                )),
            }
        }

        if emuia_level == 10 && simc_level == 8 {
            // EMUiA nests it, SIMC says standalone: SIMC wins the level and
            // the asserted parent loses the child's area
            match find_border(borders, PLACE_ID_TAG, parent_id.as_deref()) {
                Some(pidx) => {
                    let child = convert::as_multi_polygon(&borders[idx].geometry);
                    let parent = convert::as_multi_polygon(&borders[pidx].geometry);
                    if let (Some(child), Some(parent)) = (child, parent) {
                        let new_geo = parent.difference(&child);
                        if !new_geo.0.is_empty() {
                            info!(
                                "Changing geometry (EMUiA = 10, TERC = 8) of {} because of {}. {} border dump: {}",
                                borders[pidx].name().unwrap_or("<unnamed>"),
                                borders[idx].name().unwrap_or("<unnamed>"),
                                borders[pidx].name().unwrap_or("<unnamed>"),
                                borders[pidx]
                            );
                            borders[pidx].geometry = Geometry::MultiPolygon(new_geo);
                        }
                    }
                    fixme.push(format!(
                        "EMUiA points teryt:simc {}, name: {} as parent. In TERC this is standalone",
                        borders[pidx].tag(SIMC_TAG).unwrap_or(""),
                        borders[pidx].name().unwrap_or("")
                    ));
                }
                None => fixme.push(format!(
                    "Missing parent border: {}",
                    parent_id.as_deref().unwrap_or("")
                )),
            }
        }

        if emuia_level == 8 && simc_level == 10 {
            // SIMC nests it, EMUiA says standalone: merge it into the SIMC
            // parent when that parent is in the batch
            fixme.push(format!(
                "TERC points this as part of teryt:simc={}, name={}",
                entry.parent.as_deref().unwrap_or(""),
                parent_name(simc, entry.parent.as_deref())
            ));
            level = emuia_level;
            match find_border(borders, SIMC_TAG, entry.parent.as_deref()) {
                Some(pidx) => {
                    info!(
                        "Changing geometry (EMUiA = 8, TERC = 10) of {} because of {}. {} border dump: {}",
                        borders[pidx].name().unwrap_or("<unnamed>"),
                        borders[idx].name().unwrap_or("<unnamed>"),
                        borders[pidx].name().unwrap_or("<unnamed>"),
                        borders[pidx]
                    );
                    let child = convert::as_multi_polygon(&borders[idx].geometry);
                    let parent = convert::as_multi_polygon(&borders[pidx].geometry);
                    if let (Some(child), Some(parent)) = (child, parent) {
                        borders[pidx].geometry = Geometry::MultiPolygon(parent.union(&child));
                    }
                    level = simc_level;
                }
                None => fixme.push(format!(
                    "Missing parent border: {}",
                    entry.parent.as_deref().unwrap_or("")
                )),
            }
        }

        borders[idx].set_tag("admin_level", level.to_string());
        if !fixme.is_empty() {
            borders[idx].set_tag("fixme", fixme.join(", "));
        }
    }
}

/// Linear scan of the current batch; duplicates are a data-quality condition
/// and the first match wins.
fn find_border(borders: &[Feature], key: &str, value: Option<&str>) -> Option<usize> {
    let value = value?;
    borders.iter().position(|b| b.tag(key) == Some(value))
}

fn parent_name(simc: &SimcDictionary, parent: Option<&str>) -> String {
    parent
        .and_then(|code| simc.get(code))
        .map(|e| e.name.clone())
        .unwrap_or_default()
}
