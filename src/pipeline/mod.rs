//! The border export pipeline.
//!
//! Stage order is fixed: dedup, registry reconciliation, Wikidata matching,
//! boundary extraction, then serialization with the splitter plugged in as
//! the serializer's batch mapping. Every stage rewrites the feature batch in
//! place of returning annotations, so each one sees its predecessors'
//! repairs.

pub mod dedup;
pub mod reconcile;
pub mod split;
pub mod wikimatch;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use geo::BoundingRect;
use geo_types::MultiPolygon;
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::emuia::{self, EmuiaFetcher};
use crate::error::ExportError;
use crate::geometry::area::BUFFER_TOLERANCE;
use crate::geometry::{convert, WorkingArea};
use crate::models::Feature;
use crate::osm::{BorderTagMapper, FeatureToOsm};
use crate::registry::{MunicipalityIndex, SimcDictionary, TercDictionary};
use crate::wikidata::{WikidataEntry, WikidataFetcher};

/// Knobs for one export run.
pub struct ProcessOptions<'a> {
    /// Reconcile admin levels against the SIMC registry.
    pub clean_borders: bool,
    /// Rewrite shared border edges into common ways.
    pub split: bool,
    /// Which reconciled borders end up in the output document.
    pub filter: Box<dyn Fn(&Feature) -> bool + 'a>,
    /// Reference time for expiry filtering; injectable so reruns compare.
    pub now: DateTime<Utc>,
}

impl Default for ProcessOptions<'_> {
    fn default() -> Self {
        Self {
            clean_borders: true,
            split: true,
            filter: Box::new(|_| true),
            now: Utc::now(),
        }
    }
}

/// Runs the full pipeline over an already-fetched batch and serializes the
/// result. Deterministic for fixed inputs and `now`.
pub fn process(
    adm_bound: MultiPolygon<f64>,
    borders: Vec<Feature>,
    wikidata: Vec<WikidataEntry>,
    simc: &SimcDictionary,
    opts: ProcessOptions<'_>,
) -> Result<Vec<u8>, ExportError> {
    let area = WorkingArea::new(adm_bound, BUFFER_TOLERANCE);
    let mut borders = dedup::filter_and_dedup(borders, &area, opts.now);
    if opts.clean_borders {
        reconcile::clean_borders(&mut borders, simc);
    }
    wikimatch::add_wikidata(wikidata, &mut borders);
    for border in &mut borders {
        border.geometry = convert::boundary(&border.geometry);
    }

    let caller_filter = opts.filter;
    let mapper = BorderTagMapper;
    let mut builder = FeatureToOsm::new(borders, &mapper).with_filter(|f: &Feature| {
        if !area.contains(&f.geometry) {
            debug!("Border not contained in working area: {}", f);
            return false;
        }
        if !(caller_filter)(f) {
            debug!("Filter function rejected border: {}", f);
            return false;
        }
        true
    });
    if opts.split {
        builder = builder.with_mapping(|mut batch| {
            split::split_by_common_ways(&mut batch);
            batch
        });
    }
    builder.to_xml()
}

/// Full fetch-and-export for one municipality: PRG outline, tiled EMUiA
/// download, Wikidata candidates, then [`process`].
pub async fn get_borders(
    terc: &str,
    prg: &MunicipalityIndex,
    simc: &SimcDictionary,
    terc_dict: &TercDictionary,
    opts: ProcessOptions<'_>,
) -> Result<Vec<u8>> {
    match terc_dict.get(terc) {
        Some(unit) => info!("Exporting borders of {} ({})", unit.name, terc),
        None => warn!("TERC {} not present in the registry cache", terc),
    }

    let adm_bound = prg
        .outline(terc)
        .with_context(|| format!("No municipality outline for TERC {}", terc))?;
    let bbox = adm_bound
        .bounding_rect()
        .context("Municipality outline is empty")?;
    let tiles = emuia::divide_bbox((bbox.min().x, bbox.min().y, bbox.max().x, bbox.max().y));
    info!("Fetching {} EMUiA tiles", tiles.len());

    let fetcher = EmuiaFetcher::new();
    let progress = ProgressBar::new(tiles.len() as u64);
    let fetched = try_join_all(tiles.into_iter().map(|tile| {
        let fetcher = &fetcher;
        let progress = &progress;
        async move {
            let features = fetcher.fetch_tile(tile).await?;
            progress.inc(1);
            Ok::<_, anyhow::Error>(features)
        }
    }))
    .await?;
    progress.finish_and_clear();
    let borders: Vec<Feature> = fetched.into_iter().flatten().collect();
    info!("Fetched {} borders from EMUiA", borders.len());

    let wikidata = match WikidataFetcher::new().fetch_for_terc(terc).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Wikidata fetch failed, exporting without links: {}", e);
            Vec::new()
        }
    };

    Ok(process(adm_bound, borders, wikidata, simc, opts)?)
}
