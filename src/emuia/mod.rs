//! EMUiA place-border fetch layer.
//!
//! The WMS endpoint caps the size of one GetMap answer, so a municipality
//! bounding box is first cut into small tiles and each tile fetched as a
//! KML document. Tile overlap produces duplicate placemarks; the dedup
//! stage removes them later.

pub mod kml;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::debug;

use crate::models::Feature;

pub type Bbox = (f64, f64, f64, f64);

const WMS_ENDPOINT: &str = "http://emuia1.gugik.gov.pl/wmsproxy/emuia/wms";
const LAYER: &str = "emuia:layer_miejscowosci_granica";

const TILE_WIDTH: f64 = 0.03;
const TILE_HEIGHT: f64 = 0.04;
/// Degrees are stepped in integer microdegrees so tile corners repeat
/// exactly between runs.
const PRECISION: f64 = 1_000_000.0;

/// Cut `(minx, miny, maxx, maxy)` into fetchable tiles. Edge tiles are
/// clamped to the box so nothing outside it is requested.
pub fn divide_bbox(bbox: Bbox) -> Vec<Bbox> {
    let (minx, miny, maxx, maxy) = bbox;
    let step_x = (TILE_WIDTH * PRECISION) as i64;
    let step_y = (TILE_HEIGHT * PRECISION) as i64;
    let max_x = (maxx * PRECISION).ceil() as i64;
    let max_y = (maxy * PRECISION).ceil() as i64;

    let mut tiles = Vec::new();
    let mut x = (minx * PRECISION).floor() as i64;
    while x < max_x {
        let mut y = (miny * PRECISION).floor() as i64;
        while y < max_y {
            let tx = x as f64 / PRECISION;
            let ty = y as f64 / PRECISION;
            tiles.push((tx, ty, (tx + TILE_WIDTH).min(maxx), (ty + TILE_HEIGHT).min(maxy)));
            y += step_y;
        }
        x += step_x;
    }
    tiles
}

pub struct EmuiaFetcher {
    client: Client,
}

impl EmuiaFetcher {
    pub fn new() -> Self {
        Self {
            // The endpoint serves an expired certificate chain.
            client: Client::builder()
                .user_agent("osm-borders/0.1 (border exporter)")
                .timeout(std::time::Duration::from_secs(120))
                .danger_accept_invalid_certs(true)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Fetch one tile worth of place borders.
    pub async fn fetch_tile(&self, bbox: Bbox) -> Result<Vec<Feature>> {
        let (minx, miny, maxx, maxy) = bbox;
        let bbox_param = format!("{},{},{},{}", minx, miny, maxx, maxy);
        debug!("Fetching EMUiA tile {}", bbox_param);
        let response = self
            .client
            .get(WMS_ENDPOINT)
            .query(&[
                ("SERVICE", "WMS"),
                ("VERSION", "1.1.1"),
                ("REQUEST", "GetMap"),
                ("FORMAT", "application/vnd.google-earth.kml+xml"),
                ("LAYERS", LAYER),
                ("STYLES", ""),
                ("SRS", "EPSG:4326"),
                ("WIDTH", "16000"),
                ("HEIGHT", "16000"),
                ("BBOX", bbox_param.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("EMUiA request failed for tile {}", bbox_param))?
            .error_for_status()
            .with_context(|| format!("EMUiA refused tile {}", bbox_param))?;
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read EMUiA tile {}", bbox_param))?;
        kml::kml_to_features(&body)
            .with_context(|| format!("Failed to decode EMUiA tile {}", bbox_param))
    }
}

impl Default for EmuiaFetcher {
    fn default() -> Self {
        Self::new()
    }
}
