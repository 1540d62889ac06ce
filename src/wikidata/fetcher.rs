//! Wikidata place fetcher using SPARQL queries.
//!
//! One query per municipality: every item whose TERC identifier (P1653)
//! starts with the municipality code, together with its label, coordinates
//! and Polish Wikipedia article.

use anyhow::{Context, Result};
use geo_types::Point;
use percent_encoding::percent_decode_str;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use wkt::TryFromWkt;

const WIKIDATA_SPARQL_ENDPOINT: &str = "https://query.wikidata.org/sparql";
const ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/";
const ARTICLE_PREFIX: &str = "https://pl.wikipedia.org/wiki/";

/// One candidate place for the name matcher.
#[derive(Debug, Clone)]
pub struct WikidataEntry {
    pub name: String,
    pub point: Point<f64>,
    pub wikidata: String,
    pub wikipedia: String,
}

#[derive(Debug, Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Debug, Deserialize)]
struct SparqlResults {
    bindings: Vec<SparqlBinding>,
}

#[derive(Debug, Deserialize)]
struct SparqlBinding {
    place: SparqlValue,
    #[serde(rename = "placeLabel")]
    label: SparqlValue,
    article: SparqlValue,
    coords: SparqlValue,
}

#[derive(Debug, Deserialize)]
struct SparqlValue {
    value: String,
}

pub struct WikidataFetcher {
    client: Client,
}

impl WikidataFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .user_agent("osm-borders/0.1 (border exporter)")
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Fetch every Wikidata place inside the TERC unit `terc`.
    pub async fn fetch_for_terc(&self, terc: &str) -> Result<Vec<WikidataEntry>> {
        let query = sparql_query(terc);
        let response = self
            .client
            .get(WIKIDATA_SPARQL_ENDPOINT)
            .query(&[("query", query.as_str()), ("format", "json")])
            .send()
            .await
            .context("Wikidata SPARQL request failed")?
            .error_for_status()
            .context("Wikidata query refused")?;

        let data: SparqlResponse = response
            .json()
            .await
            .context("Failed to parse Wikidata response")?;
        let entries = entries_from_response(data);
        debug!("Fetched {} Wikidata places for terc {}", entries.len(), terc);
        Ok(entries)
    }
}

impl Default for WikidataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Places do not carry a TERC identifier themselves; only the municipality
/// does (P1653). The query resolves the municipality first and then walks
/// P131 ("located in") backwards to every place inside it.
fn sparql_query(terc: &str) -> String {
    format!(
        r#"
        SELECT ?place ?placeLabel ?article ?coords WHERE {{
            ?unit wdt:P1653 "{}" .
            ?place wdt:P131 ?unit .
            ?place wdt:P625 ?coords .
            ?article schema:about ?place ;
                     schema:inLanguage "pl" ;
                     schema:isPartOf <https://pl.wikipedia.org/> .
            SERVICE wikibase:label {{ bd:serviceParam wikibase:language "pl". }}
        }}
    "#,
        terc
    )
}

/// Parse a raw SPARQL JSON document. Split out of the fetcher so response
/// handling is testable without the network.
pub fn parse_response(data: &str) -> Result<Vec<WikidataEntry>> {
    let response: SparqlResponse =
        serde_json::from_str(data).context("Failed to parse Wikidata response")?;
    Ok(entries_from_response(response))
}

fn entries_from_response(data: SparqlResponse) -> Vec<WikidataEntry> {
    let mut entries = Vec::new();
    for binding in data.results.bindings {
        match entry_from_binding(&binding) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("Skipping malformed Wikidata binding: {}", e),
        }
    }
    entries
}

fn entry_from_binding(binding: &SparqlBinding) -> Result<WikidataEntry> {
    let wikidata = binding
        .place
        .value
        .strip_prefix(ENTITY_PREFIX)
        .with_context(|| format!("Unexpected entity URI: {}", binding.place.value))?
        .to_string();
    let point = Point::<f64>::try_from_wkt_str(&binding.coords.value)
        .map_err(|e| anyhow::anyhow!("Bad coordinates {}: {}", binding.coords.value, e))?;
    let title = binding
        .article
        .value
        .strip_prefix(ARTICLE_PREFIX)
        .with_context(|| format!("Unexpected article URL: {}", binding.article.value))?;
    // article URLs carry underscores; the wikipedia tag wants the display
    // title with spaces
    let title = percent_decode_str(title)
        .decode_utf8_lossy()
        .replace('_', " ");
    Ok(WikidataEntry {
        name: binding.label.value.clone(),
        point,
        wikidata,
        wikipedia: format!("pl:{}", title),
    })
}
