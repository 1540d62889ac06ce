//! Wikidata place entries fetched over SPARQL.

pub mod fetcher;

pub use fetcher::{WikidataEntry, WikidataFetcher};
