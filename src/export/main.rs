//! Border export CLI.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use osm_borders::geometry::convert;
use osm_borders::models::Feature;
use osm_borders::osm::{FeatureToOsm, PrgTagMapper};
use osm_borders::pipeline::{self, ProcessOptions};
use osm_borders::registry::{MunicipalityIndex, SimcDictionary, TercDictionary};

#[derive(Parser, Debug)]
#[command(name = "export")]
#[command(about = "Export administrative borders from EMUiA as OSM XML")]
struct Args {
    /// TERC code of the municipality to export
    terc: String,

    /// Output file
    #[arg(short, long, default_value = "result.osm")]
    output: PathBuf,

    /// Directory with the registry cache files (prg.json, simc.json, terc.json)
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// Keep every admin level instead of admin_level=8 only
    #[arg(long)]
    all_levels: bool,

    /// Do not rewrite shared border edges into common ways
    #[arg(long)]
    no_split: bool,

    /// Do not reconcile admin levels against the SIMC registry
    #[arg(long)]
    no_clean: bool,

    /// Export PRG municipality outlines instead of EMUiA place borders
    #[arg(long)]
    prg: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install log subscriber")?;

    let prg = MunicipalityIndex::load(&args.cache_dir.join("prg.json"))
        .context("Failed to load the PRG cache")?;

    let data = if args.prg {
        export_prg(&prg, &args.terc)?
    } else {
        let simc = SimcDictionary::load(&args.cache_dir.join("simc.json"))
            .context("Failed to load the SIMC cache")?;
        let terc_dict = TercDictionary::load(&args.cache_dir.join("terc.json"))
            .context("Failed to load the TERC cache")?;
        let opts = ProcessOptions {
            clean_borders: !args.no_clean,
            split: !args.no_split,
            filter: if args.all_levels {
                Box::new(|_: &Feature| true)
            } else {
                Box::new(|f: &Feature| f.tag("admin_level") == Some("8"))
            },
            now: chrono::Utc::now(),
        };
        pipeline::get_borders(&args.terc, &prg, &simc, &terc_dict, opts).await?
    };

    fs::write(&args.output, &data)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("Wrote {} bytes to {}", data.len(), args.output.display());
    Ok(())
}

/// The PRG mode skips the whole pipeline: outlines are authoritative as-is
/// and only need boundary extraction and tag mapping.
fn export_prg(prg: &MunicipalityIndex, terc: &str) -> Result<Vec<u8>> {
    let mut outlines = prg.with_prefix(terc);
    anyhow::ensure!(!outlines.is_empty(), "No PRG units with prefix {}", terc);
    info!("Exporting {} PRG outlines", outlines.len());
    for outline in &mut outlines {
        outline.geometry = convert::boundary(&outline.geometry);
    }
    let mapper = PrgTagMapper;
    Ok(FeatureToOsm::new(outlines, &mapper).to_xml()?)
}
