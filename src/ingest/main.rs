//! Municipal directory ingest pipeline.
//!
//! Reads the directory workbook, normalizes headers, canonicalizes rows
//! (including UTM to WGS84 conversion), and writes the line-delimited
//! record store plus the name index.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ortskern::coords::ZoneTransformer;
use ortskern::headers;
use ortskern::pipeline::{self, reader, BuildStats};
use ortskern::store;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Build the places backbone from the municipal directory")]
struct Args {
    /// Directory workbook (.xlsx) or CSV export
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Optional TOML config with input/output paths
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output path for the record store (default data/processed/places.jsonl)
    #[arg(long)]
    out_places: Option<PathBuf>,

    /// Output path for the name index (default data/processed/places_index.json)
    #[arg(long)]
    out_index: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    let input = args
        .file
        .clone()
        .or(config.input)
        .context("No input file: pass --file or set `input` in the config")?;
    let out_places = args
        .out_places
        .or(config.out_places)
        .unwrap_or_else(|| PathBuf::from("data/processed/places.jsonl"));
    let out_index = args
        .out_index
        .or(config.out_index)
        .unwrap_or_else(|| PathBuf::from("data/processed/places_index.json"));

    info!("Ortskern Ingest Pipeline");
    info!("File: {}", input.display());

    let start = Utc::now();

    let rows = reader::read_rows(&input)?;
    let header = headers::detect(&rows).context("Header normalization failed")?;
    info!(
        "Header resolved ({} columns, data starts at row {})",
        header.columns.len(),
        header.data_start
    );

    let data_rows = &rows[header.data_start.min(rows.len())..];
    let pb = ProgressBar::new(data_rows.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})",
            )?
            .progress_chars("#>-"),
    );

    let mut transformer = ZoneTransformer::new();
    let mut records = Vec::new();
    let mut index = store::NameIndex::new();
    let mut stats = BuildStats::default();

    for row in data_rows {
        pb.inc(1);
        stats.rows += 1;

        let Some(rec) = pipeline::build_row(row, &header, &mut transformer) else {
            stats.skipped += 1;
            continue;
        };
        if rec.geo.lat.is_some() {
            stats.geocoded += 1;
        }
        index
            .entry(rec.name_key())
            .or_default()
            .push(rec.place_id.clone());
        records.push(rec);
        stats.emitted += 1;
    }
    pb.finish_with_message("Processing complete");

    if stats.skipped > 0 {
        warn!("Dropped {} rows without place_id/name", stats.skipped);
    }

    store::write_places(&out_places, &records)?;
    store::write_name_index(&out_index, &index)?;

    let elapsed = Utc::now() - start;
    info!(
        "Done in {}s: {} rows, {} emitted, {} skipped, {} geocoded ({} zones)",
        elapsed.num_seconds(),
        stats.rows,
        stats.emitted,
        stats.skipped,
        stats.geocoded,
        transformer.cached_zones()
    );

    Ok(())
}
