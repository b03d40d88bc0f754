use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use log::info;
use qutescoop_engine::data::parse::{
    build_sector_table, parse_airports, parse_sector_boundaries, parse_sector_names,
};
use qutescoop_engine::data::{read_text_lossy, write_navdata_to_file, NavData};
use reqwest::blocking::Client;
use serde::Serialize;
use tempfile::NamedTempFile;

#[derive(Debug, Serialize)]
struct BundleMetadata {
    airports_source: String,
    sector_names_source: String,
    sector_boundaries_source: String,
    airports: usize,
    sectors: usize,
    degenerate_sectors: usize,
    generated_at_epoch: u64,
}

/// Usage: build_navdata <airports> <sector names> <sector boundaries> [output dir]
///
/// Each source is a local path or an http(s) URL.
fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: build_navdata <airports> <sector names> <sector boundaries> [output dir]");
    }
    let output_dir = PathBuf::from(args.get(3).map(String::as_str).unwrap_or("data"));

    let client = Client::builder()
        .user_agent("qutescoop-engine-navdata-builder/0.1")
        .build()?;

    let airports = parse_airports(fetch_source(&client, &args[0])?.as_bytes())
        .with_context(|| format!("failed to parse airports from {}", args[0]))?;
    let names = parse_sector_names(fetch_source(&client, &args[1])?.as_bytes())
        .with_context(|| format!("failed to parse sector names from {}", args[1]))?;
    let boundaries = parse_sector_boundaries(fetch_source(&client, &args[2])?.as_bytes())
        .with_context(|| format!("failed to parse sector boundaries from {}", args[2]))?;
    let navdata = NavData::new(airports, build_sector_table(&names, boundaries));

    fs::create_dir_all(&output_dir).context("failed to create data output directory")?;
    let bundle_path = output_dir.join("navdata.bin");
    write_navdata_to_file(&navdata, &bundle_path)
        .with_context(|| format!("failed to write bundle to {}", bundle_path.display()))?;

    let metadata = BundleMetadata {
        airports_source: args[0].clone(),
        sector_names_source: args[1].clone(),
        sector_boundaries_source: args[2].clone(),
        airports: navdata.airports().len(),
        sectors: navdata.sectors.len(),
        degenerate_sectors: navdata
            .sectors
            .iter()
            .filter(|s| s.polygon.is_degenerate())
            .count(),
        generated_at_epoch: current_epoch_seconds(),
    };

    let metadata_path = output_dir.join("navdata.meta.json");
    let metadata_json = serde_json::to_vec_pretty(&metadata)?;
    fs::write(&metadata_path, metadata_json)
        .with_context(|| format!("failed to write metadata to {}", metadata_path.display()))?;

    info!(
        "Wrote navdata bundle to {} ({} airports, {} sectors)",
        bundle_path.display(),
        metadata.airports,
        metadata.sectors
    );

    Ok(())
}

fn fetch_source(client: &Client, source: &str) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let file = download(client, source)?;
        read_text(file.path())
    } else {
        read_text(Path::new(source))
    }
}

fn download(client: &Client, url: &str) -> Result<NamedTempFile> {
    info!("Downloading {url}");
    let mut response = client
        .get(url)
        .send()
        .with_context(|| format!("failed to download {url}"))?
        .error_for_status()
        .with_context(|| format!("{url} returned an error status"))?;
    let mut file = NamedTempFile::new()?;
    response.copy_to(&mut file)?;
    file.flush()?;
    Ok(file)
}

fn read_text(path: &Path) -> Result<String> {
    read_text_lossy(path).with_context(|| format!("failed to read {}", path.display()))
}

fn current_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
