#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line tool for the parcel map.
//!
//! Loads a `GeoJSON` parcel file (and optionally a listings file) into an
//! in-memory engine, runs a single query, and prints the result as JSON.
//! `serve` starts the API server instead.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use parcel_map_engine::{ParcelEngine, parse_bbox, parse_regions, seed};
use parcel_map_parcel_models::Listing;
use serde::Serialize;

#[derive(Parser)]
#[command(name = "parcel_map_cli", about = "Parcel query tool")]
struct Cli {
    /// `GeoJSON` `FeatureCollection` of parcels
    #[arg(long, global = true)]
    parcels: Option<PathBuf>,

    /// JSON array of listings (for `regions-summary` and `stats`)
    #[arg(long, global = true)]
    listings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parcels in the given regions
    Regions {
        /// Comma-separated region names (all regions when omitted)
        #[arg(long)]
        regions: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Parcels intersecting a bounding box
    Bbox {
        /// `minX,minY,maxX,maxY`
        bbox: String,
        #[arg(long)]
        regions: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Case-insensitive attribute search
    Search {
        /// One of `owner_name`, `parcel_id`, `address`, `land_use`, `region`
        field: String,
        value: String,
        #[arg(long)]
        regions: Option<String>,
    },
    /// Stored and recomputed measurements for one parcel
    Measure { parcel_id: String },
    /// Listing summary per region
    RegionsSummary,
    /// Listing statistics, optionally for one region
    Stats {
        #[arg(long)]
        region: Option<String>,
    },
    /// Start the API server (configured through the environment)
    Serve,
}

fn print_json(value: &impl Serialize) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Parcels and listings loaded for a single query.
struct Loaded {
    engine: ParcelEngine,
    listings: Vec<Listing>,
}

fn load(
    parcels: Option<&Path>,
    listings: Option<&Path>,
) -> Result<Loaded, Box<dyn std::error::Error>> {
    let engine = ParcelEngine::default();
    match parcels {
        Some(path) => {
            let report = seed::load_parcels_file(&engine, path)?;
            log::info!(
                "{} parcels loaded, {} rejected",
                report.inserted,
                report.rejected
            );
        }
        None => log::warn!("No --parcels file given; querying an empty registry"),
    }

    let listings = match listings {
        Some(path) => seed::load_listings_file(path)?,
        None => Vec::new(),
    };

    Ok(Loaded { engine, listings })
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let load_seeds = || load(cli.parcels.as_deref(), cli.listings.as_deref());

    match cli.command {
        Commands::Serve => {
            actix_web::rt::System::new().block_on(parcel_map_server::run_server())?;
        }
        Commands::Regions { regions, limit } => {
            let Loaded { engine, .. } = load_seeds()?;
            print_json(&engine.by_region(&parse_regions(regions.as_deref()), limit)?)?;
        }
        Commands::Bbox {
            bbox,
            regions,
            limit,
        } => {
            let bbox = parse_bbox(&bbox)?;
            let Loaded { engine, .. } = load_seeds()?;
            print_json(&engine.by_bbox(&bbox, &parse_regions(regions.as_deref()), limit)?)?;
        }
        Commands::Search {
            field,
            value,
            regions,
        } => {
            let Loaded { engine, .. } = load_seeds()?;
            print_json(&engine.search(&field, &value, &parse_regions(regions.as_deref()))?)?;
        }
        Commands::Measure { parcel_id } => {
            let Loaded { engine, .. } = load_seeds()?;
            let measurements = engine
                .get_measurements(&parcel_id)
                .ok_or_else(|| format!("Parcel not found: {parcel_id}"))?;
            print_json(&measurements)?;
        }
        Commands::RegionsSummary => {
            let Loaded { engine, listings } = load_seeds()?;
            print_json(&engine.regions_summary(&listings))?;
        }
        Commands::Stats { region } => {
            let Loaded { engine, listings } = load_seeds()?;
            print_json(&engine.plot_statistics(&listings, region.as_deref()))?;
        }
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    run(Cli::parse())
}
