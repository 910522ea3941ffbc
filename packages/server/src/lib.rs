#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the parcel map.
//!
//! Loads parcels (and optionally listings) from seed files into an
//! in-memory [`ParcelEngine`] at startup and serves region, bounding-box,
//! and attribute queries, per-parcel measurements, and listing statistics
//! as JSON.

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use parcel_map_engine::{ParcelEngine, seed};
use parcel_map_parcel_models::Listing;

pub use config::{ConfigError, ServerConfig};

/// Shared application state.
pub struct AppState {
    pub engine: Arc<ParcelEngine>,
    /// Listings supplied at startup, joined with parcels for statistics.
    pub listings: Arc<Vec<Listing>>,
}

/// Registers the `/api` routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/parcels", web::get().to(handlers::parcels))
            .route("/parcels", web::post().to(handlers::create_parcel))
            .route("/parcels/search", web::get().to(handlers::search))
            .route("/parcels/{parcel_id}", web::get().to(handlers::parcel_detail))
            .route("/parcels/{parcel_id}", web::patch().to(handlers::update_parcel))
            .route("/parcels/{parcel_id}", web::delete().to(handlers::delete_parcel))
            .route(
                "/parcels/{parcel_id}/measurements",
                web::get().to(handlers::parcel_measurements),
            )
            .route("/external/regions", web::get().to(handlers::regions_summary))
            .route("/external/stats", web::get().to(handlers::plot_statistics)),
    );
}

/// Builds the engine and listings described by `config`.
///
/// # Errors
///
/// Returns an error if a configured seed file cannot be read or parsed.
pub fn build_state(config: &ServerConfig) -> Result<AppState, parcel_map_engine::EngineError> {
    let engine = ParcelEngine::new(config.limits);

    if let Some(path) = &config.parcels_path {
        seed::load_parcels_file(&engine, path)?;
    }

    let listings = match &config.listings_path {
        Some(path) => seed::load_listings_file(path)?,
        None => Vec::new(),
    };

    Ok(AppState {
        engine: Arc::new(engine),
        listings: Arc::new(listings),
    })
}

/// Starts the parcel map API server.
///
/// Reads [`ServerConfig`] from the environment, loads the seed files, and
/// runs the Actix-Web HTTP server. The caller provides the async runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if configuration or seed loading
/// fails, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> std::io::Result<()> {
    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;

    log::info!("Loading parcel data...");
    let state = web::Data::new(build_state(&config).map_err(std::io::Error::other)?);
    log::info!(
        "Serving {} parcels and {} listings",
        state.engine.len(),
        state.listings.len()
    );

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes)
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}
