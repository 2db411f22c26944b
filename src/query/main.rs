//! Query server for the places backbone.
//!
//! Loads the record store once at startup, builds the in-memory fuzzy
//! index, and serves name completion and direct record lookup over HTTP.
//! With `--query` it runs a single search on the command line instead.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ortskern::models::PlaceRecord;
use ortskern::search::{PlaceSearch, DEFAULT_MIN_SCORE};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Place completion and lookup server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:3000")]
    listen: String,

    /// Record store written by the ingest pipeline
    #[arg(long, default_value = "data/processed/places.jsonl")]
    places: PathBuf,

    /// Run one search on the command line and exit
    #[arg(short, long)]
    query: Option<String>,

    /// Result limit for --query
    #[arg(long, default_value = "10")]
    limit: usize,

    /// Minimum score for --query
    #[arg(long, default_value = "60")]
    min_score: f64,
}

/// Application state shared across handlers. The index is read-only after
/// load, so handlers share it without locking.
struct AppState {
    search: PlaceSearch,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Loading record store from {}", args.places.display());
    let search = PlaceSearch::load_from_path(&args.places)?;
    info!("Loaded {} places", search.len());

    if let Some(query) = &args.query {
        run_oneshot(&search, query, args.limit, args.min_score);
        return Ok(());
    }

    let state = Arc::new(AppState { search });

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/completion", get(completion_handler))
        .route("/place/{place_id}", get(place_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", args.listen);
    let listener = tokio::net::TcpListener::bind(&args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn run_oneshot(search: &PlaceSearch, query: &str, limit: usize, min_score: f64) {
    let hits = search.search(query, limit, min_score);
    if hits.is_empty() {
        println!("No results for: {query}");
        return;
    }
    println!("Found {} result(s) for: {query}\n", hits.len());
    for hit in hits {
        println!("  {:<40} (ID: {}, Score: {:.1})", hit.name, hit.place_id, hit.score);
        if let Some(district) = &hit.district {
            println!("    District: {district}");
        }
        if let (Some(lat), Some(lon)) = (hit.lat, hit.lon) {
            println!("    Coordinates: {lat:.4}, {lon:.4}");
        }
        if let Some(assoc) = &hit.association_name {
            println!("    Association: {assoc}");
        }
        println!();
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    places: usize,
}

/// Health check endpoint
async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        places: state.search.len(),
    })
}

#[derive(Debug, Deserialize)]
struct CompletionParams {
    #[serde(default)]
    query: String,
    limit: Option<usize>,
    min_score: Option<f64>,
}

#[derive(Serialize)]
struct CompletionResponse {
    results: Vec<CompletionItem>,
    size: usize,
    from: usize,
}

#[derive(Serialize)]
struct CompletionItem {
    value: String,
    place_id: String,
    score: f64,
    status: Option<String>,
    district: Option<String>,
    association: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Name completion: `/completion?query=ahr&limit=10`
async fn completion_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompletionParams>,
) -> Json<CompletionResponse> {
    let limit = params.limit.unwrap_or(10).clamp(1, 20);
    let min_score = params.min_score.unwrap_or(DEFAULT_MIN_SCORE);

    let hits = state.search.search(&params.query, limit, min_score);
    let results: Vec<CompletionItem> = hits
        .into_iter()
        .map(|h| CompletionItem {
            value: h.name,
            place_id: h.place_id,
            score: h.score,
            status: h.status_code,
            district: h.district,
            association: h.association_name,
            lat: h.lat,
            lon: h.lon,
        })
        .collect();

    let size = results.len();
    Json(CompletionResponse {
        results,
        size,
        from: 0,
    })
}

/// Direct record lookup: `/place/{place_id}`, 404 on unknown id.
async fn place_handler(
    State(state): State<Arc<AppState>>,
    Path(place_id): Path<String>,
) -> Result<Json<PlaceRecord>, (StatusCode, Json<serde_json::Value>)> {
    match state.search.get(&place_id) {
        Some(record) => Ok(Json(record.clone())),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "place not found" })),
        )),
    }
}
