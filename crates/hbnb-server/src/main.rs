//! HBnB API Server
//!
//! REST API over the HBnB object model (states, cities, users, places,
//! reviews, amenities). Storage is either a JSON snapshot file or SQLite,
//! picked by `HBNB_TYPE_STORAGE`.

mod config;
mod handlers;
mod storage;


use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hbnb_core::Storage;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    /// Held for the whole of a request; the storage session is not shared
    pub scope: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            scope: Arc::new(Mutex::new(())),
        }
    }
}

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic| error!("PANIC: {}", panic)));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::fmt().with_env_filter(filter).try_init() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    info!("Starting HBnB API server v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run_server().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run_server() -> Result<()> {
    let settings = Settings::from_env().context("Failed to load configuration")?;
    info!(
        "Config loaded: storage={}, bind={}",
        settings.type_storage,
        settings.bind_address()
    );

    let storage = storage::open(&settings)
        .await
        .context("Failed to initialize storage")?;
    info!("Storage ready: {} objects", storage.count(None).await?);

    let app = build_router(AppState::new(storage.clone()));

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .context("Failed to parse bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    storage.close().await.context("Failed to close storage")?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), storage_scope))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    use handlers::{
        amenities, cities, index, places, places_amenities, places_search, reviews, states,
        users,
    };

    Router::new()
        .route("/status", get(index::status))
        .route("/stats", get(index::stats))
        .route("/states", get(states::list).post(states::create))
        .route(
            "/states/:id",
            get(states::get).put(states::update).delete(states::delete),
        )
        .route(
            "/states/:id/cities",
            get(cities::list_in_state).post(cities::create),
        )
        .route(
            "/cities/:id",
            get(cities::get).put(cities::update).delete(cities::delete),
        )
        .route(
            "/cities/:id/places",
            get(places::list_in_city).post(places::create),
        )
        .route("/amenities", get(amenities::list).post(amenities::create))
        .route(
            "/amenities/:id",
            get(amenities::get)
                .put(amenities::update)
                .delete(amenities::delete),
        )
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route(
            "/places/:id",
            get(places::get).put(places::update).delete(places::delete),
        )
        .route(
            "/places/:id/reviews",
            get(reviews::list_for_place).post(reviews::create),
        )
        .route("/places/:id/amenities", get(places_amenities::list))
        .route(
            "/places/:id/amenities/:amenity_id",
            post(places_amenities::link).delete(places_amenities::unlink),
        )
        .route(
            "/reviews/:id",
            get(reviews::get).put(reviews::update).delete(reviews::delete),
        )
        .route("/places_search", post(places_search::search))
}

/// One request at a time owns the storage session; it is closed afterwards
/// so nothing staged by a failed request leaks into the next one.
async fn storage_scope(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let _scope = state.scope.lock().await;
    let response = next.run(request).await;
    if let Err(e) = state.storage.close().await {
        warn!("Failed to close storage session: {}", e);
    }
    response
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
}
