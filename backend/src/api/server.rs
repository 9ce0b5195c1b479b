//! HTTP Server for the productload API.
//!
//! Wraps a [`MemoryRepository`] shared across requests. Loads run on the
//! blocking pool, one at a time.
//!
//! # API Endpoints
//!
//! | Method | Path              | Description                          |
//! |--------|-------------------|--------------------------------------|
//! | GET    | `/health`         | Health check                         |
//! | POST   | `/api/load`       | Upload a CSV and load it             |
//! | GET    | `/api/products`   | Current store snapshot               |
//! | GET    | `/api/logs`       | SSE stream for real-time logs        |
//!
//! `POST /api/load` takes a multipart `file` field and optional query
//! parameters `dummy`, `matchBy` and `schemaVersion`.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{aborted_response, error_response, LoadResponse};
use crate::assets::LocalAssets;
use crate::cache::CatalogRegistry;
use crate::config::{LoadOptions, SchemaVersion};
use crate::error::{LoadError, ServerError, ServerResult};
use crate::load::load_table;
use crate::parser::parse_bytes_auto;
use crate::store::MemoryRepository;

/// Server settings.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Base options for every load; query parameters override them.
    pub options: LoadOptions,
    /// Snapshot file, read at startup and written after committed loads.
    pub store_path: Option<PathBuf>,
    /// Directory image paths are resolved against.
    pub images_dir: Option<PathBuf>,
}

#[derive(Clone)]
struct AppState {
    repo: Arc<Mutex<MemoryRepository>>,
    registry: Arc<Mutex<CatalogRegistry>>,
    config: Arc<ServerConfig>,
}

/// Query parameters of `POST /api/load`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadQuery {
    dummy: Option<bool>,
    match_by: Option<String>,
    schema_version: Option<String>,
}

/// Start the HTTP server
pub async fn start_server(port: u16, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let repo = match &config.store_path {
        Some(path) => MemoryRepository::open(path)?,
        None => MemoryRepository::new(),
    };

    let state = AppState {
        repo: Arc::new(Mutex::new(repo)),
        registry: Arc::new(Mutex::new(CatalogRegistry::new())),
        config: Arc::new(config),
    };

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    let app = router(state).layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Productload server running on http://localhost:{}", port);
    println!("   POST /api/load     - Upload and load a CSV file");
    println!("   GET  /api/products - Store snapshot");
    println!("   GET  /api/logs     - SSE log stream");
    println!("   GET  /health       - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/load", post(load_csv))
        .route("/api/products", get(products))
        .route("/api/logs", get(sse_logs))
        .with_state(state)
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "productload",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "load": "POST /api/load",
            "products": "GET /api/products",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Store snapshot endpoint
async fn products(State(state): State<AppState>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let snapshot = state
        .repo
        .lock()
        .map_err(|_| ServerError::Internal("store lock poisoned".into()))
        .and_then(|repo| repo.snapshot().map_err(|e| ServerError::Internal(e.to_string())))
        .map_err(into_http)?;
    Ok(Json(snapshot))
}

/// Upload and load endpoint
async fn load_csv(
    State(state): State<AppState>,
    Query(query): Query<LoadQuery>,
    mut multipart: Multipart,
) -> Result<Json<LoadResponse>, (StatusCode, Json<Value>)> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| into_http(ServerError::BadRequest(format!("Multipart error: {}", e))))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| into_http(ServerError::BadRequest(format!("Read error: {}", e))))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| into_http(ServerError::BadRequest("No file provided".into())))?;
    let options = query_options(&state.config.options, query).map_err(into_http)?;

    log_info(format!(
        "New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    tokio::task::spawn_blocking(move || run_load(&state, &bytes, options))
        .await
        .map_err(|e| into_http(ServerError::Internal(e.to_string())))?
        .map(Json)
        .map_err(into_http)
}

fn query_options(base: &LoadOptions, query: LoadQuery) -> ServerResult<LoadOptions> {
    let mut options = base.clone();
    if let Some(dummy) = query.dummy {
        options.dummy = dummy;
    }
    if let Some(column) = query.match_by.filter(|c| !c.trim().is_empty()) {
        options.match_by = Some(column);
    }
    if let Some(version) = query.schema_version {
        options.schema_version = version
            .parse::<SchemaVersion>()
            .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    }
    Ok(options)
}

fn run_load(state: &AppState, bytes: &[u8], options: LoadOptions) -> ServerResult<LoadResponse> {
    let table = parse_bytes_auto(bytes).map_err(LoadError::from)?;

    let mut assets = match &state.config.images_dir {
        Some(dir) => LocalAssets::with_base_dir(dir),
        None => LocalAssets::new(),
    }
    .with_delimiters(options.delimiters.clone());

    let mut repo = state
        .repo
        .lock()
        .map_err(|_| ServerError::Internal("store lock poisoned".into()))?;
    let mut registry = state
        .registry
        .lock()
        .map_err(|_| ServerError::Internal("catalog lock poisoned".into()))?;

    let report = load_table(&table, &mut *repo, &mut assets, &mut registry, options)?;

    if !report.dry_run {
        if let Some(path) = &state.config.store_path {
            repo.persist(path)
                .map_err(|e| ServerError::Internal(format!("Loaded but not persisted: {}", e)))?;
        }
    }

    log_success(format!(
        "Load finished: {} loaded, {} failed",
        report.loaded_count, report.failed_count
    ));
    Ok(LoadResponse::new(report, &table))
}

fn into_http(err: ServerError) -> (StatusCode, Json<Value>) {
    log_error(err.to_string());
    match &err {
        ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(error_response(msg))),
        ServerError::Load(load) => {
            let status = match load {
                LoadError::Csv(_) | LoadError::Mapping(_) | LoadError::Config(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                LoadError::Store(_) | LoadError::Aborted { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let body = match load.report() {
                Some(report) => aborted_response(&err.to_string(), report),
                None => error_response(&err.to_string()),
            };
            (status, Json(body))
        }
        ServerError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, Json(error_response(msg))),
    }
}
