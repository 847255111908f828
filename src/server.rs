use crate::config::AppConfig;
use crate::data;
use crate::error::MapError;
use crate::intake;
use crate::render;
use anyhow::Result;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub struct AppState {
    pub config: AppConfig,
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub map_url: String,
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    config.storage.ensure_dirs()?;

    let port = config.server.port;
    let state = Arc::new(AppState { config });
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    tracing::info!("starting server on http://{}", addr);

    let app = app_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/api/health", get(health_check))
        .route("/api/generate-map", post(generate_map))
        .route("/api/maps/{filename}", get(get_map))
        // Uploads are accepted at any size
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home() -> &'static str {
    "Welcome to the HealthMap Analyzer API! Use the /api/health, /api/generate-map and /api/maps/<filename> endpoints."
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

async fn generate_map(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<GenerateResponse>, MapError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| MapError::Multipart(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| MapError::Multipart(err.to_string()))?;
        upload = Some((filename, bytes.to_vec()));
    }

    let (filename, bytes) = upload.ok_or(MapError::MissingFile)?;
    if filename.is_empty() {
        return Err(MapError::EmptyFilename);
    }

    let upload_path =
        intake::store_upload(&state.config.storage.upload_dir, &filename, &bytes).await?;

    // The upload is consumed by this request whether or not it maps cleanly
    let outcome = process_upload(&state, &upload_path);
    intake::discard_upload(&upload_path).await;
    let map_filename = outcome?;

    tracing::info!("generated map artifact {}", map_filename);

    Ok(Json(GenerateResponse {
        success: true,
        map_url: format!("/api/maps/{}", map_filename),
    }))
}

fn process_upload(state: &AppState, path: &std::path::Path) -> Result<String, MapError> {
    let records = data::load_table(path)?;
    let html = render::render_map(&state.config.map, &records)?;
    render::save_artifact(&state.config.storage.maps_dir, &html)
}

async fn get_map(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, MapError> {
    // Only names the renderer could have produced are served
    let safe = intake::sanitize_filename(&filename).map_err(|_| MapError::NotFound)?;
    if safe != filename || !safe.ends_with(".html") {
        return Err(MapError::NotFound);
    }

    let path = state.config.storage.maps_dir.join(&safe);
    let contents = tokio::fs::read(&path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MapError::NotFound
        } else {
            MapError::Io(err)
        }
    })?;

    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        contents,
    )
        .into_response())
}
