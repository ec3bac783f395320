use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use magpie_core::{
    Download, DownloadFilter, DownloadStatus, GrabError, SanitizedConfig, ScheduledTask,
    SchedulerError, StoreError, TaskStatus, TaskType,
};

use crate::state::AppState;

/// API error: status code plus a JSON `{"error": ...}` body.
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "error": self.1 }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => ApiError(StatusCode::NOT_FOUND, e.to_string()),
            StoreError::Database(_) => ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(e: SchedulerError) -> Self {
        match e {
            SchedulerError::UnknownTask(_) => ApiError(StatusCode::NOT_FOUND, e.to_string()),
            SchedulerError::Store(e) => e.into(),
        }
    }
}

impl From<GrabError> for ApiError {
    fn from(e: GrabError) -> Self {
        match &e {
            GrabError::NotFound(_) => ApiError(StatusCode::NOT_FOUND, e.to_string()),
            GrabError::State(_) => ApiError(StatusCode::CONFLICT, e.to_string()),
            GrabError::Validation(_) | GrabError::Blacklisted(_) => {
                ApiError(StatusCode::BAD_REQUEST, e.to_string())
            }
            _ => ApiError(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    }
}

/// Reject requests without the configured API key. No-op when no key is set.
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(expected) = &state.config.server.api_key {
        let provided = request
            .headers()
            .get("x-api-key")
            .and_then(|v| v.to_str().ok());
        if provided != Some(expected.as_str()) {
            return ApiError(StatusCode::UNAUTHORIZED, "invalid api key".to_string())
                .into_response();
        }
    }
    next.run(request).await
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_secs: i64,
    pub active_downloads: usize,
    pub tasks: usize,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Result<Json<StatusResponse>, ApiError> {
    let active = state.downloads.list_non_terminal()?;
    let tasks = state.scheduler.list()?;
    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (chrono::Utc::now() - state.started_at).num_seconds(),
        active_downloads: active.len(),
        tasks: tasks.len(),
    }))
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(SanitizedConfig::from(&state.config))
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TaskStatus>>, ApiError> {
    Ok(Json(state.scheduler.list()?))
}

fn parse_task(task: &str) -> Result<TaskType, ApiError> {
    TaskType::from_str(task)
        .ok_or_else(|| ApiError(StatusCode::NOT_FOUND, format!("unknown task: {}", task)))
}

#[derive(Serialize)]
pub struct TriggerResponse {
    pub started: bool,
}

pub async fn trigger_task(
    State(state): State<Arc<AppState>>,
    Path(task): Path<String>,
) -> Result<Json<TriggerResponse>, ApiError> {
    let task = parse_task(&task)?;
    let started = state.scheduler.trigger(task).await?;
    Ok(Json(TriggerResponse { started }))
}

#[derive(Deserialize)]
pub struct UpdateTaskRequest {
    pub interval_minutes: Option<i64>,
    pub enabled: Option<bool>,
}

pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(task): Path<String>,
    Json(body): Json<UpdateTaskRequest>,
) -> Result<Json<ScheduledTask>, ApiError> {
    let task = parse_task(&task)?;
    if let Some(interval) = body.interval_minutes {
        if interval < 1 {
            return Err(ApiError(
                StatusCode::BAD_REQUEST,
                "interval_minutes must be >= 1".to_string(),
            ));
        }
    }
    Ok(Json(state.scheduler.update(
        task,
        body.interval_minutes,
        body.enabled,
    )?))
}

#[derive(Deserialize)]
pub struct DownloadsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadsQuery>,
) -> Result<Json<Vec<Download>>, ApiError> {
    let mut filter = DownloadFilter::new().with_limit(query.limit.unwrap_or(100));
    if let Some(status) = query.status.as_deref() {
        let status = DownloadStatus::from_str(status).ok_or_else(|| {
            ApiError(
                StatusCode::BAD_REQUEST,
                format!("unknown status: {}", status),
            )
        })?;
        filter = filter.with_status(status);
    }
    Ok(Json(state.downloads.list(&filter)?))
}

#[derive(Deserialize)]
pub struct CancelQuery {
    #[serde(default)]
    pub delete_data: bool,
}

pub async fn cancel_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<CancelQuery>,
) -> Result<StatusCode, ApiError> {
    state.manager.cancel(id, query.delete_data).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct WantedEpisodeEntry {
    pub id: i64,
    pub show_title: String,
    pub season: i32,
    pub episode: i32,
}

#[derive(Serialize)]
pub struct WantedAlbumEntry {
    pub id: i64,
    pub artist_name: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct WantedBookEntry {
    pub id: i64,
    pub author_name: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct WantedResponse {
    pub movies: Vec<magpie_core::Movie>,
    pub episodes: Vec<WantedEpisodeEntry>,
    pub albums: Vec<WantedAlbumEntry>,
    pub books: Vec<WantedBookEntry>,
}

pub async fn wanted(State(state): State<Arc<AppState>>) -> Result<Json<WantedResponse>, ApiError> {
    let movies = state.library.wanted_movies()?;
    let episodes = state
        .library
        .wanted_episodes(state.config.rss.episode_limit)?
        .into_iter()
        .map(|w| WantedEpisodeEntry {
            id: w.episode.id,
            show_title: w.show_title,
            season: w.episode.season,
            episode: w.episode.episode,
        })
        .collect();
    let albums = state
        .library
        .wanted_albums()?
        .into_iter()
        .map(|w| WantedAlbumEntry {
            id: w.album.id,
            artist_name: w.artist_name,
            title: w.album.title,
        })
        .collect();
    let books = state
        .library
        .wanted_books()?
        .into_iter()
        .map(|w| WantedBookEntry {
            id: w.book.id,
            author_name: w.author_name,
            title: w.book.title,
        })
        .collect();

    Ok(Json(WantedResponse {
        movies,
        episodes,
        albums,
        books,
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&state.registry.gather(), &mut buffer)
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    String::from_utf8(buffer)
        .map_err(|e| ApiError(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
