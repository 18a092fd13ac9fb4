//! Read-only HTTP projection of the metadata store.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use clipflow_core::AppError;

use crate::error::HttpAppError;
use crate::state::AppState;

const MAX_PAGE_SIZE: i64 = 100;
const MAX_BATCH_SIZE: usize = 100;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/videos/", get(list_videos))
        .route("/videos/author/{author_id}", get(author_videos))
        .route("/videos/batch", post(batch_videos))
        .route("/video/", get(get_video))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "msg": "healthy" }))
}

#[derive(Debug, Deserialize)]
struct PageParams {
    #[serde(default)]
    offset: i64,
    #[serde(default = "default_count")]
    count: i64,
}

fn default_count() -> i64 {
    MAX_PAGE_SIZE
}

impl PageParams {
    fn clamped(&self) -> (i64, i64) {
        (self.offset.max(0), self.count.clamp(1, MAX_PAGE_SIZE))
    }
}

async fn list_videos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (offset, count) = params.clamped();
    let videos = state.videos.list_page(offset, count).await?;
    Ok(Json(json!({ "msg": "ok", "videos": videos })))
}

async fn author_videos(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(author_id): axum::extract::Path<i64>,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    let (offset, count) = params.clamped();
    let videos = state.videos.list_by_author(author_id, offset, count).await?;
    Ok(Json(json!({ "msg": "ok", "videos": videos })))
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    uuids: Vec<Uuid>,
}

async fn batch_videos(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<serde_json::Value>, HttpAppError> {
    if request.uuids.len() > MAX_BATCH_SIZE {
        return Err(AppError::InvalidInput(format!(
            "at most {} uuids per batch",
            MAX_BATCH_SIZE
        ))
        .into());
    }
    let videos = state.videos.get_batch(&request.uuids).await?;
    Ok(Json(json!({ "msg": "ok", "videos": videos })))
}

#[derive(Debug, Deserialize)]
struct VideoQuery {
    uuid: Uuid,
}

/// Single-record lookup. A record that exists but has not been confirmed by
/// the pipeline yet is reported as temporarily unavailable.
async fn get_video(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VideoQuery>,
) -> Result<Response, HttpAppError> {
    match state.videos.get_by_uuid(query.uuid).await? {
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "msg": "video not found" })),
        )
            .into_response()),
        Some(video) if !video.is_complete => Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "msg": "video is still processing" })),
        )
            .into_response()),
        Some(video) => Ok(Json(json!({ "msg": "ok", "video": video })).into_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_clamp_to_valid_ranges() {
        let params = PageParams { offset: -5, count: 0 };
        assert_eq!(params.clamped(), (0, 1));

        let params = PageParams { offset: 10, count: 1000 };
        assert_eq!(params.clamped(), (10, 100));

        let params = PageParams { offset: 0, count: 25 };
        assert_eq!(params.clamped(), (0, 25));
    }
}
