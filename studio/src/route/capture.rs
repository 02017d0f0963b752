use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;

use api::response::Capture;

use crate::{result::Result, AppState};

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::CAPTURE, get(index))
        .route(api::path::CAPTURE_SESSION, post(acquire).delete(release))
}

async fn index(State(state): State<AppState>) -> Json<Vec<Capture>> {
    Json(state.capture.active().await)
}

async fn acquire(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<(StatusCode, Json<Capture>)> {
    let capture = state.sessions.acquire_capture(&session).await?;
    Ok((StatusCode::CREATED, Json(capture)))
}

async fn release(State(state): State<AppState>, Path(session): Path<String>) -> StatusCode {
    state.capture.release(&session).await;
    StatusCode::NO_CONTENT
}
