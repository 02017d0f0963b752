use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::Query;
use http::StatusCode;

use api::request::{CreateSession, RevealQuery, SessionRef};
use api::response::{CurrentStatus, EndResult, Session};

use crate::{result::Result, AppState};

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::SESSION, post(create))
        .route(api::path::SESSION_START, post(start))
        .route(api::path::SESSION_END, post(end))
        .route(api::path::SESSION_CURRENT, get(current))
}

/// The only response that carries the ingest key in plaintext by default
async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSession>,
) -> Result<(StatusCode, Json<Session>)> {
    let session = state.sessions.create(&req.title, &req.description).await?;
    Ok((StatusCode::CREATED, Json(session.to_response(true))))
}

async fn start(
    State(state): State<AppState>,
    Json(req): Json<SessionRef>,
) -> Result<Json<Session>> {
    let session = state.sessions.start(&req.session_id).await?;
    Ok(Json(session.to_response(false)))
}

async fn end(
    State(state): State<AppState>,
    Json(req): Json<SessionRef>,
) -> Result<Json<EndResult>> {
    let outcome = state.sessions.end(&req.session_id).await?;
    Ok(Json(outcome.to_response()))
}

async fn current(
    State(state): State<AppState>,
    Query(req): Query<RevealQuery>,
) -> Result<Json<CurrentStatus>> {
    let status = state.sessions.current_status().await?;
    Ok(Json(status.to_response(req.reveal)))
}
