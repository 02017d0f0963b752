use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::Query;
use futures::Stream;
use tokio_stream::StreamExt;

use api::request::PageQuery;
use api::response::{ArchivePage, PublicStatus};

use crate::{archive::Audience, result::Result, AppState};

/// Served without operator credentials
pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::STATUS, get(status))
        .route(api::path::STATUS_EVENTS, get(events))
        .route(api::path::PUBLIC_ARCHIVE, get(archive))
}

async fn status(State(state): State<AppState>) -> Result<Json<PublicStatus>> {
    Ok(Json(state.notifier.public_status().await?))
}

async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    // polling /api/status catches up on anything skipped
    let stream = state.notifier.viewer_events().filter_map(|event| {
        Event::default()
            .event(event.r#type.as_str())
            .json_data(&event)
            .ok()
            .map(Ok)
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn archive(
    State(state): State<AppState>,
    Query(req): Query<PageQuery>,
) -> Result<Json<ArchivePage>> {
    let page = state
        .archive
        .list(req.page, req.page_size, Audience::Viewer)
        .await?;
    Ok(Json(page.to_response()))
}
