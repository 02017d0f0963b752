use axum::extract::{Path, State};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use axum_extra::extract::Query;
use http::StatusCode;

use api::request::{ArchiveRef, PageQuery, RenameArchive, SetVisibility};
use api::response::{ArchiveEntry, ArchivePage};

use crate::{archive::Audience, result::Result, AppState};

pub fn route() -> Router<AppState> {
    Router::new()
        .route(api::path::ARCHIVE, get(index))
        .route(api::path::ARCHIVE_TRASH, get(trashed).post(trash))
        .route(api::path::ARCHIVE_RESTORE, post(restore))
        .route(api::path::ARCHIVE_PERMANENT, delete(permanent_delete))
        .route(api::path::ARCHIVE_VISIBILITY, post(visibility))
        .route(api::path::ARCHIVE_RENAME, put(rename))
}

async fn index(
    State(state): State<AppState>,
    Query(req): Query<PageQuery>,
) -> Result<Json<ArchivePage>> {
    let page = state
        .archive
        .list(req.page, req.page_size, Audience::Admin)
        .await?;
    Ok(Json(page.to_response()))
}

async fn trashed(State(state): State<AppState>) -> Result<Json<Vec<ArchiveEntry>>> {
    let entries = state.archive.list_trashed().await?;
    Ok(Json(entries.iter().map(|e| e.to_response()).collect()))
}

async fn trash(
    State(state): State<AppState>,
    Json(req): Json<ArchiveRef>,
) -> Result<Json<ArchiveEntry>> {
    Ok(Json(state.archive.trash(&req.id).await?.to_response()))
}

async fn restore(
    State(state): State<AppState>,
    Json(req): Json<ArchiveRef>,
) -> Result<Json<ArchiveEntry>> {
    Ok(Json(state.archive.restore(&req.id).await?.to_response()))
}

async fn permanent_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.archive.permanent_delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn visibility(
    State(state): State<AppState>,
    Json(req): Json<SetVisibility>,
) -> Result<Json<ArchiveEntry>> {
    let entry = state.archive.set_visibility(&req.id, req.visible).await?;
    Ok(Json(entry.to_response()))
}

async fn rename(
    State(state): State<AppState>,
    Json(req): Json<RenameArchive>,
) -> Result<Json<ArchiveEntry>> {
    let entry = state.archive.rename(&req.id, &req.title).await?;
    Ok(Json(entry.to_response()))
}
