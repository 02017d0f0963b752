use http::StatusCode;
use serde_json::json;

use api::request::PageQuery;
use api::response::{
    ActiveState, ArchiveEntry, ArchivePage, CurrentStatus, EndOutcome, EndResult, ErrorBody,
    Lifecycle, PublicStatus, Session, SessionState,
};

mod common;

async fn create(server: &common::Server, title: &str) -> Session {
    let res = server
        .post(api::path::SESSION)
        .json(&json!({ "title": title, "description": "weekly" }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::CREATED, res.status());
    res.json().await.unwrap()
}

async fn error_of(res: reqwest::Response) -> (StatusCode, String) {
    let status = res.status();
    let body: ErrorBody = res.json().await.unwrap();
    (status, body.error)
}

#[tokio::test]
async fn test_broadcast_to_archive() {
    let server = common::start().await;

    let session = create(&server, "Market Update").await;
    assert_eq!(SessionState::Idle, session.state);
    assert!(!session.ingest.masked);
    assert!(session.ingest.endpoint.ends_with(&format!("/whip/{}", session.id)));

    let current: CurrentStatus = server
        .get(api::path::SESSION_CURRENT)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ActiveState::Idle, current.state);
    let shown = current.session.unwrap();
    assert!(shown.ingest.masked);
    assert_ne!(session.ingest.key, shown.ingest.key);

    let res = server
        .post(api::path::SESSION_START)
        .json(&json!({ "sessionId": session.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let live: Session = res.json().await.unwrap();
    assert_eq!(SessionState::Live, live.state);

    let status: PublicStatus = reqwest::get(server.url(api::path::STATUS))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(status.is_live);
    assert_eq!(Some("Market Update"), status.title.as_deref());

    let res = server
        .post(api::path::SESSION_END)
        .json(&json!({ "sessionId": session.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let ended: EndResult = res.json().await.unwrap();
    assert_eq!(EndOutcome::Archived, ended.outcome);
    assert_eq!(SessionState::Ended, ended.session.state);
    let entry = ended.entry.unwrap();
    assert_eq!(session.id, entry.id);
    assert_eq!(
        entry.duration_seconds,
        (entry.ended_at - entry.started_at) / 1000
    );

    let page: ArchivePage = reqwest::get(server.url(&api::path::public_archive_page(
        PageQuery::default(),
    )))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(1, page.total);
    assert_eq!(entry, page.entries[0]);

    let status: PublicStatus = reqwest::get(server.url(api::path::STATUS))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(PublicStatus::default(), status);
}

#[tokio::test]
async fn test_trash_restore_delete() {
    let server = common::start().await;
    let session = create(&server, "Office Hours").await;
    for path in [api::path::SESSION_START, api::path::SESSION_END] {
        let res = server
            .post(path)
            .json(&json!({ "sessionId": session.id }))
            .send()
            .await
            .unwrap();
        assert_eq!(StatusCode::OK, res.status());
    }
    let id = json!({ "id": session.id });

    let res = server
        .request(http::Method::DELETE, &api::path::archive_permanent(&session.id))
        .send()
        .await
        .unwrap();
    assert_eq!(
        (StatusCode::CONFLICT, "invalid_state".to_string()),
        error_of(res).await
    );

    let trashed: ArchiveEntry = server
        .post(api::path::ARCHIVE_TRASH)
        .json(&id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(Lifecycle::Trashed, trashed.lifecycle);
    assert!(trashed.trashed_at.is_some());

    let page: ArchivePage = server
        .get(&api::path::archive_page(PageQuery::default()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(0, page.total);

    let restored: ArchiveEntry = server
        .post(api::path::ARCHIVE_RESTORE)
        .json(&id)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(Lifecycle::Active, restored.lifecycle);

    let res = server
        .post(api::path::ARCHIVE_TRASH)
        .json(&id)
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());
    let res = server
        .request(http::Method::DELETE, &api::path::archive_permanent(&session.id))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let trash: Vec<ArchiveEntry> = server
        .get(api::path::ARCHIVE_TRASH)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(trash.is_empty());
}

#[tokio::test]
async fn test_hidden_entries_stay_with_admin() {
    let server = common::start().await;
    let session = create(&server, "Internal").await;
    for path in [api::path::SESSION_START, api::path::SESSION_END] {
        server
            .post(path)
            .json(&json!({ "sessionId": session.id }))
            .send()
            .await
            .unwrap();
    }

    let hidden: ArchiveEntry = server
        .post(api::path::ARCHIVE_VISIBILITY)
        .json(&json!({ "id": session.id, "visible": false }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!hidden.is_visible);

    let renamed: ArchiveEntry = server
        .request(http::Method::PUT, api::path::ARCHIVE_RENAME)
        .json(&json!({ "id": session.id, "title": "Internal Review" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!("Internal Review", renamed.title);
    assert!(!renamed.is_visible);

    let admin: ArchivePage = server
        .get(&api::path::archive_page(PageQuery::default()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(1, admin.total);

    let viewer: ArchivePage = reqwest::get(server.url(&api::path::public_archive_page(
        PageQuery::default(),
    )))
    .await
    .unwrap()
    .json()
    .await
    .unwrap();
    assert_eq!(0, viewer.total);
}

#[tokio::test]
async fn test_error_statuses() {
    let server = common::start().await;
    let session = create(&server, "first").await;

    let res = server
        .post(api::path::SESSION)
        .json(&json!({ "title": "second" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        (StatusCode::CONFLICT, "conflict".to_string()),
        error_of(res).await
    );

    let res = server
        .post(api::path::SESSION_START)
        .json(&json!({ "sessionId": "missing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        (StatusCode::NOT_FOUND, "not_found".to_string()),
        error_of(res).await
    );

    let res = server
        .get(&api::path::archive_page(PageQuery {
            page: Some(0),
            page_size: None,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        (StatusCode::UNPROCESSABLE_ENTITY, "validation".to_string()),
        error_of(res).await
    );

    // capture is disabled by default
    let res = server
        .post(&api::path::capture(&session.id))
        .send()
        .await
        .unwrap();
    assert_eq!(
        (StatusCode::SERVICE_UNAVAILABLE, "device_unavailable".to_string()),
        error_of(res).await
    );

    server
        .post(api::path::SESSION_END)
        .json(&json!({ "sessionId": session.id }))
        .send()
        .await
        .unwrap();
    let res = server
        .post(api::path::SESSION_START)
        .json(&json!({ "sessionId": session.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        (StatusCode::CONFLICT, "invalid_state".to_string()),
        error_of(res).await
    );
}

#[tokio::test]
async fn test_operator_routes_need_token() {
    let server = common::start_with(|cfg| {
        cfg.auth.tokens = vec!["operator-token".to_string()];
    })
    .await;

    let res = reqwest::get(server.url(api::path::SESSION_CURRENT))
        .await
        .unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = server.get(api::path::SESSION_CURRENT).send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = reqwest::get(server.url(api::path::STATUS)).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
}

#[tokio::test]
async fn test_status_events_stream() {
    let server = common::start().await;
    let mut res = reqwest::get(server.url(api::path::STATUS_EVENTS))
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let session = create(&server, "Market Update").await;
    let res_start = server
        .post(api::path::SESSION_START)
        .json(&json!({ "sessionId": session.id }))
        .send()
        .await
        .unwrap();
    assert_eq!(StatusCode::OK, res_start.status());

    let mut body = String::new();
    let read = async {
        while let Some(chunk) = res.chunk().await.unwrap() {
            body.push_str(&String::from_utf8_lossy(&chunk));
            if body.contains(&session.id) {
                break;
            }
        }
    };
    tokio::time::timeout(std::time::Duration::from_secs(5), read)
        .await
        .unwrap();
    assert!(body.contains("event: live"));
    assert!(!body.contains("event: created"));
    assert!(!body.contains(&session.ingest.key));
}
