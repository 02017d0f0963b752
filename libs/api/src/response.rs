use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub title: String,
    pub description: String,
    pub state: SessionState,
    pub ingest: Ingest,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Ingest {
    pub endpoint: String,
    /// Plaintext only in the create response or on explicit reveal
    pub key: String,
    pub masked: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Live,
    Ended,
    Cancelled,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveState {
    None,
    Idle,
    Live,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStatus {
    pub state: ActiveState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndOutcome {
    Cancelled,
    Archived,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EndResult {
    pub outcome: EndOutcome,
    pub session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<ArchiveEntry>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Active,
    Trashed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub duration_seconds: i64,
    pub started_at: i64,
    pub ended_at: i64,
    pub is_visible: bool,
    pub lifecycle: Lifecycle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed_at: Option<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePage {
    pub entries: Vec<ArchiveEntry>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl ArchivePage {
    pub fn has_more(&self) -> bool {
        self.total > self.page * self.page_size
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicStatus {
    pub is_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer_count: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Capture {
    pub session_id: String,
    pub video: String,
    pub audio: String,
    pub since: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// Stream listing of the ingest server, only the fields used for viewer telemetry
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct IngestStream {
    pub id: String,
    #[serde(default)]
    pub subscribe: IngestPubSub,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct IngestPubSub {
    #[serde(default)]
    pub sessions: Vec<IngestSubscriber>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct IngestSubscriber {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_status_omits_empty_fields() {
        let body = serde_json::to_string(&PublicStatus::default()).unwrap();
        assert_eq!(body, r#"{"isLive":false}"#);
    }

    #[test]
    fn test_ingest_stream_ignores_unknown_fields() {
        let body = r#"[{"id":"s1","createdAt":1,"publish":{"leaveAt":0,"sessions":[]},
            "subscribe":{"leaveAt":0,"sessions":[{"id":"a","state":"connected"},{"id":"b"}]},
            "codecs":[]}]"#;
        let streams: Vec<IngestStream> = serde_json::from_str(body).unwrap();
        assert_eq!(streams[0].subscribe.sessions.len(), 2);
    }

    #[test]
    fn test_archive_page_has_more() {
        let page = ArchivePage {
            entries: vec![],
            total: 25,
            page: 2,
            page_size: 10,
        };
        assert!(page.has_more());
        let page = ArchivePage { page: 3, ..page };
        assert!(!page.has_more());
    }
}
