use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateSession {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionRef {
    pub session_id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ArchiveRef {
    pub id: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SetVisibility {
    pub id: String,
    pub visible: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RenameArchive {
    pub id: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct RevealQuery {
    /// Show the ingest key in plaintext instead of the masked form
    #[serde(default)]
    pub reveal: bool,
}
