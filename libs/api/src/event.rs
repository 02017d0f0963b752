use serde::{Deserialize, Serialize};

/// Body posted to status webhooks and pushed to event stream subscribers
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub r#type: StatusEventType,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub at: i64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum StatusEventType {
    Created,
    Live,
    Ended,
    Cancelled,
}

impl StatusEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusEventType::Created => "created",
            StatusEventType::Live => "live",
            StatusEventType::Ended => "ended",
            StatusEventType::Cancelled => "cancelled",
        }
    }

    /// Idle and cancelled sessions never reach viewers
    pub fn is_public(&self) -> bool {
        matches!(self, StatusEventType::Live | StatusEventType::Ended)
    }
}
