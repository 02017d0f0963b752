use std::sync::Arc;

use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use api::event::{StatusEvent, StatusEventType};

use crate::entity::stream_sessions;
use crate::{
    archive::{ArchiveEntry, ArchiveManager},
    capture::CaptureFallback,
    clock::Clock,
    config::Limits,
    credential::{CredentialIssuer, IngestCredentials, IngestKey},
    error::AppError,
    repository::{SessionStatus, StreamRepository, Transition},
    result::Result,
};

/// Where a session is in its life. Timestamps are unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Live {
        started_at: i64,
    },
    Ended {
        started_at: i64,
        ended_at: i64,
        duration_seconds: i64,
    },
    Cancelled {
        cancelled_at: i64,
    },
}

impl SessionPhase {
    pub fn status(&self) -> SessionStatus {
        match self {
            SessionPhase::Idle => SessionStatus::Idle,
            SessionPhase::Live { .. } => SessionStatus::Live,
            SessionPhase::Ended { .. } => SessionStatus::Ended,
            SessionPhase::Cancelled { .. } => SessionStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSession {
    pub id: String,
    pub title: String,
    pub description: String,
    pub phase: SessionPhase,
    pub credentials: IngestCredentials,
    pub created_at: i64,
}

impl TryFrom<stream_sessions::Model> for StreamSession {
    type Error = AppError;

    fn try_from(m: stream_sessions::Model) -> Result<Self> {
        let status: SessionStatus = m.state.parse()?;
        let phase = match (status, m.started_at, m.ended_at, m.duration_seconds) {
            (SessionStatus::Idle, None, None, None) => SessionPhase::Idle,
            (SessionStatus::Live, Some(started_at), None, None) => SessionPhase::Live { started_at },
            (SessionStatus::Ended, Some(started_at), Some(ended_at), Some(duration_seconds)) => {
                SessionPhase::Ended {
                    started_at,
                    ended_at,
                    duration_seconds,
                }
            }
            (SessionStatus::Cancelled, None, Some(cancelled_at), None) => {
                SessionPhase::Cancelled { cancelled_at }
            }
            (status, started_at, ended_at, duration_seconds) => {
                return Err(anyhow::anyhow!(
                    "corrupt session {}: {} with started_at {:?} ended_at {:?} duration {:?}",
                    m.id,
                    status,
                    started_at,
                    ended_at,
                    duration_seconds
                )
                .into())
            }
        };
        Ok(Self {
            id: m.id,
            title: m.title,
            description: m.description,
            phase,
            credentials: IngestCredentials {
                endpoint: m.ingest_endpoint,
                key: IngestKey::new(m.ingest_key),
            },
            created_at: m.created_at,
        })
    }
}

impl StreamSession {
    pub fn status(&self) -> SessionStatus {
        self.phase.status()
    }

    pub fn started_at(&self) -> Option<i64> {
        match self.phase {
            SessionPhase::Live { started_at } | SessionPhase::Ended { started_at, .. } => {
                Some(started_at)
            }
            _ => None,
        }
    }

    /// The key is masked unless `reveal`
    pub fn to_response(&self, reveal: bool) -> api::response::Session {
        let (ended_at, duration_seconds) = match self.phase {
            SessionPhase::Ended {
                ended_at,
                duration_seconds,
                ..
            } => (Some(ended_at), Some(duration_seconds)),
            SessionPhase::Cancelled { cancelled_at } => (Some(cancelled_at), None),
            _ => (None, None),
        };
        api::response::Session {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            state: self.status().into(),
            ingest: api::response::Ingest {
                endpoint: self.credentials.endpoint.clone(),
                key: if reveal {
                    self.credentials.key.expose().to_string()
                } else {
                    self.credentials.key.masked()
                },
                masked: !reveal,
            },
            created_at: self.created_at,
            started_at: self.started_at(),
            ended_at,
            duration_seconds,
        }
    }
}

/// The session holding the active slot, if any
#[derive(Debug, Clone)]
pub enum CurrentStatus {
    None,
    Idle(StreamSession),
    Live(StreamSession),
}

impl CurrentStatus {
    pub fn to_response(&self, reveal: bool) -> api::response::CurrentStatus {
        use api::response::ActiveState;
        let (state, session) = match self {
            CurrentStatus::None => (ActiveState::None, None),
            CurrentStatus::Idle(s) => (ActiveState::Idle, Some(s.to_response(reveal))),
            CurrentStatus::Live(s) => (ActiveState::Live, Some(s.to_response(reveal))),
        };
        api::response::CurrentStatus { state, session }
    }
}

#[derive(Debug, Clone)]
pub enum EndOutcome {
    /// Ended before going live, nothing archived
    Cancelled(StreamSession),
    Archived(StreamSession, ArchiveEntry),
}

impl EndOutcome {
    pub fn session(&self) -> &StreamSession {
        match self {
            EndOutcome::Cancelled(s) | EndOutcome::Archived(s, _) => s,
        }
    }

    pub fn to_response(&self) -> api::response::EndResult {
        match self {
            EndOutcome::Cancelled(s) => api::response::EndResult {
                outcome: api::response::EndOutcome::Cancelled,
                session: s.to_response(false),
                entry: None,
            },
            EndOutcome::Archived(s, entry) => api::response::EndResult {
                outcome: api::response::EndOutcome::Archived,
                session: s.to_response(false),
                entry: Some(entry.to_response()),
            },
        }
    }
}

/// Trimmed title, or a validation error
pub fn validate_title(title: &str, limits: &Limits) -> Result<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title must not be blank"));
    }
    if title.chars().count() > limits.title_max_len {
        return Err(AppError::validation(format!(
            "title is longer than {} characters",
            limits.title_max_len
        )));
    }
    Ok(title.to_string())
}

fn validate_description(description: &str, limits: &Limits) -> Result<String> {
    if description.chars().count() > limits.description_max_len {
        return Err(AppError::validation(format!(
            "description is longer than {} characters",
            limits.description_max_len
        )));
    }
    Ok(description.trim().to_string())
}

/// Drives sessions through idle, live and their terminal states while
/// keeping at most one session in the active slot.
pub struct SessionLifecycle {
    db: DatabaseConnection,
    issuer: Arc<dyn CredentialIssuer>,
    archive: Arc<ArchiveManager>,
    capture: Arc<CaptureFallback>,
    events: broadcast::Sender<StatusEvent>,
    clock: Arc<dyn Clock>,
    limits: Limits,
}

impl SessionLifecycle {
    pub fn new(
        db: DatabaseConnection,
        issuer: Arc<dyn CredentialIssuer>,
        archive: Arc<ArchiveManager>,
        capture: Arc<CaptureFallback>,
        events: broadcast::Sender<StatusEvent>,
        clock: Arc<dyn Clock>,
        limits: Limits,
    ) -> Self {
        Self {
            db,
            issuer,
            archive,
            capture,
            events,
            clock,
            limits,
        }
    }

    pub async fn create(&self, title: &str, description: &str) -> Result<StreamSession> {
        let title = validate_title(title, &self.limits)?;
        let description = validate_description(description, &self.limits)?;

        // fail before asking the ingest server for anything
        if let Some(active) = StreamRepository::active_session_id(&self.db).await? {
            return Err(busy(&active));
        }

        let id = Uuid::new_v4().to_string();
        let credentials = self.issuer.issue(&id).await?;
        let now = self.clock.now_millis();

        let txn = self.db.begin().await?;
        if !StreamRepository::claim_slot(&txn, &id, now).await? {
            txn.rollback().await?;
            let active = StreamRepository::active_session_id(&self.db).await?;
            return Err(busy(active.as_deref().unwrap_or("another session")));
        }
        let model = StreamRepository::insert(
            &txn,
            stream_sessions::ActiveModel {
                id: Set(id.clone()),
                title: Set(title),
                description: Set(description),
                state: Set(SessionStatus::Idle.to_string()),
                ingest_endpoint: Set(credentials.endpoint),
                ingest_key: Set(credentials.key.expose().to_string()),
                created_at: Set(now),
                started_at: Set(None),
                ended_at: Set(None),
                duration_seconds: Set(None),
                updated_at: Set(now),
            },
        )
        .await?;
        txn.commit().await?;

        let session = StreamSession::try_from(model)?;
        info!(session = session.id, title = session.title, "session created");
        self.publish(StatusEventType::Created, &session, now);
        Ok(session)
    }

    pub async fn start(&self, id: &str) -> Result<StreamSession> {
        let now = self.clock.now_millis();
        let transition = Transition::Start { started_at: now };
        if !StreamRepository::transition(&self.db, id, transition).await? {
            return Err(self.transition_error(id, transition).await);
        }

        let session = self.get(id).await?;
        info!(session = id, "session live");
        self.publish(StatusEventType::Live, &session, now);
        Ok(session)
    }

    /// Cancel an idle session or archive a live one. Any local capture of
    /// the session is released whatever the outcome.
    pub async fn end(&self, id: &str) -> Result<EndOutcome> {
        let res = self.finish(id).await;
        if self.capture.release(id).await {
            debug!(session = id, "capture released on end");
        }
        res
    }

    async fn finish(&self, id: &str) -> Result<EndOutcome> {
        let session = self.get(id).await?;
        let now = self.clock.now_millis();

        let transition = match session.phase {
            SessionPhase::Idle => Transition::Cancel { cancelled_at: now },
            SessionPhase::Live { started_at } => Transition::End {
                ended_at: now,
                duration_seconds: (now - started_at).max(0) / 1000,
            },
            _ => {
                return Err(AppError::invalid_state(format!(
                    "session {} is already {}",
                    id,
                    session.status()
                )))
            }
        };

        let txn = self.db.begin().await?;
        if !StreamRepository::transition(&txn, id, transition).await? {
            txn.rollback().await?;
            return Err(self.transition_error(id, transition).await);
        }
        if !StreamRepository::release_slot(&txn, id, now).await? {
            warn!(session = id, "active slot was not held by the ending session");
        }

        let session: StreamSession = StreamRepository::find(&txn, id)
            .await?
            .ok_or_else(|| not_found(id))?
            .try_into()?;
        let outcome = match transition {
            Transition::End { .. } => {
                let entry = self.archive.finalize(&txn, &session).await?;
                EndOutcome::Archived(session, entry)
            }
            _ => EndOutcome::Cancelled(session),
        };
        txn.commit().await?;

        let (kind, what) = match &outcome {
            EndOutcome::Archived(..) => (StatusEventType::Ended, "session ended"),
            EndOutcome::Cancelled(_) => (StatusEventType::Cancelled, "session cancelled"),
        };
        info!(session = id, "{}", what);
        self.publish(kind, outcome.session(), now);
        Ok(outcome)
    }

    pub async fn current_status(&self) -> Result<CurrentStatus> {
        let Some(id) = StreamRepository::active_session_id(&self.db).await? else {
            return Ok(CurrentStatus::None);
        };
        let session = self.get(&id).await?;
        Ok(match session.phase {
            SessionPhase::Idle => CurrentStatus::Idle(session),
            SessionPhase::Live { .. } => CurrentStatus::Live(session),
            _ => CurrentStatus::None,
        })
    }

    pub async fn get(&self, id: &str) -> Result<StreamSession> {
        StreamRepository::find(&self.db, id)
            .await?
            .ok_or_else(|| not_found(id))?
            .try_into()
    }

    /// Push local devices into the session's ingest endpoint
    pub async fn acquire_capture(&self, id: &str) -> Result<api::response::Capture> {
        let session = self.get(id).await?;
        self.bind_capture(&session).await
    }

    /// `session` may be stale by the time the devices are open, so the state
    /// is read again once the handle is registered. An `end` that committed
    /// in between has already run its release.
    async fn bind_capture(&self, session: &StreamSession) -> Result<api::response::Capture> {
        ensure_capturable(session)?;
        let info = self.capture.acquire(&session.id, &session.credentials).await?;

        let recheck = self
            .get(&session.id)
            .await
            .and_then(|current| ensure_capturable(&current));
        if let Err(e) = recheck {
            self.capture.release(&session.id).await;
            warn!(session = session.id, "capture dropped, session moved on: {}", e);
            return Err(e);
        }
        Ok(info)
    }

    fn publish(&self, r#type: StatusEventType, session: &StreamSession, at: i64) {
        let _ = self.events.send(StatusEvent {
            r#type,
            session_id: session.id.clone(),
            title: Some(session.title.clone()),
            at,
        });
    }

    /// A lost compare-and-swap: the row is gone or moved on
    async fn transition_error(&self, id: &str, transition: Transition) -> AppError {
        match StreamRepository::find(&self.db, id).await {
            Ok(None) => not_found(id),
            Ok(Some(model)) => AppError::invalid_state(format!(
                "session {} is {}, expected {}",
                id,
                model.state,
                transition.from_status()
            )),
            Err(e) => e,
        }
    }
}

fn busy(active: &str) -> AppError {
    AppError::conflict(format!("session {} is still active", active))
}

fn ensure_capturable(session: &StreamSession) -> Result<()> {
    if session.status().is_terminal() {
        return Err(AppError::invalid_state(format!(
            "session {} is {}",
            session.id,
            session.status()
        )));
    }
    Ok(())
}

fn not_found(id: &str) -> AppError {
    AppError::not_found(format!("session {} not found", id))
}
