use std::{fmt, str::FromStr};

use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
};

use crate::entity::{
    active_slot::{self, Entity as ActiveSlot, SLOT_ID},
    stream_sessions::{self, Entity as StreamSessions},
};
use crate::{error::AppError, result::Result};

/// Stored form of a session's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Live,
    Ended,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Live => "live",
            SessionStatus::Ended => "ended",
            SessionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Ended | SessionStatus::Cancelled)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "idle" => Ok(SessionStatus::Idle),
            "live" => Ok(SessionStatus::Live),
            "ended" => Ok(SessionStatus::Ended),
            "cancelled" => Ok(SessionStatus::Cancelled),
            other => Err(anyhow::anyhow!("unknown session state: {}", other).into()),
        }
    }
}

impl From<SessionStatus> for api::response::SessionState {
    fn from(status: SessionStatus) -> Self {
        match status {
            SessionStatus::Idle => api::response::SessionState::Idle,
            SessionStatus::Live => api::response::SessionState::Live,
            SessionStatus::Ended => api::response::SessionState::Ended,
            SessionStatus::Cancelled => api::response::SessionState::Cancelled,
        }
    }
}

/// Column writes that accompany a state change
#[derive(Debug, Clone, Copy)]
pub enum Transition {
    Start { started_at: i64 },
    End { ended_at: i64, duration_seconds: i64 },
    Cancel { cancelled_at: i64 },
}

impl Transition {
    pub fn from_status(&self) -> SessionStatus {
        match self {
            Transition::Start { .. } | Transition::Cancel { .. } => SessionStatus::Idle,
            Transition::End { .. } => SessionStatus::Live,
        }
    }

    pub fn to_status(&self) -> SessionStatus {
        match self {
            Transition::Start { .. } => SessionStatus::Live,
            Transition::End { .. } => SessionStatus::Ended,
            Transition::Cancel { .. } => SessionStatus::Cancelled,
        }
    }

    fn at(&self) -> i64 {
        match self {
            Transition::Start { started_at } => *started_at,
            Transition::End { ended_at, .. } => *ended_at,
            Transition::Cancel { cancelled_at } => *cancelled_at,
        }
    }
}

/// Persistence of sessions and the single active slot.
///
/// Every write is a compare-and-swap on the expected current value, so
/// callers learn from `false` that somebody else got there first.
pub struct StreamRepository;

impl StreamRepository {
    pub async fn find<C: ConnectionTrait>(
        db: &C,
        id: &str,
    ) -> Result<Option<stream_sessions::Model>> {
        Ok(StreamSessions::find_by_id(id.to_string()).one(db).await?)
    }

    pub async fn insert<C: ConnectionTrait>(
        db: &C,
        model: stream_sessions::ActiveModel,
    ) -> Result<stream_sessions::Model> {
        Ok(model.insert(db).await?)
    }

    /// The slot pointer, a single key lookup
    pub async fn active_session_id<C: ConnectionTrait>(db: &C) -> Result<Option<String>> {
        let slot = ActiveSlot::find_by_id(SLOT_ID).one(db).await?;
        Ok(slot.and_then(|s| s.session_id))
    }

    /// Claim the empty slot for `id`
    pub async fn claim_slot<C: ConnectionTrait>(db: &C, id: &str, now: i64) -> Result<bool> {
        let res = ActiveSlot::update_many()
            .col_expr(active_slot::Column::SessionId, Expr::value(id.to_string()))
            .col_expr(active_slot::Column::UpdatedAt, Expr::value(now))
            .filter(active_slot::Column::Id.eq(SLOT_ID))
            .filter(active_slot::Column::SessionId.is_null())
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Empty the slot if `id` still holds it
    pub async fn release_slot<C: ConnectionTrait>(db: &C, id: &str, now: i64) -> Result<bool> {
        let res = ActiveSlot::update_many()
            .col_expr(
                active_slot::Column::SessionId,
                Expr::value(Option::<String>::None),
            )
            .col_expr(active_slot::Column::UpdatedAt, Expr::value(now))
            .filter(active_slot::Column::Id.eq(SLOT_ID))
            .filter(active_slot::Column::SessionId.eq(id))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }

    /// Apply `transition` only while the row is still in its source state
    pub async fn transition<C: ConnectionTrait>(
        db: &C,
        id: &str,
        transition: Transition,
    ) -> Result<bool> {
        let mut update = StreamSessions::update_many()
            .col_expr(
                stream_sessions::Column::State,
                Expr::value(transition.to_status().as_str()),
            )
            .col_expr(stream_sessions::Column::UpdatedAt, Expr::value(transition.at()));

        update = match transition {
            Transition::Start { started_at } => {
                update.col_expr(stream_sessions::Column::StartedAt, Expr::value(started_at))
            }
            Transition::End {
                ended_at,
                duration_seconds,
            } => update
                .col_expr(stream_sessions::Column::EndedAt, Expr::value(ended_at))
                .col_expr(
                    stream_sessions::Column::DurationSeconds,
                    Expr::value(duration_seconds),
                ),
            Transition::Cancel { cancelled_at } => {
                update.col_expr(stream_sessions::Column::EndedAt, Expr::value(cancelled_at))
            }
        };

        let res = update
            .filter(stream_sessions::Column::Id.eq(id))
            .filter(stream_sessions::Column::State.eq(transition.from_status().as_str()))
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ConnectOptions, Database, DatabaseConnection, Set, TransactionTrait};

    use super::*;
    use crate::migration::{Migrator, MigratorTrait};

    async fn db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = Database::connect(opt).await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        db
    }

    fn row(id: &str) -> stream_sessions::ActiveModel {
        stream_sessions::ActiveModel {
            id: Set(id.to_string()),
            title: Set("t".to_string()),
            description: Set(String::new()),
            state: Set(SessionStatus::Idle.to_string()),
            ingest_endpoint: Set("http://ingest/whip/x".to_string()),
            ingest_key: Set("k".to_string()),
            created_at: Set(1),
            started_at: Set(None),
            ended_at: Set(None),
            duration_seconds: Set(None),
            updated_at: Set(1),
        }
    }

    #[tokio::test]
    async fn test_slot_is_claimed_once() {
        let db = db().await;
        assert_eq!(StreamRepository::active_session_id(&db).await.unwrap(), None);

        assert!(StreamRepository::claim_slot(&db, "a", 1).await.unwrap());
        assert!(!StreamRepository::claim_slot(&db, "b", 2).await.unwrap());
        assert_eq!(
            StreamRepository::active_session_id(&db).await.unwrap(),
            Some("a".to_string())
        );

        assert!(!StreamRepository::release_slot(&db, "b", 3).await.unwrap());
        assert!(StreamRepository::release_slot(&db, "a", 3).await.unwrap());
        assert!(StreamRepository::claim_slot(&db, "b", 4).await.unwrap());
    }

    #[tokio::test]
    async fn test_transition_requires_source_state() {
        let db = db().await;
        StreamRepository::insert(&db, row("s1")).await.unwrap();

        let end = Transition::End {
            ended_at: 10_000,
            duration_seconds: 9,
        };
        assert!(!StreamRepository::transition(&db, "s1", end).await.unwrap());

        let start = Transition::Start { started_at: 1_000 };
        assert!(StreamRepository::transition(&db, "s1", start).await.unwrap());
        assert!(!StreamRepository::transition(&db, "s1", start).await.unwrap());
        assert!(StreamRepository::transition(&db, "s1", end).await.unwrap());

        let model = StreamRepository::find(&db, "s1").await.unwrap().unwrap();
        assert_eq!(model.state, "ended");
        assert_eq!(model.started_at, Some(1_000));
        assert_eq!(model.ended_at, Some(10_000));
        assert_eq!(model.duration_seconds, Some(9));

        let cancel = Transition::Cancel { cancelled_at: 20_000 };
        assert!(!StreamRepository::transition(&db, "s1", cancel).await.unwrap());
        assert!(!StreamRepository::transition(&db, "missing", start)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_rolled_back_claim_leaves_slot_empty() {
        let db = db().await;
        let txn = db.begin().await.unwrap();
        assert!(StreamRepository::claim_slot(&txn, "a", 1).await.unwrap());
        txn.rollback().await.unwrap();
        assert_eq!(StreamRepository::active_session_id(&db).await.unwrap(), None);
    }

    #[test]
    fn test_status_parse() {
        for status in [
            SessionStatus::Idle,
            SessionStatus::Live,
            SessionStatus::Ended,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
        }
        assert!("paused".parse::<SessionStatus>().is_err());
        assert!(SessionStatus::Cancelled.is_terminal());
        assert!(!SessionStatus::Live.is_terminal());
    }
}
