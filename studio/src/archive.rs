use std::sync::Arc;

use opendal::Operator;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tracing::{debug, error, info};

use crate::entity::archive_entries::{self, Entity as ArchiveEntries};
use crate::{
    clock::Clock,
    config::Limits,
    error::AppError,
    result::Result,
    session::{validate_title, SessionPhase, StreamSession},
};

const ACTIVE: &str = "active";
const TRASHED: &str = "trashed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Active,
    Trashed { trashed_at: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub recording_path: String,
    pub duration_seconds: i64,
    pub started_at: i64,
    pub ended_at: i64,
    pub is_visible: bool,
    pub lifecycle: Lifecycle,
}

impl TryFrom<archive_entries::Model> for ArchiveEntry {
    type Error = AppError;

    fn try_from(m: archive_entries::Model) -> Result<Self> {
        let lifecycle = match (m.lifecycle.as_str(), m.trashed_at) {
            (ACTIVE, None) => Lifecycle::Active,
            (TRASHED, Some(trashed_at)) => Lifecycle::Trashed { trashed_at },
            (lifecycle, trashed_at) => {
                return Err(anyhow::anyhow!(
                    "corrupt archive entry {}: lifecycle {} with trashed_at {:?}",
                    m.id,
                    lifecycle,
                    trashed_at
                )
                .into())
            }
        };
        Ok(Self {
            id: m.id,
            title: m.title,
            description: m.description,
            thumbnail_url: m.thumbnail_url,
            recording_path: m.recording_path,
            duration_seconds: m.duration_seconds,
            started_at: m.started_at,
            ended_at: m.ended_at,
            is_visible: m.is_visible,
            lifecycle,
        })
    }
}

impl ArchiveEntry {
    pub fn is_trashed(&self) -> bool {
        matches!(self.lifecycle, Lifecycle::Trashed { .. })
    }

    pub fn to_response(&self) -> api::response::ArchiveEntry {
        let (lifecycle, trashed_at) = match self.lifecycle {
            Lifecycle::Active => (api::response::Lifecycle::Active, None),
            Lifecycle::Trashed { trashed_at } => {
                (api::response::Lifecycle::Trashed, Some(trashed_at))
            }
        };
        api::response::ArchiveEntry {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            duration_seconds: self.duration_seconds,
            started_at: self.started_at,
            ended_at: self.ended_at,
            is_visible: self.is_visible,
            lifecycle,
            trashed_at,
        }
    }
}

/// Who is reading the listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Sees hidden entries too
    Admin,
    Viewer,
}

#[derive(Debug, Clone)]
pub struct ArchivePage {
    pub entries: Vec<ArchiveEntry>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl ArchivePage {
    pub fn to_response(&self) -> api::response::ArchivePage {
        api::response::ArchivePage {
            entries: self.entries.iter().map(ArchiveEntry::to_response).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

pub struct ArchiveManager {
    db: DatabaseConnection,
    storage: Operator,
    clock: Arc<dyn Clock>,
    limits: Limits,
    public_base_url: String,
}

impl ArchiveManager {
    pub fn new(
        db: DatabaseConnection,
        storage: Operator,
        clock: Arc<dyn Clock>,
        limits: Limits,
        public_base_url: String,
    ) -> Self {
        Self {
            db,
            storage,
            clock,
            limits,
            public_base_url,
        }
    }

    /// Record a session that just ended. Runs on the caller's transaction.
    pub async fn finalize<C: ConnectionTrait>(
        &self,
        conn: &C,
        session: &StreamSession,
    ) -> Result<ArchiveEntry> {
        let SessionPhase::Ended {
            started_at,
            ended_at,
            duration_seconds,
        } = session.phase
        else {
            return Err(AppError::invalid_state(format!(
                "session {} has not ended",
                session.id
            )));
        };

        let recording_path = storage::recording_dir(&session.id, started_at);
        let thumbnail_url = format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            storage::thumbnail_path(&recording_path)
        );
        let now = self.clock.now_millis();
        let model = archive_entries::ActiveModel {
            id: Set(session.id.clone()),
            title: Set(session.title.clone()),
            description: Set(session.description.clone()),
            thumbnail_url: Set(thumbnail_url),
            recording_path: Set(recording_path),
            duration_seconds: Set(duration_seconds),
            started_at: Set(started_at),
            ended_at: Set(ended_at),
            is_visible: Set(true),
            lifecycle: Set(ACTIVE.to_string()),
            trashed_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(conn)
        .await?;

        info!(id = model.id, duration_seconds, "archive entry created");
        ArchiveEntry::try_from(model)
    }

    pub async fn get(&self, id: &str) -> Result<ArchiveEntry> {
        ArchiveEntries::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or_else(|| not_found(id))
            .and_then(ArchiveEntry::try_from)
    }

    /// Active entries, newest broadcast first. `page` counts from 1.
    pub async fn list(
        &self,
        page: Option<u64>,
        page_size: Option<u64>,
        audience: Audience,
    ) -> Result<ArchivePage> {
        let page = page.unwrap_or(1);
        if page == 0 {
            return Err(AppError::validation("page starts at 1"));
        }
        let page_size = page_size
            .unwrap_or(self.limits.default_page_size)
            .clamp(1, self.limits.max_page_size);

        let mut query =
            ArchiveEntries::find().filter(archive_entries::Column::Lifecycle.eq(ACTIVE));
        if audience == Audience::Viewer {
            query = query.filter(archive_entries::Column::IsVisible.eq(true));
        }
        let paginator = query
            .order_by_desc(archive_entries::Column::StartedAt)
            .order_by_asc(archive_entries::Column::Id)
            .paginate(&self.db, page_size);

        let total = paginator.num_items().await?;
        let entries = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(ArchiveEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        debug!(?audience, page, page_size, total, "archive listed");

        Ok(ArchivePage {
            entries,
            total,
            page,
            page_size,
        })
    }

    /// Most recently trashed first
    pub async fn list_trashed(&self) -> Result<Vec<ArchiveEntry>> {
        ArchiveEntries::find()
            .filter(archive_entries::Column::Lifecycle.eq(TRASHED))
            .order_by_desc(archive_entries::Column::TrashedAt)
            .order_by_asc(archive_entries::Column::Id)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ArchiveEntry::try_from)
            .collect()
    }

    pub async fn rename(&self, id: &str, title: &str) -> Result<ArchiveEntry> {
        let title = validate_title(title, &self.limits)?;
        let res = ArchiveEntries::update_many()
            .col_expr(archive_entries::Column::Title, Expr::value(title))
            .col_expr(
                archive_entries::Column::UpdatedAt,
                Expr::value(self.clock.now_millis()),
            )
            .filter(archive_entries::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(not_found(id));
        }
        info!(id, "archive entry renamed");
        self.get(id).await
    }

    pub async fn set_visibility(&self, id: &str, visible: bool) -> Result<ArchiveEntry> {
        let res = ArchiveEntries::update_many()
            .col_expr(archive_entries::Column::IsVisible, Expr::value(visible))
            .col_expr(
                archive_entries::Column::UpdatedAt,
                Expr::value(self.clock.now_millis()),
            )
            .filter(archive_entries::Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(not_found(id));
        }
        info!(id, visible, "archive visibility changed");
        self.get(id).await
    }

    pub async fn trash(&self, id: &str) -> Result<ArchiveEntry> {
        let now = self.clock.now_millis();
        let res = ArchiveEntries::update_many()
            .col_expr(archive_entries::Column::Lifecycle, Expr::value(TRASHED))
            .col_expr(archive_entries::Column::TrashedAt, Expr::value(now))
            .col_expr(archive_entries::Column::UpdatedAt, Expr::value(now))
            .filter(archive_entries::Column::Id.eq(id))
            .filter(archive_entries::Column::Lifecycle.eq(ACTIVE))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(self.lifecycle_error(id, "already in trash").await);
        }
        info!(id, "archive entry trashed");
        self.get(id).await
    }

    pub async fn restore(&self, id: &str) -> Result<ArchiveEntry> {
        let res = ArchiveEntries::update_many()
            .col_expr(archive_entries::Column::Lifecycle, Expr::value(ACTIVE))
            .col_expr(
                archive_entries::Column::TrashedAt,
                Expr::value(Option::<i64>::None),
            )
            .col_expr(
                archive_entries::Column::UpdatedAt,
                Expr::value(self.clock.now_millis()),
            )
            .filter(archive_entries::Column::Id.eq(id))
            .filter(archive_entries::Column::Lifecycle.eq(TRASHED))
            .exec(&self.db)
            .await?;
        if res.rows_affected == 0 {
            return Err(self.lifecycle_error(id, "not in trash").await);
        }
        info!(id, "archive entry restored");
        self.get(id).await
    }

    /// Remove a trashed entry and its recording. Either both go or neither.
    pub async fn permanent_delete(&self, id: &str) -> Result<()> {
        // the delete has to be the first statement of the transaction
        let Some(model) = ArchiveEntries::find_by_id(id.to_string()).one(&self.db).await? else {
            return Err(not_found(id));
        };
        if !storage::validate_path(&model.recording_path) {
            return Err(anyhow::anyhow!(
                "archive entry {} has unsafe recording path {}",
                id,
                model.recording_path
            )
            .into());
        }

        let txn = self.db.begin().await?;
        let res = ArchiveEntries::delete_many()
            .filter(archive_entries::Column::Id.eq(id))
            .filter(archive_entries::Column::Lifecycle.eq(TRASHED))
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Err(self.lifecycle_error(id, "must be in trash before permanent delete").await);
        }

        match storage::remove_dir(&self.storage, &model.recording_path).await {
            Ok(removed) => {
                txn.commit().await?;
                info!(id, removed, "archive entry permanently deleted");
                Ok(())
            }
            Err(e) => {
                txn.rollback().await?;
                error!(id, path = model.recording_path, "remove recording failed: {:?}", e);
                Err(AppError::upstream(format!(
                    "recording storage refused delete of {}: {}",
                    model.recording_path, e
                )))
            }
        }
    }

    async fn lifecycle_error(&self, id: &str, reason: &str) -> AppError {
        match ArchiveEntries::find_by_id(id.to_string()).one(&self.db).await {
            Ok(Some(_)) => AppError::invalid_state(format!("archive entry {} {}", id, reason)),
            Ok(None) => not_found(id),
            Err(e) => e.into(),
        }
    }
}

fn not_found(id: &str) -> AppError {
    AppError::not_found(format!("archive entry {} not found", id))
}
