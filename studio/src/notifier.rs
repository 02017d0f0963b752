use std::sync::Arc;

use sea_orm::DatabaseConnection;
use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::debug;

use api::{event::StatusEvent, response::PublicStatus};

use crate::{
    credential::ViewerTelemetry,
    repository::StreamRepository,
    result::Result,
    session::{SessionPhase, StreamSession},
};

/// Viewer facing view of the broadcast. Never carries credentials.
pub struct StatusNotifier {
    db: DatabaseConnection,
    telemetry: Arc<dyn ViewerTelemetry>,
    events: broadcast::Sender<StatusEvent>,
}

impl StatusNotifier {
    pub fn new(
        db: DatabaseConnection,
        telemetry: Arc<dyn ViewerTelemetry>,
        events: broadcast::Sender<StatusEvent>,
    ) -> Self {
        Self {
            db,
            telemetry,
            events,
        }
    }

    pub async fn public_status(&self) -> Result<PublicStatus> {
        let Some(id) = StreamRepository::active_session_id(&self.db).await? else {
            return Ok(PublicStatus::default());
        };
        let Some(model) = StreamRepository::find(&self.db, &id).await? else {
            return Ok(PublicStatus::default());
        };
        let session = StreamSession::try_from(model)?;

        // an idle session has not gone on air yet
        let SessionPhase::Live { started_at } = session.phase else {
            return Ok(PublicStatus::default());
        };
        let viewer_count = self.telemetry.viewer_count(&session.id).await;
        debug!(session = session.id, ?viewer_count, "public status");

        Ok(PublicStatus {
            is_live: true,
            session_id: Some(session.id),
            title: Some(session.title),
            started_at: Some(started_at),
            viewer_count,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.events.subscribe()
    }

    /// Events viewers may see. Lagged subscribers skip what they missed.
    pub fn viewer_events(&self) -> impl Stream<Item = StatusEvent> + Send + 'static {
        BroadcastStream::new(self.subscribe())
            .filter_map(|event| event.ok().filter(|e| e.r#type.is_public()))
    }
}
