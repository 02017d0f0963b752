use std::sync::Arc;

use crate::{
    archive::ArchiveManager, capture::CaptureFallback, config::Config,
    notifier::StatusNotifier, session::SessionLifecycle,
};

pub mod archive;
pub mod capture;
pub mod session;
pub mod status;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionLifecycle>,
    pub archive: Arc<ArchiveManager>,
    pub capture: Arc<CaptureFallback>,
    pub notifier: Arc<StatusNotifier>,
}
