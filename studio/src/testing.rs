use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use opendal::Operator;
use tempfile::TempDir;

use storage::StorageConfig;

use crate::{
    archive::ArchiveManager,
    capture::{tests::FakeDevice, CaptureFallback},
    clock::ManualClock,
    config::Config,
    credential::{CredentialIssuer, IngestCredentials, IngestKey, ViewerTelemetry},
    error::AppError,
    notifier::StatusNotifier,
    result::Result,
    service::database::DatabaseService,
    session::SessionLifecycle,
    Backends,
};

/// 2025-03-03 09:00:00 UTC
pub const T0: i64 = 1_740_992_400_000;

#[derive(Default)]
pub struct StubIssuer {
    pub issued: AtomicUsize,
    pub down: bool,
}

#[async_trait]
impl CredentialIssuer for StubIssuer {
    async fn issue(&self, session_id: &str) -> Result<IngestCredentials> {
        if self.down {
            return Err(AppError::upstream("ingest server unreachable"));
        }
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(IngestCredentials {
            endpoint: format!("http://ingest.test/whip/{}", session_id),
            key: IngestKey::new(format!("sk-{}", session_id)),
        })
    }
}

pub struct StubTelemetry(pub Option<u64>);

#[async_trait]
impl ViewerTelemetry for StubTelemetry {
    async fn viewer_count(&self, _session_id: &str) -> Option<u64> {
        self.0
    }
}

pub struct Harness {
    pub sessions: Arc<SessionLifecycle>,
    pub archive: Arc<ArchiveManager>,
    pub capture: Arc<CaptureFallback>,
    pub notifier: Arc<StatusNotifier>,
    pub clock: Arc<ManualClock>,
    pub issuer: Arc<StubIssuer>,
    pub storage: Operator,
    /// Tracks opened on the fake capture device
    pub open_tracks: Arc<AtomicUsize>,
    _dir: TempDir,
}

pub struct Options {
    pub issuer: StubIssuer,
    pub viewers: Option<u64>,
    /// Recording storage that refuses every call
    pub broken_storage: bool,
    /// File backed database behind a pool of several connections
    pub file_db: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            issuer: StubIssuer::default(),
            viewers: Some(0),
            broken_storage: false,
            file_db: false,
        }
    }
}

pub async fn harness() -> Harness {
    harness_with(Options::default()).await
}

/// For tests that race operations against each other
pub async fn pooled_harness() -> Harness {
    harness_with(Options {
        file_db: true,
        ..Default::default()
    })
    .await
}

pub async fn harness_with(opts: Options) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = Config::default();
    if opts.file_db {
        cfg.database.url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("onair.db").to_string_lossy()
        );
        cfg.database.max_connections = 5;
    } else {
        cfg.database.url = "sqlite::memory:".to_string();
        cfg.database.max_connections = 1;
    }

    let storage_cfg = if opts.broken_storage {
        StorageConfig::S3 {
            bucket: "recordings".to_string(),
            root: "/".to_string(),
            region: Some("us-east-1".to_string()),
            endpoint: Some("http://127.0.0.1:9".to_string()),
            access_key_id: Some("test".to_string()),
            secret_access_key: Some("test".to_string()),
        }
    } else {
        StorageConfig::Fs {
            root: dir.path().join("recordings").to_string_lossy().to_string(),
        }
    };

    let db = DatabaseService::new(&cfg.database).await.unwrap().connection;
    let storage = storage::create_operator(&storage_cfg).unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let issuer = Arc::new(opts.issuer);
    let open_tracks = Arc::new(AtomicUsize::new(0));
    let device = FakeDevice {
        open: open_tracks.clone(),
        fail: None,
    };

    let state = crate::app_state(
        cfg,
        Backends {
            db,
            storage: storage.clone(),
            issuer: issuer.clone(),
            telemetry: Arc::new(StubTelemetry(opts.viewers)),
            capture: CaptureFallback::new(Some(Arc::new(device)), clock.clone()),
            clock: clock.clone(),
        },
    )
    .unwrap();

    Harness {
        sessions: state.sessions,
        archive: state.archive,
        capture: state.capture,
        notifier: state.notifier,
        clock,
        issuer,
        storage,
        open_tracks,
        _dir: dir,
    }
}

impl Harness {
    /// A session taken from creation through a broadcast of `secs` seconds
    pub async fn broadcast(&self, title: &str, secs: i64) -> crate::archive::ArchiveEntry {
        let session = self.sessions.create(title, "").await.unwrap();
        self.sessions.start(&session.id).await.unwrap();
        self.clock.advance_secs(secs);
        match self.sessions.end(&session.id).await.unwrap() {
            crate::session::EndOutcome::Archived(_, entry) => entry,
            other => panic!("expected archive, got {:?}", other),
        }
    }
}
