use std::{collections::HashMap, io, path::Path, process::Stdio, sync::Arc};

use async_trait::async_trait;
use tokio::{process::Child, sync::Mutex};
use tracing::{debug, info, warn};

use crate::{
    clock::Clock, config::Capture as CaptureConfig, credential::IngestCredentials,
    error::AppError, result::Result,
};

/// Running media tracks of one capture
pub trait Tracks: Send + Sync {
    fn stop(&mut self);
}

/// Local camera and microphone pair
#[async_trait]
pub trait Device: Send + Sync {
    fn video(&self) -> &str;
    fn audio(&self) -> &str;
    async fn open(&self, credentials: &IngestCredentials) -> Result<Box<dyn Tracks>>;
}

/// Devices held for one session, released when dropped
pub struct CaptureHandle {
    session_id: String,
    video: String,
    audio: String,
    since: i64,
    tracks: Option<Box<dyn Tracks>>,
}

impl CaptureHandle {
    pub fn stop(&mut self) {
        if let Some(mut tracks) = self.tracks.take() {
            tracks.stop();
            info!(session = self.session_id, "capture released");
        }
    }

    fn info(&self) -> api::response::Capture {
        api::response::Capture {
            session_id: self.session_id.clone(),
            video: self.video.clone(),
            audio: self.audio.clone(),
            since: self.since,
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

pub struct CaptureFallback {
    device: Option<Arc<dyn Device>>,
    clock: Arc<dyn Clock>,
    handles: Mutex<HashMap<String, CaptureHandle>>,
}

impl CaptureFallback {
    pub fn new(device: Option<Arc<dyn Device>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            device,
            clock,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(cfg: &CaptureConfig, clock: Arc<dyn Clock>) -> Self {
        let device: Option<Arc<dyn Device>> = if cfg.enabled {
            Some(Arc::new(FfmpegDevice::new(cfg)))
        } else {
            None
        };
        Self::new(device, clock)
    }

    pub async fn acquire(
        &self,
        session_id: &str,
        credentials: &IngestCredentials,
    ) -> Result<api::response::Capture> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| AppError::device_unavailable("local capture is disabled"))?;

        let mut handles = self.handles.lock().await;
        if handles.contains_key(session_id) {
            return Err(AppError::conflict(format!(
                "session {} is already being captured",
                session_id
            )));
        }

        let tracks = device.open(credentials).await?;
        let handle = CaptureHandle {
            session_id: session_id.to_string(),
            video: device.video().to_string(),
            audio: device.audio().to_string(),
            since: self.clock.now_millis(),
            tracks: Some(tracks),
        };
        let info = handle.info();
        handles.insert(session_id.to_string(), handle);
        info!(session = session_id, video = info.video, audio = info.audio, "capture acquired");
        Ok(info)
    }

    /// `true` if a capture was running
    pub async fn release(&self, session_id: &str) -> bool {
        // dropping the handle stops its tracks
        self.handles.lock().await.remove(session_id).is_some()
    }

    pub async fn release_all(&self) {
        let mut handles = self.handles.lock().await;
        if !handles.is_empty() {
            info!("releasing {} capture(s)", handles.len());
        }
        handles.clear();
    }

    pub async fn active(&self) -> Vec<api::response::Capture> {
        let handles = self.handles.lock().await;
        let mut list: Vec<_> = handles.values().map(CaptureHandle::info).collect();
        list.sort_by_key(|c| c.since);
        list
    }
}

/// Pushes local devices with an external encoder process
pub struct FfmpegDevice {
    video: String,
    audio: String,
    command: String,
}

impl FfmpegDevice {
    pub fn new(cfg: &CaptureConfig) -> Self {
        Self {
            video: cfg.video_device.clone(),
            audio: cfg.audio_device.clone(),
            command: cfg.command.clone(),
        }
    }

    fn args(&self, credentials: &IngestCredentials) -> Result<Vec<String>> {
        let args = shellwords::split(&self.command)
            .map_err(|e| AppError::device_unavailable(format!("bad capture command: {}", e)))?;
        if args.is_empty() {
            return Err(AppError::device_unavailable("capture command is empty"));
        }
        Ok(args
            .into_iter()
            .map(|arg| {
                arg.replace("{video}", &self.video)
                    .replace("{audio}", &self.audio)
                    .replace("{endpoint}", &credentials.endpoint)
                    .replace("{key}", credentials.key.expose())
            })
            .collect())
    }
}

fn probe(path: &str) -> Result<()> {
    // alsa names like `default` or `hw:1,0` are not files
    if !path.starts_with('/') {
        return Ok(());
    }
    match std::fs::OpenOptions::new().read(true).open(Path::new(path)) {
        Ok(_) => Ok(()),
        Err(e) => Err(device_error(path, e)),
    }
}

fn device_error(what: &str, e: io::Error) -> AppError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => {
            AppError::permission_denied(format!("{}: permission denied", what))
        }
        _ => AppError::device_unavailable(format!("{}: {}", what, e)),
    }
}

#[async_trait]
impl Device for FfmpegDevice {
    fn video(&self) -> &str {
        &self.video
    }

    fn audio(&self) -> &str {
        &self.audio
    }

    async fn open(&self, credentials: &IngestCredentials) -> Result<Box<dyn Tracks>> {
        let (video, audio) = (self.video.clone(), self.audio.clone());
        tokio::task::spawn_blocking(move || {
            probe(&video)?;
            probe(&audio)
        })
        .await??;

        let mut args = self.args(credentials)?;
        let program = args.remove(0);
        debug!(program, video = self.video, audio = self.audio, "spawn capture");
        let child = tokio::process::Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| device_error(&program, e))?;
        Ok(Box::new(ProcessTracks(child)))
    }
}

struct ProcessTracks(Child);

impl Tracks for ProcessTracks {
    fn stop(&mut self) {
        if let Err(e) = self.0.start_kill() {
            warn!("capture process already gone: {}", e);
        }
    }
}
