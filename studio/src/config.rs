use serde::{Deserialize, Serialize};
use std::{env, net::SocketAddr, str::FromStr};

use storage::StorageConfig;

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: Http,
    #[serde(default)]
    pub auth: Auth,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub database: Database,
    #[serde(default)]
    pub ingest: Ingest,
    #[serde(default)]
    pub archive: Archive,
    #[serde(default)]
    pub capture: Capture,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub webhooks: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Http {
    #[serde(default = "default_http_listen")]
    pub listen: SocketAddr,
    #[serde(default)]
    pub cors: bool,
}

/// Operator credentials. Empty means the operator API is open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Auth {
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Database {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Database {
    pub fn is_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingest {
    /// Base url broadcasters push to, the session id is appended
    #[serde(default = "default_ingest_public_url")]
    pub public_url: String,
    /// Admin api of the ingest server, used to register streams and read viewer counts
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Shared with the ingest server to sign stream scoped push keys.
    /// Empty falls back to opaque random keys.
    #[serde(default)]
    pub secret: String,
    /// Seconds a push key stays valid
    #[serde(default = "default_key_ttl")]
    pub key_ttl: u64,
    #[serde(default)]
    pub retry_attempts: RetryAttempts,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_telemetry_timeout_ms")]
    pub telemetry_timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryAttempts(pub u8);

impl Default for RetryAttempts {
    fn default() -> Self {
        RetryAttempts(3)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    /// Prefix for thumbnail urls handed to viewers
    #[serde(default = "default_archive_public_base_url")]
    pub public_base_url: String,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_video_device")]
    pub video_device: String,
    #[serde(default = "default_audio_device")]
    pub audio_device: String,
    /// Placeholders: {video} {audio} {endpoint} {key}
    #[serde(default = "default_capture_command")]
    pub command: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Limits {
    #[serde(default = "default_title_max_len")]
    pub title_max_len: usize,
    #[serde(default = "default_description_max_len")]
    pub description_max_len: usize,
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u64,
}

fn default_http_listen() -> SocketAddr {
    SocketAddr::from_str(&format!(
        "0.0.0.0:{}",
        env::var("PORT").unwrap_or(String::from("8888"))
    ))
    .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8888)))
}

impl Default for Http {
    fn default() -> Self {
        Self {
            listen: default_http_listen(),
            cors: Default::default(),
        }
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug".to_string()
        } else {
            "info".to_string()
        }
    })
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://onair.db?mode=rwc".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    10
}

impl Default for Ingest {
    fn default() -> Self {
        Self {
            public_url: default_ingest_public_url(),
            api_url: None,
            token: None,
            secret: String::new(),
            key_ttl: default_key_ttl(),
            retry_attempts: Default::default(),
            retry_backoff_ms: default_retry_backoff_ms(),
            telemetry_timeout_ms: default_telemetry_timeout_ms(),
        }
    }
}

fn default_ingest_public_url() -> String {
    "http://localhost:7777".to_string()
}

fn default_key_ttl() -> u64 {
    60 * 60 * 24
}

fn default_retry_backoff_ms() -> u64 {
    200
}

fn default_telemetry_timeout_ms() -> u64 {
    1000
}

impl Default for Archive {
    fn default() -> Self {
        Self {
            public_base_url: default_archive_public_base_url(),
            storage: Default::default(),
        }
    }
}

fn default_archive_public_base_url() -> String {
    "/recordings".to_string()
}

impl Default for Capture {
    fn default() -> Self {
        Self {
            enabled: false,
            video_device: default_video_device(),
            audio_device: default_audio_device(),
            command: default_capture_command(),
        }
    }
}

fn default_video_device() -> String {
    "/dev/video0".to_string()
}

fn default_audio_device() -> String {
    "default".to_string()
}

fn default_capture_command() -> String {
    "ffmpeg -hide_banner -loglevel warning -f v4l2 -i {video} -f alsa -i {audio} -c:v libx264 -preset ultrafast -tune zerolatency -pix_fmt yuv420p -c:a libopus -f whip -authorization {key} {endpoint}".to_string()
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            title_max_len: default_title_max_len(),
            description_max_len: default_description_max_len(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_title_max_len() -> usize {
    120
}

fn default_description_max_len() -> usize {
    2000
}

fn default_page_size() -> u64 {
    20
}

fn default_max_page_size() -> u64 {
    100
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ingest.public_url.trim().is_empty() {
            return Err(anyhow::anyhow!("ingest.public_url must not be empty"));
        }
        if self.limits.max_page_size == 0 || self.limits.default_page_size == 0 {
            return Err(anyhow::anyhow!("page sizes must be greater than zero"));
        }
        if self.limits.default_page_size > self.limits.max_page_size {
            return Err(anyhow::anyhow!(
                "limits.default_page_size exceeds limits.max_page_size"
            ));
        }
        if self.limits.title_max_len == 0 {
            return Err(anyhow::anyhow!("limits.title_max_len must be greater than zero"));
        }
        if self.database.is_memory() && self.database.max_connections != 1 {
            return Err(anyhow::anyhow!(
                "in-memory database must use database.max_connections = 1"
            ));
        }
        if self.ingest.retry_attempts.0 == 0 {
            return Err(anyhow::anyhow!("ingest.retry_attempts must be at least 1"));
        }
        Ok(())
    }
}
