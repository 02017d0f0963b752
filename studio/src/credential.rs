use std::{fmt, time::Duration};

use async_trait::async_trait;
use auth::{
    claims::{Access, Claims},
    Keys,
};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};
use uuid::Uuid;

use api::response::IngestStream;

use crate::{config::Ingest as IngestConfig, error::AppError, result::Result};

/// Push secret of one session. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct IngestKey(String);

impl IngestKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First and last four characters, the rest elided
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() <= 12 {
            return "****".to_string();
        }
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}…{}", head, tail)
    }
}

impl fmt::Debug for IngestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IngestKey({})", self.masked())
    }
}

impl fmt::Display for IngestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngestCredentials {
    pub endpoint: String,
    pub key: IngestKey,
}

#[async_trait]
pub trait CredentialIssuer: Send + Sync {
    async fn issue(&self, session_id: &str) -> Result<IngestCredentials>;
}

#[async_trait]
pub trait ViewerTelemetry: Send + Sync {
    /// `None` when telemetry is not configured or the ingest server did not answer
    async fn viewer_count(&self, session_id: &str) -> Option<u64>;
}

/// Talks to the WHIP ingest server: registers streams, signs push keys
/// and reads subscriber counts.
pub struct IngestClient {
    public_url: String,
    api_url: Option<String>,
    token: Option<String>,
    keys: Option<Keys>,
    key_ttl: u64,
    retry_attempts: u8,
    retry_backoff: Duration,
    telemetry_timeout: Duration,
    client: Client,
}

impl IngestClient {
    pub fn new(cfg: &IngestConfig) -> anyhow::Result<Self> {
        Ok(Self {
            public_url: cfg.public_url.clone(),
            api_url: cfg.api_url.clone().filter(|u| !u.is_empty()),
            token: cfg.token.clone().filter(|t| !t.is_empty()),
            keys: if cfg.secret.is_empty() {
                None
            } else {
                Some(Keys::new(cfg.secret.as_bytes()))
            },
            key_ttl: cfg.key_ttl,
            retry_attempts: cfg.retry_attempts.0.max(1),
            retry_backoff: Duration::from_millis(cfg.retry_backoff_ms),
            telemetry_timeout: Duration::from_millis(cfg.telemetry_timeout_ms),
            client: Client::builder()
                .connect_timeout(Duration::from_millis(500))
                .timeout(Duration::from_secs(5))
                .build()?,
        })
    }

    fn mint_key(&self, session_id: &str) -> Result<IngestKey> {
        match &self.keys {
            Some(keys) => {
                let exp = chrono::Utc::now().timestamp().max(0) as u64 + self.key_ttl;
                let token = keys.token(Claims {
                    id: session_id.to_string(),
                    exp,
                    mode: Access::publish().into(),
                })?;
                Ok(IngestKey::new(token))
            }
            None => Ok(IngestKey::new(format!(
                "{}{}",
                Uuid::new_v4().simple(),
                Uuid::new_v4().simple()
            ))),
        }
    }

    async fn register_once(&self, api_url: &str, session_id: &str) -> Result<()> {
        let mut req = self
            .client
            .post(api::path::ingest::streams(api_url, session_id));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let res = req
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("ingest server unreachable: {}", e)))?;
        match res.status() {
            // already registered counts as registered
            s if s.is_success() || s == StatusCode::CONFLICT => Ok(()),
            s => {
                let body = res.text().await.unwrap_or_default();
                Err(AppError::upstream(format!(
                    "ingest server answered {}: {}",
                    s, body
                )))
            }
        }
    }

    async fn register(&self, api_url: &str, session_id: &str) -> Result<()> {
        let mut backoff = self.retry_backoff;
        let mut attempt = 1;
        loop {
            match self.register_once(api_url, session_id).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    warn!(session = session_id, attempt, "stream register failed: {}", e);
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl CredentialIssuer for IngestClient {
    async fn issue(&self, session_id: &str) -> Result<IngestCredentials> {
        if let Some(api_url) = &self.api_url {
            self.register(api_url, session_id).await?;
            debug!(session = session_id, "stream registered on ingest server");
        }
        let key = self.mint_key(session_id)?;
        info!(session = session_id, key = %key, "ingest credentials issued");
        Ok(IngestCredentials {
            endpoint: api::path::ingest::whip(&self.public_url, session_id),
            key,
        })
    }
}

#[async_trait]
impl ViewerTelemetry for IngestClient {
    async fn viewer_count(&self, session_id: &str) -> Option<u64> {
        let api_url = self.api_url.as_ref()?;
        let mut req = self
            .client
            .get(api::path::ingest::streams(api_url, ""))
            .timeout(self.telemetry_timeout);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let streams = match req.send().await.and_then(|r| r.error_for_status()) {
            Ok(res) => res.json::<Vec<IngestStream>>().await,
            Err(e) => Err(e),
        };
        match streams {
            Ok(streams) => Some(
                streams
                    .iter()
                    .find(|s| s.id == session_id)
                    .map(|s| s.subscribe.sessions.len() as u64)
                    .unwrap_or(0),
            ),
            Err(e) => {
                warn!(session = session_id, "viewer telemetry unavailable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryAttempts;

    fn config() -> IngestConfig {
        IngestConfig {
            public_url: "https://ingest.example.com/".to_string(),
            retry_attempts: RetryAttempts(2),
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_key_is_never_printed() {
        let key = IngestKey::new("0123456789abcdefghij");
        assert_eq!(key.masked(), "0123…ghij");
        assert_eq!(format!("{:?}", key), "IngestKey(0123…ghij)");
        assert_eq!(key.to_string(), "0123…ghij");
        assert_eq!(IngestKey::new("short").masked(), "****");
        assert_eq!(key.expose(), "0123456789abcdefghij");
    }

    #[tokio::test]
    async fn test_issue_signs_stream_scoped_key() {
        let mut cfg = config();
        cfg.secret = "shared".to_string();
        let client = IngestClient::new(&cfg).unwrap();

        let creds = client.issue("s1").await.unwrap();
        assert_eq!(creds.endpoint, "https://ingest.example.com/whip/s1");

        let claims = auth::verify(b"shared", creds.key.expose()).unwrap();
        assert_eq!(claims.id, "s1");
        let access = Access::from(claims.mode);
        assert!(access.w);
        assert!(!access.x);
    }

    #[tokio::test]
    async fn test_issue_opaque_key_without_secret() {
        let client = IngestClient::new(&config()).unwrap();
        let a = client.issue("s1").await.unwrap();
        let b = client.issue("s2").await.unwrap();
        assert_eq!(a.key.expose().len(), 64);
        assert_ne!(a.key, b.key);
    }

    #[tokio::test]
    async fn test_unreachable_ingest_server_is_upstream_error() {
        let mut cfg = config();
        cfg.api_url = Some("http://127.0.0.1:9".to_string());
        let client = IngestClient::new(&cfg).unwrap();

        let err = client.issue("s1").await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
        assert_eq!(client.viewer_count("s1").await, None);
    }

    #[tokio::test]
    async fn test_no_telemetry_without_api_url() {
        let client = IngestClient::new(&config()).unwrap();
        assert_eq!(client.viewer_count("s1").await, None);
    }
}
