use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use api::event::StatusEvent;

use super::EventHook;
use crate::{error::AppError, result::Result};

#[derive(Clone, Debug)]
pub struct WebHook {
    url: String,
    client: Client,
}

impl WebHook {
    pub fn new(url: String) -> anyhow::Result<Self> {
        Ok(WebHook {
            url,
            client: Client::builder()
                .connect_timeout(Duration::from_millis(300))
                .timeout(Duration::from_millis(500))
                .build()?,
        })
    }

    async fn event_handler(&self, event: StatusEvent) -> Result<()> {
        let req_body = serde_json::to_string(&event)?;
        match self
            .client
            .post(self.url.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(req_body.clone())
            .send()
            .await
        {
            Ok(response) => {
                let status = response.status();
                let success = status.is_success();
                let res_body = response.text().await?;
                if success {
                    debug!(
                        url = self.url,
                        ?status,
                        req_body,
                        res_body,
                        "event webhook success"
                    );
                    Ok(())
                } else {
                    warn!(
                        url = self.url,
                        ?status,
                        req_body,
                        res_body,
                        "event webhook error"
                    );
                    Err(AppError::upstream(res_body))
                }
            }
            Err(err) => {
                warn!(url = self.url, req_body, ?err, "event webhook error");
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl EventHook for WebHook {
    async fn hook(&self, mut event_receiver: broadcast::Receiver<StatusEvent>) {
        loop {
            match event_receiver.recv().await {
                Ok(event) => {
                    let _ = self.event_handler(event).await;
                }
                Err(RecvError::Lagged(n)) => {
                    warn!(url = self.url, "webhook skipped {} events", n);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
