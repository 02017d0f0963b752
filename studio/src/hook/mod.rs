use std::fmt::Debug;

use async_trait::async_trait;
use tokio::sync::broadcast;

use api::event::StatusEvent;

pub mod webhook;

#[async_trait]
pub trait EventHook: Debug {
    async fn hook(&self, mut event_receiver: broadcast::Receiver<StatusEvent>);
}
