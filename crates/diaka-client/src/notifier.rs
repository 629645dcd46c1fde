//! Test notification submission.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::topic::Topic;
use crate::transport::Transport;
use crate::types::TestNotification;

/// Submits test notifications for one topic.
#[derive(Clone)]
pub struct NotifierClient {
    topic: Topic,
    transport: Arc<dyn Transport>,
    config: Arc<DiakaConfig>,
}

impl NotifierClient {
    /// Create a notifier for a topic.
    pub fn new(topic: Topic, transport: Arc<dyn Transport>, config: Arc<DiakaConfig>) -> Self {
        Self {
            topic,
            transport,
            config,
        }
    }

    /// Send a test notification and return the HTTP status code.
    ///
    /// Non-success statuses are returned, not raised.
    pub async fn send(&self, notification: &TestNotification) -> Result<u16, DiakaError> {
        let url = self.config.message_create_url();
        let query = notification.to_query(self.topic.as_str());
        debug!(
            "Sending test notification for topic {} to target {}",
            self.topic, notification.target
        );

        let response = self.transport.get(&url, &query).await?;
        info!("Test notification for topic {}: HTTP {}", self.topic, response.status);
        Ok(response.status)
    }
}
