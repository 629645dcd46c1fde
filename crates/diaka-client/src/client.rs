//! Asynchronous diaka.ua client.

use std::sync::Arc;

use tracing::info;

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::notifier::NotifierClient;
use crate::session::{NotificationStream, SessionBuilder, TokenMode};
use crate::stats::StatsClient;
use crate::token::TokenAcquirer;
use crate::topic::{AuthToken, Topic};
use crate::transport::{HttpTransport, Transport};
use crate::types::{DonationKind, DonationStats, NotificationRecord, TestNotification};
use crate::widget::WidgetScraper;

/// Client bound to one topic, for use on a tokio runtime.
///
/// Cloning is cheap; clones share the underlying HTTP connection pool.
#[derive(Clone)]
pub struct AsyncDiaka {
    topic: Topic,
    config: Arc<DiakaConfig>,
    transport: Arc<dyn Transport>,
    token_mode: TokenMode,
}

impl AsyncDiaka {
    /// Create a client from the widget link diaka.ua provides for the stream.
    pub fn new(url: &str) -> Result<Self, DiakaError> {
        Self::with_config(url, DiakaConfig::default())
    }

    /// Create a client with a custom configuration.
    pub fn with_config(url: &str, config: DiakaConfig) -> Result<Self, DiakaError> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(url, config, Arc::new(transport))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(
        url: &str,
        config: DiakaConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DiakaError> {
        let topic = Topic::from_url(url)?;
        info!("Diaka client for topic {}", topic);

        Ok(Self {
            topic,
            config: Arc::new(config),
            transport,
            token_mode: TokenMode::PerSession,
        })
    }

    /// Use a fixed token for every session instead of fetching one per session.
    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.token_mode = TokenMode::Fixed(token);
        self
    }

    /// Fetch a token now and reuse it for every session.
    pub async fn prefetch_token(self) -> Result<Self, DiakaError> {
        let token = self.acquire_token().await?;
        Ok(self.with_token(token))
    }

    /// Get the topic.
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Get the configuration.
    pub fn config(&self) -> &DiakaConfig {
        &self.config
    }

    /// Fetch a fresh authorization token for the topic.
    pub async fn acquire_token(&self) -> Result<AuthToken, DiakaError> {
        TokenAcquirer::new(self.transport.clone(), self.config.clone())
            .acquire(&self.topic)
            .await
    }

    /// Fetch and scrape the widget for one donation.
    pub async fn parse_notification(
        &self,
        transaction_id: u64,
        widget_hash: &str,
    ) -> Result<NotificationRecord, DiakaError> {
        WidgetScraper::new(self.transport.clone(), self.config.clone())
            .scrape(transaction_id, widget_hash)
            .await
    }

    /// Send a test notification and return the HTTP status code.
    pub async fn send_test_notification(
        &self,
        notification: &TestNotification,
    ) -> Result<u16, DiakaError> {
        self.notifier().send(notification).await
    }

    /// Most recent donations.
    ///
    /// The API's own defaults are [`DEFAULT_STATS_LIMIT`](crate::DEFAULT_STATS_LIMIT)
    /// and [`DonationKind::Test`].
    pub async fn get_last_donations(
        &self,
        limit: u32,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        self.stats().recent(limit, kind).await
    }

    /// Largest donations in the last `offset` seconds (86400 for one day).
    pub async fn get_largest_donations(
        &self,
        offset: u64,
        limit: u32,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        self.stats().top(offset, limit, kind).await
    }

    /// Sum of donations in the last `offset` seconds.
    pub async fn get_amount_of_donations(
        &self,
        offset: u64,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        self.stats().sum(offset, kind).await
    }

    /// Open a live session.
    ///
    /// Nothing is sent until the stream is first polled. Each call starts an
    /// independent session with its own token and connection.
    pub fn open_session(&self) -> NotificationStream {
        self.session_builder().open()
    }

    /// Builder for a session with non-default options.
    pub fn session_builder(&self) -> SessionBuilder {
        SessionBuilder::new(self.topic.clone(), self.config.clone(), self.transport.clone())
            .token_mode(self.token_mode.clone())
    }

    /// Stats client sharing this client's transport.
    pub fn stats(&self) -> StatsClient {
        StatsClient::new(self.topic.clone(), self.transport.clone(), self.config.clone())
    }

    /// Notifier sharing this client's transport.
    pub fn notifier(&self) -> NotifierClient {
        NotifierClient::new(self.topic.clone(), self.transport.clone(), self.config.clone())
    }
}

impl std::fmt::Debug for AsyncDiaka {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncDiaka")
            .field("topic", &self.topic)
            .field("config", &self.config)
            .field("token_mode", &self.token_mode)
            .finish()
    }
}
