//! Blocking diaka.ua client.
//!
//! [`Diaka`] drives the same session core as [`AsyncDiaka`] on a private
//! current-thread runtime, so every call blocks the calling thread until
//! its network work is done. Run one session per thread to consume
//! several topics at once.
//!
//! Do not use this module from inside an async runtime.

use std::sync::Arc;

use futures::StreamExt;
use tokio::runtime::{Builder, Runtime};

use crate::client::AsyncDiaka;
use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::session::{EventErrorPolicy, NotificationStream, SessionState};
use crate::topic::{AuthToken, Topic};
use crate::transport::Transport;
use crate::types::{DonationKind, DonationStats, NotificationRecord, TestNotification};

/// Blocking client bound to one topic.
#[derive(Clone)]
pub struct Diaka {
    inner: AsyncDiaka,
    runtime: Arc<Runtime>,
}

impl Diaka {
    /// Create a client from the widget link diaka.ua provides for the stream.
    pub fn new(url: &str) -> Result<Self, DiakaError> {
        Self::from_async(AsyncDiaka::new(url)?)
    }

    /// Create a client with a custom configuration.
    pub fn with_config(url: &str, config: DiakaConfig) -> Result<Self, DiakaError> {
        Self::from_async(AsyncDiaka::with_config(url, config)?)
    }

    /// Create a client over a custom transport.
    pub fn with_transport(
        url: &str,
        config: DiakaConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, DiakaError> {
        Self::from_async(AsyncDiaka::with_transport(url, config, transport)?)
    }

    /// Wrap an async client.
    pub fn from_async(inner: AsyncDiaka) -> Result<Self, DiakaError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(DiakaError::Runtime)?;

        Ok(Self {
            inner,
            runtime: Arc::new(runtime),
        })
    }

    /// Use a fixed token for every session instead of fetching one per session.
    pub fn with_token(mut self, token: AuthToken) -> Self {
        self.inner = self.inner.with_token(token);
        self
    }

    /// Fetch a token now and reuse it for every session.
    pub fn prefetch_token(self) -> Result<Self, DiakaError> {
        let token = self.acquire_token()?;
        Ok(self.with_token(token))
    }

    /// Get the topic.
    pub fn topic(&self) -> &Topic {
        self.inner.topic()
    }

    /// Get the async client this one drives.
    pub fn as_async(&self) -> &AsyncDiaka {
        &self.inner
    }

    /// Fetch a fresh authorization token for the topic.
    pub fn acquire_token(&self) -> Result<AuthToken, DiakaError> {
        self.runtime.block_on(self.inner.acquire_token())
    }

    /// Fetch and scrape the widget for one donation.
    pub fn parse_notification(
        &self,
        transaction_id: u64,
        widget_hash: &str,
    ) -> Result<NotificationRecord, DiakaError> {
        self.runtime
            .block_on(self.inner.parse_notification(transaction_id, widget_hash))
    }

    /// Send a test notification and return the HTTP status code.
    pub fn send_test_notification(
        &self,
        notification: &TestNotification,
    ) -> Result<u16, DiakaError> {
        self.runtime
            .block_on(self.inner.send_test_notification(notification))
    }

    /// Most recent donations.
    pub fn get_last_donations(
        &self,
        limit: u32,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        self.runtime
            .block_on(self.inner.get_last_donations(limit, kind))
    }

    /// Largest donations in the last `offset` seconds.
    pub fn get_largest_donations(
        &self,
        offset: u64,
        limit: u32,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        self.runtime
            .block_on(self.inner.get_largest_donations(offset, limit, kind))
    }

    /// Sum of donations in the last `offset` seconds.
    pub fn get_amount_of_donations(
        &self,
        offset: u64,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        self.runtime
            .block_on(self.inner.get_amount_of_donations(offset, kind))
    }

    /// Open a live session.
    ///
    /// Nothing is sent until the iterator is first advanced.
    pub fn open_session(&self) -> NotificationIter {
        NotificationIter::new(self.inner.open_session(), self.runtime.clone())
    }

    /// Open a live session with a specific per-event error policy.
    pub fn open_session_with(&self, policy: EventErrorPolicy) -> NotificationIter {
        let stream = self.inner.session_builder().event_errors(policy).open();
        NotificationIter::new(stream, self.runtime.clone())
    }
}

impl std::fmt::Debug for Diaka {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Diaka").field("inner", &self.inner).finish()
    }
}

/// Blocking iterator over a live session.
///
/// Each `next()` blocks until the next record (or error) is available.
/// Dropping the iterator closes the connection.
pub struct NotificationIter {
    stream: NotificationStream,
    runtime: Arc<Runtime>,
}

impl NotificationIter {
    fn new(stream: NotificationStream, runtime: Arc<Runtime>) -> Self {
        Self { stream, runtime }
    }

    /// State as of the last yielded item.
    pub fn state(&self) -> SessionState {
        self.stream.state()
    }
}

impl Iterator for NotificationIter {
    type Item = Result<NotificationRecord, DiakaError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime.block_on(self.stream.next())
    }
}

impl std::fmt::Debug for NotificationIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationIter")
            .field("stream", &self.stream)
            .finish()
    }
}
