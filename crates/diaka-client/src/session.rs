//! Live notification sessions.
//!
//! A session acquires a token, opens the SSE feed and turns every
//! inbound event into a [`NotificationRecord`] by scraping its widget.
//! Events are enriched one at a time, so records come out in the order
//! the events arrived.

use std::fmt;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::stream::{Stream, StreamExt};
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::token::TokenAcquirer;
use crate::topic::{AuthToken, Topic};
use crate::transport::{EventStream, RawEvent, Transport};
use crate::types::{InboundEvent, NotificationRecord};
use crate::widget::WidgetScraper;

/// What a session does with an error tied to a single event
/// (undecodable payload, unusable widget, failed widget fetch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventErrorPolicy {
    /// Yield the error and keep streaming.
    #[default]
    Report,
    /// Log the error and keep streaming without yielding it.
    Skip,
    /// Yield the error and close the session.
    Terminate,
}

impl FromStr for EventErrorPolicy {
    type Err = DiakaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "report" => Ok(EventErrorPolicy::Report),
            "skip" => Ok(EventErrorPolicy::Skip),
            "terminate" => Ok(EventErrorPolicy::Terminate),
            other => Err(DiakaError::Config(format!(
                "unknown event error policy: {} (expected report, skip or terminate)",
                other
            ))),
        }
    }
}

impl fmt::Display for EventErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventErrorPolicy::Report => f.write_str("report"),
            EventErrorPolicy::Skip => f.write_str("skip"),
            EventErrorPolicy::Terminate => f.write_str("terminate"),
        }
    }
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, nothing sent yet.
    Idle,
    /// Acquiring a token and opening the connection.
    Connecting,
    /// Connected and yielding records.
    Streaming,
    /// The feed ended or the session was stopped.
    Closed,
    /// Token acquisition or the connection failed.
    Failed,
}

impl SessionState {
    /// Whether the session can yield no more items.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Where a session gets its token from.
#[derive(Debug, Clone, Default)]
pub enum TokenMode {
    /// Fetch a fresh token every time a session opens.
    #[default]
    PerSession,
    /// Reuse a token acquired up front.
    Fixed(AuthToken),
}

type Item = Result<NotificationRecord, DiakaError>;

/// Everything a session needs besides its own state.
///
/// Shared borrows of this are held across awaits, so it must stay `Sync`.
struct SessionContext {
    topic: Topic,
    config: Arc<DiakaConfig>,
    transport: Arc<dyn Transport>,
    tokens: TokenAcquirer,
    scraper: WidgetScraper,
    token_mode: TokenMode,
}

impl SessionContext {
    async fn connect(&self) -> Result<EventStream, DiakaError> {
        let token = match &self.token_mode {
            TokenMode::PerSession => self.tokens.acquire(&self.topic).await?,
            TokenMode::Fixed(token) => token.clone(),
        };

        let query = [
            ("topic", self.topic.to_string()),
            ("authorization", token.as_str().to_string()),
        ];

        self.transport
            .open_events(&self.config.events_url, &query)
            .await
            .map_err(into_session_failure)
    }

    async fn enrich(&self, raw: &RawEvent) -> Result<NotificationRecord, DiakaError> {
        let event = InboundEvent::decode(&raw.data)?;
        debug!(
            "Session {} event {}: transaction {}, widget {}",
            self.topic, raw.event, event.transaction_id, event.widget_hash
        );
        self.scraper
            .scrape(event.transaction_id, &event.widget_hash)
            .await
    }
}

/// The state machine behind a [`NotificationStream`].
struct SessionCore {
    ctx: SessionContext,
    policy: EventErrorPolicy,
    state: SessionState,
    events: Option<EventStream>,
}

impl SessionCore {
    fn transition(&mut self, next: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.ctx.topic, self.state, next);
        self.state = next;
    }

    /// Drop the connection and enter a terminal state.
    fn close(&mut self, next: SessionState) {
        self.events = None;
        self.transition(next);
    }

    async fn advance(mut self) -> (Self, Option<Item>) {
        let item = self.next_item().await;
        (self, item)
    }

    async fn next_item(&mut self) -> Option<Item> {
        loop {
            match self.state {
                SessionState::Idle | SessionState::Connecting => {
                    self.transition(SessionState::Connecting);
                    match self.ctx.connect().await {
                        Ok(events) => {
                            self.events = Some(events);
                            self.transition(SessionState::Streaming);
                            info!("Session {} streaming", self.ctx.topic);
                        }
                        Err(e) => {
                            error!("Session {} failed to start: {}", self.ctx.topic, e);
                            self.close(SessionState::Failed);
                            return Some(Err(e));
                        }
                    }
                }
                SessionState::Streaming => {
                    let next = match self.events.as_mut() {
                        Some(events) => events.next().await,
                        None => None,
                    };

                    let raw = match next {
                        Some(Ok(raw)) => raw,
                        Some(Err(e)) => {
                            error!("Session {} connection error: {}", self.ctx.topic, e);
                            self.close(SessionState::Failed);
                            return Some(Err(into_session_failure(e)));
                        }
                        None => {
                            info!("Session {} ended by remote", self.ctx.topic);
                            self.close(SessionState::Closed);
                            return None;
                        }
                    };

                    match self.ctx.enrich(&raw).await {
                        Ok(record) => return Some(Ok(record)),
                        Err(e) => match self.policy {
                            EventErrorPolicy::Report => {
                                warn!("Session {} event error: {}", self.ctx.topic, e);
                                return Some(Err(e));
                            }
                            EventErrorPolicy::Skip => {
                                warn!("Session {} skipping event: {}", self.ctx.topic, e);
                                continue;
                            }
                            EventErrorPolicy::Terminate => {
                                error!(
                                    "Session {} closing on event error: {}",
                                    self.ctx.topic, e
                                );
                                self.close(SessionState::Closed);
                                return Some(Err(e));
                            }
                        },
                    }
                }
                SessionState::Closed | SessionState::Failed => return None,
            }
        }
    }
}

fn into_session_failure(e: DiakaError) -> DiakaError {
    match e {
        DiakaError::SessionFailed(_) => e,
        other => DiakaError::SessionFailed(other.to_string()),
    }
}

/// Builder for a [`NotificationStream`].
#[derive(Clone)]
pub struct SessionBuilder {
    topic: Topic,
    config: Arc<DiakaConfig>,
    transport: Arc<dyn Transport>,
    token_mode: TokenMode,
    policy: EventErrorPolicy,
}

impl SessionBuilder {
    /// Start a builder with the configuration's event error policy.
    pub fn new(topic: Topic, config: Arc<DiakaConfig>, transport: Arc<dyn Transport>) -> Self {
        let policy = config.event_errors;
        Self {
            topic,
            config,
            transport,
            token_mode: TokenMode::default(),
            policy,
        }
    }

    /// Set where the session's token comes from.
    pub fn token_mode(mut self, mode: TokenMode) -> Self {
        self.token_mode = mode;
        self
    }

    /// Set the per-event error policy.
    pub fn event_errors(mut self, policy: EventErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Create the session. Nothing is sent until it is first polled.
    pub fn open(self) -> NotificationStream {
        let tokens = TokenAcquirer::new(self.transport.clone(), self.config.clone());
        let scraper = WidgetScraper::new(self.transport.clone(), self.config.clone());

        NotificationStream {
            state: SessionState::Idle,
            core: Some(SessionCore {
                ctx: SessionContext {
                    topic: self.topic,
                    config: self.config,
                    transport: self.transport,
                    tokens,
                    scraper,
                    token_mode: self.token_mode,
                },
                policy: self.policy,
                state: SessionState::Idle,
                events: None,
            }),
            step: None,
        }
    }
}

/// A live, ordered stream of enriched donation notifications.
///
/// Yields `Ok` for every enriched event and `Err` for per-event errors
/// (under [`EventErrorPolicy::Report`]) or for the failure that ended the
/// session. Dropping the stream closes the connection and abandons any
/// in-flight widget fetch.
pub struct NotificationStream {
    state: SessionState,
    core: Option<SessionCore>,
    step: Option<BoxFuture<'static, (SessionCore, Option<Item>)>>,
}

impl NotificationStream {
    /// State as of the last yielded item.
    pub fn state(&self) -> SessionState {
        self.state
    }
}

impl Stream for NotificationStream {
    type Item = Item;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.step.is_none() {
            let core = match self.core.take() {
                Some(core) if !core.state.is_terminal() => core,
                Some(core) => {
                    self.core = Some(core);
                    return Poll::Ready(None);
                }
                None => return Poll::Ready(None),
            };
            self.step = Some(core.advance().boxed());
        }

        let Some(step) = self.step.as_mut() else {
            return Poll::Ready(None);
        };

        match step.poll_unpin(cx) {
            Poll::Ready((core, item)) => {
                self.step = None;
                self.state = core.state;
                self.core = Some(core);
                Poll::Ready(item)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for NotificationStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let topic = self.core.as_ref().map(|core| core.ctx.topic.as_str());
        f.debug_struct("NotificationStream")
            .field("topic", &topic)
            .field("state", &self.state)
            .finish()
    }
}
