//! HTTP and Server-Sent Events transport.
//!
//! Everything the client sends over the network goes through the
//! [`Transport`] trait, so sessions and scrapers can be driven by an
//! in-memory implementation in tests.

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource, RequestBuilderExt};
use tracing::{debug, error, info};

use crate::config::DiakaConfig;
use crate::error::DiakaError;

/// Status and body of a completed GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

/// One server-pushed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Event name (`message` when the server does not set one).
    pub event: String,
    /// Event payload.
    pub data: String,
}

impl RawEvent {
    /// Create an unnamed (`message`) event.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: "message".to_string(),
            data: data.into(),
        }
    }
}

/// A live event feed. Dropping it closes the connection.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RawEvent, DiakaError>> + Send>>;

/// Network operations used by the client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET request with query parameters.
    ///
    /// Non-success statuses are returned, not raised.
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, DiakaError>;

    /// Open a Server-Sent Events connection.
    ///
    /// Resolves once the connection is established. Errors yielded by the
    /// returned stream are connection-level and end it.
    async fn open_events(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<EventStream, DiakaError>;
}

/// [`Transport`] backed by reqwest and reqwest-eventsource.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    sse: Client,
}

impl HttpTransport {
    /// Build the HTTP clients for a configuration.
    pub fn new(config: &DiakaConfig) -> Result<Self, DiakaError> {
        let mut http = Client::builder().timeout(config.request_timeout);
        // SSE connections are long-lived and must not time out
        let mut sse = Client::builder();

        if let Some(ref user_agent) = config.user_agent {
            http = http.user_agent(user_agent.clone());
            sse = sse.user_agent(user_agent.clone());
        }

        Ok(Self {
            http: http.build().map_err(DiakaError::Transport)?,
            sse: sse.build().map_err(DiakaError::Transport)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, DiakaError> {
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(DiakaError::Transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(DiakaError::Transport)?;
        debug!("GET {} -> {} ({} bytes)", url, status, body.len());

        Ok(HttpResponse { status, body })
    }

    async fn open_events(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<EventStream, DiakaError> {
        info!("Creating SSE connection to {}", url);

        let mut event_source = self
            .sse
            .get(url)
            .query(query)
            .eventsource()
            .map_err(|e| DiakaError::SessionFailed(e.to_string()))?;

        // Wait for the connection before handing the stream out
        let pending = match event_source.next().await {
            Some(Ok(Event::Open)) => {
                debug!("SSE connection opened");
                None
            }
            Some(Ok(Event::Message(msg))) => Some(RawEvent {
                event: msg.event,
                data: msg.data,
            }),
            Some(Err(e)) => {
                event_source.close();
                let reason = describe_sse_error(e);
                error!("SSE connection failed: {}", reason);
                return Err(DiakaError::SessionFailed(reason));
            }
            None => {
                return Err(DiakaError::SessionFailed(
                    "connection closed before it opened".to_string(),
                ));
            }
        };

        Ok(Box::pin(SseEvents {
            event_source,
            pending,
            finished: false,
        }))
    }
}

/// Error text for an SSE failure. The request URL carries the
/// authorization token, so it is stripped from transport errors.
fn describe_sse_error(e: reqwest_eventsource::Error) -> String {
    match e {
        reqwest_eventsource::Error::Transport(e) => e.without_url().to_string(),
        other => other.to_string(),
    }
}

/// Adapts an [`EventSource`] to [`EventStream`] without reconnecting.
struct SseEvents {
    event_source: EventSource,
    pending: Option<RawEvent>,
    finished: bool,
}

impl SseEvents {
    fn finish(&mut self) {
        self.finished = true;
        self.event_source.close();
    }
}

impl Stream for SseEvents {
    type Item = Result<RawEvent, DiakaError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if let Some(event) = self.pending.take() {
            return Poll::Ready(Some(Ok(event)));
        }
        if self.finished {
            return Poll::Ready(None);
        }

        loop {
            match Pin::new(&mut self.event_source).poll_next(cx) {
                Poll::Ready(Some(Ok(Event::Open))) => {
                    debug!("SSE connection opened");
                    continue;
                }
                Poll::Ready(Some(Ok(Event::Message(msg)))) => {
                    debug!("Received SSE event: {}", msg.event);
                    return Poll::Ready(Some(Ok(RawEvent {
                        event: msg.event,
                        data: msg.data,
                    })));
                }
                Poll::Ready(Some(Err(reqwest_eventsource::Error::StreamEnded)))
                | Poll::Ready(None) => {
                    info!("SSE stream ended");
                    self.finish();
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    // Returning here keeps the event source from retrying
                    let reason = describe_sse_error(e);
                    error!("SSE error: {}", reason);
                    self.finish();
                    return Poll::Ready(Some(Err(DiakaError::SessionFailed(reason))));
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl Drop for SseEvents {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Closing SSE connection");
            self.event_source.close();
        }
    }
}
