//! In-memory transport and fixtures for unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::transport::{EventStream, HttpResponse, RawEvent, Transport};
use crate::types::NotificationRecord;

pub(crate) const STREAM_ORIGIN: &str = "http://c.diaka.test";
pub(crate) const API_ORIGIN: &str = "http://diaka.test/api/v1";
pub(crate) const EVENTS_URL: &str = "http://e.diaka.test/sse";

pub(crate) fn test_config() -> DiakaConfig {
    DiakaConfig::new(STREAM_ORIGIN, API_ORIGIN, EVENTS_URL)
}

pub(crate) fn stream_page(token: &str) -> String {
    format!(
        "<html><head><script>\n\
         const es = new EventSource(url);\n\
         xhr.setRequestHeader('authorization', '{}');\n\
         </script></head><body></body></html>",
        token
    )
}

pub(crate) fn widget_html(transaction_id: u64, hash: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body>
  <div class="alert">
    <audio id="startMusic" src="/media/start/{hash}.mp3" autoplay></audio>
    <img src="/media/images/{hash}.gif" alt="">
    <img src="/media/images/second.gif" alt="">
    <p class="header">
      Donor {id} - 100 UAH
    </p>
    <p class="message">  Message {id}  </p>
    <audio id="voiceMusic" src="/media/voice/{id}.mp3"></audio>
  </div>
</body>
</html>"#,
        hash = hash,
        id = transaction_id
    )
}

pub(crate) fn expected_record(transaction_id: u64, hash: &str) -> NotificationRecord {
    NotificationRecord {
        start_music_url: format!("{}/media/start/{}.mp3", STREAM_ORIGIN, hash),
        voice_music_url: format!("{}/media/voice/{}.mp3", STREAM_ORIGIN, transaction_id),
        image_url: format!("{}/media/images/{}.gif", STREAM_ORIGIN, hash),
        message_header: format!("Donor {} - 100 UAH", transaction_id),
        message_body: format!("Message {}", transaction_id),
    }
}

pub(crate) fn event_json(transaction_id: u64, hash: &str) -> RawEvent {
    RawEvent::message(format!(
        r#"{{"data": {{"transaction": {{"id": {}}}, "widget": {{"hash": "{}"}}}}}}"#,
        transaction_id, hash
    ))
}

/// Events served by one `open_events` call.
pub(crate) struct EventScript {
    items: Vec<Result<RawEvent, DiakaError>>,
    hang: bool,
}

impl EventScript {
    /// Serve the items, then end the stream.
    pub(crate) fn ending(items: Vec<Result<RawEvent, DiakaError>>) -> Self {
        Self { items, hang: false }
    }

    /// Serve the items, then stay open forever.
    pub(crate) fn hanging(items: Vec<Result<RawEvent, DiakaError>>) -> Self {
        Self { items, hang: true }
    }
}

/// A recorded GET request.
#[derive(Debug, Clone)]
pub(crate) struct Request {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl Request {
    pub(crate) fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
struct FakeState {
    responses: Mutex<HashMap<String, HttpResponse>>,
    broken_widgets: Mutex<HashSet<u64>>,
    hanging_widgets: Mutex<HashSet<u64>>,
    abandoned_fetches: Arc<AtomicUsize>,
    scripts: Mutex<VecDeque<EventScript>>,
    requests: Mutex<Vec<Request>>,
    token_fetches: AtomicUsize,
    connections: AtomicUsize,
    closes: Arc<AtomicUsize>,
}

/// Transport serving canned pages, generated widgets and scripted events.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport {
    state: Arc<FakeState>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for a path under the stream origin.
    pub(crate) fn with_page(self, path: &str, body: &str) -> Self {
        self.with_response(&format!("{}{}", STREAM_ORIGIN, path), 200, body)
    }

    /// Serve `body` for a path under the API origin.
    pub(crate) fn with_api_response(self, path: &str, status: u16, body: &str) -> Self {
        self.with_response(&format!("{}{}", API_ORIGIN, path), status, body)
    }

    fn with_response(self, url: &str, status: u16, body: &str) -> Self {
        self.state.responses.lock().unwrap().insert(
            url.to_string(),
            HttpResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    /// Serve widget HTML without the voice audio for this transaction.
    pub(crate) fn with_broken_widget(self, transaction_id: u64) -> Self {
        self.state
            .broken_widgets
            .lock()
            .unwrap()
            .insert(transaction_id);
        self
    }

    /// Never answer the widget request for this transaction.
    pub(crate) fn with_hanging_widget(self, transaction_id: u64) -> Self {
        self.state
            .hanging_widgets
            .lock()
            .unwrap()
            .insert(transaction_id);
        self
    }

    /// Queue the events for the next `open_events` call.
    pub(crate) fn with_events(self, script: EventScript) -> Self {
        self.state.scripts.lock().unwrap().push_back(script);
        self
    }

    pub(crate) fn shared(&self) -> Arc<dyn Transport> {
        Arc::new(self.clone())
    }

    pub(crate) fn config(&self) -> Arc<DiakaConfig> {
        Arc::new(test_config())
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.state.requests.lock().unwrap().clone()
    }

    pub(crate) fn widget_requests(&self) -> Vec<Request> {
        let widget_url = test_config().widget_url();
        self.requests()
            .into_iter()
            .filter(|r| r.url == widget_url)
            .collect()
    }

    pub(crate) fn token_fetches(&self) -> usize {
        self.state.token_fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn connections(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// Hanging widget requests whose future was dropped.
    pub(crate) fn abandoned_fetches(&self) -> usize {
        self.state.abandoned_fetches.load(Ordering::SeqCst)
    }

    fn widget_response(&self, request: &Request) -> HttpResponse {
        let hash = request.param("widgetHash").unwrap_or_default();
        let id = widget_id(request);

        let mut body = widget_html(id, hash);
        if self.state.broken_widgets.lock().unwrap().contains(&id) {
            body = body.replace("id=\"voiceMusic\"", "id=\"otherMusic\"");
        }

        HttpResponse { status: 200, body }
    }
}

fn widget_id(request: &Request) -> u64 {
    request
        .param("transactionId")
        .and_then(|v| v.parse().ok())
        .unwrap_or_default()
}

/// Counts drops of the future holding it.
struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str, query: &[(&str, String)]) -> Result<HttpResponse, DiakaError> {
        let request = Request {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        };
        self.state.requests.lock().unwrap().push(request.clone());

        if url.starts_with(&format!("{}/stream/", STREAM_ORIGIN)) {
            self.state.token_fetches.fetch_add(1, Ordering::SeqCst);
        }

        if url == test_config().widget_url() {
            let hang = self
                .state
                .hanging_widgets
                .lock()
                .unwrap()
                .contains(&widget_id(&request));
            if hang {
                let _guard = DropCounter(self.state.abandoned_fetches.clone());
                return futures::future::pending().await;
            }
            return Ok(self.widget_response(&request));
        }

        let response = self.state.responses.lock().unwrap().get(url).cloned();
        Ok(response.unwrap_or(HttpResponse {
            status: 404,
            body: "<html><body>Not Found</body></html>".to_string(),
        }))
    }

    async fn open_events(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<EventStream, DiakaError> {
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        self.state.requests.lock().unwrap().push(Request {
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        });

        let script = self
            .state
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DiakaError::SessionFailed("connection refused".to_string()))?;

        let items = stream::iter(script.items);
        let inner: EventStream = if script.hang {
            Box::pin(items.chain(stream::pending()))
        } else {
            Box::pin(items)
        };

        Ok(Box::pin(TrackedStream {
            inner,
            closes: self.state.closes.clone(),
        }))
    }
}

/// Counts how many times the connection was released.
struct TrackedStream {
    inner: EventStream,
    closes: Arc<AtomicUsize>,
}

impl Stream for TrackedStream {
    type Item = Result<RawEvent, DiakaError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl Drop for TrackedStream {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
