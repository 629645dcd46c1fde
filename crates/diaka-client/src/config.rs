//! Configuration types for diaka-client.

use std::env;
use std::time::Duration;

use crate::error::DiakaError;
use crate::session::EventErrorPolicy;

/// Origin serving stream pages and widget HTML.
pub const DEFAULT_STREAM_ORIGIN: &str = "https://c.diaka.ua";

/// Base URL of the public REST API.
pub const DEFAULT_API_ORIGIN: &str = "https://diaka.ua/api/v1";

/// Server-Sent Events endpoint for live donations.
pub const DEFAULT_EVENTS_URL: &str = "https://e.diaka.ua/sse";

/// Configuration for connecting to diaka.ua.
///
/// Only the origins are configurable; endpoint paths are fixed.
#[derive(Debug, Clone)]
pub struct DiakaConfig {
    /// Origin of stream pages and widget HTML (e.g., "https://c.diaka.ua").
    /// Also prefixed to scraped media paths.
    pub stream_origin: String,
    /// REST API base (e.g., "https://diaka.ua/api/v1").
    pub api_origin: String,
    /// Full SSE endpoint URL.
    pub events_url: String,
    /// Timeout for ordinary requests. The SSE connection never times out.
    pub request_timeout: Duration,
    /// User-Agent header sent with every request.
    pub user_agent: Option<String>,
    /// What a live session does with errors tied to a single event.
    pub event_errors: EventErrorPolicy,
}

impl DiakaConfig {
    /// Create a configuration pointing all endpoints at custom origins.
    pub fn new(
        stream_origin: impl Into<String>,
        api_origin: impl Into<String>,
        events_url: impl Into<String>,
    ) -> Self {
        Self {
            stream_origin: trim_origin(stream_origin.into()),
            api_origin: trim_origin(api_origin.into()),
            events_url: events_url.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables.
    ///
    /// Optional environment variables:
    /// - `DIAKA_STREAM_ORIGIN` - Stream/widget origin (default: https://c.diaka.ua)
    /// - `DIAKA_API_ORIGIN` - REST API base (default: https://diaka.ua/api/v1)
    /// - `DIAKA_EVENTS_URL` - SSE endpoint (default: https://e.diaka.ua/sse)
    /// - `DIAKA_REQUEST_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
    /// - `DIAKA_USER_AGENT` - User-Agent header (default: reqwest's)
    /// - `DIAKA_EVENT_ERRORS` - `report`, `skip` or `terminate` (default: report)
    pub fn from_env() -> Result<Self, DiakaError> {
        let defaults = Self::default();

        let stream_origin = env::var("DIAKA_STREAM_ORIGIN")
            .map(trim_origin)
            .unwrap_or(defaults.stream_origin);

        let api_origin = env::var("DIAKA_API_ORIGIN")
            .map(trim_origin)
            .unwrap_or(defaults.api_origin);

        let events_url = env::var("DIAKA_EVENTS_URL").unwrap_or(defaults.events_url);

        let request_timeout = match env::var("DIAKA_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    DiakaError::Config(format!("DIAKA_REQUEST_TIMEOUT_SECS is not a number: {}", raw))
                })?,
            Err(_) => defaults.request_timeout,
        };

        let user_agent = env::var("DIAKA_USER_AGENT").ok().filter(|v| !v.is_empty());

        let event_errors = match env::var("DIAKA_EVENT_ERRORS") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.event_errors,
        };

        Ok(Self {
            stream_origin,
            api_origin,
            events_url,
            request_timeout,
            user_agent,
            event_errors,
        })
    }

    /// Set the stream/widget origin.
    pub fn with_stream_origin(mut self, origin: impl Into<String>) -> Self {
        self.stream_origin = trim_origin(origin.into());
        self
    }

    /// Set the REST API base.
    pub fn with_api_origin(mut self, origin: impl Into<String>) -> Self {
        self.api_origin = trim_origin(origin.into());
        self
    }

    /// Set the SSE endpoint URL.
    pub fn with_events_url(mut self, url: impl Into<String>) -> Self {
        self.events_url = url.into();
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the per-event error policy for live sessions.
    pub fn with_event_errors(mut self, policy: EventErrorPolicy) -> Self {
        self.event_errors = policy;
        self
    }

    /// Get the stream page URL for a topic.
    pub fn stream_page_url(&self, topic: &str) -> String {
        format!("{}/stream/{}", self.stream_origin, urlencoding::encode(topic))
    }

    /// Get the widget HTML endpoint URL.
    pub fn widget_url(&self) -> String {
        format!("{}/api/v1/widget/get-html", self.stream_origin)
    }

    /// Get the test notification endpoint URL.
    pub fn message_create_url(&self) -> String {
        format!("{}/message/create", self.api_origin)
    }

    /// Get the donation statistics endpoint URL.
    pub fn message_stats_url(&self) -> String {
        format!("{}/message/stats", self.api_origin)
    }

    /// Prefix a scraped root-relative path with the stream origin.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.stream_origin, path)
    }
}

impl Default for DiakaConfig {
    fn default() -> Self {
        Self {
            stream_origin: DEFAULT_STREAM_ORIGIN.to_string(),
            api_origin: DEFAULT_API_ORIGIN.to_string(),
            events_url: DEFAULT_EVENTS_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: None,
            event_errors: EventErrorPolicy::default(),
        }
    }
}

fn trim_origin(origin: String) -> String {
    origin.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_origins() {
        let config = DiakaConfig::default();
        assert_eq!(config.stream_origin, "https://c.diaka.ua");
        assert_eq!(config.api_origin, "https://diaka.ua/api/v1");
        assert_eq!(config.events_url, "https://e.diaka.ua/sse");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.event_errors, EventErrorPolicy::Report);
    }

    #[test]
    fn test_endpoint_urls() {
        let config = DiakaConfig::default();
        assert_eq!(config.stream_page_url("abc123"), "https://c.diaka.ua/stream/abc123");
        assert_eq!(
            config.widget_url(),
            "https://c.diaka.ua/api/v1/widget/get-html"
        );
        assert_eq!(
            config.message_create_url(),
            "https://diaka.ua/api/v1/message/create"
        );
        assert_eq!(
            config.message_stats_url(),
            "https://diaka.ua/api/v1/message/stats"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = DiakaConfig::new("http://127.0.0.1:9000/", "http://127.0.0.1:9001/api/", "x")
            .with_events_url("http://127.0.0.1:9002/sse");
        assert_eq!(config.stream_origin, "http://127.0.0.1:9000");
        assert_eq!(config.api_origin, "http://127.0.0.1:9001/api");
        assert_eq!(config.events_url, "http://127.0.0.1:9002/sse");
        assert_eq!(config.absolute_url("/media/a.mp3"), "http://127.0.0.1:9000/media/a.mp3");
    }
}
