//! Error types for diaka-client.

use thiserror::Error;

use crate::widget::WidgetField;

/// Errors that can occur when talking to diaka.ua.
#[derive(Debug, Error)]
pub enum DiakaError {
    /// HTTP request failed (network, DNS, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The stream page did not contain an authorization token.
    #[error("authorization token not found on stream page for topic {topic}")]
    TokenNotFound { topic: String },

    /// The widget HTML is missing one of the expected elements.
    #[error("widget markup is missing {field}")]
    Scrape { field: WidgetField },

    /// An SSE payload could not be decoded into an event.
    #[error("malformed event: {reason}")]
    MalformedEvent { reason: String, data: String },

    /// The live connection failed; the session is over.
    #[error("session failed: {0}")]
    SessionFailed(String),

    /// The widget URL did not contain a topic.
    #[error("invalid topic: {0:?}")]
    InvalidTopic(String),

    /// JSON deserialization of a response body failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The blocking client could not start its runtime.
    #[error("runtime error: {0}")]
    Runtime(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_not_found_names_topic() {
        let err = DiakaError::TokenNotFound {
            topic: "abc123".to_string(),
        };
        assert!(err.to_string().contains("abc123"));
    }

    #[test]
    fn test_scrape_error_names_field() {
        let err = DiakaError::Scrape {
            field: WidgetField::VoiceMusic,
        };
        assert_eq!(err.to_string(), "widget markup is missing voice music audio");
    }
}
