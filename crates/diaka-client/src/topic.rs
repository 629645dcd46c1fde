//! Topic and token identifiers.

use std::fmt;

use crate::error::DiakaError;

/// Identifier of one streamer's donation channel.
///
/// This is the last path segment of the widget link diaka.ua hands out
/// for showing donations on stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    /// Extract the topic from a widget URL (or accept a bare topic).
    ///
    /// # Example
    ///
    /// ```rust
    /// use diaka_client::Topic;
    ///
    /// let topic = Topic::from_url("https://diaka.ua/widget/abc123").unwrap();
    /// assert_eq!(topic.as_str(), "abc123");
    /// ```
    pub fn from_url(url: &str) -> Result<Self, DiakaError> {
        let segment = url
            .trim()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("");

        if segment.is_empty() {
            return Err(DiakaError::InvalidTopic(url.to_string()));
        }

        Ok(Self(segment.to_string()))
    }

    /// Get the topic as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bearer token embedded in a topic's stream page.
///
/// Valid for one SSE connection.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
