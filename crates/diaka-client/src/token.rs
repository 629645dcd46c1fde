//! Authorization token acquisition.
//!
//! The stream page embeds the SSE bearer token in an inline script,
//! as in `xhr.setRequestHeader('authorization', '<token>')`.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::topic::{AuthToken, Topic};
use crate::transport::Transport;

const TOKEN_MARKER: &str = "'authorization',";

/// Find the first `'authorization', '<token>'` pair in page text.
pub fn extract_token(page: &str) -> Option<AuthToken> {
    page.match_indices(TOKEN_MARKER)
        .find_map(|(idx, _)| quoted_value(&page[idx + TOKEN_MARKER.len()..]))
}

/// Parse a leading single-quoted, non-empty value after optional whitespace.
fn quoted_value(rest: &str) -> Option<AuthToken> {
    let rest = rest.trim_start().strip_prefix('\'')?;
    let end = rest.find('\'')?;
    if end == 0 {
        return None;
    }
    Some(AuthToken::new(&rest[..end]))
}

/// Fetches a fresh authorization token for a topic.
#[derive(Clone)]
pub struct TokenAcquirer {
    transport: Arc<dyn Transport>,
    config: Arc<DiakaConfig>,
}

impl TokenAcquirer {
    /// Create an acquirer over a transport.
    pub fn new(transport: Arc<dyn Transport>, config: Arc<DiakaConfig>) -> Self {
        Self { transport, config }
    }

    /// Fetch the topic's stream page and extract its token.
    ///
    /// Every call performs a live fetch.
    pub async fn acquire(&self, topic: &Topic) -> Result<AuthToken, DiakaError> {
        let url = self.config.stream_page_url(topic.as_str());
        debug!("Fetching authorization token for topic {}", topic);

        let response = self.transport.get(&url, &[]).await?;

        match extract_token(&response.body) {
            Some(token) => Ok(token),
            None => {
                warn!(
                    "No authorization token on stream page for topic {} (HTTP {})",
                    topic, response.status
                );
                Err(DiakaError::TokenNotFound {
                    topic: topic.to_string(),
                })
            }
        }
    }
}
