//! Donation statistics queries.

use std::sync::Arc;

use tracing::debug;

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::topic::Topic;
use crate::transport::Transport;
use crate::types::{DonationKind, DonationStats};

/// Queries the `message/stats` endpoint for one topic.
///
/// Responses are passed through uninterpreted, remote error payloads
/// included.
#[derive(Clone)]
pub struct StatsClient {
    topic: Topic,
    transport: Arc<dyn Transport>,
    config: Arc<DiakaConfig>,
}

impl StatsClient {
    /// Create a stats client for a topic.
    pub fn new(topic: Topic, transport: Arc<dyn Transport>, config: Arc<DiakaConfig>) -> Self {
        Self {
            topic,
            transport,
            config,
        }
    }

    /// Most recent donations.
    pub async fn recent(&self, limit: u32, kind: DonationKind) -> Result<DonationStats, DiakaError> {
        let query = vec![
            ("action", "recent".to_string()),
            ("conveyorHash", self.topic.to_string()),
            ("params[limit]", limit.to_string()),
            ("params[test]", kind.as_param().to_string()),
        ];
        self.query(query).await
    }

    /// Largest donations in the last `offset` seconds.
    pub async fn top(
        &self,
        offset: u64,
        limit: u32,
        kind: DonationKind,
    ) -> Result<DonationStats, DiakaError> {
        let query = vec![
            ("action", "top".to_string()),
            ("conveyorHash", self.topic.to_string()),
            ("params[limit]", limit.to_string()),
            ("params[test]", kind.as_param().to_string()),
            ("params[offset]", offset.to_string()),
        ];
        self.query(query).await
    }

    /// Sum of donations in the last `offset` seconds.
    pub async fn sum(&self, offset: u64, kind: DonationKind) -> Result<DonationStats, DiakaError> {
        let query = vec![
            ("action", "sum".to_string()),
            ("conveyorHash", self.topic.to_string()),
            ("params[test]", kind.as_param().to_string()),
            ("params[time]", offset.to_string()),
        ];
        self.query(query).await
    }

    async fn query(&self, query: Vec<(&str, String)>) -> Result<DonationStats, DiakaError> {
        let url = self.config.message_stats_url();
        debug!("Stats query {} for topic {}", query[0].1, self.topic);

        let response = self.transport.get(&url, &query).await?;
        Ok(serde_json::from_str(&response.body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTransport;

    fn client(transport: &FakeTransport) -> StatsClient {
        StatsClient::new(
            Topic::from_url("abc123").unwrap(),
            transport.shared(),
            transport.config(),
        )
    }

    fn pairs(transport: &FakeTransport) -> Vec<(String, String)> {
        transport.requests().pop().unwrap().query
    }

    fn owned(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_recent_query() {
        let transport =
            FakeTransport::new().with_api_response("/message/stats", 200, r#"[{"amount": 10}]"#);

        let stats = client(&transport).recent(10, DonationKind::Test).await.unwrap();
        assert_eq!(stats[0]["amount"], 10);
        assert_eq!(
            pairs(&transport),
            owned(&[
                ("action", "recent"),
                ("conveyorHash", "abc123"),
                ("params[limit]", "10"),
                ("params[test]", "1"),
            ])
        );
    }

    #[tokio::test]
    async fn test_top_query() {
        let transport = FakeTransport::new().with_api_response("/message/stats", 200, "[]");

        client(&transport)
            .top(86400, 5, DonationKind::Paid)
            .await
            .unwrap();
        assert_eq!(
            pairs(&transport),
            owned(&[
                ("action", "top"),
                ("conveyorHash", "abc123"),
                ("params[limit]", "5"),
                ("params[test]", "2"),
                ("params[offset]", "86400"),
            ])
        );
    }

    #[tokio::test]
    async fn test_sum_query() {
        let transport =
            FakeTransport::new().with_api_response("/message/stats", 200, r#"{"sum": "150.00"}"#);

        let stats = client(&transport).sum(3600, DonationKind::Test).await.unwrap();
        assert_eq!(stats["sum"], "150.00");
        assert_eq!(
            pairs(&transport),
            owned(&[
                ("action", "sum"),
                ("conveyorHash", "abc123"),
                ("params[test]", "1"),
                ("params[time]", "3600"),
            ])
        );
    }

    #[tokio::test]
    async fn test_remote_error_payload_passed_through() {
        let transport = FakeTransport::new().with_api_response(
            "/message/stats",
            400,
            r#"{"error": "conveyor not found"}"#,
        );

        let stats = client(&transport).recent(10, DonationKind::Test).await.unwrap();
        assert_eq!(stats["error"], "conveyor not found");
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let transport = FakeTransport::new();
        assert!(matches!(
            client(&transport).sum(60, DonationKind::Test).await,
            Err(DiakaError::Json(_))
        ));
    }
}
