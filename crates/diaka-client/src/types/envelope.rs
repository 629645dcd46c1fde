//! Live event envelope and the enriched notification record.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DiakaError;

/// A donation event as pushed over SSE, reduced to the ids needed
/// to fetch its widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Donation transaction id.
    pub transaction_id: u64,
    /// Hash of the widget template instance that renders this donation.
    pub widget_hash: String,
}

impl InboundEvent {
    /// Decode an SSE `data` payload.
    ///
    /// The payload looks like
    /// `{"data": {"transaction": {"id": 1}, "widget": {"hash": "h"}}}`;
    /// everything else in it is ignored.
    pub fn decode(data: &str) -> Result<Self, DiakaError> {
        let envelope: EventEnvelope =
            serde_json::from_str(data).map_err(|e| DiakaError::MalformedEvent {
                reason: e.to_string(),
                data: data.to_string(),
            })?;

        let EventData {
            transaction,
            widget,
        } = envelope.data;

        if widget.hash.is_empty() {
            return Err(DiakaError::MalformedEvent {
                reason: "empty widget hash".to_string(),
                data: data.to_string(),
            });
        }

        Ok(Self {
            transaction_id: transaction.id,
            widget_hash: widget.hash,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EventEnvelope {
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    transaction: TransactionRef,
    widget: WidgetRef,
}

#[derive(Debug, Deserialize)]
struct TransactionRef {
    #[serde(deserialize_with = "deserialize_id")]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct WidgetRef {
    hash: String,
}

/// Transaction ids are numbers, but accept numeric strings too.
fn deserialize_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Number(u64),
        Text(String),
    }

    match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(id) => Ok(id),
        IdRepr::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid transaction id: {}", text))),
    }
}

/// A fully resolved donation notification.
///
/// The three URL fields are absolute. A record is only ever built with
/// all five fields present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Jingle played when the alert appears.
    pub start_music_url: String,
    /// Text-to-speech rendering of the message.
    pub voice_music_url: String,
    /// Alert image or animation.
    pub image_url: String,
    /// Header line, usually donor name and amount.
    pub message_header: String,
    /// Donor's message.
    pub message_body: String,
}
