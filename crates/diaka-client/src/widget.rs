//! Widget HTML scraping.

use std::fmt;
use std::sync::Arc;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::config::DiakaConfig;
use crate::error::DiakaError;
use crate::transport::Transport;
use crate::types::NotificationRecord;

/// The five elements a donation widget must contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetField {
    /// `<audio id="startMusic">`
    StartMusic,
    /// `<audio id="voiceMusic">`
    VoiceMusic,
    /// First `<img>` in the document.
    Image,
    /// `<p class="header">`
    MessageHeader,
    /// `<p class="message">`
    MessageBody,
}

impl WidgetField {
    /// All fields, in extraction order.
    pub const ALL: [WidgetField; 5] = [
        WidgetField::StartMusic,
        WidgetField::VoiceMusic,
        WidgetField::Image,
        WidgetField::MessageHeader,
        WidgetField::MessageBody,
    ];

    /// CSS selector locating this field's element.
    pub fn selector(&self) -> &'static str {
        match self {
            WidgetField::StartMusic => "audio#startMusic",
            WidgetField::VoiceMusic => "audio#voiceMusic",
            WidgetField::Image => "img",
            WidgetField::MessageHeader => "p.header",
            WidgetField::MessageBody => "p.message",
        }
    }
}

impl fmt::Display for WidgetField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WidgetField::StartMusic => "start music audio",
            WidgetField::VoiceMusic => "voice music audio",
            WidgetField::Image => "image",
            WidgetField::MessageHeader => "message header",
            WidgetField::MessageBody => "message body",
        };
        f.write_str(name)
    }
}

/// Extract a notification record from widget HTML.
///
/// Media `src` paths are prefixed with `origin`; paragraph text is trimmed.
/// Fails on the first field that cannot be found.
pub fn parse_widget_html(html: &str, origin: &str) -> Result<NotificationRecord, DiakaError> {
    let document = Html::parse_document(html);

    let media_url = |field: WidgetField| -> Result<String, DiakaError> {
        let src = find_element(&document, field)
            .and_then(|element| element.value().attr("src"))
            .ok_or(DiakaError::Scrape { field })?;
        Ok(format!("{}{}", origin, src))
    };

    let text = |field: WidgetField| -> Result<String, DiakaError> {
        let element = find_element(&document, field).ok_or(DiakaError::Scrape { field })?;
        Ok(element.text().collect::<String>().trim().to_string())
    };

    Ok(NotificationRecord {
        start_music_url: media_url(WidgetField::StartMusic)?,
        voice_music_url: media_url(WidgetField::VoiceMusic)?,
        image_url: media_url(WidgetField::Image)?,
        message_header: text(WidgetField::MessageHeader)?,
        message_body: text(WidgetField::MessageBody)?,
    })
}

fn find_element(document: &Html, field: WidgetField) -> Option<ElementRef<'_>> {
    let selector = Selector::parse(field.selector()).ok()?;
    document.select(&selector).next()
}

/// Fetches a donation's widget HTML and scrapes it into a record.
#[derive(Clone)]
pub struct WidgetScraper {
    transport: Arc<dyn Transport>,
    config: Arc<DiakaConfig>,
}

impl WidgetScraper {
    /// Create a scraper over a transport.
    pub fn new(transport: Arc<dyn Transport>, config: Arc<DiakaConfig>) -> Self {
        Self { transport, config }
    }

    /// Fetch and scrape the widget for one donation.
    pub async fn scrape(
        &self,
        transaction_id: u64,
        widget_hash: &str,
    ) -> Result<NotificationRecord, DiakaError> {
        let url = self.config.widget_url();
        let query = [
            ("widgetHash", widget_hash.to_string()),
            ("transactionId", transaction_id.to_string()),
        ];

        debug!("Fetching widget {} for transaction {}", widget_hash, transaction_id);
        let response = self.transport.get(&url, &query).await?;

        parse_widget_html(&response.body, &self.config.stream_origin).map_err(|e| {
            warn!(
                "Widget {} for transaction {} unusable (HTTP {}): {}",
                widget_hash, transaction_id, response.status, e
            );
            e
        })
    }
}
