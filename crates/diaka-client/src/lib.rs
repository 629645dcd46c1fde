//! Client library for diaka.ua donation notifications.
//!
//! This crate connects to the live donation feed of a diaka.ua stream and
//! turns every donation into a [`NotificationRecord`] scraped from its
//! widget. It also supports:
//!
//! - Sending test notifications
//! - Querying donation statistics (recent, largest, sum)
//! - Async ([`AsyncDiaka`]) and blocking ([`Diaka`]) clients
//!
//! # Example
//!
//! ```no_run
//! use diaka_client::AsyncDiaka;
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<(), diaka_client::DiakaError> {
//! let diaka = AsyncDiaka::new("https://diaka.ua/widget/abc123")?;
//!
//! let mut notifications = diaka.open_session();
//! while let Some(result) = notifications.next().await {
//!     match result {
//!         Ok(record) => println!("{}: {}", record.message_header, record.message_body),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod client;
pub mod config;
pub mod error;
pub mod notifier;
pub mod session;
pub mod stats;
pub mod token;
pub mod topic;
pub mod transport;
pub mod types;
pub mod widget;

#[cfg(test)]
mod test_support;

pub use blocking::{Diaka, NotificationIter};
pub use client::AsyncDiaka;
pub use config::DiakaConfig;
pub use error::DiakaError;
pub use notifier::NotifierClient;
pub use session::{EventErrorPolicy, NotificationStream, SessionBuilder, SessionState, TokenMode};
pub use stats::StatsClient;
pub use token::{extract_token, TokenAcquirer};
pub use topic::{AuthToken, Topic};
pub use transport::{EventStream, HttpResponse, HttpTransport, RawEvent, Transport};
pub use types::*;
pub use widget::{parse_widget_html, WidgetField, WidgetScraper};

/// Crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
