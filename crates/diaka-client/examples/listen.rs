//! Print every donation of a topic as it arrives.
//!
//! Run with: cargo run --example listen -- <widget url>
//!
//! Configuration via .env file or environment variables:
//!   DIAKA_TEST_URL      - Widget URL used when no argument is given
//!   DIAKA_EVENT_ERRORS  - report, skip or terminate (default: report)
//!   RUST_LOG            - Log filter (default: info)

use diaka_client::{AsyncDiaka, DiakaConfig};
use futures::StreamExt;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (from project root)
    let _ = dotenvy::from_path("../../.env");

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let url = match env::args().nth(1).or_else(|| env::var("DIAKA_TEST_URL").ok()) {
        Some(url) => url,
        None => {
            eprintln!("Usage: cargo run --example listen -- <widget url>");
            std::process::exit(1);
        }
    };

    let diaka = AsyncDiaka::with_config(&url, DiakaConfig::from_env()?)?;
    println!("Listening for donations to {}...", diaka.topic());

    let mut notifications = diaka.open_session();
    while let Some(result) = notifications.next().await {
        match result {
            Ok(record) => {
                println!("{}", record.message_header);
                if !record.message_body.is_empty() {
                    println!("  {}", record.message_body);
                }
                println!("  voice: {}", record.voice_music_url);
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    println!("Session ended ({:?})", notifications.state());
    Ok(())
}
