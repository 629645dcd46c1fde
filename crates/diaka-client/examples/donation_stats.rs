//! Print donation statistics for a topic using the blocking client.
//!
//! Run with: cargo run --example donation_stats -- <widget url>

use diaka_client::{Diaka, DiakaConfig, DonationKind, DEFAULT_STATS_LIMIT};
use std::env;

const ONE_DAY: u64 = 86_400;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::from_path("../../.env");
    tracing_subscriber::fmt::init();

    let url = env::args()
        .nth(1)
        .or_else(|| env::var("DIAKA_TEST_URL").ok())
        .ok_or("usage: cargo run --example donation_stats -- <widget url>")?;

    let diaka = Diaka::with_config(&url, DiakaConfig::from_env()?)?;

    let recent = diaka.get_last_donations(DEFAULT_STATS_LIMIT, DonationKind::Paid)?;
    println!("Recent: {}", serde_json::to_string_pretty(&recent)?);

    let top = diaka.get_largest_donations(ONE_DAY, 3, DonationKind::Paid)?;
    println!("Top today: {}", serde_json::to_string_pretty(&top)?);

    let sum = diaka.get_amount_of_donations(ONE_DAY, DonationKind::Paid)?;
    println!("Sum today: {}", sum);

    Ok(())
}
