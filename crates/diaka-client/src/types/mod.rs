//! Wire and request types.

mod envelope;
mod send;

pub use envelope::{InboundEvent, NotificationRecord};
pub use send::{
    DonationKind, TestNotification, DEFAULT_STATS_LIMIT, DEFAULT_TEST_AMOUNT,
    DEFAULT_TEST_MESSAGE, DEFAULT_TEST_NAME,
};

/// Donation statistics, returned exactly as the API sent them.
pub type DonationStats = serde_json::Value;
