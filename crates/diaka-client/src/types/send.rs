//! Request parameters for test notifications and donation statistics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DiakaError;

/// Default number of donations returned by the stats endpoints.
pub const DEFAULT_STATS_LIMIT: u32 = 10;

/// Default test notification amount.
pub const DEFAULT_TEST_AMOUNT: f64 = 54.0;

/// Default test notification donor name.
pub const DEFAULT_TEST_NAME: &str = "DiakaPlug";

/// Default test notification message.
pub const DEFAULT_TEST_MESSAGE: &str = "Hi from Rust";

/// Which donations the stats endpoints should count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationKind {
    /// Only test donations.
    #[default]
    Test,
    /// Only paid donations.
    Paid,
}

impl DonationKind {
    /// Value of the `params[test]` query parameter.
    pub fn as_param(&self) -> u8 {
        match self {
            DonationKind::Test => 1,
            DonationKind::Paid => 2,
        }
    }
}

impl fmt::Display for DonationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DonationKind::Test => f.write_str("test"),
            DonationKind::Paid => f.write_str("paid"),
        }
    }
}

impl FromStr for DonationKind {
    type Err = DiakaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "test" | "1" => Ok(DonationKind::Test),
            "paid" | "2" => Ok(DonationKind::Paid),
            other => Err(DiakaError::Config(format!("unknown donation kind: {}", other))),
        }
    }
}

/// Parameters for a test notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestNotification {
    /// Donation target (goal) the notification is attributed to.
    pub target: String,
    /// Donation amount.
    pub amount: f64,
    /// Donor's name.
    pub name: String,
    /// Donor's message.
    pub message: String,
    /// Identifier of the system the donation came from.
    pub source: String,
    /// Whether the alert should be displayed. Sent as lowercase `true`/`false`.
    pub show: bool,
    /// Free-form additional information.
    pub additional: String,
}

impl TestNotification {
    /// Create a test notification for a target with default values.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            amount: DEFAULT_TEST_AMOUNT,
            name: DEFAULT_TEST_NAME.to_string(),
            message: DEFAULT_TEST_MESSAGE.to_string(),
            source: String::new(),
            show: true,
            additional: String::new(),
        }
    }

    /// Set the amount.
    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    /// Set the donor's name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the source system identifier.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set whether the alert is displayed.
    pub fn with_show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }

    /// Set the additional information.
    pub fn with_additional(mut self, additional: impl Into<String>) -> Self {
        self.additional = additional.into();
        self
    }

    /// Query parameters for `message/create`, in wire order.
    pub fn to_query(&self, topic: &str) -> Vec<(&'static str, String)> {
        vec![
            ("key", topic.to_string()),
            ("amount", self.amount.to_string()),
            ("name", self.name.clone()),
            ("message", self.message.clone()),
            ("target", self.target.clone()),
            ("source", self.source.clone()),
            ("additional", self.additional.clone()),
            ("show", self.show.to_string()),
        ]
    }
}
