//! Record types persisted by residentdesk.
//!
//! Every store holds an insertion-ordered JSON array of one of these shapes.
//! Records are created once by a validated submission and never changed.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Housing blocks seeded into a fresh housing store.
pub const DEFAULT_HOUSING_BLOCKS: [&str; 4] = ["Block A", "Block B", "Block C", "Block D"];

/// The persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Resident feedback ratings.
    Feedback,
    /// Maintenance tickets.
    Tickets,
    /// The housing-block reference list.
    Housing,
}

impl Collection {
    /// All collections, in initialization order.
    pub const ALL: [Collection; 3] = [Self::Feedback, Self::Tickets, Self::Housing];

    /// Stable name used for file names, table rows and logs.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Feedback => "feedback",
            Self::Tickets => "tickets",
            Self::Housing => "housing",
        }
    }

    /// File name of this collection in the JSON backend.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Feedback => "feedback.json",
            Self::Tickets => "tickets.json",
            Self::Housing => "housing.json",
        }
    }

    /// Position of this collection in [`Collection::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Feedback => 0,
            Self::Tickets => 1,
            Self::Housing => 2,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A resident's rating of the complex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    /// When the feedback was accepted (UTC, ISO-8601).
    pub timestamp: String,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Free-text description, never empty.
    pub description: String,
}

/// A maintenance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// When the ticket was accepted (UTC, ISO-8601).
    pub timestamp: String,
    /// What is broken.
    pub problem: String,
    /// Housing block, one of the reference list at submission time.
    pub housing: String,
    /// Room identifier within the block.
    pub room: String,
    /// When the resident is available; may be empty.
    pub time_available: String,
}

/// Format a timestamp the way records store it.
///
/// Microsecond precision with a `Z` suffix, e.g. `2024-05-01T09:30:00.123456Z`.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The default housing-block list as owned strings.
#[must_use]
pub fn default_housing_blocks() -> Vec<String> {
    DEFAULT_HOUSING_BLOCKS.iter().map(|b| (*b).to_string()).collect()
}
