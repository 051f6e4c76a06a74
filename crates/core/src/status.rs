//! Queue entry lifecycle states and transition rules.
//!
//! The lifecycle is a small fixed state machine:
//!
//! ```text
//! pending  --approve--> approved --callNext--> serving --callNext--> served
//! pending  --reject --> rejected
//! approved --skip   --> skipped
//! serving  --skip   --> skipped
//! ```
//!
//! `served`, `skipped` and `rejected` are terminal; no transition is
//! defined out of them.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a [`QueueEntry`](crate::QueueEntry).
///
/// The string form (lowercase) is used on the wire and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Approved,
    Serving,
    Served,
    Skipped,
    Rejected,
}

/// Statuses that count as "active": a user may hold at most one entry in
/// any of these at a time.
pub const ACTIVE_STATUSES: &[QueueStatus] = &[
    QueueStatus::Pending,
    QueueStatus::Approved,
    QueueStatus::Serving,
];

impl QueueStatus {
    /// Lowercase string form, matching the wire and database encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "pending",
            QueueStatus::Approved => "approved",
            QueueStatus::Serving => "serving",
            QueueStatus::Served => "served",
            QueueStatus::Skipped => "skipped",
            QueueStatus::Rejected => "rejected",
        }
    }

    /// Parse the lowercase string form.
    pub fn parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(QueueStatus::Pending),
            "approved" => Ok(QueueStatus::Approved),
            "serving" => Ok(QueueStatus::Serving),
            "served" => Ok(QueueStatus::Served),
            "skipped" => Ok(QueueStatus::Skipped),
            "rejected" => Ok(QueueStatus::Rejected),
            other => Err(format!("unknown queue status '{other}'")),
        }
    }

    /// Whether an entry in this status blocks its user from joining again.
    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }

    /// Whether no transition is defined out of this status.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Served | QueueStatus::Skipped | QueueStatus::Rejected
        )
    }

    /// Whether an `approve` transition is defined from this status.
    pub fn can_approve(&self) -> bool {
        *self == QueueStatus::Pending
    }

    /// Whether a `reject` transition is defined from this status.
    pub fn can_reject(&self) -> bool {
        *self == QueueStatus::Pending
    }

    /// Whether a `skip` transition is defined from this status.
    pub fn can_skip(&self) -> bool {
        matches!(self, QueueStatus::Approved | QueueStatus::Serving)
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QueueStatus::parse(s)
    }
}
