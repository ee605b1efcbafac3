//! Reminder tasks.

use chrono::{DateTime, Utc};
use numera_core::ReminderId;
use serde::{Deserialize, Serialize};

use super::ReminderStatus;

/// A task assigned to one or more users.
///
/// Scheduler-generated reminders carry a stable `task_id` (for instance
/// `cocp-safecustody-<number id>`) that doubles as an idempotency key and
/// drives the mark-done eligibility rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    /// Document ID.
    pub id: ReminderId,
    /// Collection-local serial number.
    pub sr_no: u64,
    /// Idempotency key for system-generated reminders.
    #[serde(default)]
    pub task_id: Option<String>,
    /// What needs doing.
    pub task_name: String,
    /// Display names of the assignees.
    pub assigned_to: Vec<String>,
    /// Pending or Done.
    pub status: ReminderStatus,
    /// When it is due.
    pub due_date: DateTime<Utc>,
    /// UID of the creator, or `"system"`.
    pub created_by: String,
    /// Set when marked done; drives the retention sweep.
    #[serde(default)]
    pub completion_date: Option<DateTime<Utc>>,
    /// Optional note, e.g. supplied when completing.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for creating a reminder by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReminder {
    /// What needs doing.
    pub task_name: String,
    /// Display names of the assignees.
    pub assigned_to: Vec<String>,
    /// When it is due.
    pub due_date: DateTime<Utc>,
}
