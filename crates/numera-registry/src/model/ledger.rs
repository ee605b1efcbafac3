//! Audit feed entries, vendor payments and user profiles.

use chrono::{DateTime, Utc};
use numera_core::{ActivityId, PaymentId};
use serde::{Deserialize, Serialize};

use super::Role;

/// One entry of the global audit feed. Nearly every mutation writes one,
/// in the same atomic batch as the mutation itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Document ID.
    pub id: ActivityId,
    /// Collection-local serial number.
    pub sr_no: u64,
    /// Display name of the acting user, or `"System"`.
    pub employee_name: String,
    /// Short action label, e.g. `"Sold Number"`.
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
    /// UID of the acting user.
    pub created_by: String,
}

/// A payment received from a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Document ID.
    pub id: PaymentId,
    /// Collection-local serial number.
    pub sr_no: u64,
    /// Paying vendor.
    pub vendor_name: String,
    /// Amount received.
    pub amount: f64,
    /// When the payment landed.
    pub payment_date: DateTime<Utc>,
    /// Optional note.
    #[serde(default)]
    pub notes: Option<String>,
    /// UID of the recording user.
    pub created_by: String,
}

/// Input for recording a payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPayment {
    /// Paying vendor.
    pub vendor_name: String,
    /// Amount received.
    pub amount: f64,
    /// When the payment landed.
    pub payment_date: DateTime<Utc>,
    /// Optional note.
    #[serde(default)]
    pub notes: Option<String>,
}

/// A user account profile. The document ID equals the `uid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Stable user ID; also the document ID.
    pub uid: String,
    /// Login email.
    pub email: String,
    /// Display name shown in assignments and activities.
    pub display_name: String,
    /// Access role.
    pub role: Role,
}
