//! Record types for every registry collection.
//!
//! Wire names are camelCase throughout; enum values serialize exactly as the
//! business writes them (`"RTS"`, `"Non-RTS"`, `"COCP"`, lowercase roles).

mod ledger;
mod number;
mod reminder;
mod trade;

pub use ledger::{Activity, NewPayment, PaymentRecord, UserProfile};
pub use number::{NewNumber, NumberDetails, NumberRecord, NumberTemplate};
pub use reminder::{NewReminder, Reminder};
pub use trade::{
    DealerPurchaseRecord, DeletedNumberRecord, NewDealerPurchase, PreBookingRecord, SaleDetails,
    SaleRecord,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Return-to-service status of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtsStatus {
    /// Ready to sell.
    #[serde(rename = "RTS")]
    Rts,
    /// Locked in until its RTS date arrives.
    #[serde(rename = "Non-RTS")]
    NonRts,
}

impl fmt::Display for RtsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rts => "RTS",
            Self::NonRts => "Non-RTS",
        })
    }
}

/// Whether a record has been uploaded to the carrier portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadStatus {
    /// Not yet uploaded.
    Pending,
    /// Upload confirmed.
    Done,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
        })
    }
}

/// Billing category of a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberType {
    /// Standard prepaid SIM.
    Prepaid,
    /// Postpaid connection with a bill cycle.
    Postpaid,
    /// Company-owned, company-paid; carries a safe-custody date.
    #[serde(rename = "COCP")]
    Cocp,
}

impl fmt::Display for NumberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Prepaid => "Prepaid",
            Self::Postpaid => "Postpaid",
            Self::Cocp => "COCP",
        })
    }
}

/// Kind of place a SIM is physically held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationType {
    /// At the shop.
    Store,
    /// With an employee.
    Employee,
    /// With a dealer.
    Dealer,
}

impl fmt::Display for LocationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Store => "Store",
            Self::Employee => "Employee",
            Self::Dealer => "Dealer",
        })
    }
}

/// Who owns the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipType {
    /// Single owner.
    Individual,
    /// Joint ownership; `partner_name` is required.
    Partnership,
}

impl fmt::Display for OwnershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Individual => "Individual",
            Self::Partnership => "Partnership",
        })
    }
}

/// Whether the postpaid bill is paid by the purchasing dealer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdBill {
    /// Dealer pays the bill.
    Yes,
    /// We pay the bill.
    No,
}

impl fmt::Display for PdBill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Yes => "Yes",
            Self::No => "No",
        })
    }
}

/// State of a reminder task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderStatus {
    /// Open.
    Pending,
    /// Completed; `completion_date` is set.
    Done,
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "Pending",
            Self::Done => "Done",
        })
    }
}

/// Access role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including deletions and the retention sweep.
    Admin,
    /// Sees only records assigned to them; no destructive operations.
    Employee,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
        })
    }
}

/// The authenticated principal performing an operation.
///
/// `Actor::system()` stands in for scheduler-originated mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Stable user ID.
    pub uid: String,
    /// Display name recorded in lifecycle events and activities.
    pub display_name: String,
    /// Role used for permission checks.
    pub role: Role,
}

impl Actor {
    /// The synthetic actor for scheduler and maintenance jobs.
    #[must_use]
    pub fn system() -> Self {
        Self {
            uid: "system".to_string(),
            display_name: "System".to_string(),
            role: Role::Admin,
        }
    }

    /// Whether this actor may perform admin-only operations.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_wire_names_match_business_values() {
        assert_eq!(serde_json::to_value(RtsStatus::NonRts).unwrap(), "Non-RTS");
        assert_eq!(serde_json::to_value(NumberType::Cocp).unwrap(), "COCP");
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "admin");
        assert_eq!(serde_json::to_value(UploadStatus::Done).unwrap(), "Done");
    }

    #[test]
    fn enum_roundtrip() {
        let status: RtsStatus = serde_json::from_str("\"Non-RTS\"").unwrap();
        assert_eq!(status, RtsStatus::NonRts);
        assert_eq!(status.to_string(), "Non-RTS");
    }
}
