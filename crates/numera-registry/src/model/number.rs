//! Inventory number records.

use chrono::{DateTime, Utc};
use numera_core::{EventLog, LifecycleEvent, Msisdn, NumberId};
use serde::{Deserialize, Serialize};

use super::{LocationType, NumberType, OwnershipType, PdBill, RtsStatus, UploadStatus};

/// Everything about a number except its document ID.
///
/// Transition records (sales, pre-bookings, the deleted archive) embed this
/// struct verbatim as `originalNumber`, history included, so a number's full
/// past travels with it through every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberDetails {
    /// Collection-local serial number.
    pub sr_no: u64,
    /// The ten-digit mobile number.
    pub mobile: Msisdn,
    /// Digital root of the mobile, precomputed for search.
    pub sum: u32,
    /// RTS / Non-RTS.
    pub status: RtsStatus,
    /// Carrier-portal upload state.
    pub upload_status: UploadStatus,
    /// Prepaid / Postpaid / COCP.
    pub number_type: NumberType,
    /// Vendor the number was purchased from.
    pub purchase_from: String,
    /// Purchase price.
    pub purchase_price: f64,
    /// Asking price; zero when unset.
    #[serde(default)]
    pub sale_price: f64,
    /// Date a Non-RTS number becomes sellable. `None` once RTS.
    #[serde(default)]
    pub rts_date: Option<DateTime<Utc>>,
    /// Display name of the holder; mirrors `assigned_to`.
    pub name: String,
    /// Free-form location name.
    pub current_location: String,
    /// Kind of location.
    pub location_type: LocationType,
    /// Employee the SIM is assigned to, or `"Unassigned"`.
    pub assigned_to: String,
    /// When the number was purchased.
    pub purchase_date: DateTime<Utc>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When the SIM was last checked in at its location.
    #[serde(default)]
    pub check_in_date: Option<DateTime<Utc>>,
    /// COCP only: when safe custody expires.
    #[serde(default)]
    pub safe_custody_date: Option<DateTime<Utc>>,
    /// UID of the creating user.
    pub created_by: String,
    /// COCP only: the corporate account name.
    #[serde(default)]
    pub account_name: Option<String>,
    /// Individual or Partnership.
    pub ownership_type: OwnershipType,
    /// Partner name for Partnership ownership.
    #[serde(default)]
    pub partner_name: Option<String>,
    /// Postpaid only: bill cycle date.
    #[serde(default)]
    pub bill_date: Option<DateTime<Utc>>,
    /// Postpaid only: whether the dealer pays the bill.
    #[serde(default)]
    pub pd_bill: Option<PdBill>,
    /// Append-only lifecycle history.
    #[serde(default)]
    pub history: EventLog,
}

/// A number in active inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberRecord {
    /// Document ID.
    pub id: NumberId,
    /// All remaining fields.
    #[serde(flatten)]
    pub details: NumberDetails,
}

/// The fields shared by every row of a bulk add: everything in a new number
/// except the mobile itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberTemplate {
    /// RTS / Non-RTS.
    pub status: RtsStatus,
    /// Only kept when status is Non-RTS.
    #[serde(default)]
    pub rts_date: Option<DateTime<Utc>>,
    /// Upload state; defaults to Pending.
    #[serde(default = "default_upload_status")]
    pub upload_status: UploadStatus,
    /// Prepaid / Postpaid / COCP.
    pub number_type: NumberType,
    /// Vendor purchased from.
    pub purchase_from: String,
    /// Purchase price.
    pub purchase_price: f64,
    /// Asking price.
    #[serde(default)]
    pub sale_price: Option<f64>,
    /// Purchase date.
    pub purchase_date: DateTime<Utc>,
    /// Location name.
    pub current_location: String,
    /// Location kind.
    pub location_type: LocationType,
    /// Assignee; `None` means Unassigned.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Ownership.
    pub ownership_type: OwnershipType,
    /// Required for Partnership ownership.
    #[serde(default)]
    pub partner_name: Option<String>,
    /// COCP only.
    #[serde(default)]
    pub account_name: Option<String>,
    /// COCP only.
    #[serde(default)]
    pub safe_custody_date: Option<DateTime<Utc>>,
    /// Postpaid only.
    #[serde(default)]
    pub bill_date: Option<DateTime<Utc>>,
    /// Postpaid only.
    #[serde(default)]
    pub pd_bill: Option<PdBill>,
}

fn default_upload_status() -> UploadStatus {
    UploadStatus::Pending
}

/// Input for creating a single number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNumber {
    /// The mobile number to add.
    pub mobile: Msisdn,
    /// Everything else.
    #[serde(flatten)]
    pub template: NumberTemplate,
}

impl NumberTemplate {
    /// Materializes the template into stored details for one mobile,
    /// normalizing type-conditional fields the same way for manual adds,
    /// bulk adds and CSV imports:
    ///
    /// - `rts_date` is kept only for Non-RTS status;
    /// - `safe_custody_date` and `account_name` only for COCP;
    /// - `bill_date` and `pd_bill` only for Postpaid;
    /// - assignment defaults to `"Unassigned"` and also fills `name`;
    /// - `partner_name` is cleared unless ownership is Partnership.
    #[must_use]
    pub fn into_details(
        self,
        mobile: Msisdn,
        sr_no: u64,
        created_by: &str,
        initial_event: LifecycleEvent,
    ) -> NumberDetails {
        let assigned_to = self
            .assigned_to
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "Unassigned".to_string());
        let sum = mobile.digital_root();
        let is_cocp = self.number_type == NumberType::Cocp;
        let is_postpaid = self.number_type == NumberType::Postpaid;

        NumberDetails {
            sr_no,
            sum,
            mobile,
            status: self.status,
            upload_status: self.upload_status,
            number_type: self.number_type,
            purchase_from: self.purchase_from,
            purchase_price: self.purchase_price,
            sale_price: self.sale_price.unwrap_or(0.0),
            rts_date: match self.status {
                RtsStatus::NonRts => self.rts_date,
                RtsStatus::Rts => None,
            },
            name: assigned_to.clone(),
            current_location: self.current_location,
            location_type: self.location_type,
            assigned_to,
            purchase_date: self.purchase_date,
            notes: self.notes,
            check_in_date: None,
            safe_custody_date: if is_cocp { self.safe_custody_date } else { None },
            created_by: created_by.to_string(),
            account_name: if is_cocp { self.account_name } else { None },
            ownership_type: self.ownership_type,
            partner_name: match self.ownership_type {
                OwnershipType::Partnership => self.partner_name,
                OwnershipType::Individual => None,
            },
            bill_date: if is_postpaid { self.bill_date } else { None },
            pd_bill: if is_postpaid { self.pd_bill } else { None },
            history: EventLog::with_initial(initial_event),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template(number_type: NumberType, status: RtsStatus) -> NumberTemplate {
        NumberTemplate {
            status,
            rts_date: Some(Utc::now()),
            upload_status: UploadStatus::Pending,
            number_type,
            purchase_from: "numberwale".to_string(),
            purchase_price: 500.0,
            sale_price: None,
            purchase_date: Utc::now(),
            current_location: "Main Store".to_string(),
            location_type: LocationType::Store,
            assigned_to: None,
            notes: None,
            ownership_type: OwnershipType::Individual,
            partner_name: Some("ignored".to_string()),
            account_name: Some("Acme".to_string()),
            safe_custody_date: Some(Utc::now()),
            bill_date: Some(Utc::now()),
            pd_bill: Some(PdBill::Yes),
        }
    }

    #[test]
    fn prepaid_rts_drops_conditional_fields() {
        let details = template(NumberType::Prepaid, RtsStatus::Rts).into_details(
            Msisdn::new("9876543210").unwrap(),
            1,
            "u1",
            LifecycleEvent::new("Created", "added", "Tester"),
        );
        assert_eq!(details.rts_date, None);
        assert_eq!(details.safe_custody_date, None);
        assert_eq!(details.account_name, None);
        assert_eq!(details.bill_date, None);
        assert_eq!(details.pd_bill, None);
        assert_eq!(details.partner_name, None);
        assert_eq!(details.assigned_to, "Unassigned");
        assert_eq!(details.name, "Unassigned");
        assert_eq!(details.sum, 9);
        assert_eq!(details.history.len(), 1);
    }

    #[test]
    fn cocp_keeps_custody_and_account() {
        let details = template(NumberType::Cocp, RtsStatus::NonRts).into_details(
            Msisdn::new("9000000001").unwrap(),
            7,
            "u1",
            LifecycleEvent::new("Created", "added", "Tester"),
        );
        assert!(details.rts_date.is_some());
        assert!(details.safe_custody_date.is_some());
        assert_eq!(details.account_name.as_deref(), Some("Acme"));
        assert_eq!(details.bill_date, None);
    }

    #[test]
    fn record_serializes_flat_with_camel_case() {
        let details = template(NumberType::Prepaid, RtsStatus::Rts).into_details(
            Msisdn::new("9876543210").unwrap(),
            1,
            "u1",
            LifecycleEvent::new("Created", "added", "Tester"),
        );
        let record = NumberRecord {
            id: NumberId::generate(),
            details,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("srNo").is_some());
        assert!(value.get("uploadStatus").is_some());
        assert!(value.get("details").is_none(), "must flatten");
        assert_eq!(value["assignedTo"], json!("Unassigned"));
    }
}
