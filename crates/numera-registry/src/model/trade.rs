//! Transition records: sales, pre-bookings, dealer purchases and the
//! deleted-number archive.

use chrono::{DateTime, Utc};
use numera_core::{DealerPurchaseId, DeletedNumberId, Msisdn, NumberId, PreBookingId, SaleId};
use serde::{Deserialize, Serialize};

use super::{NumberDetails, UploadStatus};

/// Sale terms supplied when selling one or more numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleDetails {
    /// Final sale price per number.
    pub sale_price: f64,
    /// Buyer.
    pub sold_to: String,
    /// Sale date.
    pub sale_date: DateTime<Utc>,
}

/// A completed sale. The sold number's full prior state, history included,
/// rides along as `original_number` so the sale can be cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    /// Document ID.
    pub id: SaleId,
    /// Collection-local serial number.
    pub sr_no: u64,
    /// Sold mobile.
    pub mobile: Msisdn,
    /// Digital root, carried from the underlying number.
    pub sum: u32,
    /// Buyer.
    pub sold_to: String,
    /// Final sale price.
    pub sale_price: f64,
    /// Sale date.
    pub sale_date: DateTime<Utc>,
    /// Upload state carried from the underlying number.
    pub upload_status: UploadStatus,
    /// UID of the selling user.
    pub created_by: String,
    /// The number as it was at the moment of sale.
    pub original_number: NumberDetails,
}

/// A number parked for a prospective buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreBookingRecord {
    /// Document ID.
    pub id: PreBookingId,
    /// Collection-local serial number.
    pub sr_no: u64,
    /// Pre-booked mobile.
    pub mobile: Msisdn,
    /// Digital root.
    pub sum: u32,
    /// Upload state carried from the underlying number.
    pub upload_status: UploadStatus,
    /// When it was moved to the pre-booking list.
    pub pre_booking_date: DateTime<Utc>,
    /// UID of the booking user.
    pub created_by: String,
    /// The number as it was at the moment of pre-booking.
    pub original_number: NumberDetails,
}

/// A number purchased by a dealer directly; a standalone register entry with
/// no embedded inventory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealerPurchaseRecord {
    /// Document ID.
    pub id: DealerPurchaseId,
    /// Collection-local serial number.
    pub sr_no: u64,
    /// Purchased mobile.
    pub mobile: Msisdn,
    /// Digital root.
    pub sum: u32,
    /// Purchasing dealer.
    pub dealer_name: String,
    /// Purchase price.
    pub price: f64,
    /// UID of the recording user.
    pub created_by: String,
}

/// Input for recording a dealer purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDealerPurchase {
    /// Purchased mobile.
    pub mobile: Msisdn,
    /// Purchasing dealer.
    pub dealer_name: String,
    /// Purchase price.
    pub price: f64,
}

/// Archive entry for a number deleted from inventory. Restorable; the full
/// record travels along as `original_number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNumberRecord {
    /// Document ID in the archive collection.
    pub id: DeletedNumberId,
    /// ID the record had in the numbers collection.
    pub original_id: NumberId,
    /// Serial number it had in inventory.
    pub original_sr_no: u64,
    /// Deleted mobile.
    pub mobile: Msisdn,
    /// Digital root.
    pub sum: u32,
    /// Mandatory reason supplied at deletion time.
    pub deletion_reason: String,
    /// Display name of the deleting user.
    pub deleted_by: String,
    /// When it was deleted.
    pub deleted_at: DateTime<Utc>,
    /// The number as it was at deletion.
    pub original_number: NumberDetails,
}
