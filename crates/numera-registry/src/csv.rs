//! Delimited-text transfer of number records.
//!
//! Export writes the current rows with a leading summary line; import maps
//! header names to fields, validates each row and reports a per-row
//! accept/reject outcome. Rejected rows never reach the store.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use numera_core::Msisdn;

use crate::model::{
    LocationType, NewNumber, NumberRecord, NumberType, NumberTemplate, OwnershipType, PdBill,
    RtsStatus, UploadStatus,
};

/// Column order of an export, and the headers import understands.
pub const EXPORT_HEADERS: [&str; 20] = [
    "Mobile",
    "Sum",
    "Status",
    "UploadStatus",
    "NumberType",
    "PurchaseFrom",
    "PurchasePrice",
    "SalePrice",
    "PurchaseDate",
    "RTSDate",
    "AssignedTo",
    "CurrentLocation",
    "LocationType",
    "OwnershipType",
    "PartnerName",
    "AccountName",
    "SafeCustodyDate",
    "BillDate",
    "PDBill",
    "Notes",
];

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 6] = [
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%Y/%m/%d",
    "%m/%d/%y",
];

/// Serializes rows as delimited text, preceded by a summary line.
#[must_use]
pub fn export_numbers(records: &[NumberRecord], generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# {} records exported {}\n",
        records.len(),
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&EXPORT_HEADERS.join(","));
    out.push('\n');

    for record in records {
        let d = &record.details;
        let fields: Vec<String> = vec![
            d.mobile.to_string(),
            d.sum.to_string(),
            d.status.to_string(),
            d.upload_status.to_string(),
            d.number_type.to_string(),
            d.purchase_from.clone(),
            d.purchase_price.to_string(),
            d.sale_price.to_string(),
            format_date(Some(d.purchase_date)),
            format_date(d.rts_date),
            d.assigned_to.clone(),
            d.current_location.clone(),
            d.location_type.to_string(),
            d.ownership_type.to_string(),
            d.partner_name.clone().unwrap_or_default(),
            d.account_name.clone().unwrap_or_default(),
            format_date(d.safe_custody_date),
            format_date(d.bill_date),
            d.pd_bill.map(|p| p.to_string()).unwrap_or_default(),
            d.notes.clone().unwrap_or_default(),
        ];
        let quoted: Vec<String> = fields.iter().map(|f| quote_field(f)).collect();
        out.push_str(&quoted.join(","));
        out.push('\n');
    }
    out
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn quote_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// A row the import refused, with the reason reported back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedRow {
    /// 1-based data-row index (the header line does not count).
    pub row: usize,
    /// The raw mobile column, when present.
    pub mobile: Option<String>,
    /// Why the row was refused.
    pub reason: String,
}

/// Outcome of parsing an import file.
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    /// Rows that passed validation, ready for creation in one batch.
    pub accepted: Vec<NewNumber>,
    /// Rows that were refused, each with its reason.
    pub rejected: Vec<RejectedRow>,
}

/// Parses and validates delimited text into draft number records.
///
/// `existing_mobiles` holds every mobile already live in the system, across
/// all stages; `employees` is the list of valid assignee names, anything
/// else falls back to `"Unassigned"`.
#[must_use]
pub fn parse_import(
    text: &str,
    existing_mobiles: &HashSet<String>,
    employees: &[String],
) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    let mut lines = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty() && !l.starts_with('#'));

    let Some(header_line) = lines.next() else {
        return outcome;
    };
    let headers: Vec<String> = split_row(header_line)
        .into_iter()
        .map(|h| h.trim().to_string())
        .collect();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let columns: Vec<Option<usize>> = EXPORT_HEADERS.iter().map(|h| column(h)).collect();
    let field = |row: &[String], header: &str| -> Option<String> {
        let idx = EXPORT_HEADERS.iter().position(|h| *h == header)?;
        let col = columns[idx]?;
        let value = row.get(col)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    };

    let mut seen = HashSet::new();
    for (row_no, line) in lines.enumerate() {
        let row = split_row(line);
        let row_no = row_no + 1;
        let raw_mobile = field(&row, "Mobile");
        let reject = |reason: &str, rejected: &mut Vec<RejectedRow>| {
            rejected.push(RejectedRow {
                row: row_no,
                mobile: raw_mobile.clone(),
                reason: reason.to_string(),
            });
        };

        let Some(mobile) = raw_mobile.as_deref().and_then(|m| Msisdn::new(m).ok()) else {
            reject(
                "Invalid or missing mobile number (must be 10 digits).",
                &mut outcome.rejected,
            );
            continue;
        };
        if !seen.insert(mobile.to_string()) {
            reject(
                "Duplicate mobile number found within the import file.",
                &mut outcome.rejected,
            );
            continue;
        }
        if existing_mobiles.contains(mobile.as_str()) {
            reject(
                "Mobile number already exists in the system.",
                &mut outcome.rejected,
            );
            continue;
        }

        let status = match field(&row, "Status").as_deref() {
            Some("RTS") => RtsStatus::Rts,
            Some("Non-RTS") => RtsStatus::NonRts,
            _ => {
                reject(
                    "Status is a required field. Must be \"RTS\" or \"Non-RTS\".",
                    &mut outcome.rejected,
                );
                continue;
            }
        };

        let upload_status = match field(&row, "UploadStatus").as_deref() {
            Some("Done") => UploadStatus::Done,
            _ => UploadStatus::Pending,
        };
        let number_type = match field(&row, "NumberType").as_deref() {
            Some("Postpaid") => NumberType::Postpaid,
            Some("COCP") => NumberType::Cocp,
            _ => NumberType::Prepaid,
        };
        let ownership_type = match field(&row, "OwnershipType").as_deref() {
            Some("Partnership") => OwnershipType::Partnership,
            _ => OwnershipType::Individual,
        };

        let partner_name = field(&row, "PartnerName");
        if ownership_type == OwnershipType::Partnership && partner_name.is_none() {
            reject(
                "PartnerName is required for Partnership ownership.",
                &mut outcome.rejected,
            );
            continue;
        }

        let safe_custody_date = field(&row, "SafeCustodyDate").and_then(|v| parse_date(&v));
        if number_type == NumberType::Cocp && safe_custody_date.is_none() {
            reject(
                "Invalid or missing SafeCustodyDate (required for COCP).",
                &mut outcome.rejected,
            );
            continue;
        }

        let account_name = field(&row, "AccountName");
        if number_type == NumberType::Cocp && account_name.is_none() {
            reject(
                "Missing AccountName (required for COCP).",
                &mut outcome.rejected,
            );
            continue;
        }

        let bill_date = field(&row, "BillDate").and_then(|v| parse_date(&v));
        if number_type == NumberType::Postpaid && bill_date.is_none() {
            reject(
                "Invalid or missing BillDate (required for Postpaid).",
                &mut outcome.rejected,
            );
            continue;
        }

        let rts_date = field(&row, "RTSDate").and_then(|v| parse_date(&v));
        if status == RtsStatus::NonRts && rts_date.is_none() {
            reject(
                "Invalid or missing RTSDate (required for Non-RTS status).",
                &mut outcome.rejected,
            );
            continue;
        }

        let Some(purchase_date) = field(&row, "PurchaseDate").and_then(|v| parse_date(&v)) else {
            reject("Invalid or missing PurchaseDate.", &mut outcome.rejected);
            continue;
        };

        let Some(purchase_price) = field(&row, "PurchasePrice").and_then(|v| v.parse().ok())
        else {
            reject(
                "Invalid or missing PurchasePrice. Must be a number.",
                &mut outcome.rejected,
            );
            continue;
        };

        let sale_price: Option<f64> = field(&row, "SalePrice").and_then(|v| v.parse().ok());
        let assigned_to = field(&row, "AssignedTo").filter(|a| employees.contains(a));
        let pd_bill = match field(&row, "PDBill").as_deref() {
            Some("Yes") => Some(PdBill::Yes),
            _ => Some(PdBill::No),
        };
        let location_type = match field(&row, "LocationType").as_deref() {
            Some("Employee") => LocationType::Employee,
            Some("Dealer") => LocationType::Dealer,
            _ => LocationType::Store,
        };

        outcome.accepted.push(NewNumber {
            mobile,
            template: NumberTemplate {
                status,
                rts_date,
                upload_status,
                number_type,
                purchase_from: field(&row, "PurchaseFrom")
                    .unwrap_or_else(|| "N/A".to_string()),
                purchase_price,
                sale_price,
                purchase_date,
                current_location: field(&row, "CurrentLocation")
                    .unwrap_or_else(|| "N/A".to_string()),
                location_type,
                assigned_to,
                notes: field(&row, "Notes"),
                ownership_type,
                partner_name,
                account_name,
                safe_custody_date,
                bill_date,
                pd_bill,
            },
        });
    }

    outcome
}

/// Parses a date column against each accepted layout, midnight UTC.
fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

/// Splits one delimited line, honoring double-quoted fields with `""`
/// escapes.
fn split_row(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testutil::template;
    use numera_core::{LifecycleEvent, NumberId};

    fn record(mobile: &str) -> NumberRecord {
        NumberRecord {
            id: NumberId::generate(),
            details: template().into_details(
                Msisdn::new(mobile).unwrap(),
                1,
                "u-admin",
                LifecycleEvent::new("Created", "x", "Asha"),
            ),
        }
    }

    #[test]
    fn export_has_summary_headers_and_rows() {
        let out = export_numbers(&[record("9876543210")], Utc::now());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("# 1 records exported "));
        assert!(lines[1].starts_with("Mobile,Sum,Status"));
        assert!(lines[2].starts_with("9876543210,9,RTS,Pending,Prepaid"));
    }

    #[test]
    fn quoted_fields_round_trip() {
        assert_eq!(
            split_row("a,\"b, with comma\",\"he said \"\"hi\"\"\",d"),
            vec!["a", "b, with comma", "he said \"hi\"", "d"]
        );
        assert_eq!(quote_field("plain"), "plain");
        assert_eq!(quote_field("a,b"), "\"a,b\"");
    }

    #[test]
    fn import_validates_per_row() {
        let text = "\
Mobile,Status,PurchaseDate,PurchasePrice,NumberType,AccountName,SafeCustodyDate
9876543210,RTS,2026-01-15,500,Prepaid,,
98765,RTS,2026-01-15,500,Prepaid,,
9876543210,RTS,2026-01-15,500,Prepaid,,
9000000001,Maybe,2026-01-15,500,Prepaid,,
9000000002,RTS,2026-01-15,,Prepaid,,
9000000003,RTS,2026-01-15,500,COCP,Acme,15-02-2026
9000000004,RTS,2026-01-15,500,COCP,,15-02-2026
9000000005,RTS,,500,Prepaid,,
";
        let outcome = parse_import(text, &HashSet::new(), &[]);
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.accepted[0].mobile.as_str(), "9876543210");
        assert_eq!(outcome.accepted[1].mobile.as_str(), "9000000003");

        let reasons: Vec<&str> = outcome.rejected.iter().map(|r| r.reason.as_str()).collect();
        assert_eq!(
            reasons,
            vec![
                "Invalid or missing mobile number (must be 10 digits).",
                "Duplicate mobile number found within the import file.",
                "Status is a required field. Must be \"RTS\" or \"Non-RTS\".",
                "Invalid or missing PurchasePrice. Must be a number.",
                "Missing AccountName (required for COCP).",
                "Invalid or missing PurchaseDate.",
            ]
        );
    }

    #[test]
    fn import_rejects_known_mobiles() {
        let existing: HashSet<String> = ["9876543210".to_string()].into();
        let text = "Mobile,Status,PurchaseDate,PurchasePrice\n9876543210,RTS,2026-01-15,500\n";
        let outcome = parse_import(text, &existing, &[]);
        assert!(outcome.accepted.is_empty());
        assert_eq!(
            outcome.rejected[0].reason,
            "Mobile number already exists in the system."
        );
    }

    #[test]
    fn date_formats_are_tried_in_order() {
        assert!(parse_date("15-01-2026").is_some());
        assert!(parse_date("2026-01-15").is_some());
        assert!(parse_date("01/15/2026").is_some());
        assert!(parse_date("01/15/26").is_some());
        assert!(parse_date("not a date").is_none());
    }

    #[test]
    fn unknown_assignee_falls_back_to_unassigned() {
        let text = "Mobile,Status,PurchaseDate,PurchasePrice,AssignedTo\n\
                    9000000001,RTS,2026-01-15,500,Ghost\n\
                    9000000002,RTS,2026-01-15,500,Ravi\n";
        let outcome = parse_import(text, &HashSet::new(), &["Ravi".to_string()]);
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.accepted[0].template.assigned_to, None);
        assert_eq!(
            outcome.accepted[1].template.assigned_to.as_deref(),
            Some("Ravi")
        );
    }
}
