//! Inventory mutations: create, update, assign, check in, archive, restore.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use numera_core::{
    DeletedNumberId, Error, LifecycleEvent, Msisdn, NumberId, Result, WriteBatch,
};

use crate::collections;
use crate::model::{
    Actor, DeletedNumberRecord, LocationType, NewNumber, NumberRecord, NumberTemplate, PdBill,
    RtsStatus, UploadStatus,
};
use crate::store::next_sr_no;
use crate::writer::{detailed_description, event_value, RegistryWriter};

/// Where a batch of SIMs is being moved to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// Kind of location.
    pub location_type: LocationType,
    /// Free-form location name.
    pub current_location: String,
}

impl RegistryWriter {
    async fn numbers(&self) -> Result<Vec<NumberRecord>> {
        self.registry().fetch(collections::NUMBERS).await
    }

    fn find<'a>(numbers: &'a [NumberRecord], id: &NumberId) -> Result<&'a NumberRecord> {
        numbers
            .iter()
            .find(|n| n.id == *id)
            .ok_or_else(|| Error::resource_not_found("number", id))
    }

    fn find_all<'a>(
        numbers: &'a [NumberRecord],
        ids: &[NumberId],
    ) -> Result<Vec<&'a NumberRecord>> {
        ids.iter().map(|id| Self::find(numbers, id)).collect()
    }

    /// Adds a single number to inventory.
    ///
    /// # Errors
    ///
    /// Rejects duplicates of any live mobile before writing anything.
    pub async fn add_number(&self, actor: &Actor, new: NewNumber) -> Result<NumberRecord> {
        if self.registry().is_duplicate(new.mobile.as_str(), None).await? {
            return Err(Error::duplicate(new.mobile.as_str()));
        }

        let numbers = self.numbers().await?;
        let sr_no = next_sr_no(numbers.iter().map(|n| n.details.sr_no));
        let event = LifecycleEvent::new(
            "Created",
            format!("Number added to inventory by {}.", actor.display_name),
            &actor.display_name,
        );
        let mobile = new.mobile.clone();
        let record = NumberRecord {
            id: NumberId::generate(),
            details: new.template.into_details(new.mobile, sr_no, &actor.uid, event),
        };

        let batch = WriteBatch::new().put(
            collections::NUMBERS,
            record.id.to_string(),
            serde_json::to_value(&record)?,
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Added Number",
                format!("Manually added new number {mobile}"),
            )
            .await?;
        self.commit(batch).await?;
        info!(mobile = %mobile, actor = %actor.display_name, "added number");
        Ok(record)
    }

    /// Adds many numbers sharing one field template.
    ///
    /// # Errors
    ///
    /// Rejects the whole call if any mobile duplicates a live one or repeats
    /// within the list.
    pub async fn add_numbers_bulk(
        &self,
        actor: &Actor,
        template: NumberTemplate,
        mobiles: Vec<Msisdn>,
    ) -> Result<Vec<NumberRecord>> {
        if mobiles.is_empty() {
            return Ok(Vec::new());
        }
        for (i, mobile) in mobiles.iter().enumerate() {
            if mobiles[..i].contains(mobile) {
                return Err(Error::validation(format!(
                    "mobile {mobile} appears more than once in the request"
                )));
            }
            if self.registry().is_duplicate(mobile.as_str(), None).await? {
                return Err(Error::duplicate(mobile.as_str()));
            }
        }

        let numbers = self.numbers().await?;
        let mut sr_no = next_sr_no(numbers.iter().map(|n| n.details.sr_no));
        let event = LifecycleEvent::new(
            "Created",
            format!("Number added to inventory via bulk add by {}.", actor.display_name),
            &actor.display_name,
        );

        let mut batch = WriteBatch::new();
        let mut created = Vec::with_capacity(mobiles.len());
        for mobile in mobiles {
            let record = NumberRecord {
                id: NumberId::generate(),
                details: template
                    .clone()
                    .into_details(mobile, sr_no, &actor.uid, event.clone()),
            };
            sr_no += 1;
            batch = batch.put(
                collections::NUMBERS,
                record.id.to_string(),
                serde_json::to_value(&record)?,
            );
            created.push(record);
        }

        let affected: Vec<String> = created
            .iter()
            .map(|r| r.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Bulk Added Numbers",
                detailed_description("Added", &affected),
            )
            .await?;
        self.commit(batch).await?;
        info!(count = created.len(), actor = %actor.display_name, "bulk added numbers");
        Ok(created)
    }

    /// Creates numbers from accepted CSV import rows. Validation (including
    /// duplicate rejection) happens in the import pipeline beforehand.
    pub async fn import_numbers(
        &self,
        actor: &Actor,
        rows: Vec<NewNumber>,
    ) -> Result<Vec<NumberRecord>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let numbers = self.numbers().await?;
        let mut sr_no = next_sr_no(numbers.iter().map(|n| n.details.sr_no));

        let mut batch = WriteBatch::new();
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let event = LifecycleEvent::new(
                "Created",
                "Number imported from CSV file.",
                &actor.display_name,
            );
            let record = NumberRecord {
                id: NumberId::generate(),
                details: row.template.into_details(row.mobile, sr_no, &actor.uid, event),
            };
            sr_no += 1;
            batch = batch.put(
                collections::NUMBERS,
                record.id.to_string(),
                serde_json::to_value(&record)?,
            );
            created.push(record);
        }

        let affected: Vec<String> = created
            .iter()
            .map(|r| r.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Imported Numbers",
                detailed_description("Imported from CSV:", &affected),
            )
            .await?;
        self.commit(batch).await?;
        Ok(created)
    }

    /// Replaces a number's editable details, appending one history event.
    ///
    /// # Errors
    ///
    /// Rejects unknown ids and mobile changes that collide with a live number.
    pub async fn update_number(
        &self,
        actor: &Actor,
        id: &NumberId,
        new: NewNumber,
    ) -> Result<NumberRecord> {
        let numbers = self.numbers().await?;
        let existing = Self::find(&numbers, id)?;

        if self
            .registry()
            .is_duplicate(new.mobile.as_str(), Some(id))
            .await?
        {
            return Err(Error::duplicate(new.mobile.as_str()));
        }

        let event = LifecycleEvent::new(
            "Details Updated",
            format!("Number details updated by {}.", actor.display_name),
            &actor.display_name,
        );

        // Creation-only fields survive the edit.
        let mut details = new.template.into_details(
            new.mobile,
            existing.details.sr_no,
            &existing.details.created_by,
            event.clone(),
        );
        details.check_in_date = existing.details.check_in_date;
        details.history = existing.details.history.clone();
        details.history.push(event);

        let record = NumberRecord {
            id: *id,
            details,
        };
        let batch = WriteBatch::new().put(
            collections::NUMBERS,
            record.id.to_string(),
            serde_json::to_value(&record)?,
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Updated Number",
                format!("Updated details for number {}", record.details.mobile),
            )
            .await?;
        self.commit(batch).await?;
        Ok(record)
    }

    /// Changes RTS status. Flipping to RTS clears the RTS date; an optional
    /// note is appended to the number's notes.
    pub async fn update_status(
        &self,
        actor: &Actor,
        id: &NumberId,
        status: RtsStatus,
        rts_date: Option<DateTime<Utc>>,
        note: Option<String>,
    ) -> Result<()> {
        let numbers = self.numbers().await?;
        let num = Self::find(&numbers, id)?;

        let effective_date = match status {
            RtsStatus::Rts => None,
            RtsStatus::NonRts => rts_date,
        };
        let date_text = effective_date
            .map(|d| format!(" with RTS date {}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        let note_text = note.as_deref().unwrap_or_default();
        let event = LifecycleEvent::new(
            "RTS Status Changed",
            format!("Status changed to {status}{date_text}. {note_text}")
                .trim()
                .to_string(),
            &actor.display_name,
        );

        let mut patch = json!({ "status": status, "rtsDate": effective_date });
        if let Some(note) = note.filter(|n| !n.is_empty()) {
            let combined = match &num.details.notes {
                Some(existing) if !existing.is_empty() => format!("{existing}\n{note}"),
                _ => note,
            };
            patch["notes"] = json!(combined);
        }

        let batch = WriteBatch::new().merge_with_history(
            collections::NUMBERS,
            id.to_string(),
            patch,
            vec![event_value(&event)?],
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Updated RTS Status",
                format!("Marked {} as {status}", num.details.mobile),
            )
            .await?;
        self.commit(batch).await
    }

    /// Sets upload status on one or more numbers.
    pub async fn update_upload_status(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        upload_status: UploadStatus,
    ) -> Result<()> {
        let numbers = self.numbers().await?;
        let targets = Self::find_all(&numbers, ids)?;
        let event = LifecycleEvent::new(
            "Upload Status Changed",
            format!("Upload status changed to {upload_status}."),
            &actor.display_name,
        );

        let mut batch = WriteBatch::new();
        for target in &targets {
            batch = batch.merge_with_history(
                collections::NUMBERS,
                target.id.to_string(),
                json!({ "uploadStatus": upload_status }),
                vec![event_value(&event)?],
            );
        }

        let affected: Vec<String> = targets
            .iter()
            .map(|n| n.details.mobile.to_string())
            .collect();
        let (action, description) = if targets.len() == 1 {
            (
                "Updated Upload Status",
                format!("Set upload status for {} to {upload_status}", affected[0]),
            )
        } else {
            (
                "Bulk Updated Upload Status",
                detailed_description(
                    &format!("Updated upload status to {upload_status} for"),
                    &affected,
                ),
            )
        };
        let batch = self.with_activity(batch, actor, action, description).await?;
        self.commit(batch).await
    }

    /// Assigns numbers to an employee and moves them to a location.
    pub async fn assign_numbers(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        employee_name: &str,
        location: &LocationUpdate,
    ) -> Result<()> {
        let numbers = self.numbers().await?;
        let targets = Self::find_all(&numbers, ids)?;
        let event = LifecycleEvent::new(
            "Assigned",
            format!(
                "Assigned to {employee_name} and moved to {}.",
                location.current_location
            ),
            &actor.display_name,
        );

        let mut batch = WriteBatch::new();
        for target in &targets {
            batch = batch.merge_with_history(
                collections::NUMBERS,
                target.id.to_string(),
                json!({
                    "assignedTo": employee_name,
                    "name": employee_name,
                    "locationType": location.location_type,
                    "currentLocation": location.current_location,
                }),
                vec![event_value(&event)?],
            );
        }

        let affected: Vec<String> = targets
            .iter()
            .map(|n| n.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Assigned Numbers",
                detailed_description(&format!("Assigned to {employee_name}:"), &affected),
            )
            .await?;
        self.commit(batch).await
    }

    /// Moves numbers to a location without changing assignment.
    pub async fn update_location(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        location: &LocationUpdate,
    ) -> Result<()> {
        let numbers = self.numbers().await?;
        let targets = Self::find_all(&numbers, ids)?;
        let event = LifecycleEvent::new(
            "Location Updated",
            format!("Location changed to {}.", location.current_location),
            &actor.display_name,
        );

        let mut batch = WriteBatch::new();
        for target in &targets {
            batch = batch.merge_with_history(
                collections::NUMBERS,
                target.id.to_string(),
                json!({
                    "locationType": location.location_type,
                    "currentLocation": location.current_location,
                }),
                vec![event_value(&event)?],
            );
        }

        let affected: Vec<String> = targets
            .iter()
            .map(|n| n.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Updated Number Location",
                detailed_description(
                    &format!("Updated location to {} for", location.current_location),
                    &affected,
                ),
            )
            .await?;
        self.commit(batch).await
    }

    /// Records that a SIM was physically checked in at its location.
    pub async fn check_in(&self, actor: &Actor, id: &NumberId) -> Result<()> {
        let numbers = self.numbers().await?;
        let num = Self::find(&numbers, id)?;
        let event = LifecycleEvent::new(
            "Checked In",
            format!("SIM Checked In at {}.", num.details.current_location),
            &actor.display_name,
        );

        let batch = WriteBatch::new().merge_with_history(
            collections::NUMBERS,
            id.to_string(),
            json!({ "checkInDate": Utc::now() }),
            vec![event_value(&event)?],
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Checked In Number",
                format!("Checked in SIM number {}.", num.details.mobile),
            )
            .await?;
        self.commit(batch).await
    }

    /// Sets the safe-custody date on one or more COCP numbers.
    pub async fn update_safe_custody(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        new_date: DateTime<Utc>,
    ) -> Result<()> {
        let numbers = self.numbers().await?;
        let targets = Self::find_all(&numbers, ids)?;
        let event = LifecycleEvent::new(
            "COCP Date Changed",
            format!("Safe Custody Date changed to {}.", new_date.format("%Y-%m-%d")),
            &actor.display_name,
        );

        let mut batch = WriteBatch::new();
        for target in &targets {
            batch = batch.merge_with_history(
                collections::NUMBERS,
                target.id.to_string(),
                json!({ "safeCustodyDate": new_date }),
                vec![event_value(&event)?],
            );
        }

        let affected: Vec<String> = targets
            .iter()
            .map(|n| n.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Updated Safe Custody Date",
                detailed_description(
                    &format!(
                        "Updated Safe Custody Date to {} for",
                        new_date.format("%Y-%m-%d")
                    ),
                    &affected,
                ),
            )
            .await?;
        self.commit(batch).await
    }

    /// Sets bill date and PD-bill flag on one or more postpaid numbers.
    pub async fn update_postpaid(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        bill_date: DateTime<Utc>,
        pd_bill: PdBill,
    ) -> Result<()> {
        let numbers = self.numbers().await?;
        let targets = Self::find_all(&numbers, ids)?;
        let event = LifecycleEvent::new(
            "Postpaid Details Updated",
            format!(
                "Bill Date set to {}, PD Bill set to {pd_bill}.",
                bill_date.format("%Y-%m-%d")
            ),
            &actor.display_name,
        );

        let mut batch = WriteBatch::new();
        for target in &targets {
            batch = batch.merge_with_history(
                collections::NUMBERS,
                target.id.to_string(),
                json!({ "billDate": bill_date, "pdBill": pd_bill }),
                vec![event_value(&event)?],
            );
        }

        let affected: Vec<String> = targets
            .iter()
            .map(|n| n.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Updated Postpaid Details",
                detailed_description("Updated bill details for", &affected),
            )
            .await?;
        self.commit(batch).await
    }

    /// Moves numbers to the deleted archive with a mandatory reason.
    /// Admin only.
    pub async fn delete_numbers(
        &self,
        actor: &Actor,
        ids: &[NumberId],
        reason: &str,
    ) -> Result<Vec<DeletedNumberRecord>> {
        if !actor.is_admin() {
            return Err(Error::PermissionDenied(
                "only admins can delete number records".to_string(),
            ));
        }
        if reason.trim().is_empty() {
            return Err(Error::validation("a deletion reason is required"));
        }

        let numbers = self.numbers().await?;
        let targets = Self::find_all(&numbers, ids)?;

        let mut batch = WriteBatch::new();
        let mut archived = Vec::with_capacity(targets.len());
        for target in &targets {
            let event = LifecycleEvent::new(
                "Deleted",
                format!("Deleted from inventory: {}.", reason.trim()),
                &actor.display_name,
            );
            let mut details = target.details.clone();
            details.history.push(event);

            let entry = DeletedNumberRecord {
                id: DeletedNumberId::generate(),
                original_id: target.id,
                original_sr_no: details.sr_no,
                mobile: details.mobile.clone(),
                sum: details.sum,
                deletion_reason: reason.trim().to_string(),
                deleted_by: actor.display_name.clone(),
                deleted_at: Utc::now(),
                original_number: details,
            };
            batch = batch
                .put(
                    collections::DELETED_NUMBERS,
                    entry.id.to_string(),
                    serde_json::to_value(&entry)?,
                )
                .delete(collections::NUMBERS, target.id.to_string());
            archived.push(entry);
        }

        let affected: Vec<String> = archived.iter().map(|e| e.mobile.to_string()).collect();
        let batch = self
            .with_activity(
                batch,
                actor,
                "Deleted Numbers",
                detailed_description("Moved to deleted archive:", &affected),
            )
            .await?;
        self.commit(batch).await?;
        info!(count = archived.len(), actor = %actor.display_name, "archived numbers");
        Ok(archived)
    }

    /// Restores an archived number back to inventory.
    ///
    /// # Errors
    ///
    /// Rejects if the mobile has since reappeared in a live collection.
    pub async fn restore_deleted(
        &self,
        actor: &Actor,
        id: &DeletedNumberId,
    ) -> Result<NumberRecord> {
        let archive: Vec<DeletedNumberRecord> =
            self.registry().fetch(collections::DELETED_NUMBERS).await?;
        let entry = archive
            .iter()
            .find(|e| e.id == *id)
            .ok_or_else(|| Error::resource_not_found("deleted number", id))?;

        if self
            .registry()
            .is_duplicate(entry.mobile.as_str(), None)
            .await?
        {
            return Err(Error::duplicate(entry.mobile.as_str()));
        }

        let event = LifecycleEvent::new(
            "Restored",
            "Number restored from the deleted archive.",
            &actor.display_name,
        );
        let mut details = entry.original_number.clone();
        details.history.push(event);

        let record = NumberRecord {
            id: NumberId::generate(),
            details,
        };
        let batch = WriteBatch::new()
            .put(
                collections::NUMBERS,
                record.id.to_string(),
                serde_json::to_value(&record)?,
            )
            .delete(collections::DELETED_NUMBERS, id.to_string());
        let batch = self
            .with_activity(
                batch,
                actor,
                "Restored Number",
                format!("Restored {} from the deleted archive.", record.details.mobile),
            )
            .await?;
        self.commit(batch).await?;
        Ok(record)
    }
}
