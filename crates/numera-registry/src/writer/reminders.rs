//! Reminder tasks: creation, assignment, completion and deletion.

use chrono::Utc;
use serde::Serialize;
use serde_json::json;

use numera_core::{Error, ReminderId, Result, WriteBatch};

use crate::collections;
use crate::model::{
    Actor, NewReminder, NumberRecord, PreBookingRecord, Reminder, ReminderStatus,
};
use crate::store::next_sr_no;
use crate::writer::RegistryWriter;

/// Task-id prefix for safe-custody follow-ups.
pub(crate) const COCP_TASK_PREFIX: &str = "cocp-safecustody-";
/// Task-id prefix for pre-booked RTS follow-ups.
pub(crate) const PREBOOKED_TASK_PREFIX: &str = "prebooked-rts-";

/// Why a reminder could not be marked done, when it couldn't. System
/// reminders stay open until the condition they track is actually resolved:
/// a safe-custody reminder needs the custody date pushed into the future, a
/// pre-booked reminder needs the booking sold.
#[must_use]
pub fn mark_done_block_reason(
    reminder: &Reminder,
    numbers: &[NumberRecord],
    prebookings: &[PreBookingRecord],
) -> Option<String> {
    let task_id = reminder.task_id.as_deref()?;

    if let Some(number_id) = task_id.strip_prefix(COCP_TASK_PREFIX) {
        let number = numbers.iter().find(|n| n.id.to_string() == number_id)?;
        let due = number.details.safe_custody_date?;
        if due.date_naive() <= Utc::now().date_naive() {
            return Some(format!(
                "The Safe Custody Date for {} has not been updated to a future date.",
                number.details.mobile
            ));
        }
        return None;
    }

    if let Some(booking_id) = task_id.strip_prefix(PREBOOKED_TASK_PREFIX) {
        let booking = prebookings.iter().find(|b| b.id.to_string() == booking_id)?;
        return Some(format!(
            "The Pre-Booked number {} has not been marked as sold yet.",
            booking.mobile
        ));
    }

    None
}

/// One reminder a bulk completion left untouched, and why.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedReminder {
    /// The reminder left pending.
    pub id: ReminderId,
    /// Its task name, for reporting.
    pub task_name: String,
    /// The blocking condition.
    pub reason: String,
}

/// Outcome of a bulk mark-done: what completed and what was skipped.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDoneReport {
    /// Reminders that were marked done.
    pub completed: Vec<ReminderId>,
    /// Reminders skipped because their condition is unresolved.
    pub skipped: Vec<SkippedReminder>,
}

impl RegistryWriter {
    async fn reminders(&self) -> Result<Vec<Reminder>> {
        self.registry().fetch(collections::REMINDERS).await
    }

    fn find_reminder<'a>(reminders: &'a [Reminder], id: &ReminderId) -> Result<&'a Reminder> {
        reminders
            .iter()
            .find(|r| r.id == *id)
            .ok_or_else(|| Error::resource_not_found("reminder", id))
    }

    /// Creates a reminder by hand.
    pub async fn add_reminder(&self, actor: &Actor, new: NewReminder) -> Result<Reminder> {
        if new.assigned_to.is_empty() {
            return Err(Error::validation("a reminder needs at least one assignee"));
        }
        let reminders = self.reminders().await?;
        let reminder = Reminder {
            id: ReminderId::generate(),
            sr_no: next_sr_no(reminders.iter().map(|r| r.sr_no)),
            task_id: None,
            task_name: new.task_name,
            assigned_to: new.assigned_to,
            status: ReminderStatus::Pending,
            due_date: new.due_date,
            created_by: actor.uid.clone(),
            completion_date: None,
            notes: None,
        };

        let batch = WriteBatch::new().put(
            collections::REMINDERS,
            reminder.id.to_string(),
            serde_json::to_value(&reminder)?,
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Added Reminder",
                format!("Added reminder: {}", reminder.task_name),
            )
            .await?;
        self.commit(batch).await?;
        Ok(reminder)
    }

    /// Replaces the assignee list on one or more reminders.
    pub async fn assign_reminders(
        &self,
        actor: &Actor,
        ids: &[ReminderId],
        assignees: &[String],
    ) -> Result<()> {
        if assignees.is_empty() {
            return Err(Error::validation("a reminder needs at least one assignee"));
        }
        let reminders = self.reminders().await?;
        let mut batch = WriteBatch::new();
        let mut names = Vec::with_capacity(ids.len());
        for id in ids {
            let reminder = Self::find_reminder(&reminders, id)?;
            names.push(reminder.task_name.clone());
            batch = batch.merge(
                collections::REMINDERS,
                id.to_string(),
                json!({ "assignedTo": assignees }),
            );
        }

        let batch = self
            .with_activity(
                batch,
                actor,
                "Assigned Reminders",
                format!(
                    "Assigned {} reminder(s) to {}",
                    names.len(),
                    assignees.join(", ")
                ),
            )
            .await?;
        self.commit(batch).await
    }

    /// Marks one reminder done, with an optional completion note.
    ///
    /// # Errors
    ///
    /// System reminders whose tracked condition is unresolved are rejected
    /// with the blocking reason as a precondition failure.
    pub async fn mark_reminder_done(
        &self,
        actor: &Actor,
        id: &ReminderId,
        note: Option<String>,
    ) -> Result<()> {
        let reminders = self.reminders().await?;
        let reminder = Self::find_reminder(&reminders, id)?;
        let numbers: Vec<NumberRecord> = self.registry().fetch(collections::NUMBERS).await?;
        let prebookings: Vec<PreBookingRecord> =
            self.registry().fetch(collections::PREBOOKINGS).await?;

        if let Some(reason) = mark_done_block_reason(reminder, &numbers, &prebookings) {
            return Err(Error::precondition(reason));
        }

        let mut patch = json!({
            "status": ReminderStatus::Done,
            "completionDate": Utc::now(),
        });
        if let Some(note) = note.filter(|n| !n.trim().is_empty()) {
            patch["notes"] = json!(note);
        }

        let batch =
            WriteBatch::new().merge(collections::REMINDERS, id.to_string(), patch);
        let batch = self
            .with_activity(
                batch,
                actor,
                "Marked Task Done",
                format!("Completed task: {}", reminder.task_name),
            )
            .await?;
        self.commit(batch).await
    }

    /// Marks many reminders done at once, skipping the ones whose tracked
    /// condition is unresolved instead of failing the batch.
    pub async fn mark_reminders_done_bulk(
        &self,
        actor: &Actor,
        ids: &[ReminderId],
    ) -> Result<BulkDoneReport> {
        let reminders = self.reminders().await?;
        let numbers: Vec<NumberRecord> = self.registry().fetch(collections::NUMBERS).await?;
        let prebookings: Vec<PreBookingRecord> =
            self.registry().fetch(collections::PREBOOKINGS).await?;

        let mut report = BulkDoneReport::default();
        let mut batch = WriteBatch::new();
        for id in ids {
            let reminder = Self::find_reminder(&reminders, id)?;
            if let Some(reason) = mark_done_block_reason(reminder, &numbers, &prebookings) {
                report.skipped.push(SkippedReminder {
                    id: *id,
                    task_name: reminder.task_name.clone(),
                    reason,
                });
                continue;
            }
            batch = batch.merge(
                collections::REMINDERS,
                id.to_string(),
                json!({
                    "status": ReminderStatus::Done,
                    "completionDate": Utc::now(),
                }),
            );
            report.completed.push(*id);
        }

        if report.completed.is_empty() {
            return Ok(report);
        }
        let batch = self
            .with_activity(
                batch,
                actor,
                "Bulk Marked Tasks Done",
                format!("Completed {} task(s)", report.completed.len()),
            )
            .await?;
        self.commit(batch).await?;
        Ok(report)
    }

    /// Deletes one reminder. Admin only.
    pub async fn delete_reminder(&self, actor: &Actor, id: &ReminderId) -> Result<()> {
        if !actor.is_admin() {
            return Err(Error::PermissionDenied(
                "only admins can delete reminders".to_string(),
            ));
        }
        let reminders = self.reminders().await?;
        let reminder = Self::find_reminder(&reminders, id)?;

        let batch = WriteBatch::new().delete(collections::REMINDERS, id.to_string());
        let batch = self
            .with_activity(
                batch,
                actor,
                "Deleted Reminder",
                format!("Deleted task: {}", reminder.task_name),
            )
            .await?;
        self.commit(batch).await
    }

    /// Deletes many reminders at once. Admin only.
    pub async fn delete_reminders(&self, actor: &Actor, ids: &[ReminderId]) -> Result<()> {
        if !actor.is_admin() {
            return Err(Error::PermissionDenied(
                "only admins can delete reminders".to_string(),
            ));
        }
        let reminders = self.reminders().await?;
        let mut batch = WriteBatch::new();
        for id in ids {
            Self::find_reminder(&reminders, id)?;
            batch = batch.delete(collections::REMINDERS, id.to_string());
        }
        let batch = self
            .with_activity(
                batch,
                actor,
                "Bulk Deleted Reminders",
                format!("Deleted {} reminder(s).", ids.len()),
            )
            .await?;
        self.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testutil::{admin, new_number, template, writer};
    use chrono::Duration;
    use numera_core::Msisdn;

    fn new_reminder(name: &str) -> NewReminder {
        NewReminder {
            task_name: name.to_string(),
            assigned_to: vec!["Asha".to_string()],
            due_date: Utc::now() + Duration::days(1),
        }
    }

    #[tokio::test]
    async fn add_and_complete_plain_reminder() {
        let (writer, registry) = writer().await;
        let reminder = writer
            .add_reminder(&admin(), new_reminder("Call vendor"))
            .await
            .unwrap();
        assert_eq!(reminder.sr_no, 1);
        assert_eq!(reminder.status, ReminderStatus::Pending);

        writer
            .mark_reminder_done(&admin(), &reminder.id, Some("done by phone".into()))
            .await
            .unwrap();

        registry.refresh_all().await.unwrap();
        let stored = &registry.reminders()[0];
        assert_eq!(stored.status, ReminderStatus::Done);
        assert!(stored.completion_date.is_some());
        assert_eq!(stored.notes.as_deref(), Some("done by phone"));
    }

    #[tokio::test]
    async fn stale_custody_date_blocks_completion() {
        let (writer, registry) = writer().await;
        let mut new = new_number("9876543210");
        new.template.number_type = crate::model::NumberType::Cocp;
        new.template.safe_custody_date = Some(Utc::now() - Duration::days(3));
        new.template.account_name = Some("Acme Telecom".to_string());
        let number = writer.add_number(&admin(), new).await.unwrap();

        let done = writer.generate_system_reminders().await.unwrap();
        assert_eq!(done, 1);

        registry.refresh_all().await.unwrap();
        let reminder = registry.reminders()[0].clone();
        assert_eq!(
            reminder.task_id.as_deref(),
            Some(format!("{COCP_TASK_PREFIX}{}", number.id).as_str())
        );

        let err = writer
            .mark_reminder_done(&admin(), &reminder.id, None)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "precondition failed: The Safe Custody Date for {} has not been updated to a future date.",
                number.details.mobile
            )
        );

        // Pushing the date forward unblocks it.
        writer
            .update_safe_custody(&admin(), &[number.id], Utc::now() + Duration::days(30))
            .await
            .unwrap();
        writer
            .mark_reminder_done(&admin(), &reminder.id, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bulk_done_completes_eligible_and_reports_skips() {
        let (writer, registry) = writer().await;

        // Three plain reminders, all eligible.
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            ids.push(writer.add_reminder(&admin(), new_reminder(name)).await.unwrap().id);
        }

        // Two blocked system reminders: one stale-custody, one pre-booked.
        let mut cocp = new_number("9000000001");
        cocp.template.number_type = crate::model::NumberType::Cocp;
        cocp.template.safe_custody_date = Some(Utc::now() - Duration::days(1));
        cocp.template.account_name = Some("Acme Telecom".to_string());
        writer.add_number(&admin(), cocp).await.unwrap();

        let parked = writer
            .add_numbers_bulk(&admin(), template(), vec![Msisdn::new("9000000002").unwrap()])
            .await
            .unwrap();
        writer.pre_book(&admin(), &[parked[0].id]).await.unwrap();

        writer.generate_system_reminders().await.unwrap();
        registry.refresh_all().await.unwrap();
        for reminder in registry.reminders() {
            if reminder.task_id.is_some() {
                ids.push(reminder.id);
            }
        }
        assert_eq!(ids.len(), 5);

        let report = writer
            .mark_reminders_done_bulk(&admin(), &ids)
            .await
            .unwrap();
        assert_eq!(report.completed.len(), 3);
        assert_eq!(report.skipped.len(), 2);
        assert!(report
            .skipped
            .iter()
            .any(|s| s.reason.contains("Safe Custody Date")));
        assert!(report
            .skipped
            .iter()
            .any(|s| s.reason.contains("has not been marked as sold yet")));

        registry.refresh_all().await.unwrap();
        let done = registry
            .reminders()
            .iter()
            .filter(|r| r.status == ReminderStatus::Done)
            .count();
        assert_eq!(done, 3);
    }

    #[tokio::test]
    async fn delete_many_reminders() {
        let (writer, registry) = writer().await;
        let a = writer.add_reminder(&admin(), new_reminder("a")).await.unwrap();
        let b = writer.add_reminder(&admin(), new_reminder("b")).await.unwrap();

        writer
            .delete_reminders(&admin(), &[a.id, b.id])
            .await
            .unwrap();
        registry.refresh_all().await.unwrap();
        assert!(registry.reminders().is_empty());
        assert_eq!(
            registry.activities().last().unwrap().action,
            "Bulk Deleted Reminders"
        );
    }
}
