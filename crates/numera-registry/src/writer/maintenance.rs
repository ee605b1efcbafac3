//! Scheduled maintenance: RTS flips, system reminders and retention sweeps.
//!
//! These run under the system actor and are idempotent, so the scheduler can
//! invoke them on every tick without duplicating work.

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::info;

use numera_core::{LifecycleEvent, ReminderId, Result, WriteBatch};

use crate::collections;
use crate::model::{
    Actor, NumberRecord, PreBookingRecord, Reminder, ReminderStatus, Role, RtsStatus, UserProfile,
};
use crate::store::next_sr_no;
use crate::writer::reminders::{COCP_TASK_PREFIX, PREBOOKED_TASK_PREFIX};
use crate::writer::{detailed_description, event_value, RegistryWriter};

/// Completed reminders are kept this long before the sweep removes them.
const DONE_RETENTION_DAYS: i64 = 7;

impl RegistryWriter {
    /// Flips Non-RTS numbers whose RTS date has arrived to RTS status.
    ///
    /// Returns the number of records flipped.
    pub async fn flip_due_rts(&self) -> Result<usize> {
        let system = Actor::system();
        let today = Utc::now().date_naive();
        let numbers: Vec<NumberRecord> = self.registry().fetch(collections::NUMBERS).await?;

        let due: Vec<&NumberRecord> = numbers
            .iter()
            .filter(|n| {
                n.details.status == RtsStatus::NonRts
                    && n.details
                        .rts_date
                        .is_some_and(|d| d.date_naive() <= today)
            })
            .collect();
        if due.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for number in &due {
            let event = LifecycleEvent::new(
                "RTS Status Changed",
                "Number automatically became RTS as per schedule.",
                &system.display_name,
            );
            batch = batch.merge_with_history(
                collections::NUMBERS,
                number.id.to_string(),
                json!({ "status": RtsStatus::Rts, "rtsDate": null }),
                vec![event_value(&event)?],
            );
        }

        let affected: Vec<String> = due
            .iter()
            .map(|n| n.details.mobile.to_string())
            .collect();
        let batch = self
            .with_activity(
                batch,
                &system,
                "Auto-updated to RTS",
                detailed_description("Automatically updated to RTS", &affected),
            )
            .await?;
        self.commit(batch).await?;
        info!(count = due.len(), "flipped due numbers to RTS");
        Ok(due.len())
    }

    /// Creates follow-up reminders for COCP numbers whose safe-custody date
    /// has lapsed and for pre-bookings whose underlying number is RTS.
    ///
    /// Each candidate gets a stable `task_id`, so reminders that already
    /// exist are never duplicated. Returns the number created.
    pub async fn generate_system_reminders(&self) -> Result<usize> {
        let system = Actor::system();
        let today = Utc::now().date_naive();
        let numbers: Vec<NumberRecord> = self.registry().fetch(collections::NUMBERS).await?;
        let prebookings: Vec<PreBookingRecord> =
            self.registry().fetch(collections::PREBOOKINGS).await?;
        let reminders: Vec<Reminder> = self.registry().fetch(collections::REMINDERS).await?;
        let users: Vec<UserProfile> = self.registry().fetch(collections::USERS).await?;

        let existing: std::collections::HashSet<&str> = reminders
            .iter()
            .filter_map(|r| r.task_id.as_deref())
            .collect();
        let admins: Vec<String> = users
            .into_iter()
            .filter(|u| u.role == Role::Admin)
            .map(|u| u.display_name)
            .collect();
        let mut sr_no = next_sr_no(reminders.iter().map(|r| r.sr_no));

        let mut batch = WriteBatch::new();
        let mut created = 0;

        for number in &numbers {
            let Some(custody) = number.details.safe_custody_date else {
                continue;
            };
            if custody.date_naive() > today {
                continue;
            }
            let task_id = format!("{COCP_TASK_PREFIX}{}", number.id);
            if existing.contains(task_id.as_str()) {
                continue;
            }
            let reminder = Reminder {
                id: ReminderId::generate(),
                sr_no,
                task_id: Some(task_id),
                task_name: format!(
                    "Update Safe Custody Date for {}",
                    number.details.mobile
                ),
                assigned_to: admins.clone(),
                status: ReminderStatus::Pending,
                due_date: custody,
                created_by: system.uid.clone(),
                completion_date: None,
                notes: None,
            };
            sr_no += 1;
            created += 1;
            batch = batch.put(
                collections::REMINDERS,
                reminder.id.to_string(),
                serde_json::to_value(&reminder)?,
            );
        }

        for booking in &prebookings {
            if booking.original_number.status != RtsStatus::Rts {
                continue;
            }
            let task_id = format!("{PREBOOKED_TASK_PREFIX}{}", booking.id);
            if existing.contains(task_id.as_str()) {
                continue;
            }
            let reminder = Reminder {
                id: ReminderId::generate(),
                sr_no,
                task_id: Some(task_id),
                task_name: format!("Mark Pre-Booked number {} as sold", booking.mobile),
                assigned_to: admins.clone(),
                status: ReminderStatus::Pending,
                due_date: booking.pre_booking_date,
                created_by: system.uid.clone(),
                completion_date: None,
                notes: None,
            };
            sr_no += 1;
            created += 1;
            batch = batch.put(
                collections::REMINDERS,
                reminder.id.to_string(),
                serde_json::to_value(&reminder)?,
            );
        }

        if created == 0 {
            return Ok(0);
        }
        self.commit(batch).await?;
        info!(count = created, "generated system reminders");
        Ok(created)
    }

    /// Deletes reminders completed more than a week ago.
    ///
    /// Returns the number deleted.
    pub async fn sweep_completed_reminders(&self) -> Result<usize> {
        let system = Actor::system();
        let cutoff = Utc::now() - Duration::days(DONE_RETENTION_DAYS);
        let reminders: Vec<Reminder> = self.registry().fetch(collections::REMINDERS).await?;

        let stale: Vec<&Reminder> = reminders
            .iter()
            .filter(|r| {
                r.status == ReminderStatus::Done
                    && r.completion_date.is_some_and(|d| d < cutoff)
            })
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for reminder in &stale {
            batch = batch.delete(collections::REMINDERS, reminder.id.to_string());
        }
        let batch = self
            .with_activity(
                batch,
                &system,
                "Auto-deleted reminders",
                format!(
                    "Deleted {} completed reminder(s) older than {DONE_RETENTION_DAYS} days",
                    stale.len()
                ),
            )
            .await?;
        self.commit(batch).await?;
        info!(count = stale.len(), "swept completed reminders");
        Ok(stale.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::testutil::{admin, new_number, writer};
    use numera_core::DocumentStore;

    #[tokio::test]
    async fn due_non_rts_numbers_flip_to_rts() {
        let (writer, registry) = writer().await;
        let mut due = new_number("9000000001");
        due.template.status = RtsStatus::NonRts;
        due.template.rts_date = Some(Utc::now() - Duration::days(1));
        let due = writer.add_number(&admin(), due).await.unwrap();

        let mut future = new_number("9000000002");
        future.template.status = RtsStatus::NonRts;
        future.template.rts_date = Some(Utc::now() + Duration::days(30));
        let future = writer.add_number(&admin(), future).await.unwrap();

        assert_eq!(writer.flip_due_rts().await.unwrap(), 1);

        registry.refresh_all().await.unwrap();
        let flipped = registry.number(&due.id).unwrap();
        assert_eq!(flipped.details.status, RtsStatus::Rts);
        assert_eq!(flipped.details.rts_date, None);
        let latest = flipped.details.history.latest().unwrap().clone();
        assert_eq!(latest.action, "RTS Status Changed");
        assert_eq!(
            latest.description,
            "Number automatically became RTS as per schedule."
        );
        assert_eq!(latest.performed_by, "System");

        let untouched = registry.number(&future.id).unwrap();
        assert_eq!(untouched.details.status, RtsStatus::NonRts);

        // Nothing left to flip on the next tick.
        assert_eq!(writer.flip_due_rts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn system_reminders_are_idempotent() {
        let (writer, registry) = writer().await;
        let mut cocp = new_number("9000000001");
        cocp.template.number_type = crate::model::NumberType::Cocp;
        cocp.template.safe_custody_date = Some(Utc::now() - Duration::days(2));
        cocp.template.account_name = Some("Acme Telecom".to_string());
        writer.add_number(&admin(), cocp).await.unwrap();

        let parked = writer
            .add_number(&admin(), new_number("9000000002"))
            .await
            .unwrap();
        writer.pre_book(&admin(), &[parked.id]).await.unwrap();

        assert_eq!(writer.generate_system_reminders().await.unwrap(), 2);
        assert_eq!(writer.generate_system_reminders().await.unwrap(), 0);

        registry.refresh_all().await.unwrap();
        assert_eq!(registry.reminders().len(), 2);
    }

    #[tokio::test]
    async fn sweep_only_removes_old_done_reminders() {
        let (writer, registry) = writer().await;
        let keep = writer
            .add_reminder(
                &admin(),
                crate::model::NewReminder {
                    task_name: "fresh".to_string(),
                    assigned_to: vec!["Asha".to_string()],
                    due_date: Utc::now(),
                },
            )
            .await
            .unwrap();
        writer
            .mark_reminder_done(&admin(), &keep.id, None)
            .await
            .unwrap();

        // Plant an old completed reminder directly in the backend.
        let old = Reminder {
            id: ReminderId::generate(),
            sr_no: 99,
            task_id: None,
            task_name: "stale".to_string(),
            assigned_to: vec!["Asha".to_string()],
            status: ReminderStatus::Done,
            due_date: Utc::now() - Duration::days(20),
            created_by: "u-admin".to_string(),
            completion_date: Some(Utc::now() - Duration::days(10)),
            notes: None,
        };
        registry
            .backend()
            .apply(WriteBatch::new().put(
                collections::REMINDERS,
                old.id.to_string(),
                serde_json::to_value(&old).unwrap(),
            ))
            .await
            .unwrap();

        assert_eq!(writer.sweep_completed_reminders().await.unwrap(), 1);

        registry.refresh_all().await.unwrap();
        let remaining = registry.reminders();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].task_name, "fresh");
        assert_eq!(
            registry.activities().last().unwrap().action,
            "Auto-deleted reminders"
        );
    }
}
