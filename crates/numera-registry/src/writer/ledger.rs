//! Vendor payments, audit-feed pruning and user administration.

use numera_core::{ActivityId, Error, PaymentId, Result, WriteBatch};

use crate::collections;
use crate::model::{Activity, Actor, NewPayment, PaymentRecord, UserProfile};
use crate::store::next_sr_no;
use crate::writer::RegistryWriter;

impl RegistryWriter {
    /// Records a payment received from a vendor.
    pub async fn add_payment(&self, actor: &Actor, new: NewPayment) -> Result<PaymentRecord> {
        if new.amount <= 0.0 {
            return Err(Error::validation("payment amount must be positive"));
        }
        if new.vendor_name.trim().is_empty() {
            return Err(Error::validation("vendor name is required"));
        }

        let payments: Vec<PaymentRecord> = self.registry().fetch(collections::PAYMENTS).await?;
        let record = PaymentRecord {
            id: PaymentId::generate(),
            sr_no: next_sr_no(payments.iter().map(|p| p.sr_no)),
            vendor_name: new.vendor_name,
            amount: new.amount,
            payment_date: new.payment_date,
            notes: new.notes,
            created_by: actor.uid.clone(),
        };

        let batch = WriteBatch::new().put(
            collections::PAYMENTS,
            record.id.to_string(),
            serde_json::to_value(&record)?,
        );
        let batch = self
            .with_activity(
                batch,
                actor,
                "Received Payment",
                format!("Received ₹{} from {}", record.amount, record.vendor_name),
            )
            .await?;
        self.commit(batch).await?;
        Ok(record)
    }

    /// Removes entries from the audit feed. Admin only.
    pub async fn delete_activities(&self, actor: &Actor, ids: &[ActivityId]) -> Result<()> {
        if !actor.is_admin() {
            return Err(Error::PermissionDenied(
                "only admins can delete activity entries".to_string(),
            ));
        }
        let activities: Vec<Activity> = self.registry().fetch(collections::ACTIVITIES).await?;

        let mut batch = WriteBatch::new();
        for id in ids {
            if !activities.iter().any(|a| a.id == *id) {
                return Err(Error::resource_not_found("activity", id));
            }
            batch = batch.delete(collections::ACTIVITIES, id.to_string());
        }
        let batch = self
            .with_activity(
                batch,
                actor,
                "Deleted Activities",
                format!("Deleted {} activity record(s)", ids.len()),
            )
            .await?;
        self.commit(batch).await
    }

    /// Removes a user profile. Admin only, and never the caller's own.
    pub async fn delete_user(&self, actor: &Actor, uid: &str) -> Result<()> {
        if !actor.is_admin() {
            return Err(Error::PermissionDenied(
                "only admins can delete users".to_string(),
            ));
        }
        if actor.uid == uid {
            return Err(Error::PermissionDenied(
                "users cannot delete their own account".to_string(),
            ));
        }
        let users: Vec<UserProfile> = self.registry().fetch(collections::USERS).await?;
        let user = users
            .iter()
            .find(|u| u.uid == uid)
            .ok_or_else(|| Error::resource_not_found("user", uid))?;

        let batch = WriteBatch::new().delete(collections::USERS, uid.to_string());
        let batch = self
            .with_activity(
                batch,
                actor,
                "Deleted User",
                format!("Deleted user account for {}", user.display_name),
            )
            .await?;
        self.commit(batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;
    use crate::writer::testutil::{admin, employee, new_number, writer};
    use chrono::Utc;
    use numera_core::DocumentStore;
    use serde_json::json;

    #[tokio::test]
    async fn payment_validates_and_lands_in_register() {
        let (writer, registry) = writer().await;

        let err = writer
            .add_payment(
                &admin(),
                NewPayment {
                    vendor_name: "numberwale".to_string(),
                    amount: 0.0,
                    payment_date: Utc::now(),
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let record = writer
            .add_payment(
                &admin(),
                NewPayment {
                    vendor_name: "numberwale".to_string(),
                    amount: 2500.0,
                    payment_date: Utc::now(),
                    notes: Some("settlement".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(record.sr_no, 1);

        registry.refresh_all().await.unwrap();
        assert_eq!(registry.payments().len(), 1);
        assert_eq!(
            registry.activities().last().unwrap().action,
            "Received Payment"
        );
    }

    #[tokio::test]
    async fn delete_activities_is_admin_only() {
        let (writer, registry) = writer().await;
        writer
            .add_number(&admin(), new_number("9876543210"))
            .await
            .unwrap();
        registry.refresh_all().await.unwrap();
        let activity_id = registry.activities()[0].id;

        let err = writer
            .delete_activities(&employee(), &[activity_id])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        writer
            .delete_activities(&admin(), &[activity_id])
            .await
            .unwrap();
        registry.refresh_all().await.unwrap();
        // The deletion itself was logged.
        let activities = registry.activities();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].action, "Deleted Activities");
    }

    #[tokio::test]
    async fn users_cannot_delete_themselves() {
        let (writer, registry) = writer().await;
        let acting = admin();
        registry
            .backend()
            .apply(
                WriteBatch::new()
                    .put(
                        collections::USERS,
                        acting.uid.clone(),
                        json!({
                            "uid": acting.uid,
                            "email": "asha@example.com",
                            "displayName": acting.display_name,
                            "role": Role::Admin,
                        }),
                    )
                    .put(
                        collections::USERS,
                        "u-emp".to_string(),
                        json!({
                            "uid": "u-emp",
                            "email": "ravi@example.com",
                            "displayName": "Ravi",
                            "role": Role::Employee,
                        }),
                    ),
            )
            .await
            .unwrap();

        let err = writer.delete_user(&acting, &acting.uid).await.unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        writer.delete_user(&acting, "u-emp").await.unwrap();
        registry.refresh_all().await.unwrap();
        assert_eq!(registry.users().len(), 1);
    }
}
