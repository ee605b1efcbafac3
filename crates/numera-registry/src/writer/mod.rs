//! Mutation operations over the registry.
//!
//! Every operation follows the same recipe: read the current state straight
//! from the backend, validate, compose the changed documents together with
//! their lifecycle events and one audit-feed activity, and apply the whole
//! thing as a single atomic batch. On rejection nothing is applied.

mod ledger;
mod maintenance;
mod numbers;
mod reminders;
mod trades;

pub use numbers::LocationUpdate;
pub use reminders::{mark_done_block_reason, BulkDoneReport, SkippedReminder};

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use numera_core::observability::registry_span;
use numera_core::{ActivityId, DocumentStore, LifecycleEvent, Result, WriteBatch};
use tracing::Instrument;

use crate::collections;
use crate::model::{Activity, Actor};
use crate::store::{next_sr_no, RegistryStore};

/// Executes registry mutations as atomic batches.
#[derive(Clone)]
pub struct RegistryWriter {
    store: Arc<dyn DocumentStore>,
    registry: Arc<RegistryStore>,
}

impl RegistryWriter {
    /// Creates a writer over the registry's backend.
    #[must_use]
    pub fn new(registry: Arc<RegistryStore>) -> Self {
        Self {
            store: registry.backend(),
            registry,
        }
    }

    /// The registry this writer reads through.
    #[must_use]
    pub fn registry(&self) -> &Arc<RegistryStore> {
        &self.registry
    }

    /// Appends an audit-feed activity to the batch.
    pub(crate) async fn with_activity(
        &self,
        batch: WriteBatch,
        actor: &Actor,
        action: &str,
        description: String,
    ) -> Result<WriteBatch> {
        let existing: Vec<Activity> = self
            .registry
            .fetch(collections::ACTIVITIES)
            .instrument(registry_span(action, &actor.display_name))
            .await?;
        let activity = Activity {
            id: ActivityId::generate(),
            sr_no: next_sr_no(existing.iter().map(|a| a.sr_no)),
            employee_name: actor.display_name.clone(),
            action: action.to_string(),
            description,
            timestamp: Utc::now(),
            created_by: actor.uid.clone(),
        };
        let id = activity.id.to_string();
        Ok(batch.put(collections::ACTIVITIES, id, serde_json::to_value(&activity)?))
    }

    pub(crate) async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.store.apply(batch).await
    }
}

impl std::fmt::Debug for RegistryWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryWriter").finish_non_exhaustive()
    }
}

/// `"<base> N numbers: a, b, c."` for bulk activity descriptions.
pub(crate) fn detailed_description(base: &str, mobiles: &[String]) -> String {
    if mobiles.is_empty() {
        return format!("{base} 0 numbers.");
    }
    format!("{base} {} numbers: {}.", mobiles.len(), mobiles.join(", "))
}

pub(crate) fn event_value(event: &LifecycleEvent) -> Result<Value> {
    Ok(serde_json::to_value(event)?)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use crate::model::{
        LocationType, NewNumber, NumberTemplate, NumberType, OwnershipType, Role, RtsStatus,
        UploadStatus,
    };
    use numera_core::{MemoryStore, Msisdn};

    pub fn admin() -> Actor {
        Actor {
            uid: "u-admin".to_string(),
            display_name: "Asha".to_string(),
            role: Role::Admin,
        }
    }

    pub fn employee() -> Actor {
        Actor {
            uid: "u-emp".to_string(),
            display_name: "Ravi".to_string(),
            role: Role::Employee,
        }
    }

    pub fn template() -> NumberTemplate {
        NumberTemplate {
            status: RtsStatus::Rts,
            rts_date: None,
            upload_status: UploadStatus::Pending,
            number_type: NumberType::Prepaid,
            purchase_from: "numberwale".to_string(),
            purchase_price: 500.0,
            sale_price: None,
            purchase_date: Utc::now(),
            current_location: "Main Store".to_string(),
            location_type: LocationType::Store,
            assigned_to: None,
            notes: None,
            ownership_type: OwnershipType::Individual,
            partner_name: None,
            account_name: None,
            safe_custody_date: None,
            bill_date: None,
            pd_bill: None,
        }
    }

    pub fn new_number(mobile: &str) -> NewNumber {
        NewNumber {
            mobile: Msisdn::new(mobile).unwrap(),
            template: template(),
        }
    }

    pub async fn writer() -> (RegistryWriter, Arc<RegistryStore>) {
        let backend = Arc::new(MemoryStore::new());
        let registry = Arc::new(RegistryStore::new(backend));
        let writer = RegistryWriter::new(Arc::clone(&registry));
        (writer, registry)
    }
}
