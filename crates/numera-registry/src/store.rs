//! The mirrored registry store.
//!
//! [`RegistryStore`] keeps typed in-memory snapshots of every collection,
//! fed by the document store's change notices. Snapshots serve the read
//! side (list endpoints, the history aggregator, the scheduler's scans);
//! the write side re-reads collections directly so serial numbers and
//! duplicate checks never act on a stale mirror.
//!
//! The mirror has an explicit lifecycle: [`RegistryStore::init`] performs
//! the initial load and spawns the refresh task; [`RegistryStore::shutdown`]
//! stops it.

use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use numera_core::{DocumentStore, Error, NumberId, Result};

use crate::collections;
use crate::model::{
    Activity, DealerPurchaseRecord, DeletedNumberRecord, NumberRecord, PaymentRecord,
    PreBookingRecord, Reminder, Role, SaleRecord, UserProfile,
};

/// Vendors offered by default in sale dropdowns, merged with past buyers.
/// Vendors always offered in buyer/seller pickers, merged with every buyer
/// seen in past sales.
pub const DEFAULT_VENDORS: &[&str] = &[
    "lifetimenumber",
    "vipnumberstore",
    "vipnumbershop",
    "numberwale",
    "numberspoint",
    "vipfancynumber",
    "numberatm",
    "numbersolution",
];

/// Next serial number for a collection: highest existing + 1, starting at 1.
pub fn next_sr_no(existing: impl IntoIterator<Item = u64>) -> u64 {
    existing.into_iter().max().unwrap_or(0) + 1
}

#[derive(Default)]
struct Snapshots {
    numbers: RwLock<Vec<NumberRecord>>,
    sales: RwLock<Vec<SaleRecord>>,
    prebookings: RwLock<Vec<PreBookingRecord>>,
    dealer_purchases: RwLock<Vec<DealerPurchaseRecord>>,
    deleted_numbers: RwLock<Vec<DeletedNumberRecord>>,
    reminders: RwLock<Vec<Reminder>>,
    activities: RwLock<Vec<Activity>>,
    payments: RwLock<Vec<PaymentRecord>>,
    users: RwLock<Vec<UserProfile>>,
}

/// Typed, subscription-fed view over the document store.
pub struct RegistryStore {
    store: Arc<dyn DocumentStore>,
    snapshots: Snapshots,
    mirror: StdMutex<Option<JoinHandle<()>>>,
}

impl RegistryStore {
    /// Creates a store over the given backend. Snapshots are empty until
    /// [`init`](Self::init) runs.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            snapshots: Snapshots::default(),
            mirror: StdMutex::new(None),
        }
    }

    /// The underlying document store.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store)
    }

    /// Loads every collection and spawns the refresh task.
    ///
    /// # Errors
    ///
    /// Fails if the initial load of any collection fails.
    pub async fn init(self: &Arc<Self>) -> Result<()> {
        self.refresh_all().await?;

        let mut rx = self.store.subscribe();
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notice) => {
                        if let Err(error) = this.refresh(&notice.collection).await {
                            warn!(collection = %notice.collection, %error, "snapshot refresh failed");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        debug!(missed, "change notices lagged; refreshing all collections");
                        if let Err(error) = this.refresh_all().await {
                            warn!(%error, "full snapshot refresh failed");
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        let mut mirror = self
            .mirror
            .lock()
            .map_err(|_| Error::internal("mirror lock poisoned"))?;
        if let Some(old) = mirror.replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Stops the refresh task. Snapshots keep their last contents.
    pub fn shutdown(&self) {
        if let Ok(mut mirror) = self.mirror.lock() {
            if let Some(handle) = mirror.take() {
                handle.abort();
            }
        }
    }

    /// Re-reads one collection into its snapshot.
    ///
    /// # Errors
    ///
    /// Fails if the backend list fails. Unknown collection names are ignored.
    pub async fn refresh(&self, collection: &str) -> Result<()> {
        match collection {
            collections::NUMBERS => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.numbers, records)
            }
            collections::SALES => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.sales, records)
            }
            collections::PREBOOKINGS => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.prebookings, records)
            }
            collections::DEALER_PURCHASES => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.dealer_purchases, records)
            }
            collections::DELETED_NUMBERS => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.deleted_numbers, records)
            }
            collections::REMINDERS => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.reminders, records)
            }
            collections::ACTIVITIES => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.activities, records)
            }
            collections::PAYMENTS => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.payments, records)
            }
            collections::USERS => {
                let records = self.fetch(collection).await?;
                self.write_snapshot(&self.snapshots.users, records)
            }
            other => {
                debug!(collection = other, "ignoring notice for unmirrored collection");
                Ok(())
            }
        }
    }

    /// Re-reads every collection.
    ///
    /// # Errors
    ///
    /// Fails on the first collection whose load fails.
    pub async fn refresh_all(&self) -> Result<()> {
        for collection in collections::ALL {
            self.refresh(collection).await?;
        }
        Ok(())
    }

    /// Lists and parses a collection straight from the backend, bypassing
    /// the snapshot. Documents that fail to parse are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Fails if the backend list fails.
    pub async fn fetch<T: DeserializeOwned>(&self, collection: &str) -> Result<Vec<T>> {
        let docs = self.store.list(collection).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            match serde_json::from_value::<T>(doc.data) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(collection, id = %doc.id, %error, "skipping unparseable document");
                }
            }
        }
        Ok(records)
    }

    fn write_snapshot<T>(&self, slot: &RwLock<Vec<T>>, records: Vec<T>) -> Result<()> {
        *slot
            .write()
            .map_err(|_| Error::internal("snapshot lock poisoned"))? = records;
        Ok(())
    }

    fn read_snapshot<T: Clone>(&self, slot: &RwLock<Vec<T>>) -> Vec<T> {
        slot.read().map(|v| v.clone()).unwrap_or_default()
    }

    /// Current inventory snapshot.
    #[must_use]
    pub fn numbers(&self) -> Vec<NumberRecord> {
        self.read_snapshot(&self.snapshots.numbers)
    }

    /// Current sales snapshot.
    #[must_use]
    pub fn sales(&self) -> Vec<SaleRecord> {
        self.read_snapshot(&self.snapshots.sales)
    }

    /// Current pre-bookings snapshot.
    #[must_use]
    pub fn prebookings(&self) -> Vec<PreBookingRecord> {
        self.read_snapshot(&self.snapshots.prebookings)
    }

    /// Current dealer-purchase snapshot.
    #[must_use]
    pub fn dealer_purchases(&self) -> Vec<DealerPurchaseRecord> {
        self.read_snapshot(&self.snapshots.dealer_purchases)
    }

    /// Current deleted-number archive snapshot.
    #[must_use]
    pub fn deleted_numbers(&self) -> Vec<DeletedNumberRecord> {
        self.read_snapshot(&self.snapshots.deleted_numbers)
    }

    /// Current reminders snapshot.
    #[must_use]
    pub fn reminders(&self) -> Vec<Reminder> {
        self.read_snapshot(&self.snapshots.reminders)
    }

    /// Current activity feed snapshot.
    #[must_use]
    pub fn activities(&self) -> Vec<Activity> {
        self.read_snapshot(&self.snapshots.activities)
    }

    /// Current payments snapshot.
    #[must_use]
    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.read_snapshot(&self.snapshots.payments)
    }

    /// Current user profiles snapshot.
    #[must_use]
    pub fn users(&self) -> Vec<UserProfile> {
        self.read_snapshot(&self.snapshots.users)
    }

    /// Sorted display names of all users.
    #[must_use]
    pub fn employees(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users().into_iter().map(|u| u.display_name).collect();
        names.sort();
        names
    }

    /// Display names of all admins; the assignees of system reminders.
    #[must_use]
    pub fn admins(&self) -> Vec<String> {
        self.users()
            .into_iter()
            .filter(|u| u.role == Role::Admin)
            .map(|u| u.display_name)
            .collect()
    }

    /// Known vendors: the fixed defaults plus every past buyer, sorted.
    #[must_use]
    pub fn vendors(&self) -> Vec<String> {
        let mut vendors: Vec<String> = DEFAULT_VENDORS.iter().map(ToString::to_string).collect();
        for sale in self.sales() {
            if !vendors.contains(&sale.sold_to) {
                vendors.push(sale.sold_to);
            }
        }
        vendors.sort();
        vendors
    }

    /// Looks up an inventory number in the snapshot.
    #[must_use]
    pub fn number(&self, id: &NumberId) -> Option<NumberRecord> {
        self.numbers().into_iter().find(|n| n.id == *id)
    }

    /// Whether `mobile` exists in any live collection (inventory, sales,
    /// dealer purchases, pre-bookings), reading directly from the backend.
    ///
    /// For updates, pass the record being edited as `exclude`: the check then
    /// only fires when the mobile is actually being changed to a value that
    /// exists elsewhere.
    ///
    /// # Errors
    ///
    /// Fails if any backend list fails.
    pub async fn is_duplicate(&self, mobile: &str, exclude: Option<&NumberId>) -> Result<bool> {
        let numbers: Vec<NumberRecord> = self.fetch(collections::NUMBERS).await?;

        if let Some(current_id) = exclude {
            match numbers.iter().find(|n| n.id == *current_id) {
                Some(current) if current.details.mobile.as_str() != mobile => {}
                _ => return Ok(false),
            }
        }

        if numbers.iter().any(|n| n.details.mobile.as_str() == mobile) {
            return Ok(true);
        }
        let sales: Vec<SaleRecord> = self.fetch(collections::SALES).await?;
        if sales.iter().any(|s| s.mobile.as_str() == mobile) {
            return Ok(true);
        }
        let dealer: Vec<DealerPurchaseRecord> = self.fetch(collections::DEALER_PURCHASES).await?;
        if dealer.iter().any(|d| d.mobile.as_str() == mobile) {
            return Ok(true);
        }
        let prebookings: Vec<PreBookingRecord> = self.fetch(collections::PREBOOKINGS).await?;
        Ok(prebookings.iter().any(|p| p.mobile.as_str() == mobile))
    }
}

impl std::fmt::Debug for RegistryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use numera_core::{MemoryStore, WriteBatch};
    use serde_json::json;

    fn user_doc(uid: &str, name: &str, role: &str) -> serde_json::Value {
        json!({
            "uid": uid,
            "email": format!("{uid}@example.com"),
            "displayName": name,
            "role": role,
        })
    }

    #[tokio::test]
    async fn init_loads_existing_documents() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .apply(
                WriteBatch::new()
                    .put(collections::USERS, "u1", user_doc("u1", "Asha", "admin"))
                    .put(collections::USERS, "u2", user_doc("u2", "Ravi", "employee")),
            )
            .await
            .unwrap();

        let registry = Arc::new(RegistryStore::new(backend));
        registry.init().await.unwrap();

        assert_eq!(registry.users().len(), 2);
        assert_eq!(registry.employees(), vec!["Asha", "Ravi"]);
        assert_eq!(registry.admins(), vec!["Asha"]);
        registry.shutdown();
    }

    #[tokio::test]
    async fn mirror_task_picks_up_later_writes() {
        let backend = Arc::new(MemoryStore::new());
        let backend_dyn: Arc<dyn DocumentStore> = backend.clone();
        let registry = Arc::new(RegistryStore::new(backend_dyn));
        registry.init().await.unwrap();

        backend
            .apply(WriteBatch::new().put(
                collections::USERS,
                "u1",
                user_doc("u1", "Asha", "admin"),
            ))
            .await
            .unwrap();

        // The refresh task runs asynchronously; poll briefly.
        for _ in 0..100 {
            if !registry.users().is_empty() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        assert_eq!(registry.users().len(), 1);
        registry.shutdown();
    }

    #[tokio::test]
    async fn unparseable_documents_are_skipped() {
        let backend = Arc::new(MemoryStore::new());
        backend
            .apply(
                WriteBatch::new()
                    .put(collections::USERS, "good", user_doc("good", "Asha", "admin"))
                    .put(collections::USERS, "bad", json!({"nonsense": true})),
            )
            .await
            .unwrap();

        let registry = Arc::new(RegistryStore::new(backend));
        registry.init().await.unwrap();
        assert_eq!(registry.users().len(), 1);
        registry.shutdown();
    }

    #[test]
    fn next_sr_no_is_max_plus_one() {
        assert_eq!(next_sr_no([]), 1);
        assert_eq!(next_sr_no([3, 1, 7]), 8);
    }

    #[tokio::test]
    async fn vendors_merge_defaults_with_sale_buyers() {
        let backend = Arc::new(MemoryStore::new());
        let registry = Arc::new(RegistryStore::new(backend));
        registry.init().await.unwrap();

        let vendors = registry.vendors();
        assert!(vendors.contains(&"numberwale".to_string()));
        assert!(vendors.windows(2).all(|w| w[0] <= w[1]), "sorted");
        registry.shutdown();
    }
}
