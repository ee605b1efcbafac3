//! Global history aggregation across every stage a number can live in.
//!
//! Each source collection contributes one entry per record, with the
//! embedded lifecycle log restored to timestamp order. Aggregation also
//! surfaces conflicts: a mobile present in more than one live stage at once
//! points at a write that escaped the atomic transition path.

use std::collections::HashMap;

use numera_core::{LifecycleEvent, Msisdn};
use serde::Serialize;

use crate::model::{
    DealerPurchaseRecord, DeletedNumberRecord, NumberRecord, PreBookingRecord, SaleRecord,
};
use crate::store::RegistryStore;

/// Which collection a history entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryStage {
    /// The live inventory.
    Inventory,
    /// Completed sales.
    Sale,
    /// The pre-booking list.
    PreBooking,
    /// The dealer purchase register.
    DealerPurchase,
    /// The deleted-number archive.
    Deleted,
}

impl HistoryStage {
    /// Inventory, sales and pre-bookings are mutually exclusive homes for a
    /// mobile; the register and the archive are not.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Inventory | Self::Sale | Self::PreBooking)
    }
}

impl std::fmt::Display for HistoryStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Inventory => "Inventory",
            Self::Sale => "Sale",
            Self::PreBooking => "Pre-Booking",
            Self::DealerPurchase => "Dealer Purchase",
            Self::Deleted => "Deleted",
        })
    }
}

/// One record's contribution to the global history view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// The mobile this entry is about.
    pub mobile: Msisdn,
    /// Digital root, for display alongside the mobile.
    pub sum: u32,
    /// Where the record currently lives.
    pub stage: HistoryStage,
    /// Serial number within its collection.
    pub sr_no: u64,
    /// Lifecycle events in timestamp order. Empty for dealer purchases,
    /// which carry no embedded log.
    pub events: Vec<LifecycleEvent>,
}

/// The aggregated view plus any cross-stage conflicts found while building.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalHistory {
    /// Every record from every stage, sorted by mobile then stage.
    pub records: Vec<HistoryEntry>,
    /// Mobiles found in more than one live stage, sorted.
    pub conflicts: Vec<Msisdn>,
}

impl GlobalHistory {
    /// Builds the view from raw per-collection records.
    #[must_use]
    pub fn build(
        numbers: &[NumberRecord],
        sales: &[SaleRecord],
        prebookings: &[PreBookingRecord],
        dealer_purchases: &[DealerPurchaseRecord],
        deleted: &[DeletedNumberRecord],
    ) -> Self {
        let mut records = Vec::with_capacity(
            numbers.len()
                + sales.len()
                + prebookings.len()
                + dealer_purchases.len()
                + deleted.len(),
        );

        for n in numbers {
            records.push(HistoryEntry {
                mobile: n.details.mobile.clone(),
                sum: n.details.sum,
                stage: HistoryStage::Inventory,
                sr_no: n.details.sr_no,
                events: n.details.history.ordered(),
            });
        }
        for s in sales {
            records.push(HistoryEntry {
                mobile: s.mobile.clone(),
                sum: s.sum,
                stage: HistoryStage::Sale,
                sr_no: s.sr_no,
                events: s.original_number.history.ordered(),
            });
        }
        for b in prebookings {
            records.push(HistoryEntry {
                mobile: b.mobile.clone(),
                sum: b.sum,
                stage: HistoryStage::PreBooking,
                sr_no: b.sr_no,
                events: b.original_number.history.ordered(),
            });
        }
        for p in dealer_purchases {
            records.push(HistoryEntry {
                mobile: p.mobile.clone(),
                sum: p.sum,
                stage: HistoryStage::DealerPurchase,
                sr_no: p.sr_no,
                events: Vec::new(),
            });
        }
        for d in deleted {
            records.push(HistoryEntry {
                mobile: d.mobile.clone(),
                sum: d.sum,
                stage: HistoryStage::Deleted,
                sr_no: d.original_sr_no,
                events: d.original_number.history.ordered(),
            });
        }

        records.sort_by(|a, b| {
            a.mobile
                .as_str()
                .cmp(b.mobile.as_str())
                .then_with(|| (a.stage as u8).cmp(&(b.stage as u8)))
        });

        let mut live_counts: HashMap<&str, u32> = HashMap::new();
        for entry in records.iter().filter(|e| e.stage.is_live()) {
            *live_counts.entry(entry.mobile.as_str()).or_default() += 1;
        }
        let mut conflicts: Vec<Msisdn> = records
            .iter()
            .filter(|e| e.stage.is_live())
            .filter(|e| live_counts.get(e.mobile.as_str()).copied().unwrap_or(0) > 1)
            .map(|e| e.mobile.clone())
            .collect();
        conflicts.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        conflicts.dedup();

        Self { records, conflicts }
    }

    /// Entries for one specific mobile.
    #[must_use]
    pub fn for_mobile(&self, mobile: &str) -> Vec<&HistoryEntry> {
        self.records
            .iter()
            .filter(|e| e.mobile.as_str() == mobile)
            .collect()
    }
}

/// Builds the global view from the registry's current snapshots.
#[must_use]
pub fn global_history(registry: &RegistryStore) -> GlobalHistory {
    GlobalHistory::build(
        &registry.numbers(),
        &registry.sales(),
        &registry.prebookings(),
        &registry.dealer_purchases(),
        &registry.deleted_numbers(),
    )
}
