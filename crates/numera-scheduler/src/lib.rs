//! Interval-driven maintenance for the registry.
//!
//! One polling loop, three jobs per tick: flip due Non-RTS numbers, generate
//! system reminders, sweep stale completed reminders. Every job is
//! idempotent, so a tick that races a manual mutation does no extra work on
//! the next pass.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, Instrument};

use numera_core::observability::scheduler_span;
use numera_registry::RegistryWriter;

const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between maintenance passes.
    pub poll_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

impl SchedulerConfig {
    /// Reads `NUMERA_SCHEDULER_POLL_SECS` from the environment, falling back
    /// to the default interval when unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let poll_interval = std::env::var("NUMERA_SCHEDULER_POLL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map_or(
                Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
                Duration::from_secs,
            );
        Self { poll_interval }
    }
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Numbers flipped to RTS.
    pub flipped_to_rts: usize,
    /// System reminders created.
    pub reminders_created: usize,
    /// Stale completed reminders deleted.
    pub reminders_swept: usize,
}

/// Runs the maintenance jobs on a fixed interval.
pub struct Scheduler {
    writer: RegistryWriter,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Creates a scheduler over the given writer.
    #[must_use]
    pub fn new(writer: RegistryWriter, config: SchedulerConfig) -> Self {
        Self { writer, config }
    }

    /// Runs one maintenance pass. Failures in one job are logged and do not
    /// stop the remaining jobs.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        match self
            .writer
            .flip_due_rts()
            .instrument(scheduler_span("flip_due_rts"))
            .await
        {
            Ok(count) => report.flipped_to_rts = count,
            Err(err) => error!(error = %err, "rts flip failed"),
        }
        match self
            .writer
            .generate_system_reminders()
            .instrument(scheduler_span("generate_system_reminders"))
            .await
        {
            Ok(count) => report.reminders_created = count,
            Err(err) => error!(error = %err, "reminder generation failed"),
        }
        match self
            .writer
            .sweep_completed_reminders()
            .instrument(scheduler_span("sweep_completed_reminders"))
            .await
        {
            Ok(count) => report.reminders_swept = count,
            Err(err) => error!(error = %err, "reminder sweep failed"),
        }

        report
    }

    /// Ticks on the configured interval until `shutdown` flips to true.
    ///
    /// The first tick runs immediately so a fresh process catches up without
    /// waiting a full interval.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let report = self.tick().await;
                    if report != TickReport::default() {
                        info!(
                            flipped = report.flipped_to_rts,
                            created = report.reminders_created,
                            swept = report.reminders_swept,
                            "maintenance pass did work"
                        );
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler stopping");
                        return;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use numera_core::MemoryStore;
    use numera_registry::model::{
        Actor, LocationType, NewNumber, NumberTemplate, NumberType, OwnershipType, Role,
        RtsStatus, UploadStatus,
    };
    use numera_registry::RegistryStore;
    use std::sync::Arc;

    fn admin() -> Actor {
        Actor {
            uid: "u-admin".to_string(),
            display_name: "Asha".to_string(),
            role: Role::Admin,
        }
    }

    fn non_rts_number(mobile: &str, rts_in_days: i64) -> NewNumber {
        NewNumber {
            mobile: numera_core::Msisdn::new(mobile).unwrap(),
            template: NumberTemplate {
                status: RtsStatus::NonRts,
                rts_date: Some(Utc::now() + ChronoDuration::days(rts_in_days)),
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
            },
        }
    }

    async fn scheduler() -> (Scheduler, RegistryWriter, Arc<RegistryStore>) {
        let backend = Arc::new(MemoryStore::new());
        let registry = Arc::new(RegistryStore::new(backend));
        let writer = RegistryWriter::new(Arc::clone(&registry));
        let scheduler = Scheduler::new(writer.clone(), SchedulerConfig::default());
        (scheduler, writer, registry)
    }

    #[tokio::test]
    async fn tick_flips_due_numbers_once() {
        let (scheduler, writer, registry) = scheduler().await;
        writer
            .add_number(&admin(), non_rts_number("9000000001", -1))
            .await
            .unwrap();
        writer
            .add_number(&admin(), non_rts_number("9000000002", 30))
            .await
            .unwrap();

        let first = scheduler.tick().await;
        assert_eq!(first.flipped_to_rts, 1);

        let second = scheduler.tick().await;
        assert_eq!(second.flipped_to_rts, 0);

        registry.refresh_all().await.unwrap();
        let statuses: Vec<RtsStatus> = registry
            .numbers()
            .iter()
            .map(|n| n.details.status)
            .collect();
        assert!(statuses.contains(&RtsStatus::Rts));
        assert!(statuses.contains(&RtsStatus::NonRts));
    }

    #[tokio::test]
    async fn repeated_ticks_do_not_duplicate_reminders() {
        let (scheduler, writer, registry) = scheduler().await;
        let mut cocp = non_rts_number("9000000001", 30);
        cocp.template.status = RtsStatus::Rts;
        cocp.template.rts_date = None;
        cocp.template.number_type = NumberType::Cocp;
        cocp.template.safe_custody_date = Some(Utc::now() - ChronoDuration::days(1));
        cocp.template.account_name = Some("Acme Telecom".to_string());
        writer.add_number(&admin(), cocp).await.unwrap();

        assert_eq!(scheduler.tick().await.reminders_created, 1);
        assert_eq!(scheduler.tick().await.reminders_created, 0);

        registry.refresh_all().await.unwrap();
        assert_eq!(registry.reminders().len(), 1);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown_signal() {
        let (scheduler, _writer, _registry) = scheduler().await;
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(scheduler.run(rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
