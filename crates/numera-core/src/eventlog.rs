//! Append-only lifecycle event logs.
//!
//! Every tracked record carries an [`EventLog`]: the ordered history of what
//! happened to a number as it moved between inventory, sales, pre-bookings
//! and the archive. The log is append-only, appends never reorder or mutate
//! existing entries, and readers always observe events in timestamp order
//! even when entries were merged from concurrent writers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::EventId;

/// A single immutable entry in a record's lifecycle history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleEvent {
    /// Unique event ID; also the dedupe key for set-union merges.
    pub id: EventId,
    /// Short machine-readable action, e.g. `"Sold"` or `"Status Changed"`.
    pub action: String,
    /// Human-readable description of what happened.
    pub description: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Display name of the user (or `"System"`) that performed the action.
    pub performed_by: String,
}

impl LifecycleEvent {
    /// Creates a new event stamped with the current time.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        description: impl Into<String>,
        performed_by: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::generate(),
            action: action.into(),
            description: description.into(),
            timestamp: Utc::now(),
            performed_by: performed_by.into(),
        }
    }
}

/// An ordered, append-only log of [`LifecycleEvent`]s.
///
/// Appending clamps the new event's timestamp to be no earlier than the last
/// entry, so a log built through [`EventLog::push`] is monotonic by
/// construction. Logs deserialized from storage may interleave entries from
/// concurrent writers; [`EventLog::ordered`] restores timestamp order with a
/// stable sort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog(Vec<LifecycleEvent>);

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log seeded with a single event.
    #[must_use]
    pub fn with_initial(event: LifecycleEvent) -> Self {
        Self(vec![event])
    }

    /// Appends an event, clamping its timestamp to keep the log monotonic.
    pub fn push(&mut self, mut event: LifecycleEvent) {
        if let Some(last) = self.0.last() {
            if event.timestamp < last.timestamp {
                event.timestamp = last.timestamp;
            }
        }
        self.0.push(event);
    }

    /// Returns the entries sorted by timestamp (stable, oldest first).
    #[must_use]
    pub fn ordered(&self) -> Vec<LifecycleEvent> {
        let mut events = self.0.clone();
        events.sort_by_key(|e| e.timestamp);
        events
    }

    /// The most recent entry by timestamp, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&LifecycleEvent> {
        self.0.iter().max_by_key(|e| e.timestamp)
    }

    /// Iterates entries in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &LifecycleEvent> {
        self.0.iter()
    }

    /// Number of entries in the log.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the log has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<LifecycleEvent>> for EventLog {
    fn from(events: Vec<LifecycleEvent>) -> Self {
        Self(events)
    }
}

impl IntoIterator for EventLog {
    type Item = LifecycleEvent;
    type IntoIter = std::vec::IntoIter<LifecycleEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event_at(action: &str, ts: DateTime<Utc>) -> LifecycleEvent {
        let mut e = LifecycleEvent::new(action, "test", "tester");
        e.timestamp = ts;
        e
    }

    #[test]
    fn push_clamps_backwards_timestamps() {
        let now = Utc::now();
        let mut log = EventLog::new();
        log.push(event_at("Created", now));
        log.push(event_at("Updated", now - Duration::hours(1)));

        let events = log.ordered();
        assert_eq!(events.len(), 2);
        assert!(events[0].timestamp <= events[1].timestamp);
        assert_eq!(events[1].action, "Updated");
    }

    #[test]
    fn ordered_sorts_merged_entries() {
        let now = Utc::now();
        // Simulate a log merged from two writers, out of order on disk.
        let log = EventLog::from(vec![
            event_at("Second", now),
            event_at("First", now - Duration::minutes(5)),
            event_at("Third", now + Duration::minutes(5)),
        ]);

        let actions: Vec<_> = log.ordered().into_iter().map(|e| e.action).collect();
        assert_eq!(actions, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn latest_picks_newest_by_timestamp() {
        let now = Utc::now();
        let log = EventLog::from(vec![
            event_at("Old", now - Duration::days(1)),
            event_at("New", now),
        ]);
        assert_eq!(log.latest().unwrap().action, "New");
    }

    #[test]
    fn serde_is_a_plain_array() {
        let log = EventLog::with_initial(LifecycleEvent::new("Created", "added", "tester"));
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["performedBy"], "tester");
    }
}
