//! Strongly-typed identifiers for Numera entities.
//!
//! All identifiers in Numera are:
//! - **Strongly typed**: Prevents mixing up different ID types at compile time
//! - **Lexicographically sortable**: ULIDs encode creation time and sort naturally
//! - **Globally unique**: No coordination required for generation
//!
//! # Example
//!
//! ```rust
//! use numera_core::id::{NumberId, SaleId};
//!
//! let number = NumberId::generate();
//! let sale = SaleId::generate();
//!
//! // IDs are different types - this won't compile:
//! // let wrong: NumberId = sale;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

use crate::error::{Error, Result};

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Ulid);

        impl $name {
            /// Generates a new unique ID.
            ///
            /// Uses ULID generation which is lexicographically sortable by
            /// creation time and globally unique without coordination.
            #[must_use]
            pub fn generate() -> Self {
                Self(Ulid::new())
            }

            /// Creates an ID from a raw ULID.
            #[must_use]
            pub const fn from_ulid(ulid: Ulid) -> Self {
                Self(ulid)
            }

            /// Returns the underlying ULID.
            #[must_use]
            pub const fn as_ulid(&self) -> Ulid {
                self.0
            }

            /// Returns the creation timestamp encoded in the ID.
            #[must_use]
            pub fn created_at(&self) -> chrono::DateTime<chrono::Utc> {
                let ms = self.0.timestamp_ms();
                chrono::DateTime::from_timestamp_millis(ms as i64).unwrap_or_else(chrono::Utc::now)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Ulid::from_string(s)
                    .map(Self)
                    .map_err(|e| Error::InvalidId {
                        message: format!(concat!("invalid ", $label, " ID '{}': {}"), s, e),
                    })
            }
        }
    };
}

entity_id!(
    /// A unique identifier for an inventory number record.
    NumberId,
    "number"
);

entity_id!(
    /// A unique identifier for a sale record.
    SaleId,
    "sale"
);

entity_id!(
    /// A unique identifier for a pre-booking record.
    PreBookingId,
    "pre-booking"
);

entity_id!(
    /// A unique identifier for a dealer purchase record.
    DealerPurchaseId,
    "dealer purchase"
);

entity_id!(
    /// A unique identifier for an archived deleted-number record.
    DeletedNumberId,
    "deleted number"
);

entity_id!(
    /// A unique identifier for a reminder.
    ReminderId,
    "reminder"
);

entity_id!(
    /// A unique identifier for an activity feed entry.
    ActivityId,
    "activity"
);

entity_id!(
    /// A unique identifier for a payment record.
    PaymentId,
    "payment"
);

entity_id!(
    /// A unique identifier for a lifecycle event.
    EventId,
    "event"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_id_roundtrip() {
        let id = NumberId::generate();
        let s = id.to_string();
        let parsed: NumberId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn sale_id_roundtrip() {
        let id = SaleId::generate();
        let s = id.to_string();
        let parsed: SaleId = s.parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn ids_are_unique() {
        let id1 = NumberId::generate();
        let id2 = NumberId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn invalid_id_returns_error() {
        let result: Result<NumberId> = "not-a-valid-ulid".parse();
        assert!(result.is_err());
    }
}
