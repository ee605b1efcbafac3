//! # numera-core
//!
//! Core abstractions for the Numera number-trading registry.
//!
//! This crate provides the foundational types and traits used across all
//! Numera components:
//!
//! - **Identifiers**: Strongly-typed ULID ids for every entity
//! - **MSISDN**: Validated mobile numbers with the digit arithmetic search uses
//! - **Event Log**: Append-only, timestamp-ordered lifecycle histories
//! - **Document Store**: Atomic-batch JSON storage with change notices
//! - **Error Types**: Shared error definitions and result types
//!
//! ## Crate Boundary
//!
//! `numera-core` is the **only** crate allowed to define shared primitives.
//! Domain records live in `numera-registry`; HTTP concerns in `numera-api`.
//!
//! ## Example
//!
//! ```rust
//! use numera_core::prelude::*;
//!
//! let id = NumberId::generate();
//! let mobile = Msisdn::new("9876543210").unwrap();
//! assert_eq!(mobile.digital_root(), 9);
//! # let _ = id;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod eventlog;
pub mod id;
pub mod msisdn;
pub mod observability;
pub mod store;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use numera_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::eventlog::{EventLog, LifecycleEvent};
    pub use crate::id::{
        ActivityId, DealerPurchaseId, DeletedNumberId, EventId, NumberId, PaymentId, PreBookingId,
        ReminderId, SaleId,
    };
    pub use crate::msisdn::Msisdn;
    pub use crate::store::{
        ChangeNotice, Document, DocumentStore, MemoryStore, WriteBatch, WriteOp,
    };
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use eventlog::{EventLog, LifecycleEvent};
pub use id::{
    ActivityId, DealerPurchaseId, DeletedNumberId, EventId, NumberId, PaymentId, PreBookingId,
    ReminderId, SaleId,
};
pub use msisdn::Msisdn;
pub use observability::{init_logging, LogFormat, Redacted};
pub use store::{ChangeNotice, Document, DocumentStore, MemoryStore, WriteBatch, WriteOp};
