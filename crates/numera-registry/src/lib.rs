//! Domain layer of the number-trading registry.
//!
//! Everything between the document store and the HTTP surface lives here:
//! the record models with their embedded lifecycle logs, the mirrored
//! [`store::RegistryStore`] snapshots, the [`writer::RegistryWriter`]
//! mutation operations (each one an atomic batch with its audit activity),
//! the global history aggregator, the shared query pipeline and the CSV
//! transfer code.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod collections;
pub mod csv;
pub mod history;
pub mod model;
pub mod query;
pub mod store;
pub mod writer;

pub use history::{global_history, GlobalHistory, HistoryEntry, HistoryStage};
pub use query::{AdvancedSearch, NumberQuery, Page, SortDir, SortKey};
pub use store::{next_sr_no, RegistryStore, DEFAULT_VENDORS};
pub use writer::RegistryWriter;
