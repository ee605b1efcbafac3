//! # numera-api
//!
//! HTTP composition layer for the number registry.
//!
//! This crate is a thin surface over `numera-registry`: it wires the record
//! store, the mutation writer and the scheduler behind a JSON REST API,
//! handling:
//!
//! - **Authentication**: static bearer token, or actor headers in debug mode
//! - **Routing**: `/api/v1/*` endpoints plus the messaging webhook
//! - **Observability**: request metrics, tracing, health checks
//!
//! All business rules live in `numera-registry`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod openapi;
pub mod routes;
pub mod server;
