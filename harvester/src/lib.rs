//! harvester: seller-portal order acquisition and reconciliation pipeline
//!
//! Captures per-order payloads from the portal's own network traffic,
//! persists them as immutable JSON artifacts in a pluggable storage backend,
//! and reconciles them, together with the exported payments report, into
//! normalized, refund-aware CSV tables.

pub mod capture;
pub mod config;
pub mod normalize;
pub mod payments;
pub mod report;
pub mod storage;
