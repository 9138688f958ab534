//! Attendance tracking service.
//!
//! Classes, subjects, scheduled activities, students and QR-scanned
//! attendance, persisted as one JSON file per collection and served over a
//! small HTTP API. The [`client`] module is the data access layer the front
//! end uses against that API.
//!
//! # Layout
//!
//! - [`store`]: per-collection files, with a positional encoding for
//!   students and attendance.
//! - [`records`]: list/create/replace/delete for any collection.
//! - [`ledger`]: attendance with at most one entry per (activity, student).
//! - [`http`]: the axum gateway.
//! - [`legacy`]: splitting an old single-file `db.json` on startup.
//! - [`backup`]: zip bundles of every collection.

pub mod backup;
pub mod client;
pub mod config;
pub mod http;
pub mod ledger;
pub mod legacy;
pub mod models;
pub mod records;
pub mod roster;
pub mod store;
pub mod telemetry;
