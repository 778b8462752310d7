//! devicedb - a JSON file catalog of device descriptions
//!
//! Documents live in one JSON file keyed by `_id`. Containers give them a
//! typed shape, the client materializes them into records, and checks
//! audit those records.

pub mod check;
pub mod cli;
pub mod client;
pub mod config;
pub mod container;
pub mod errors;
pub mod observability;
pub mod store;

pub use client::{Client, SearchResult};
pub use errors::{CatalogError, CatalogResult};
pub use store::{Document, Found, JsonStore, Query};
