//! Document Store subsystem
//!
//! One JSON file holds the entire catalog. The file is the unit of load and
//! store; there is no partial access.
//!
//! # Design Principles
//!
//! - Lazy initialization: a missing file is created empty on first use
//! - Exclusive, non-blocking advisory lock around every write
//! - Exact-id lookups never scan
//! - Insert is strict about duplicates, update is strict about absence,
//!   delete is lenient

mod document;
mod json_store;
mod lock;
mod search;

pub use document::{document_from_value, json_type_name, Database, Document, ID_KEY};
pub use json_store::JsonStore;
pub use lock::{lock_support, LockSupport, LockedFile};
pub use search::{
    fields_match, patterns_match, ranges_match, Found, Matches, NumericRange, Pattern, Query,
};
