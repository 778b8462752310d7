//! The record contract consumed by checks

use serde_json::Value;

use crate::container::{Device, Item};
use crate::errors::CatalogResult;
use crate::store::{Document, JsonStore, ID_KEY};

/// A stored document materialized into an item
pub trait Record {
    /// The document as stored
    fn metadata(&self) -> &Document;

    /// The document viewed through its container
    fn item(&self) -> &Item;

    /// Builds the device object; may be expensive or fail
    fn instantiate(&self) -> CatalogResult<Box<dyn Device>>;

    /// Store the record was read from, for raw re-fetches
    fn store(&self) -> &JsonStore;

    fn id(&self) -> Option<&str> {
        self.metadata().get(ID_KEY).and_then(Value::as_str)
    }
}
