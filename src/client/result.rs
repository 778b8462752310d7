//! Materialized search results

use std::fmt;

use crate::check::Record;
use crate::container::{Device, Item};
use crate::errors::CatalogResult;
use crate::store::{Document, JsonStore};

use super::Client;

/// One stored document plus the item built from it
pub struct SearchResult<'c> {
    client: &'c Client,
    metadata: Document,
    item: Item,
}

impl<'c> SearchResult<'c> {
    pub(crate) fn new(client: &'c Client, metadata: Document, item: Item) -> Self {
        Self {
            client,
            metadata,
            item,
        }
    }

    /// Client this result came from
    pub fn client(&self) -> &'c Client {
        self.client
    }

    /// Instantiates the device. Not cached; every call builds a new object.
    pub fn get(&self) -> CatalogResult<Box<dyn Device>> {
        let container = self.client.container_for(&self.metadata)?;
        (container.instantiator())(&self.item)
    }
}

impl Record for SearchResult<'_> {
    fn metadata(&self) -> &Document {
        &self.metadata
    }

    fn item(&self) -> &Item {
        &self.item
    }

    fn instantiate(&self) -> CatalogResult<Box<dyn Device>> {
        self.get()
    }

    fn store(&self) -> &JsonStore {
        self.client.store()
    }
}

impl fmt::Debug for SearchResult<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchResult")
            .field("metadata", &self.metadata)
            .field("item", &self.item)
            .finish_non_exhaustive()
    }
}
