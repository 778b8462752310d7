//! Catalog client
//!
//! Ties the document store to the container registry: raw documents go in
//! and out through the store, and searches come back as materialized
//! `SearchResult`s. Client-owned metadata (`type`, `creation`,
//! `last_edit`) is stamped here, never by the store.

mod result;

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::CatalogConfig;
use crate::container::{Container, ContainerRegistry, Item};
use crate::errors::{CatalogError, CatalogResult};
use crate::store::{Document, JsonStore, Query, ID_KEY};

pub use result::SearchResult;

/// Document field naming the container an entry belongs to
pub const TYPE_KEY: &str = "type";

/// Store + containers
#[derive(Debug, Clone)]
pub struct Client {
    store: JsonStore,
    containers: ContainerRegistry,
}

impl Client {
    pub fn new(store: JsonStore, containers: ContainerRegistry) -> Self {
        Self { store, containers }
    }

    /// Client over the database at `path` with the built-in containers
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::new(JsonStore::new(path), ContainerRegistry::builtin())
    }

    /// Client described by a configuration file
    pub fn from_config(config: &CatalogConfig) -> CatalogResult<Self> {
        let mut containers = ContainerRegistry::builtin();
        if let Some(dir) = &config.container_dir {
            containers.load_dir(Path::new(dir))?;
        }
        Ok(Self::new(JsonStore::new(&config.path), containers))
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn containers(&self) -> &ContainerRegistry {
        &self.containers
    }

    /// Container named by the document's `type` field
    pub fn container_for(&self, doc: &Document) -> CatalogResult<&Container> {
        let name = doc.get(TYPE_KEY).and_then(Value::as_str).ok_or_else(|| {
            CatalogError::Entry(format!("Document {} does not name a container", describe(doc)))
        })?;
        self.containers.get(name).ok_or_else(|| {
            CatalogError::Entry(format!(
                "Document {} uses unknown container {}",
                describe(doc),
                name
            ))
        })
    }

    /// First raw document matching `query`.
    ///
    /// # Errors
    ///
    /// `CatalogError::Search` when nothing matches.
    pub fn find_document(&self, query: &Query) -> CatalogResult<Document> {
        self.store.find_one(query)?.ok_or_else(|| {
            CatalogError::Search("No item information found that matches the search criteria".into())
        })
    }

    /// Materializes one stored document
    pub fn result_for(&self, doc: Document) -> CatalogResult<SearchResult<'_>> {
        let container = self.container_for(&doc)?;
        let item = Item::from_document(container, &doc)?;
        Ok(SearchResult::new(self, doc, item))
    }

    /// Every document whose fields equal `fields`, materialized.
    ///
    /// Documents that cannot be materialized are logged and skipped.
    pub fn search(&self, fields: Document) -> CatalogResult<Vec<SearchResult<'_>>> {
        self.search_query(&Query::new().with_fields(fields).multiples(true))
    }

    /// Every document `query` accepts, materialized
    pub fn search_query(&self, query: &Query) -> CatalogResult<Vec<SearchResult<'_>>> {
        let docs = self.store.find_many(query)?;
        Ok(self.materialize_all(docs))
    }

    /// Every document in the database, materialized
    pub fn search_all(&self) -> CatalogResult<Vec<SearchResult<'_>>> {
        let docs = self.store.all_devices()?;
        Ok(self.materialize_all(docs))
    }

    fn materialize_all(&self, docs: Vec<Document>) -> Vec<SearchResult<'_>> {
        docs.into_iter()
            .filter_map(|doc| {
                let label = describe(&doc);
                match self.result_for(doc) {
                    Ok(result) => Some(result),
                    Err(e) => {
                        warn!(
                            target: "devicedb::client",
                            id = %label,
                            error = %e,
                            "Entry is malformed. Skipping."
                        );
                        None
                    }
                }
            })
            .collect()
    }

    /// Validates `fields` against `container` and inserts them under `id`.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Entry` if mandatory information is missing or a
    ///   value has the wrong type
    /// - `CatalogError::Duplicate` if `id` is already stored
    pub fn add_document(&self, id: &str, container: &str, fields: Document) -> CatalogResult<()> {
        let definition = self.containers.get(container).ok_or_else(|| {
            CatalogError::Entry(format!("Unknown container {}", container))
        })?;
        let item = Item::from_document(definition, &fields)?;
        item.validate()?;

        let now = Value::String(Utc::now().to_rfc3339());
        let mut post = item.post();
        post.remove(ID_KEY);
        post.insert(TYPE_KEY.to_string(), Value::String(container.to_string()));
        post.insert("creation".to_string(), now.clone());
        post.insert("last_edit".to_string(), now);

        self.store.save(id, post, true)?;
        info!(target: "devicedb::client", id = %id, container = %container, "Item added");
        Ok(())
    }

    /// Merges `fields` into the stored document and restamps `last_edit`
    pub fn edit_document(&self, id: &str, fields: Document) -> CatalogResult<()> {
        let mut post = fields;
        post.remove(ID_KEY);
        post.insert(
            "last_edit".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.store.save(id, post, false)?;
        info!(target: "devicedb::client", id = %id, "Item edited");
        Ok(())
    }

    /// Deletes `id`; absent ids are only logged by the store
    pub fn remove_document(&self, id: &str) -> CatalogResult<()> {
        self.store.delete(id)
    }
}

fn describe(doc: &Document) -> String {
    doc.get(ID_KEY)
        .and_then(Value::as_str)
        .unwrap_or("<no _id>")
        .to_string()
}
