//! Single-file JSON document store
//!
//! The whole database lives in one JSON object keyed by `_id`. Every
//! operation re-reads the file; nothing is cached between calls so writes
//! from other processes are always visible.
//!
//! Mutations (`save`, `delete`) run as one load -> modify -> store unit
//! while holding the exclusive lock, so two mutating calls can never
//! interleave. A caller that does its own `load()` followed later by
//! `store()` is not protected against a concurrent writer in between.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use super::document::{Database, Document, ID_KEY};
use super::lock::{LockSupport, LockedFile};
use super::search::{Found, NumericRange, Pattern, Query};
use crate::errors::{CatalogError, CatalogResult};

/// JSON file backed document store
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
    locking: LockSupport,
}

impl JsonStore {
    /// Creates a store for `path`. Nothing is touched on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            locking: LockSupport::default(),
        }
    }

    /// Sets the locking policy; `LockSupport::Unavailable` writes unlocked
    pub fn with_locking(mut self, locking: LockSupport) -> Self {
        self.locking = locking;
        self
    }

    pub fn locking(&self) -> &LockSupport {
        &self.locking
    }

    /// Creates a store and initializes a new empty database at `path`
    pub fn create(path: impl Into<PathBuf>) -> CatalogResult<Self> {
        let store = Self::new(path);
        store.initialize()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a new, empty database.
    ///
    /// # Errors
    ///
    /// `CatalogError::Permission` if a non-empty file already exists;
    /// live data is never overwritten.
    pub fn initialize(&self) -> CatalogResult<()> {
        match fs::metadata(&self.path) {
            Ok(meta) if meta.len() > 0 => {
                return Err(CatalogError::Permission(format!(
                    "File {} already exists. Can not initialize a new database.",
                    self.path.display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CatalogError::io(
                    format!("Failed to inspect {}", self.path.display()),
                    e,
                ))
            }
        }
        self.store(&Database::new())
    }

    /// Reads and parses the full database file
    pub fn load(&self) -> CatalogResult<Database> {
        let raw = fs::read_to_string(&self.path).map_err(|e| {
            CatalogError::io(format!("Failed to read database {}", self.path.display()), e)
        })?;
        Database::from_json(&raw)
    }

    /// Loads the database, initializing it first when the file is missing
    pub fn load_or_initialize(&self) -> CatalogResult<Database> {
        match self.load() {
            Err(CatalogError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                debug!(
                    target: "devicedb::store",
                    path = %self.path.display(),
                    "Initializing new database"
                );
            }
            other => return other,
        }
        self.initialize_if_absent()?;
        self.load()
    }

    /// Overwrites the database file with `db` under the exclusive lock.
    ///
    /// # Errors
    ///
    /// `CatalogError::Locked` if another process holds the lock.
    pub fn store(&self, db: &Database) -> CatalogResult<()> {
        let mut file = LockedFile::acquire_with(&self.path, &self.locking)?;
        file.write_database(db)
    }

    /// Runs `mutate` against the current database and stores the result,
    /// all under one lock. Nothing is written if `mutate` fails.
    pub fn with_database<T, F>(&self, mutate: F) -> CatalogResult<T>
    where
        F: FnOnce(&mut Database) -> CatalogResult<T>,
    {
        if !self.path.exists() {
            debug!(
                target: "devicedb::store",
                path = %self.path.display(),
                "Initializing new database"
            );
            self.initialize_if_absent()?;
        }

        let mut file = LockedFile::acquire_with(&self.path, &self.locking)?;
        let mut db = file.read_database()?;
        let out = mutate(&mut db)?;
        file.write_database(&db)?;
        Ok(out)
    }

    /// `initialize`, except that a database created in the meantime by
    /// another writer is accepted as is
    fn initialize_if_absent(&self) -> CatalogResult<()> {
        match self.initialize() {
            Ok(()) | Err(CatalogError::Permission(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Every document in the database
    pub fn all_devices(&self) -> CatalogResult<Vec<Document>> {
        Ok(self.load_or_initialize()?.into_documents())
    }

    /// Runs `query`: `Found::Many` when `multiples` is set, otherwise
    /// `Found::One` or `Found::NoMatch`.
    pub fn find(&self, query: &Query) -> CatalogResult<Found> {
        if query.multiples {
            Ok(Found::Many(self.find_many(query)?))
        } else {
            Ok(self.find_one(query)?.map_or(Found::NoMatch, Found::One))
        }
    }

    /// First match only; the scan stops as soon as it is found
    pub fn find_one(&self, query: &Query) -> CatalogResult<Option<Document>> {
        let db = self.load_or_initialize()?;
        let mut matches = db.matches(query.id.as_deref(), query.comparison());
        Ok(matches.next().cloned())
    }

    /// Every match
    pub fn find_many(&self, query: &Query) -> CatalogResult<Vec<Document>> {
        let db = self.load_or_initialize()?;
        let found = db
            .matches(query.id.as_deref(), query.comparison())
            .cloned()
            .collect();
        Ok(found)
    }

    /// Every document with `start <= doc[key] < stop` that also equals
    /// `to_match` on its fields
    pub fn find_range(
        &self,
        key: &str,
        range: NumericRange,
        to_match: Document,
    ) -> CatalogResult<Vec<Document>> {
        let query = Query::new()
            .with_fields(to_match)
            .range(key, range)
            .multiples(true);
        self.find_many(&query)
    }

    /// Every document whose fields match the expressions in `to_match`.
    ///
    /// String values are used as the expression source; other values by
    /// their JSON text.
    pub fn find_regex(&self, to_match: &Document) -> CatalogResult<Vec<Document>> {
        let mut query = Query::new().multiples(true);
        for (key, value) in to_match {
            let source = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            query = query.pattern(key.as_str(), Pattern::new(&source)?);
        }
        self.find_many(&query)
    }

    /// Inserts (`insert = true`) or updates (`insert = false`) a document.
    ///
    /// # Errors
    ///
    /// - `CatalogError::Duplicate` when inserting an id that exists
    /// - `CatalogError::Search` when updating an id that does not
    ///
    /// The database is left untouched in both cases.
    pub fn save(&self, id: &str, post: Document, insert: bool) -> CatalogResult<()> {
        self.with_database(|db| {
            if insert {
                if db.contains(id) {
                    return Err(CatalogError::Duplicate(format!(
                        "Device {} already exists",
                        id
                    )));
                }
                let mut post = post;
                post.insert(ID_KEY.to_string(), Value::String(id.to_string()));
                db.insert(id, post);
            } else {
                let existing = db
                    .get_mut(id)
                    .ok_or_else(|| CatalogError::Search(format!("No device found {}", id)))?;
                existing.extend(post);
            }
            Ok(())
        })
    }

    /// Removes the document for `id`. An absent id is logged, not an error.
    pub fn delete(&self, id: &str) -> CatalogResult<()> {
        self.with_database(|db| {
            if db.remove(id).is_none() {
                warn!(
                    target: "devicedb::store",
                    id = %id,
                    "Device not found in database"
                );
            }
            Ok(())
        })
    }
}
