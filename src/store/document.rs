//! Document and Database model
//!
//! A Document is a field-name to value mapping that carries its own `_id`.
//! The Database maps identifiers to Documents and is always loaded and
//! stored as a whole.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};

use crate::errors::{CatalogError, CatalogResult};

/// Name of the identifier field carried by every document
pub const ID_KEY: &str = "_id";

/// A single record: field name -> value
pub type Document = Map<String, Value>;

/// Full identifier -> Document mapping persisted as one unit.
///
/// Keys are kept ordered so the persisted form is stable under diffing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Database {
    entries: BTreeMap<String, Document>,
}

impl Database {
    /// Creates an empty database
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses the raw file contents. Empty content is a valid, empty database.
    pub fn from_json(raw: &str) -> CatalogResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(raw)
            .map_err(|e| CatalogError::Database(format!("Malformed database content: {}", e)))
    }

    /// Serializes with sorted keys, 4-space indentation and a trailing newline
    pub fn to_json(&self) -> CatalogResult<Vec<u8>> {
        let mut out = Vec::with_capacity(256);
        let formatter = PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut ser)
            .map_err(|e| CatalogError::Database(format!("Failed to serialize database: {}", e)))?;
        out.push(b'\n');
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Document> {
        self.entries.get_mut(id)
    }

    /// Inserts a document under `id`, replacing any previous one
    pub fn insert(&mut self, id: impl Into<String>, document: Document) -> Option<Document> {
        self.entries.insert(id.into(), document)
    }

    pub fn remove(&mut self, id: &str) -> Option<Document> {
        self.entries.remove(id)
    }

    /// Iterates `(id, document)` pairs in key order
    pub fn iter(&self) -> btree_map::Iter<'_, String, Document> {
        self.entries.iter()
    }

    /// All documents, ignoring keys
    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.entries.values()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.entries.into_values().collect()
    }
}

impl FromIterator<(String, Document)> for Database {
    fn from_iter<I: IntoIterator<Item = (String, Document)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Converts a `json!({...})` value into a Document
pub fn document_from_value(value: Value) -> CatalogResult<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CatalogError::Entry(format!(
            "Document must be an object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Returns the JSON type name for error messages
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
