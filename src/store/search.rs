//! Lazy two-phase document matching
//!
//! Phase 1 is an exact-id lookup: a hit yields exactly that document and the
//! rest of the database is never visited. Phase 2 only runs when the id is
//! absent or missing and walks every `(id, document)` pair in key order,
//! yielding the documents the comparison accepts.
//!
//! A comparison that fails on one entry is logged and counted as a
//! non-match; the scan always continues.
//!
//! A `Query` combines three kinds of field predicate, all of which must
//! hold: exact equality, a half-open numeric range, and a case-insensitive
//! regular expression matched against the whole value.

use std::collections::{btree_map, BTreeMap};
use std::fmt;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::debug;

use super::document::{Database, Document, ID_KEY};
use crate::errors::{CatalogError, CatalogResult};

/// Numeric interval `start <= value < stop`; no `stop` means unbounded
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRange {
    start: f64,
    stop: Option<f64>,
}

impl NumericRange {
    /// # Errors
    ///
    /// `CatalogError::Search` unless `start < stop`.
    pub fn new(start: f64, stop: Option<f64>) -> CatalogResult<Self> {
        let ordered = match stop {
            Some(stop) => start < stop,
            None => !start.is_nan(),
        };
        if !ordered {
            return Err(CatalogError::Search(
                "Invalid range, make sure start < stop".into(),
            ));
        }
        Ok(Self { start, stop })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> Option<f64> {
        self.stop
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.start && self.stop.map_or(true, |stop| value < stop)
    }
}

/// Case-insensitive regular expression over a whole field value.
///
/// Strings are matched as they are; any other value is matched against its
/// JSON text, so `6.0` matches the number `6.0`.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    /// # Errors
    ///
    /// `CatalogError::Search` if `source` is not a valid regular expression.
    pub fn new(source: &str) -> CatalogResult<Self> {
        let regex = RegexBuilder::new(&format!("^(?:{})$", source))
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                CatalogError::Search(format!("Invalid regular expression '{}': {}", source, e))
            })?;
        Ok(Self {
            source: source.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.regex.is_match(s),
            other => self.regex.is_match(&other.to_string()),
        }
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Search request: optional exact id, field predicates and cardinality
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub id: Option<String>,
    pub fields: Document,
    pub ranges: BTreeMap<String, NumericRange>,
    pub patterns: BTreeMap<String, Pattern>,
    pub multiples: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query for a single identifier
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::new().id(id)
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds an equality predicate on `key`
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_fields(mut self, fields: Document) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Adds a numeric range predicate on `key`
    pub fn range(mut self, key: impl Into<String>, range: NumericRange) -> Self {
        self.ranges.insert(key.into(), range);
        self
    }

    /// Adds a regular expression predicate on `key`
    pub fn pattern(mut self, key: impl Into<String>, pattern: Pattern) -> Self {
        self.patterns.insert(key.into(), pattern);
        self
    }

    pub fn multiples(mut self, multiples: bool) -> Self {
        self.multiples = multiples;
        self
    }

    /// Predicate used for the fallback scan.
    ///
    /// When an id was requested but missed the fast path, the scan also
    /// requires the document's `_id` field to equal it.
    pub fn comparison(&self) -> impl FnMut(&str, &Document) -> CatalogResult<bool> + '_ {
        move |_name, doc| {
            if let Some(id) = &self.id {
                if doc.get(ID_KEY).and_then(Value::as_str) != Some(id.as_str()) {
                    return Ok(false);
                }
            }
            Ok(fields_match(&self.fields, doc)?
                && ranges_match(&self.ranges, doc)?
                && patterns_match(&self.patterns, doc)?)
        }
    }
}

fn field<'d>(doc: &'d Document, key: &str) -> CatalogResult<&'d Value> {
    doc.get(key)
        .ok_or_else(|| CatalogError::Search(format!("Document has no field '{}'", key)))
}

/// Every field in `fields` equals the document's value.
///
/// Stops at the first unequal field. A field missing from the document is
/// an error for that entry.
pub fn fields_match(fields: &Document, doc: &Document) -> CatalogResult<bool> {
    for (key, expected) in fields {
        if field(doc, key)? != expected {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Every ranged field holds a number inside its range.
///
/// A missing or non-numeric field is an error for that entry.
pub fn ranges_match(ranges: &BTreeMap<String, NumericRange>, doc: &Document) -> CatalogResult<bool> {
    for (key, range) in ranges {
        let value = field(doc, key)?.as_f64().ok_or_else(|| {
            CatalogError::Search(format!("Field '{}' is not a number", key))
        })?;
        if !range.contains(value) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Every patterned field matches its expression
pub fn patterns_match(patterns: &BTreeMap<String, Pattern>, doc: &Document) -> CatalogResult<bool> {
    for (key, pattern) in patterns {
        if !pattern.is_match(field(doc, key)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

enum Phase<'a> {
    Exact(Option<&'a Document>),
    Scan(btree_map::Iter<'a, String, Document>),
}

/// Lazy iterator over matching documents.
///
/// Each call to `Database::matches` builds a fresh one, so callers that
/// only want the first match pay only for it.
pub struct Matches<'a, F> {
    phase: Phase<'a>,
    comparison: F,
}

impl<'a, F> Iterator for Matches<'a, F>
where
    F: FnMut(&str, &Document) -> CatalogResult<bool>,
{
    type Item = &'a Document;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.phase {
            Phase::Exact(hit) => hit.take(),
            Phase::Scan(entries) => {
                for (name, doc) in entries.by_ref() {
                    match (self.comparison)(name, doc) {
                        Ok(true) => return Some(doc),
                        Ok(false) => {}
                        Err(e) => {
                            debug!(
                                target: "devicedb::store",
                                id = %name,
                                error = %e,
                                "Comparison method failed"
                            );
                        }
                    }
                }
                None
            }
        }
    }
}

impl Database {
    /// Documents matching `id` exactly, or failing that, every document the
    /// comparison accepts.
    pub fn matches<'a, F>(&'a self, id: Option<&str>, comparison: F) -> Matches<'a, F>
    where
        F: FnMut(&str, &Document) -> CatalogResult<bool>,
    {
        let phase = if self.is_empty() {
            Phase::Exact(None)
        } else {
            match id.and_then(|id| self.get(id)) {
                Some(doc) => Phase::Exact(Some(doc)),
                None => Phase::Scan(self.iter()),
            }
        };
        Matches { phase, comparison }
    }
}

/// Outcome of `JsonStore::find`.
///
/// A single-result search that matches nothing is `NoMatch`, which is a
/// different shape from `One`.
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    One(Document),
    Many(Vec<Document>),
    NoMatch,
}

impl Found {
    pub fn is_empty(&self) -> bool {
        match self {
            Found::One(_) => false,
            Found::Many(docs) => docs.is_empty(),
            Found::NoMatch => true,
        }
    }

    pub fn into_vec(self) -> Vec<Document> {
        match self {
            Found::One(doc) => vec![doc],
            Found::Many(docs) => docs,
            Found::NoMatch => Vec::new(),
        }
    }

    /// The single document, if this is `One`
    pub fn one(self) -> Option<Document> {
        match self {
            Found::One(doc) => Some(doc),
            _ => None,
        }
    }
}
