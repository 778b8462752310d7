//! Container and field definitions
//!
//! Supported field types:
//! - any: value kept as-is
//! - string: numbers and bools are stringified
//! - int: integers, whole floats and integer strings
//! - float: any number or numeric string
//! - bool: booleans and "true"/"false"

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use super::device::{instantiate_generic, Device};
use super::item::Item;
use crate::errors::{CatalogError, CatalogResult};
use crate::store::ID_KEY;

/// Field names owned by the client layer; containers may not declare them
pub const RESERVED_KEYS: [&str; 4] = [ID_KEY, "type", "creation", "last_edit"];

/// Builds the device object for a materialized item
pub type Instantiator = fn(&Item) -> CatalogResult<Box<dyn Device>>;

/// Enforced value type for an entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Any,
    String,
    Int,
    Float,
    Bool,
}

impl FieldType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Any => "any",
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
        }
    }

    /// Converts `value` to this type, or `None` if it cannot be converted
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldType::Any, v) => Some(v.clone()),

            (FieldType::String, Value::String(_)) => Some(value.clone()),
            (FieldType::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldType::String, Value::Bool(b)) => Some(Value::String(b.to_string())),

            (FieldType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Some(value.clone()),
            (FieldType::Int, Value::Number(n)) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| Value::from(f as i64)),
            (FieldType::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),

            (FieldType::Float, Value::Number(n)) => {
                n.as_f64().and_then(Number::from_f64).map(Value::Number)
            }
            (FieldType::Float, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),

            (FieldType::Bool, Value::Bool(_)) => Some(value.clone()),
            (FieldType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },

            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

fn default_optional() -> bool {
    true
}

/// One declared piece of information on a container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Short description
    #[serde(default)]
    pub doc: String,
    /// Mandatory entries must be filled before an item is stored
    #[serde(default = "default_optional")]
    pub optional: bool,
    #[serde(default)]
    pub enforce: FieldType,
    /// `Null` means no default
    #[serde(default)]
    pub default: Value,
}

impl EntryInfo {
    pub fn optional(doc: impl Into<String>) -> Self {
        Self {
            doc: doc.into(),
            optional: true,
            enforce: FieldType::Any,
            default: Value::Null,
        }
    }

    pub fn mandatory(doc: impl Into<String>) -> Self {
        Self {
            optional: false,
            ..Self::optional(doc)
        }
    }

    pub fn enforce(mut self, enforce: FieldType) -> Self {
        self.enforce = enforce;
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = default.into();
        self
    }
}

/// A named set of entries plus the instantiator for its device objects
#[derive(Clone)]
pub struct Container {
    name: String,
    entries: Vec<(String, EntryInfo)>,
    instantiator: Instantiator,
}

impl Container {
    /// Creates an empty container using the generic device instantiator
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
            instantiator: instantiate_generic,
        }
    }

    /// Adds an entry; later entries with the same key replace earlier ones
    pub fn with_entry(mut self, key: impl Into<String>, info: EntryInfo) -> Self {
        let key = key.into();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push((key, info));
        self
    }

    pub fn with_instantiator(mut self, instantiator: Instantiator) -> Self {
        self.instantiator = instantiator;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entries in declaration order
    pub fn entries(&self) -> impl Iterator<Item = (&str, &EntryInfo)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn entry(&self, key: &str) -> Option<&EntryInfo> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn instantiator(&self) -> Instantiator {
        self.instantiator
    }

    /// Checks the definition itself, not any document
    pub fn validate_structure(&self) -> CatalogResult<()> {
        if self.name.is_empty() {
            return Err(CatalogError::Container("Container name must not be empty".into()));
        }

        for (key, info) in &self.entries {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(CatalogError::Container(format!(
                    "The name '{}' is used by the client and can not be used for an entry of {}",
                    key, self.name
                )));
            }

            if info.default.is_null() {
                continue;
            }

            if !info.optional {
                return Err(CatalogError::Container(format!(
                    "Mandatory entry '{}' of {} can not have a default",
                    key, self.name
                )));
            }

            if info.enforce.coerce(&info.default).is_none() {
                return Err(CatalogError::Container(format!(
                    "Default value of '{}' on {} must match the enforced type {}",
                    key, self.name, info.enforce
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("name", &self.name)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

/// Serialized container definition, as read from a container file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDef {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<(String, EntryInfo)>,
}

impl From<ContainerDef> for Container {
    fn from(def: ContainerDef) -> Self {
        def.entries
            .into_iter()
            .fold(Container::new(def.name), |c, (key, info)| c.with_entry(key, info))
    }
}
