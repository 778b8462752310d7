//! Instantiated device objects

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use super::item::Item;
use super::template;
use crate::errors::{CatalogError, CatalogResult};
use crate::store::Document;

/// Outcome of a failed connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub connected: usize,
    pub total: usize,
    pub reason: String,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} signals connected. \noriginal error: {}",
            self.connected, self.total, self.reason
        )
    }
}

/// The object an item describes
pub trait Device: fmt::Debug {
    fn name(&self) -> &str;

    /// Blocks until connected or `timeout` elapses.
    ///
    /// `None` when the device has no notion of connectivity.
    fn wait_for_connection(&self, _timeout: Duration) -> Option<Result<(), ConnectionStatus>> {
        None
    }
}

/// Device built directly from an item's `device_class`, `args` and `kwargs`
#[derive(Debug, Clone, PartialEq)]
pub struct GenericDevice {
    pub name: String,
    pub device_class: String,
    pub args: Vec<Value>,
    pub kwargs: Document,
}

impl Device for GenericDevice {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Default instantiator: renders `args`/`kwargs` templates from the item
pub fn instantiate_generic(item: &Item) -> CatalogResult<Box<dyn Device>> {
    let name = item
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let device_class = item
        .get("device_class")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            CatalogError::Entry(format!("Item '{}' does not define a device_class", name))
        })?
        .to_string();

    let context = item.post();
    let render = |key: &str| -> CatalogResult<Value> {
        let raw = item.get(key).cloned().unwrap_or(Value::Null);
        template::render(&raw, &context).map_err(|undefined| {
            CatalogError::Entry(format!(
                "Item '{}' uses undefined variables in {}: {:?}",
                name, key, undefined
            ))
        })
    };

    let args = match render("args")? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    };
    let kwargs = match render("kwargs")? {
        Value::Object(map) => map,
        Value::Null => Document::new(),
        other => {
            return Err(CatalogError::Entry(format!(
                "kwargs of '{}' must be an object, got {}",
                name, other
            )))
        }
    };

    Ok(Box::new(GenericDevice {
        name,
        device_class,
        args,
        kwargs,
    }))
}
