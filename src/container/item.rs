//! Items: documents materialized through a container
//!
//! Declared entries are coerced to their enforced type (or defaulted);
//! everything else in the document lands in `extraneous`.

use serde_json::Value;
use tracing::debug;

use super::types::Container;
use crate::errors::{CatalogError, CatalogResult};
use crate::store::{json_type_name, Document};

/// A document viewed through its container
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    container: String,
    info_names: Vec<String>,
    mandatory: Vec<String>,
    values: Document,
    extraneous: Document,
}

impl Item {
    /// Materializes `doc` with `container`.
    ///
    /// # Errors
    ///
    /// `CatalogError::Entry` if a declared value cannot be converted to its
    /// enforced type.
    pub fn from_document(container: &Container, doc: &Document) -> CatalogResult<Self> {
        let mut values = Document::new();
        let mut info_names = Vec::new();
        let mut mandatory = Vec::new();

        for (key, info) in container.entries() {
            let value = match doc.get(key) {
                Some(raw) if !raw.is_null() => info.enforce.coerce(raw).ok_or_else(|| {
                    CatalogError::Entry(format!(
                        "Invalid value for '{}' on {}: expected {}, got {}",
                        key,
                        container.name(),
                        info.enforce,
                        json_type_name(raw)
                    ))
                })?,
                _ if info.optional => info.default.clone(),
                _ => Value::Null,
            };

            values.insert(key.to_string(), value);
            info_names.push(key.to_string());
            if !info.optional {
                mandatory.push(key.to_string());
            }
        }

        let extraneous: Document = doc
            .iter()
            .filter(|(k, _)| container.entry(k).is_none())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if !extraneous.is_empty() {
            debug!(
                target: "devicedb::client",
                container = container.name(),
                keys = ?extraneous.keys().collect::<Vec<_>>(),
                "Additional information defined outside the container"
            );
        }

        Ok(Self {
            container: container.name().to_string(),
            info_names,
            mandatory,
            values,
            extraneous,
        })
    }

    /// Name of the container this item was built with
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Declared entry names, in declaration order
    pub fn info_names(&self) -> &[String] {
        &self.info_names
    }

    /// Names of the entries that must be filled
    pub fn mandatory_info(&self) -> &[String] {
        &self.mandatory
    }

    /// Keys present in the document but not declared by the container
    pub fn extraneous(&self) -> &Document {
        &self.extraneous
    }

    /// Declared value or extraneous value for `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).or_else(|| self.extraneous.get(key))
    }

    /// Whether a declared entry holds a value
    pub fn is_filled(&self, key: &str) -> bool {
        self.values.get(key).map_or(false, |v| !v.is_null())
    }

    /// Declared values merged with extraneous information
    pub fn post(&self) -> Document {
        let mut post = self.extraneous.clone();
        post.extend(self.values.clone());
        post
    }

    /// Fails when any mandatory entry is unfilled
    pub fn validate(&self) -> CatalogResult<()> {
        let missing: Vec<&str> = self
            .mandatory
            .iter()
            .filter(|k| !self.is_filled(k))
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CatalogError::Entry(format!(
                "Missing mandatory information ({}) for {}",
                missing.join(", "),
                self.container
            )))
        }
    }

    /// Re-materializes this item with `target`.
    ///
    /// # Errors
    ///
    /// `CatalogError::Transfer` naming the offending key when a mandatory
    /// entry of `target` has no value or a value cannot be converted.
    pub fn transfer(&self, target: &Container) -> CatalogResult<Item> {
        let post = self.post();

        for (key, info) in target.entries() {
            match post.get(key).filter(|v| !v.is_null()) {
                None if !info.optional => {
                    return Err(CatalogError::transfer(
                        format!("{} requires a value for '{}'", target.name(), key),
                        key,
                    ))
                }
                Some(value) if info.enforce.coerce(value).is_none() => {
                    return Err(CatalogError::transfer(
                        format!(
                            "Value for '{}' can not be converted to {} for {}",
                            key,
                            info.enforce,
                            target.name()
                        ),
                        key,
                    ))
                }
                _ => {}
            }
        }

        Item::from_document(target, &post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::types::{EntryInfo, FieldType};
    use crate::store::document_from_value;
    use serde_json::json;

    fn valve() -> Container {
        Container::new("Valve")
            .with_entry("name", EntryInfo::mandatory("Name"))
            .with_entry("z", EntryInfo::optional("Position").enforce(FieldType::Float))
            .with_entry(
                "veto",
                EntryInfo::optional("Veto device")
                    .enforce(FieldType::Bool)
                    .default_value(false),
            )
    }

    fn doc(value: Value) -> Document {
        document_from_value(value).unwrap()
    }

    #[test]
    fn test_materialize_splits_extraneous() {
        let item = Item::from_document(
            &valve(),
            &doc(json!({"_id": "v1", "name": "v1", "z": "3.5", "color": "red"})),
        )
        .unwrap();

        assert_eq!(item.get("z"), Some(&json!(3.5)));
        assert_eq!(item.get("veto"), Some(&json!(false)));
        assert_eq!(item.extraneous().len(), 2);
        assert!(item.extraneous().contains_key("color"));
        assert_eq!(item.mandatory_info(), ["name".to_string()]);
        assert!(item.validate().is_ok());
    }

    #[test]
    fn test_bad_type_is_entry_error() {
        let err = Item::from_document(&valve(), &doc(json!({"name": "v1", "z": "far"})))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Entry(_)));
    }

    #[test]
    fn test_unfilled_mandatory_fails_validation() {
        let item = Item::from_document(&valve(), &doc(json!({"z": 1}))).unwrap();
        assert!(!item.is_filled("name"));
        assert!(item.validate().is_err());
    }

    #[test]
    fn test_transfer_reports_key() {
        let item = Item::from_document(&valve(), &doc(json!({"name": "v1"}))).unwrap();
        let target = Container::new("Positioned")
            .with_entry("name", EntryInfo::mandatory("Name"))
            .with_entry("z", EntryInfo::mandatory("Position").enforce(FieldType::Float));

        let err = item.transfer(&target).unwrap_err();
        assert_eq!(err.key(), Some("z"));

        let moved = Item::from_document(&valve(), &doc(json!({"name": "v1", "z": 2})))
            .unwrap()
            .transfer(&target)
            .unwrap();
        assert_eq!(moved.container(), "Positioned");
        assert_eq!(moved.get("z"), Some(&json!(2.0)));
        // veto is not declared by the target
        assert!(moved.extraneous().contains_key("veto"));
    }
}
