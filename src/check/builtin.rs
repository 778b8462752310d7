//! Built-in audit checks
//!
//! Each check takes one record and fails with a message meant to be read
//! by whoever maintains the catalog.

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use serde_json::Value;

use super::record::Record;
use crate::container::{template, RESERVED_KEYS};
use crate::store::{Query, ID_KEY};

/// How long `check_wait_connection` waits for a device
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// The device can be built from its record
pub fn check_instantiation(record: &dyn Record) -> anyhow::Result<()> {
    record.instantiate()?;
    Ok(())
}

/// Every stored key is declared by the container, client metadata aside
pub fn check_extra_info(record: &dyn Record) -> anyhow::Result<()> {
    let extra: Vec<&str> = record
        .item()
        .extraneous()
        .keys()
        .map(String::as_str)
        .filter(|key| !RESERVED_KEYS.contains(key))
        .collect();

    if !extra.is_empty() {
        bail!("Un-enforced metadata found: {:?}", extra);
    }
    Ok(())
}

fn display_field(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// `_id` and `name` hold the same value
pub fn check_name_match_id(record: &dyn Record) -> anyhow::Result<()> {
    let metadata = record.metadata();
    let id = metadata.get(ID_KEY).filter(|v| !v.is_null());
    let name = metadata.get("name").filter(|v| !v.is_null());

    if id != name {
        bail!("id: {} != name: {}", display_field(id), display_field(name));
    }
    Ok(())
}

/// Every signal of the device connects within `CONNECTION_TIMEOUT`
pub fn check_wait_connection(record: &dyn Record) -> anyhow::Result<()> {
    let device = record.instantiate()?;

    match device.wait_for_connection(CONNECTION_TIMEOUT) {
        None => bail!(
            "device has no wait_for_connection method, and is likely not an ophyd v1 device"
        ),
        Some(Err(status)) => Err(anyhow!("{}", status)),
        Some(Ok(())) => Ok(()),
    }
}

/// Every `{{variable}}` in the stored document refers to a field it defines.
///
/// Item values are already defaulted, so the raw document is re-read from
/// the store.
pub fn check_args_kwargs_match(record: &dyn Record) -> anyhow::Result<()> {
    let id = record
        .id()
        .ok_or_else(|| anyhow!("record has no {} field", ID_KEY))?;
    let doc = record
        .store()
        .find_one(&Query::by_id(id))?
        .with_context(|| format!("No item information found for {}", id))?;

    let undefined = template::undefined_variables(&Value::Object(doc.clone()), &doc);
    if !undefined.is_empty() {
        bail!("undefined variables found in document: {:?}", undefined);
    }
    Ok(())
}

/// Mandatory entries that hold no value
pub fn find_unfilled_mandatory_info(record: &dyn Record) -> Vec<String> {
    let item = record.item();
    item.mandatory_info()
        .iter()
        .filter(|key| !item.is_filled(key))
        .cloned()
        .collect()
}

/// Optional entries that hold no value, even after defaulting
pub fn find_unfilled_optional_info(record: &dyn Record) -> Vec<String> {
    let item = record.item();
    item.info_names()
        .iter()
        .filter(|key| !item.mandatory_info().contains(*key))
        .filter(|key| !item.is_filled(key))
        .cloned()
        .collect()
}

/// Every mandatory entry holds a value
pub fn check_unfilled_mandatory_info(record: &dyn Record) -> anyhow::Result<()> {
    let unfilled = find_unfilled_mandatory_info(record);
    if !unfilled.is_empty() {
        bail!("unfilled mandatory information found: {:?}", unfilled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{Client, SearchResult};
    use crate::store::document_from_value;
    use serde_json::json;
    use tempfile::TempDir;

    fn setup(docs: &[(&str, Value)]) -> (TempDir, Client) {
        let tmp = TempDir::new().unwrap();
        let client = Client::open(tmp.path().join("db.json"));
        for (id, value) in docs {
            client
                .store()
                .save(id, document_from_value(value.clone()).unwrap(), true)
                .unwrap();
        }
        (tmp, client)
    }

    fn only(client: &Client) -> SearchResult<'_> {
        let mut results = client.search_all().unwrap();
        assert_eq!(results.len(), 1);
        results.remove(0)
    }

    #[test]
    fn test_extra_info_ignores_client_keys() {
        let (_tmp, client) = setup(&[(
            "m1",
            json!({"name": "m1", "type": "Device", "creation": "now", "last_edit": "now"}),
        )]);
        assert!(check_extra_info(&only(&client)).is_ok());
    }

    #[test]
    fn test_extra_info_reports_undeclared() {
        let (_tmp, client) = setup(&[("m1", json!({"name": "m1", "type": "Device", "color": "red"}))]);
        let err = check_extra_info(&only(&client)).unwrap_err();
        assert_eq!(err.to_string(), r#"Un-enforced metadata found: ["color"]"#);
    }

    #[test]
    fn test_name_must_match_id() {
        let (_tmp, client) = setup(&[("m1", json!({"name": "motor", "type": "Device"}))]);
        let err = check_name_match_id(&only(&client)).unwrap_err();
        assert_eq!(err.to_string(), "id: m1 != name: motor");
    }

    #[test]
    fn test_generic_device_has_no_connection() {
        let (_tmp, client) = setup(&[(
            "m1",
            json!({"name": "m1", "type": "Device", "device_class": "X"}),
        )]);
        let record = only(&client);
        assert!(check_instantiation(&record).is_ok());
        let err = check_wait_connection(&record).unwrap_err();
        assert!(err.to_string().contains("no wait_for_connection"));
    }

    #[test]
    fn test_undefined_template_variables() {
        let (_tmp, client) = setup(&[(
            "m1",
            json!({
                "name": "m1",
                "type": "Device",
                "device_class": "X",
                "kwargs": {"name": "{{name}}", "extra": "{{extra}}"}
            }),
        )]);
        let err = check_args_kwargs_match(&only(&client)).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"undefined variables found in document: {"extra"}"#
        );
    }

    #[test]
    fn test_unfilled_info() {
        let (_tmp, client) = setup(&[("m1", json!({"type": "Device", "active": false}))]);
        let record = only(&client);

        assert_eq!(find_unfilled_mandatory_info(&record), vec!["name".to_string()]);
        let optional = find_unfilled_optional_info(&record);
        assert!(optional.contains(&"device_class".to_string()));
        assert!(!optional.contains(&"active".to_string()));

        let err = check_unfilled_mandatory_info(&record).unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"unfilled mandatory information found: ["name"]"#
        );
    }

    #[test]
    fn test_filled_record_passes() {
        let (_tmp, client) = setup(&[(
            "m1",
            json!({"name": "m1", "type": "Device", "device_class": "X"}),
        )]);
        let record = only(&client);
        assert!(check_unfilled_mandatory_info(&record).is_ok());
        assert!(check_args_kwargs_match(&record).is_ok());
        assert!(check_name_match_id(&record).is_ok());
    }
}
