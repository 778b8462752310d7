//! Container registry
//!
//! Containers are kept in registration order. Definitions can also be read
//! from a directory of `*.json` container files.

use std::fs;
use std::path::Path;

use serde_json::json;

use super::types::{Container, ContainerDef, EntryInfo, FieldType};
use crate::errors::{CatalogError, CatalogResult};

/// Name of the container registered by `ContainerRegistry::builtin`
pub const DEFAULT_CONTAINER: &str = "Device";

/// Ordered set of known containers
#[derive(Debug, Clone, Default)]
pub struct ContainerRegistry {
    containers: Vec<Container>,
}

impl ContainerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the generic `Device` container
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.containers.push(device_container());
        registry
    }

    /// Registers a container after checking its structure.
    ///
    /// # Errors
    ///
    /// `CatalogError::Container` for an invalid definition or a name that
    /// is already registered.
    pub fn register(&mut self, container: Container) -> CatalogResult<()> {
        container.validate_structure()?;

        if self.get(container.name()).is_some() {
            return Err(CatalogError::Container(format!(
                "Container {} is already registered",
                container.name()
            )));
        }

        self.containers.push(container);
        Ok(())
    }

    /// Registers every `*.json` container definition found in `dir`
    pub fn load_dir(&mut self, dir: &Path) -> CatalogResult<usize> {
        let entries = fs::read_dir(dir).map_err(|e| {
            CatalogError::io(format!("Failed to read container directory {}", dir.display()), e)
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                CatalogError::io(format!("Failed to read entry in {}", dir.display()), e)
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        // Directory order is platform dependent
        paths.sort();

        for path in &paths {
            let content = fs::read_to_string(path).map_err(|e| {
                CatalogError::io(format!("Failed to read container file {}", path.display()), e)
            })?;
            let def: ContainerDef = serde_json::from_str(&content).map_err(|e| {
                CatalogError::Container(format!(
                    "Malformed container file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            self.register(Container::from(def))?;
        }

        Ok(paths.len())
    }

    pub fn get(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.containers.iter().map(Container::name)
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}

fn device_container() -> Container {
    Container::new(DEFAULT_CONTAINER)
        .with_entry(
            "name",
            EntryInfo::mandatory("Shorthand name for the device").enforce(FieldType::String),
        )
        .with_entry(
            "device_class",
            EntryInfo::optional("Class used to instantiate the device").enforce(FieldType::String),
        )
        .with_entry(
            "args",
            EntryInfo::optional("Positional arguments for the device").default_value(json!([])),
        )
        .with_entry(
            "kwargs",
            EntryInfo::optional("Keyword arguments for the device").default_value(json!({})),
        )
        .with_entry(
            "active",
            EntryInfo::optional("Whether the device is in use")
                .enforce(FieldType::Bool)
                .default_value(true),
        )
        .with_entry(
            "documentation",
            EntryInfo::optional("Relevant documentation for the device")
                .enforce(FieldType::String),
        )
}
