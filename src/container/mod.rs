//! Item materialization
//!
//! Containers declare which entries a document is expected to carry, which
//! of them are mandatory and what type they must convert to. An `Item` is a
//! document viewed through its container; the container's instantiator
//! turns an item into a `Device`.

mod device;
mod item;
mod registry;
pub mod template;
mod types;

pub use device::{instantiate_generic, ConnectionStatus, Device, GenericDevice};
pub use item::Item;
pub use registry::{ContainerRegistry, DEFAULT_CONTAINER};
pub use types::{Container, ContainerDef, EntryInfo, FieldType, Instantiator, RESERVED_KEYS};
