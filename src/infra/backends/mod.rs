//! Concrete [`ViewBackend`](crate::application::ViewBackend) implementations.
//!
//! Exactly one is wired into a deployment, chosen by `views.backend`.

mod memory;
mod module_table;
mod remote;
mod store;

pub use memory::{
    MemoryBackend, RegistryError, TemplateRegistry, install_registry, installed_registry,
};
pub use module_table::{ModuleTable, ModuleTableBackend};
pub use remote::RemoteBackend;
pub use store::{PostgresViewStore, StoreBackend, ViewSourceStore};
