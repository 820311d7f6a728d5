//! View resolution contract and its render pipeline.

pub mod backend;
pub mod error;
pub mod template;
pub mod view;

pub use backend::{BackendError, Lookup, ViewBackend, qualified_name};
pub use template::{CompiledTemplate, TemplateError};
pub use view::{View, ViewError, ViewFactory, ViewOptions};
